//! Admin area. Everything except the login page sits behind [`AuthLayer`].

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::i18n::t;
use crate::middleware::auth::session_token;
use crate::middleware::{AuthLayer, AuthenticatedAdmin};
use crate::models::PreApprovalApplication;
use crate::services::admin_service::ImageUpload;
use crate::services::coerce::parse_uuid;
use crate::services::AuthService;

use super::pages::{locale, Flash};
use super::templates::page_context;
use super::{outcome_redirect, path_and_query, status_redirect, AppState};

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(auth: AuthService) -> Router<AppState> {
    Router::new()
        .route("/:lang/admin", get(dashboard))
        .route("/:lang/admin/login", get(login_page).post(login))
        .route("/:lang/admin/logout", post(logout))
        .route(
            "/:lang/admin/cars",
            post(add_car).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/:lang/admin/cars/:id/delete", post(delete_car))
        .route("/:lang/admin/cars/:id/status", post(set_car_status))
        .route(
            "/:lang/admin/applications/:id/status",
            post(set_application_status),
        )
        .route_layer(AuthLayer::new(auth))
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct StatusForm {
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct ApplicationRow<'a> {
    #[serde(flatten)]
    application: &'a PreApprovalApplication,
    full_name: String,
    masked_ssn: Option<String>,
}

async fn login_page(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(flash): Query<Flash>,
    headers: HeaderMap,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    if session_token(&headers).and_then(|token| state.auth.authenticate(&token)).is_some() {
        return Ok(Redirect::to(&format!("/{}/admin", locale)).into_response());
    }

    let mut context = page_context(locale, &path_and_query(&uri));
    flash.insert_into(&mut context);
    let html = state.templates.render("admin_login.html", &context)?;
    Ok(Html(html).into_response())
}

async fn login(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    match state.auth.login(&form.email, &form.password).await {
        Ok((_, token)) => Ok((
            [(SET_COOKIE, state.auth.session_cookie(&token))],
            Redirect::to(&format!("/{}/admin", locale)),
        )
            .into_response()),
        Err(e) => {
            tracing::warn!("Admin sign-in failed: email={}, error={}", form.email, e);
            let message = match e {
                AppError::Unauthorized(msg) => msg,
                _ => "Sign-in is unavailable, please try again.".to_string(),
            };
            Ok(status_redirect(&format!("/{}/admin/login", locale), false, &message).into_response())
        }
    }
}

async fn logout(State(state): State<AppState>, Path(lang): Path<String>) -> AppResult<Response> {
    let locale = locale(&lang)?;
    Ok((
        [(SET_COOKIE, state.auth.clear_cookie())],
        Redirect::to(&format!("/{}/admin/login", locale)),
    )
        .into_response())
}

async fn dashboard(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Query(flash): Query<Flash>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let data = state.admin.dashboard(&admin).await?;
    let applications: Vec<ApplicationRow> = data
        .applications
        .iter()
        .map(|application| ApplicationRow {
            application,
            full_name: application.details.full_name(),
            masked_ssn: application.details.masked_ssn(),
        })
        .collect();

    let mut context = page_context(locale, &path_and_query(&uri));
    context.insert("admin", &admin.email);
    context.insert("cars", &data.cars);
    context.insert("enquiries", &data.enquiries);
    context.insert("applications", &applications);
    flash.insert_into(&mut context);
    let html = state.templates.render("admin_dashboard.html", &context)?;
    Ok(Html(html).into_response())
}

async fn read_car_form(
    multipart: &mut Multipart,
) -> AppResult<(HashMap<String, String>, Vec<ImageUpload>)> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid form data: {}", e.body_text()))
    };

    let mut fields = HashMap::new();
    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" {
            let filename = field.file_name().unwrap_or("image").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(invalid)?;
            images.push(ImageUpload {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await.map_err(invalid)?;
            fields.insert(name, value);
        }
    }
    Ok((fields, images))
}

async fn add_car(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let result = match read_car_form(&mut multipart).await {
        Ok((fields, images)) => state.admin.add_car(&admin, &fields, images).await.map(|_| ()),
        Err(e) => Err(e),
    };
    Ok(outcome_redirect(
        &format!("/{}/admin", locale),
        result,
        t(locale, "admin.car_added"),
    )
    .into_response())
}

async fn delete_car(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let result = match parse_uuid(Some(id.as_str())) {
        Some(id) => state.admin.delete_car(&admin, id).await,
        None => Err(AppError::NotFound(format!("car {}", id))),
    };
    Ok(outcome_redirect(
        &format!("/{}/admin", locale),
        result,
        t(locale, "admin.car_deleted"),
    )
    .into_response())
}

async fn set_car_status(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Form(form): Form<StatusForm>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let result = match parse_uuid(Some(id.as_str())) {
        Some(id) => state.admin.set_car_status(&admin, id, &form.status).await,
        None => Err(AppError::NotFound(format!("car {}", id))),
    };
    Ok(outcome_redirect(
        &format!("/{}/admin", locale),
        result,
        t(locale, "admin.status_updated"),
    )
    .into_response())
}

async fn set_application_status(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Form(form): Form<StatusForm>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let result = match parse_uuid(Some(id.as_str())) {
        Some(id) => {
            state
                .admin
                .set_application_status(&admin, id, &form.status)
                .await
        }
        None => Err(AppError::NotFound(format!("application {}", id))),
    };
    Ok(outcome_redirect(
        &format!("/{}/admin", locale),
        result,
        t(locale, "admin.status_updated"),
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use crate::models::{AdminUser, CarStatus};
    use crate::repository::memory::{sample_car, MemoryStore};
    use crate::repository::CarRepository;
    use crate::services::auth_service::tests::hash_password;
    use crate::web::tests::{body_string, get_req, test_app};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn store_with_admin() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .put_admin(AdminUser {
                id: Uuid::new_v4(),
                email: "admin@example.com".into(),
                password_hash: hash_password("hunter2"),
            })
            .await;
        store
    }

    fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn sign_in(app: &axum::Router) -> String {
        let res = app
            .clone()
            .oneshot(form_post(
                "/en/admin/login",
                "email=admin%40example.com&password=hunter2",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/en/admin");
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_dashboard_requires_session() {
        let app = test_app(store_with_admin().await);
        let res = app.oneshot(get_req("/es/admin")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/es/admin/login");
    }

    #[tokio::test]
    async fn test_wrong_password_redirects_back_to_login() {
        let app = test_app(store_with_admin().await);
        let res = app
            .oneshot(form_post(
                "/en/admin/login",
                "email=admin%40example.com&password=nope",
                None,
            ))
            .await
            .unwrap();
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/en/admin/login?status=error"));
        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_signed_in_admin_sees_dashboard_and_can_change_status() {
        let store = store_with_admin().await;
        let car = sample_car("Volvo", "XC90", 2022);
        let id = car.id;
        store.put_car(car).await;
        let app = test_app(store.clone());
        let cookie = sign_in(&app).await;

        let req = Request::builder()
            .uri("/en/admin")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = body_string(res).await;
        assert!(html.contains("2022 Volvo XC90"));
        assert!(html.contains("admin@example.com"));

        let res = app
            .clone()
            .oneshot(form_post(
                &format!("/en/admin/cars/{}/status", id),
                "status=sold",
                Some(&cookie),
            ))
            .await
            .unwrap();
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/en/admin?status=success"));
        assert_eq!(store.find(id).await.unwrap().unwrap().status, CarStatus::Sold);

        let res = app
            .oneshot(form_post(
                &format!("/en/admin/cars/{}/delete", id),
                "",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert!(res.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .contains("status=success"));
        assert!(store.find(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_car_from_multipart_form() {
        let store = store_with_admin().await;
        let app = test_app(store.clone());
        let cookie = sign_in(&app).await;

        let boundary = "XBOUNDARYX";
        let body = [
            ("brand", "Nissan"),
            ("model", "Rogue"),
            ("model_year", "2020"),
            ("price", "21,300"),
        ]
        .iter()
        .map(|(name, value)| {
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"\r\n\r\n{v}\r\n",
                b = boundary,
                n = name,
                v = value
            )
        })
        .collect::<String>()
            + &format!("--{}--\r\n", boundary);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/en/admin/cars")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .header(header::COOKIE, &cookie)
            .body(Body::from(body))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert!(res.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .contains("status=success"));

        let cars = store
            .search(&crate::services::inventory_service::CarFilter::default())
            .await
            .unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].name, "2020 Nissan Rogue");
        assert_eq!(cars[0].price, Some(21300.0));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = test_app(store_with_admin().await);
        let cookie = sign_in(&app).await;
        let res = app
            .oneshot(form_post("/en/admin/logout", "", Some(&cookie)))
            .await
            .unwrap();
        assert!(res.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));
    }
}
