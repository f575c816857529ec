//! Public, locale-prefixed pages.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tera::Context;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::i18n::{t, Locale};
use crate::services::autocomplete;
use crate::services::coerce::parse_uuid;
use crate::services::enquiry_service::EnquiryForm;
use crate::services::inventory_service::{CarFilter, PriceRange, SortOrder};
use crate::services::pdf_export::{pdf_filename, render_car_pdf};

use super::templates::page_context;
use super::{outcome_redirect, path_and_query, AppState};

const HOME_LATEST: i64 = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:lang", get(home))
        .route("/:lang/cars", get(cars))
        .route("/:lang/cars/:id", get(car_detail))
        .route("/:lang/cars/:id/pdf", get(car_pdf))
        .route("/:lang/cars/:id/inquire", get(inquire_page).post(submit_inquiry))
        .route("/:lang/contact", get(contact_page).post(submit_contact))
        .route("/:lang/pre-approval", get(pre_approval_page))
        .route("/:lang/pre-approval/success", get(pre_approval_success))
}

/// Locale from the first path segment; unsupported segments are a 404.
pub(crate) fn locale(lang: &str) -> AppResult<Locale> {
    Locale::from_segment(lang).ok_or_else(|| AppError::NotFound(format!("locale {}", lang)))
}

/// Outcome of a form post, passed back through the redirect.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Flash {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl Flash {
    pub(crate) fn insert_into(&self, context: &mut Context) {
        context.insert("flash_status", &self.status);
        context.insert("flash_message", &self.message);
    }
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    label: String,
}

fn price_range_options(locale: Locale) -> Vec<SelectOption> {
    PriceRange::iter()
        .map(|range| {
            let value = range.as_ref().to_string();
            let label = t(locale, &format!("price_range.{}", value)).to_string();
            SelectOption { value, label }
        })
        .collect()
}

fn sort_options(locale: Locale) -> Vec<SelectOption> {
    SortOrder::iter()
        .map(|sort| {
            let value = sort.as_ref().to_string();
            let label = t(locale, &format!("sort.{}", value)).to_string();
            SelectOption { value, label }
        })
        .collect()
}

fn search_form_context(context: &mut Context, locale: Locale) {
    context.insert("brands", &autocomplete::brands());
    context.insert("price_ranges", &price_range_options(locale));
    context.insert("sort_options", &sort_options(locale));
}

pub(crate) fn not_found(state: &AppState, locale: Locale, uri: &Uri) -> AppResult<Response> {
    let context = page_context(locale, &path_and_query(uri));
    let html = state.templates.render("not_found.html", &context)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

fn cache_and_serve(state: &AppState, key: String, html: String) -> Response {
    state.pages.insert(key, html.clone());
    Html(html).into_response()
}

async fn home(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let key = path_and_query(&uri);
    if let Some(html) = state.pages.get(&key) {
        return Ok(Html(html).into_response());
    }

    let cars = state.inventory.search(&CarFilter::latest(HOME_LATEST)).await;
    let mut context = page_context(locale, &key);
    context.insert("cars", &cars);
    context.insert("query", &HashMap::<String, String>::new());
    search_form_context(&mut context, locale);
    let html = state.templates.render("home.html", &context)?;
    Ok(cache_and_serve(&state, key, html))
}

async fn cars(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let key = path_and_query(&uri);
    if let Some(html) = state.pages.get(&key) {
        return Ok(Html(html).into_response());
    }

    let filter = CarFilter::from_query(&params);
    let cars = state.inventory.search(&filter).await;
    let mut context = page_context(locale, &key);
    context.insert("cars", &cars);
    context.insert("query", &params);
    search_form_context(&mut context, locale);
    let html = state.templates.render("cars.html", &context)?;
    Ok(cache_and_serve(&state, key, html))
}

async fn car_detail(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let Some(id) = parse_uuid(Some(id.as_str())) else {
        return not_found(&state, locale, &uri);
    };

    match state.inventory.record_view(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(&state, locale, &uri),
        Err(e) => tracing::warn!("Failed to record view: car_id={}, error={}", id, e),
    }

    let key = path_and_query(&uri);
    if let Some(html) = state.pages.get(&key) {
        return Ok(Html(html).into_response());
    }

    let Some(car) = state.inventory.get(id).await? else {
        return not_found(&state, locale, &uri);
    };
    let mut context = page_context(locale, &key);
    context.insert("car", &car);
    let html = state.templates.render("car_detail.html", &context)?;
    Ok(cache_and_serve(&state, key, html))
}

async fn car_pdf(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let car = match parse_uuid(Some(id.as_str())) {
        Some(id) => state.inventory.get(id).await?,
        None => None,
    }
    .ok_or_else(|| AppError::NotFound(format!("car {}", id)))?;

    let bytes = render_car_pdf(&car, locale)?;
    tracing::info!("PDF exported: car_id={}, size={}", car.id, bytes.len());
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf_filename(&car)),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn inquire_page(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    Query(flash): Query<Flash>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let car = match parse_uuid(Some(id.as_str())) {
        Some(id) => state.inventory.get(id).await?,
        None => None,
    };
    let Some(car) = car else {
        return not_found(&state, locale, &uri);
    };

    let mut context = page_context(locale, &path_and_query(&uri));
    context.insert("car", &car);
    flash.insert_into(&mut context);
    let html = state.templates.render("inquire.html", &context)?;
    Ok(Html(html).into_response())
}

async fn submit_inquiry(
    State(state): State<AppState>,
    Path((lang, id)): Path<(String, String)>,
    Form(form): Form<EnquiryForm>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let car_id: Uuid = parse_uuid(Some(id.as_str()))
        .ok_or_else(|| AppError::NotFound(format!("car {}", id)))?;

    let path = format!("/{}/cars/{}/inquire", locale, car_id);
    let result = state.enquiries.submit_inquiry(car_id, form).await.map(|_| ());
    Ok(outcome_redirect(&path, result, t(locale, "form.success")).into_response())
}

async fn contact_page(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(flash): Query<Flash>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let mut context = page_context(locale, &path_and_query(&uri));
    flash.insert_into(&mut context);
    let html = state.templates.render("contact.html", &context)?;
    Ok(Html(html).into_response())
}

async fn submit_contact(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Form(form): Form<EnquiryForm>,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let path = format!("/{}/contact", locale);
    let result = state.enquiries.submit_contact(form).await.map(|_| ());
    Ok(outcome_redirect(&path, result, t(locale, "form.success")).into_response())
}

#[derive(Debug, Deserialize)]
struct PreApprovalQuery {
    car_id: Option<String>,
}

async fn pre_approval_page(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(query): Query<PreApprovalQuery>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let vehicle = match parse_uuid(query.car_id.as_deref()) {
        Some(id) => state.inventory.get(id).await.unwrap_or_else(|e| {
            tracing::warn!("Vehicle lookup for pre-approval failed: car_id={}, error={}", id, e);
            None
        }),
        None => None,
    };

    let mut context = page_context(locale, &path_and_query(&uri));
    context.insert("vehicle", &vehicle);
    let html = state.templates.render("pre_approval.html", &context)?;
    Ok(Html(html).into_response())
}

#[derive(Debug, Deserialize)]
struct SuccessQuery {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

async fn pre_approval_success(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    Query(query): Query<SuccessQuery>,
    uri: Uri,
) -> AppResult<Response> {
    let locale = locale(&lang)?;
    let mut context = page_context(locale, &path_and_query(&uri));
    context.insert("reference_number", &query.reference);
    let html = state.templates.render("pre_approval_success.html", &context)?;
    Ok(Html(html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::{sample_car, MemoryStore};
    use crate::repository::CarRepository;
    use crate::web::page_cache::car_paths;
    use crate::web::tests::{body_string, get_req, test_app, test_state};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_price_range_listing() {
        let store = Arc::new(MemoryStore::new());
        for (model, price) in [("Fit", 9_999.0), ("Civic", 10_000.0), ("Accord", 19_999.0), ("Pilot", 20_000.0)] {
            let mut car = sample_car("Honda", model, 2020);
            car.price = Some(price);
            store.put_car(car).await;
        }
        let res = test_app(store)
            .oneshot(get_req("/en/cars?price_range=10k_20k"))
            .await
            .unwrap();
        let html = body_string(res).await;
        assert!(html.contains("Honda Civic"));
        assert!(html.contains("Honda Accord"));
        assert!(!html.contains("Honda Fit"));
        assert!(!html.contains("Honda Pilot"));
    }

    #[tokio::test]
    async fn test_detail_page_counts_views_and_unknown_car_is_404() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Mazda", "CX-5", 2021);
        let id = car.id;
        store.put_car(car).await;
        let app = test_app(store.clone());

        let res = app
            .clone()
            .oneshot(get_req(&format!("/en/cars/{}", id)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("2021 Mazda CX-5"));
        app.clone()
            .oneshot(get_req(&format!("/es/cars/{}", id)))
            .await
            .unwrap();
        assert_eq!(store.view_count(id).await.unwrap(), Some(2));

        let res = app
            .clone()
            .oneshot(get_req(&format!("/en/cars/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = app.oneshot(get_req("/en/cars/not-a-uuid")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pdf_download() {
        let store = Arc::new(MemoryStore::new());
        let mut car = sample_car("Ford", "Ranger", 2019);
        car.custom_id = Some("STK-42".into());
        let id = car.id;
        store.put_car(car).await;
        let app = test_app(store);

        let res = app
            .clone()
            .oneshot(get_req(&format!("/en/cars/{}/pdf", id)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(
            res.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"STK-42.pdf\""
        );

        let res = app
            .oneshot(get_req(&format!("/en/cars/{}/pdf", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inquiry_post_redirects_with_status() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Kia", "Soul", 2020);
        let id = car.id;
        store.put_car(car).await;
        let app = test_app(store.clone());

        let res = app
            .clone()
            .oneshot(form_post(
                &format!("/es/cars/{}/inquire", id),
                "name=Dana&email=dana%40example.com&message=Hola",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("/es/cars/{}/inquire?status=success", id)));
        assert_eq!(store.enquiries().await.len(), 1);

        let res = app
            .oneshot(form_post(
                &format!("/en/cars/{}/inquire", id),
                "name=&email=dana%40example.com&message=Hi",
            ))
            .await
            .unwrap();
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.contains("status=error"));
        assert!(location.contains("name%20is%20required"));
        assert_eq!(store.enquiries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_contact_page_shows_flash_message() {
        let app = test_app(Arc::new(MemoryStore::new()));
        let res = app
            .oneshot(get_req("/en/contact?status=error&message=email%20is%20required"))
            .await
            .unwrap();
        assert!(body_string(res).await.contains("email is required"));
    }

    #[tokio::test]
    async fn test_pre_approval_page_prefills_vehicle() {
        let store = Arc::new(MemoryStore::new());
        let car = sample_car("Subaru", "Forester", 2018);
        let id = car.id;
        store.put_car(car).await;

        let res = test_app(store)
            .oneshot(get_req(&format!("/en/pre-approval?car_id={}", id)))
            .await
            .unwrap();
        let html = body_string(res).await;
        assert!(html.contains("2018 Subaru Forester"));
        assert!(html.contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_listing_is_served_from_cache_until_revalidated() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store.clone());
        let app = crate::web::router(state.clone());
        app.clone().oneshot(get_req("/en/cars")).await.unwrap();

        store.put_car(sample_car("Tesla", "Model 3", 2022)).await;
        let html = body_string(app.clone().oneshot(get_req("/en/cars")).await.unwrap()).await;
        assert!(!html.contains("Tesla Model 3"));

        let res = app.clone().oneshot(get_req("/en/cars?sort=newest")).await.unwrap();
        let html = body_string(res).await;
        assert!(html.contains("Tesla Model 3"));

        assert!(state.pages.revalidate(&car_paths(None)) > 0);
        let html = body_string(app.oneshot(get_req("/en/cars")).await.unwrap()).await;
        assert!(html.contains("Tesla Model 3"));
    }
}
