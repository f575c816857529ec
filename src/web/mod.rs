//! HTTP surface: public pages, JSON API and the admin area.

pub mod admin;
pub mod api;
pub mod page_cache;
pub mod pages;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::Uri;
use axum::middleware::from_fn_with_state;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::i18n::Locale;
use crate::mailer::{Mailer, Notifier};
use crate::middleware::locale::redirect_unprefixed;
use crate::repository::Repositories;
use crate::services::{
    AdminService, AuthService, EnquiryService, InventoryService, PreApprovalService,
};
use crate::storage::StorageBackend;

use page_cache::PageCache;
use templates::Templates;

#[derive(Clone)]
pub struct AppState {
    pub inventory: InventoryService,
    pub enquiries: EnquiryService,
    pub pre_approvals: PreApprovalService,
    pub admin: AdminService,
    pub auth: AuthService,
    pub pages: Arc<PageCache>,
    pub templates: Arc<Templates>,
    pub default_locale: Locale,
}

impl AppState {
    pub fn new(
        config: &Config,
        repos: Repositories,
        storage: Option<Arc<dyn StorageBackend>>,
        mailer: Arc<dyn Mailer>,
    ) -> AppResult<Self> {
        let pages = Arc::new(PageCache::new(
            config.page_cache_capacity,
            Duration::from_secs(config.page_cache_ttl_secs),
        ));
        let templates = Arc::new(Templates::new()?);
        let notifier = Notifier::new(
            mailer,
            templates.clone(),
            config.mail_from.clone(),
            config.dealership_inbox.clone(),
        );

        Ok(Self {
            inventory: InventoryService::new(repos.cars.clone()),
            enquiries: EnquiryService::new(
                repos.enquiries.clone(),
                repos.cars.clone(),
                notifier.clone(),
            ),
            pre_approvals: PreApprovalService::new(repos.applications.clone(), notifier),
            auth: AuthService::new(
                repos.admins.clone(),
                config.jwt_secret.clone(),
                config.session_ttl_hours,
                config.secure_cookies,
            ),
            admin: AdminService::new(repos, storage, pages.clone()),
            pages,
            templates,
            default_locale: config.default_locale,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(api::router())
        .merge(pages::router())
        .merge(admin::router(state.auth.clone()))
        .route("/", get(root))
        .layer(from_fn_with_state(state.default_locale, redirect_unprefixed))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Non-GET requests to `/` skip the locale redirect and land here.
async fn root(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&format!("/{}", state.default_locale))
}

/// `{path}?status=success|error&message=...` for post-redirect-get flows.
pub(crate) fn status_redirect(path: &str, ok: bool, message: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?status={}&message={}",
        path,
        if ok { "success" } else { "error" },
        urlencoding::encode(message)
    ))
}

/// Redirects to `path` reporting the outcome. Validation and not-found
/// messages are shown to the user; anything else is logged and replaced by a
/// generic message.
pub(crate) fn outcome_redirect(path: &str, result: AppResult<()>, success: &str) -> Redirect {
    match result {
        Ok(()) => status_redirect(path, true, success),
        Err(e @ (AppError::Validation(_) | AppError::NotFound(_))) => {
            tracing::warn!("{} rejected: {}", path, e);
            status_redirect(path, false, &e.to_string())
        }
        Err(e) => {
            tracing::error!("{} failed: {}", path, e);
            status_redirect(path, false, "Something went wrong, please try again.")
        }
    }
}

/// Path and query of the request, used as the page cache key and for the
/// language toggle.
pub(crate) fn path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
