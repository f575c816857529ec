use axum::extract::{Request, State};
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::i18n::{locale_from_path, localized_path, negotiate, Locale};

/// Paths served without a locale prefix.
const UNLOCALIZED_PREFIXES: &[&str] = &["/api", "/health", "/static", "/favicon.ico"];

fn is_unlocalized(path: &str) -> bool {
    UNLOCALIZED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Redirects page requests without a locale segment to `/{lang}{path}?{query}`,
/// choosing `lang` from `Accept-Language` and falling back to the default.
pub async fn redirect_unprefixed(
    State(default_locale): State<Locale>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let is_page_read = req.method() == Method::GET || req.method() == Method::HEAD;

    if !is_page_read || is_unlocalized(path) || locale_from_path(path).is_some() {
        return next.run(req).await;
    }

    let locale = negotiate(
        req.headers()
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
    .unwrap_or(default_locale);
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path);
    let target = localized_path(locale, path_and_query);

    tracing::debug!("Locale redirect: {} -> {}", path_and_query, target);
    Redirect::temporary(&target).into_response()
}
