use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::i18n::{locale_from_path, strip_locale};
use crate::services::auth_service::{AuthService, SESSION_COOKIE};

/// Signed-in admin injected by the auth middleware into request extensions.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthenticatedAdmin {
    pub admin_id: Uuid,
    pub email: String,
}

/// Admin paths (locale prefix stripped) reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/admin/login"];

#[derive(Clone)]
pub struct AuthLayer {
    auth: AuthService,
}

impl AuthLayer {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            auth: self.auth.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    auth: AuthService,
}

/// Reads the session token from the `Cookie` header(s).
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        let auth = self.auth.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();

            if PUBLIC_PATHS.iter().any(|p| strip_locale(&path) == *p) {
                return inner.call(req).await;
            }

            let session = session_token(req.headers()).and_then(|t| auth.authenticate(&t));
            let Some((admin, claims)) = session else {
                let locale = locale_from_path(&path).unwrap_or_default();
                tracing::debug!("No valid admin session for {}, redirecting to login", path);
                return Ok(Redirect::to(&format!("/{}/admin/login", locale)).into_response());
            };

            let now = Utc::now();
            let refreshed = if auth.needs_refresh(&claims, now) {
                match auth.issue_token(&admin, now) {
                    Ok(token) => Some(auth.session_cookie(&token)),
                    Err(e) => {
                        tracing::warn!("Failed to refresh admin session: {}", e);
                        None
                    }
                }
            } else {
                None
            };

            req.extensions_mut().insert(admin);
            let mut response = inner.call(req).await?;

            if let Some(cookie) = refreshed {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; dealer_session=abc.def.ghi; lang=es"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_session_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("dealer_session="));
        assert_eq!(session_token(&headers), None);
    }
}
