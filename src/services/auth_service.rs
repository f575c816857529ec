use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthenticatedAdmin;
use crate::repository::AdminRepository;

pub const SESSION_COOKIE: &str = "dealer_session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct AuthService {
    admins: Arc<dyn AdminRepository>,
    jwt_secret: String,
    ttl: chrono::Duration,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(
        admins: Arc<dyn AdminRepository>,
        jwt_secret: String,
        ttl_hours: i64,
        secure_cookies: bool,
    ) -> Self {
        Self {
            admins,
            jwt_secret,
            ttl: chrono::Duration::hours(ttl_hours),
            secure_cookies,
        }
    }

    /// Verifies credentials and returns a signed session token.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(AuthenticatedAdmin, String)> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let admin = self
            .admins
            .find_admin_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;

        let parsed = PasswordHash::new(&admin.password_hash)
            .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| invalid())?;

        let admin = AuthenticatedAdmin {
            admin_id: admin.id,
            email: admin.email,
        };
        let token = self.issue_token(&admin, Utc::now())?;
        tracing::info!("Admin signed in: admin_id={}", admin.admin_id);
        Ok((admin, token))
    }

    pub fn issue_token(&self, admin: &AuthenticatedAdmin, now: DateTime<Utc>) -> AppResult<String> {
        let claims = Claims {
            sub: admin.admin_id.to_string(),
            email: admin.email.clone(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("JWT error: {}", e)))
    }

    /// `None` for a malformed, forged or expired token.
    pub fn decode(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims)
    }

    pub fn authenticate(&self, token: &str) -> Option<(AuthenticatedAdmin, Claims)> {
        let claims = self.decode(token)?;
        let admin_id = Uuid::parse_str(&claims.sub).ok()?;
        let admin = AuthenticatedAdmin {
            admin_id,
            email: claims.email.clone(),
        };
        Some((admin, claims))
    }

    /// A session is refreshed once more than half of its lifetime has passed.
    pub fn needs_refresh(&self, claims: &Claims, now: DateTime<Utc>) -> bool {
        now.timestamp() - claims.iat > self.ttl.num_seconds() / 2
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.ttl.num_seconds()
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::AdminUser;
    use crate::repository::memory::MemoryStore;
    use argon2::password_hash::{PasswordHasher, SaltString};

    pub(crate) fn hash_password(password: &str) -> String {
        let salt = SaltString::from_b64("ZGVhbGVyc2l0ZXNhbHQ").unwrap();
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    pub(crate) async fn service_with_admin(email: &str, password: &str) -> AuthService {
        let store = Arc::new(MemoryStore::new());
        store
            .put_admin(AdminUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: hash_password(password),
            })
            .await;
        AuthService::new(store, "test-secret".to_string(), 24, false)
    }

    #[tokio::test]
    async fn test_login_with_correct_password() {
        let auth = service_with_admin("admin@example.com", "hunter2").await;
        let (admin, token) = auth.login("admin@example.com", "hunter2").await.unwrap();
        let (decoded, claims) = auth.authenticate(&token).unwrap();
        assert_eq!(decoded, admin);
        assert_eq!(claims.email, "admin@example.com");
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password_and_unknown_email() {
        let auth = service_with_admin("admin@example.com", "hunter2").await;
        assert!(matches!(
            auth.login("admin@example.com", "wrong").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "hunter2").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let auth = service_with_admin("admin@example.com", "hunter2").await;
        let (_, token) = auth.login("admin@example.com", "hunter2").await.unwrap();
        let other = AuthService::new(Arc::new(MemoryStore::new()), "other".into(), 24, false);
        assert!(other.decode(&token).is_none());
        assert!(auth.decode("not-a-jwt").is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let auth = service_with_admin("admin@example.com", "hunter2").await;
        let admin = AuthenticatedAdmin {
            admin_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
        };
        let token = auth
            .issue_token(&admin, Utc::now() - chrono::Duration::hours(48))
            .unwrap();
        assert!(auth.decode(&token).is_none());
    }

    #[tokio::test]
    async fn test_needs_refresh_after_half_ttl() {
        let auth = service_with_admin("admin@example.com", "hunter2").await;
        let now = Utc::now();
        let fresh = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "a@b.c".into(),
            iat: now.timestamp() - 3600,
            exp: now.timestamp() + 3600 * 23,
        };
        assert!(!auth.needs_refresh(&fresh, now));
        let stale = Claims {
            iat: now.timestamp() - 13 * 3600,
            ..fresh
        };
        assert!(auth.needs_refresh(&stale, now));
    }

    #[tokio::test]
    async fn test_cookie_attributes() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store, "s".into(), 2, true);
        let cookie = auth.session_cookie("abc");
        assert!(cookie.starts_with("dealer_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(cookie.ends_with("; Secure"));
        assert!(auth.clear_cookie().contains("Max-Age=0"));
    }
}
