use std::env;

use crate::i18n::Locale;

#[derive(Clone, Debug, PartialEq)]
pub enum StorageConfig {
    R2 {
        account_id: String,
        access_key: String,
        secret_key: String,
        bucket: String,
    },
    Gcs {
        bucket: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// When unset the server runs against an in-memory store with demo inventory.
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub run_migrations: bool,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub default_locale: Locale,
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub mail_from: String,
    pub dealership_inbox: String,
    pub storage: Option<StorageConfig>,
    pub storage_public_url: Option<String>,
    pub page_cache_capacity: usize,
    pub page_cache_ttl_secs: u64,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            run_migrations: env_flag("RUN_MIGRATIONS"),
            jwt_secret: env::var("JWT_SECRET")?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
            secure_cookies: env_flag("SECURE_COOKIES"),
            default_locale: env::var("DEFAULT_LOCALE")
                .ok()
                .and_then(|v| Locale::parse(&v))
                .unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
            resend_api_url: env::var("RESEND_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Dealership <noreply@example.com>".to_string()),
            dealership_inbox: env::var("DEALERSHIP_INBOX")
                .unwrap_or_else(|_| "sales@example.com".to_string()),
            storage: storage_from_env(),
            storage_public_url: env::var("STORAGE_PUBLIC_URL").ok().filter(|s| !s.is_empty()),
            page_cache_capacity: env::var("PAGE_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            page_cache_ttl_secs: env::var("PAGE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            admin_password_hash: env::var("ADMIN_PASSWORD_HASH").ok().filter(|s| !s.is_empty()),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn storage_from_env() -> Option<StorageConfig> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "r2".to_string());
    match backend.as_str() {
        "gcs" => env::var("GCS_BUCKET")
            .ok()
            .map(|bucket| StorageConfig::Gcs { bucket }),
        _ => {
            let bucket = env::var("R2_BUCKET").ok()?;
            Some(StorageConfig::R2 {
                account_id: env::var("R2_ACCOUNT_ID").ok()?,
                access_key: env::var("R2_ACCESS_KEY_ID").ok()?,
                secret_key: env::var("R2_SECRET_ACCESS_KEY").ok()?,
                bucket,
            })
        }
    }
}
