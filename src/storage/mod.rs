//! Blob storage for car images (Cloudflare R2 or Google Cloud Storage).

pub mod gcs;
pub mod r2;

use std::sync::Arc;

pub use gcs::GcsBackend;
pub use r2::R2Backend;

use crate::config::StorageConfig;
use crate::error::AppResult;

/// Key prefix for uploaded car photos.
pub const CAR_IMAGE_PREFIX: &str = "cars";

#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores the object and returns the URL browsers load it from.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    fn bucket(&self) -> &str;
}

/// Builds the configured backend. `public_url` overrides the URL base that
/// uploaded objects are served from (a custom domain or CDN).
pub async fn from_config(
    config: &StorageConfig,
    public_url: Option<String>,
) -> AppResult<Arc<dyn StorageBackend>> {
    Ok(match config {
        StorageConfig::R2 {
            account_id,
            access_key,
            secret_key,
            bucket,
        } => Arc::new(R2Backend::new(
            bucket.clone(),
            account_id.clone(),
            access_key.clone(),
            secret_key.clone(),
            public_url,
        )?),
        StorageConfig::Gcs { bucket } => Arc::new(GcsBackend::new(bucket.clone(), public_url).await?),
    })
}

/// `cars/{uuid}-{name}` where `name` keeps only `[A-Za-z0-9._-]`.
pub fn car_image_key(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let mut sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.trim_matches(['.', '_']).is_empty() {
        sanitized = "image".to_string();
    }
    format!("{}/{}-{}", CAR_IMAGE_PREFIX, uuid::Uuid::new_v4(), sanitized)
}

pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_image_key_sanitizes_filename() {
        let key = car_image_key("../My Photo (1).JPG");
        assert!(key.starts_with("cars/"));
        assert!(key.ends_with("-My_Photo__1_.JPG"), "{}", key);
        assert!(!key.contains(".."));
    }

    #[test]
    fn test_car_image_key_for_empty_name() {
        assert!(car_image_key("").ends_with("-image"));
        assert!(car_image_key("..").ends_with("-image"));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://cdn.example.com/", "cars/a.jpg"),
            "https://cdn.example.com/cars/a.jpg"
        );
    }
}
