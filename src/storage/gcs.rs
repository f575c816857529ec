use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::upload::{Media, UploadObjectRequest, UploadType},
};

use crate::error::{AppError, AppResult};

use super::{join_url, StorageBackend};

pub struct GcsBackend {
    client: Client,
    bucket: String,
    public_base: String,
}

impl GcsBackend {
    pub async fn new(bucket: String, public_url: Option<String>) -> AppResult<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| AppError::Storage(format!("GCS auth failed: {}", e)))?;
        let client = Client::new(config);
        let public_base = public_url
            .unwrap_or_else(|| format!("https://storage.googleapis.com/{}", bucket));
        Ok(Self {
            client,
            bucket,
            public_base,
        })
    }
}

#[async_trait::async_trait]
impl StorageBackend for GcsBackend {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        let mut media = Media::new(key.to_string());
        media.content_type = std::borrow::Cow::Owned(content_type.to_string());
        let upload_type = UploadType::Simple(media);

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data.to_vec(),
                &upload_type,
            )
            .await
            .map_err(|e| AppError::Storage(format!("GCS upload failed: {}", e)))?;

        tracing::info!(
            "GCS upload: bucket={}, key={}, size={}",
            self.bucket,
            key,
            data.len()
        );
        Ok(join_url(&self.public_base, key))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
