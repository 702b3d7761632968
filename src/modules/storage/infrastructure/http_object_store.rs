use crate::{
    modules::storage::domain::{content_type_for, ObjectStore},
    shared::config::StorageConfig,
    shared::errors::{AppError, AppResult},
    shared::infrastructure::http_client::RateLimitClient,
};
use async_trait::async_trait;
use std::path::Path;

/// S3-compatible object store reached with path-style `PUT` requests
pub struct HttpObjectStore {
    http_client: RateLimitClient,
    endpoint: String,
    bucket: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        Ok(Self::with_client(
            RateLimitClient::for_storage()?,
            &config.endpoint,
            &config.bucket,
            config.token.clone(),
        ))
    }

    /// Create store with custom HTTP client (for testing)
    pub fn with_client(
        http_client: RateLimitClient,
        endpoint: &str,
        bucket: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            token,
        }
    }

    /// `{endpoint}/{bucket}/{key}` with every key segment percent-encoded
    pub fn object_url(&self, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/{}",
            self.endpoint,
            urlencoding::encode(&self.bucket),
            encoded_key
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put_object(&self, key: &str, source: &Path) -> AppResult<()> {
        let body = tokio::fs::read(source).await.map_err(|e| {
            AppError::StorageError(format!("Failed to read {}: {}", source.display(), e))
        })?;

        let url = self.object_url(key);
        log::debug!("Storage: PUT {} ({} bytes)", url, body.len());

        self.http_client
            .put_bytes(&url, body, content_type_for(source), self.token.as_deref())
            .await
            .map_err(|e| match e {
                AppError::StorageError(_) => e,
                other => AppError::StorageError(format!(
                    "Failed to store s3://{}/{}: {}",
                    self.bucket, key, other
                )),
            })
    }
}
