use async_trait::async_trait;

use super::models::*;
use crate::{
    modules::media::domain::VisionClient,
    shared::errors::AppResult,
    shared::infrastructure::http_client::RateLimitClient,
};

/// Detection gateway client speaking JSON over HTTP
pub struct HttpVisionClient {
    http_client: RateLimitClient,
    base_url: String,
}

impl HttpVisionClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        Ok(Self::with_client(RateLimitClient::for_vision()?, base_url))
    }

    /// Create client with custom HTTP client (for testing)
    pub fn with_client(http_client: RateLimitClient, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl VisionClient for HttpVisionClient {
    async fn detect_labels(&self, bucket: &str, key: &str) -> AppResult<Vec<String>> {
        let request = DetectLabelsRequest {
            object: S3Object { bucket, key },
            max_labels: MAX_LABELS,
            min_confidence: MIN_CONFIDENCE,
        };

        let response: DetectLabelsResponse = self
            .http_client
            .post_json(&self.url("detect-labels"), &request)
            .await?;

        log::debug!(
            "Vision: {} labels for s3://{}/{}",
            response.labels.len(),
            bucket,
            key
        );
        Ok(response.into_names())
    }

    async fn detect_text(&self, bucket: &str, key: &str) -> AppResult<Vec<String>> {
        let request = DetectTextRequest {
            object: S3Object { bucket, key },
        };

        let response: DetectTextResponse = self
            .http_client
            .post_json(&self.url("detect-text"), &request)
            .await?;

        let words = response.into_words();
        log::debug!("Vision: {} words in s3://{}/{}", words.len(), bucket, key);
        Ok(words)
    }

    async fn detect_document_text(&self, bucket: &str, key: &str) -> AppResult<Vec<String>> {
        let request = DetectTextRequest {
            object: S3Object { bucket, key },
        };

        let response: DetectDocumentTextResponse = self
            .http_client
            .post_json(&self.url("detect-document-text"), &request)
            .await?;

        let words = response.into_words();
        log::debug!(
            "Vision: {} words in document s3://{}/{}",
            words.len(),
            bucket,
            key
        );
        Ok(words)
    }
}
