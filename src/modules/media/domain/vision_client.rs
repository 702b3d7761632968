use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Port for the detection backend; every call addresses a stored object
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Label names followed by their category names
    async fn detect_labels(&self, bucket: &str, key: &str) -> AppResult<Vec<String>>;

    /// Words found in an image
    async fn detect_text(&self, bucket: &str, key: &str) -> AppResult<Vec<String>>;

    /// Words found in a document (PDF)
    async fn detect_document_text(&self, bucket: &str, key: &str) -> AppResult<Vec<String>>;
}
