//! Persistence port for images and their detection results
use crate::modules::media::domain::entities::{Image, NewImage};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a new image
    async fn create(&self, image: NewImage) -> AppResult<Image>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Image>>;

    /// Images whose label detection flag equals `detected`, oldest first
    async fn get_by_label_detected(&self, detected: bool) -> AppResult<Vec<Image>>;

    /// Images whose text detection flag equals `detected`, oldest first
    async fn get_by_text_detected(&self, detected: bool) -> AppResult<Vec<Image>>;

    async fn mark_label_detected(&self, id: i64) -> AppResult<()>;

    async fn mark_text_detected(&self, id: i64) -> AppResult<()>;

    /// In one transaction: get-or-create every label, link it to the image
    /// unless already linked, and mark the image label-detected.
    /// Returns the number of new links.
    async fn save_labels(&self, image_id: i64, labels: Vec<String>) -> AppResult<usize>;

    /// Same as [`ImageRepository::save_labels`] for text keywords
    async fn save_text_keywords(&self, image_id: i64, keywords: Vec<String>) -> AppResult<usize>;
}
