use std::collections::HashSet;
use std::sync::Arc;

use crate::modules::media::domain::{
    DetectionSummary, Image, ImageRepository, NewImage, VisionClient,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::{log_debug, log_error, log_info, log_warn};

/// Where an image goes for text detection, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRoute {
    Document,
    Image,
    Unsupported,
}

impl TextRoute {
    pub fn for_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            ".pdf" => TextRoute::Document,
            ".jpg" | ".jpeg" | ".png" | ".gif" | ".bmp" => TextRoute::Image,
            _ => TextRoute::Unsupported,
        }
    }
}

/// Media application service
pub struct MediaService {
    image_repository: Arc<dyn ImageRepository>,
    vision_client: Arc<dyn VisionClient>,
}

impl MediaService {
    pub fn new(
        image_repository: Arc<dyn ImageRepository>,
        vision_client: Arc<dyn VisionClient>,
    ) -> Self {
        Self {
            image_repository,
            vision_client,
        }
    }

    pub async fn create_image(&self, image: NewImage) -> AppResult<Image> {
        let created = self.image_repository.create(image).await?;
        log_debug!("Recorded image {} as {}", created.id, created.object_key);
        Ok(created)
    }

    /// Detect labels for every image that has none yet and persist them.
    ///
    /// Only loading the pending set can fail the whole pass; a failure on a
    /// single image is logged and that image stays pending for the next pass.
    pub async fn detect_and_save_image_labels(&self) -> AppResult<DetectionSummary> {
        let pending = self.image_repository.get_by_label_detected(false).await?;
        LogContext::detection_batch("labels", pending.len());

        let timer = TimedOperation::new("detect_and_save_image_labels");
        let mut summary = DetectionSummary::default();

        for image in pending {
            summary.processed += 1;
            match self.detect_labels_for(&image).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    report_failure("Label detection", image.id, &e);
                }
            }
        }

        finish_pass(timer, "labels", &summary);
        Ok(summary)
    }

    async fn detect_labels_for(&self, image: &Image) -> AppResult<()> {
        let detected = self
            .vision_client
            .detect_labels(&image.bucket, &image.object_key)
            .await?;
        let labels = dedup_preserving_order(detected);

        if labels.is_empty() {
            return self.image_repository.mark_label_detected(image.id).await;
        }

        let linked = self.image_repository.save_labels(image.id, labels).await?;
        log_debug!("Image {}: linked {} new labels", image.id, linked);
        Ok(())
    }

    /// Detect text for every image that has none yet and persist the keywords.
    ///
    /// PDFs go through document detection, common raster formats through
    /// image detection; any other extension is marked detected and skipped.
    pub async fn detect_and_save_image_text(&self) -> AppResult<DetectionSummary> {
        let pending = self.image_repository.get_by_text_detected(false).await?;
        LogContext::detection_batch("text", pending.len());

        let timer = TimedOperation::new("detect_and_save_image_text");
        let mut summary = DetectionSummary::default();

        for image in pending {
            summary.processed += 1;
            let route = TextRoute::for_extension(&image.file_extension);

            if route == TextRoute::Unsupported {
                match self.image_repository.mark_text_detected(image.id).await {
                    Ok(()) => summary.skipped += 1,
                    Err(e) => {
                        summary.failed += 1;
                        log_warn!("Failed to skip image {}: {}", image.id, e);
                    }
                }
                continue;
            }

            match self.detect_text_for(&image, route).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    report_failure("Text detection", image.id, &e);
                }
            }
        }

        finish_pass(timer, "text", &summary);
        Ok(summary)
    }

    async fn detect_text_for(&self, image: &Image, route: TextRoute) -> AppResult<()> {
        let detected = match route {
            TextRoute::Document => {
                self.vision_client
                    .detect_document_text(&image.bucket, &image.object_key)
                    .await?
            }
            _ => {
                self.vision_client
                    .detect_text(&image.bucket, &image.object_key)
                    .await?
            }
        };
        let keywords = dedup_preserving_order(detected);

        if keywords.is_empty() {
            return self.image_repository.mark_text_detected(image.id).await;
        }

        let linked = self
            .image_repository
            .save_text_keywords(image.id, keywords)
            .await?;
        log_debug!("Image {}: linked {} new keywords", image.id, linked);
        Ok(())
    }
}

/// The image stays pending either way; only the log level differs
fn report_failure(kind: &str, image_id: i64, error: &AppError) {
    if error.is_transient() {
        log_warn!("{} failed for image {}, retrying next pass: {}", kind, image_id, error);
    } else {
        log_error!("{} failed for image {}: {}", kind, image_id, error);
    }
}

fn finish_pass(timer: TimedOperation, kind: &str, summary: &DetectionSummary) {
    if summary.processed == 0 {
        return;
    }
    log_info!(
        "Detection ({}): {} processed, {} succeeded, {} failed, {} skipped",
        kind,
        summary.processed,
        summary.succeeded,
        summary.failed,
        summary.skipped
    );
    timer.finish();
}

/// Trimmed, non-empty values in first-seen order
pub fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::media::domain::image_repository::MockImageRepository;
    use crate::modules::media::domain::vision_client::MockVisionClient;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn image(id: i64, extension: &str) -> Image {
        Image {
            id,
            filename: format!("/inbox/{}{}", id, extension),
            origin_filename: format!("/inbox/orig-{}{}", id, extension),
            file_extension: extension.to_string(),
            bucket: "media-warehouse".to_string(),
            object_key: format!("warehouse/{}{}", id, extension),
            uploaded: true,
            label_detected: false,
            text_detected: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let values = vec!["Cat", "Animal", "Cat", " ", "Pet", "Animal"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedup_preserving_order(values), vec!["Cat", "Animal", "Pet"]);
    }

    #[test]
    fn test_text_routes() {
        assert_eq!(TextRoute::for_extension(".PDF"), TextRoute::Document);
        assert_eq!(TextRoute::for_extension(".jpeg"), TextRoute::Image);
        assert_eq!(TextRoute::for_extension(".bmp"), TextRoute::Image);
        assert_eq!(TextRoute::for_extension(".webp"), TextRoute::Unsupported);
        assert_eq!(TextRoute::for_extension(""), TextRoute::Unsupported);
    }

    #[tokio::test]
    async fn test_labels_are_deduplicated_and_saved() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_label_detected()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(vec![image(1, ".png")]));
        repo.expect_save_labels()
            .with(eq(1), eq(vec!["Cat".to_string(), "Animal".to_string()]))
            .times(1)
            .returning(|_, labels| Ok(labels.len()));
        repo.expect_mark_label_detected().never();

        let mut vision = MockVisionClient::new();
        vision
            .expect_detect_labels()
            .times(1)
            .returning(|_, _| Ok(vec!["Cat".into(), "Animal".into(), "Cat".into()]));

        let service = MediaService::new(Arc::new(repo), Arc::new(vision));
        let summary = service.detect_and_save_image_labels().await.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_empty_labels_only_mark_detected() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_label_detected()
            .returning(|_| Ok(vec![image(7, ".jpg")]));
        repo.expect_mark_label_detected()
            .with(eq(7))
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_save_labels().never();

        let mut vision = MockVisionClient::new();
        vision.expect_detect_labels().returning(|_, _| Ok(Vec::new()));

        let service = MediaService::new(Arc::new(repo), Arc::new(vision));
        let summary = service.detect_and_save_image_labels().await.unwrap();
        assert_eq!(summary.succeeded, 1);
    }

    #[tokio::test]
    async fn test_detection_failure_leaves_image_pending() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_label_detected()
            .returning(|_| Ok(vec![image(1, ".png"), image(2, ".png")]));
        repo.expect_save_labels()
            .with(eq(2), eq(vec!["Dog".to_string()]))
            .times(1)
            .returning(|_, _| Ok(1));
        repo.expect_mark_label_detected().never();

        let mut vision = MockVisionClient::new();
        vision.expect_detect_labels().returning(|_, key| {
            if key.contains("warehouse/1") {
                Err(AppError::ExternalServiceError("gateway down".into()))
            } else {
                Ok(vec!["Dog".into()])
            }
        });

        let service = MediaService::new(Arc::new(repo), Arc::new(vision));
        let summary = service.detect_and_save_image_labels().await.unwrap();

        assert_eq!(
            summary,
            DetectionSummary {
                processed: 2,
                succeeded: 1,
                failed: 1,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn test_load_failure_fails_the_pass() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_text_detected()
            .returning(|_| Err(AppError::DatabaseError("connection refused".into())));

        let service = MediaService::new(Arc::new(repo), Arc::new(MockVisionClient::new()));
        assert!(service.detect_and_save_image_text().await.is_err());
    }

    #[tokio::test]
    async fn test_text_detection_routes_by_extension() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_text_detected().returning(|_| {
            Ok(vec![image(1, ".pdf"), image(2, ".JPG"), image(3, ".txt")])
        });
        repo.expect_save_text_keywords()
            .times(2)
            .returning(|_, keywords| Ok(keywords.len()));
        repo.expect_mark_text_detected()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok(()));

        let mut vision = MockVisionClient::new();
        vision
            .expect_detect_document_text()
            .times(1)
            .returning(|_, _| Ok(vec!["invoice".into(), "total".into()]));
        vision
            .expect_detect_text()
            .times(1)
            .returning(|_, _| Ok(vec!["STOP".into()]));

        let service = MediaService::new(Arc::new(repo), Arc::new(vision));
        let summary = service.detect_and_save_image_text().await.unwrap();

        assert_eq!(
            summary,
            DetectionSummary {
                processed: 3,
                succeeded: 2,
                failed: 0,
                skipped: 1
            }
        );
    }
}
