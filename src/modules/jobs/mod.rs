//! Periodic jobs and their registration with the scheduler
//!
//! - `image_sync`: inbox to object store to database
//! - `image_label_detect`: labels for pending images
//! - `image_text_detect`: text keywords for pending images
//!
//! Job bodies log their own failures; an error never reaches the scheduler.
pub mod image_sync;

pub use image_sync::{stage_files, ImageSyncJob, StagedFile, SyncReport};

use crate::modules::media::MediaService;
use crate::modules::scheduler::Scheduler;
use crate::modules::storage::UploadPool;
use crate::shared::config::JobsConfig;
use crate::shared::errors::AppResult;
use crate::shared::utils::LogContext;
use std::sync::Arc;

pub const IMAGE_SYNC_JOB: &str = "image_sync";
pub const LABEL_DETECT_JOB: &str = "image_label_detect";
pub const TEXT_DETECT_JOB: &str = "image_text_detect";

/// Services the jobs run against
#[derive(Clone)]
pub struct JobDependencies {
    pub media_service: Arc<MediaService>,
    pub upload_pool: Arc<UploadPool>,
}

/// Register all periodic jobs under distinct names
pub async fn register_jobs(
    scheduler: &Scheduler,
    deps: JobDependencies,
    config: &JobsConfig,
) -> AppResult<()> {
    let sync_job = Arc::new(ImageSyncJob::new(
        config.image_dir.clone(),
        Arc::clone(&deps.upload_pool),
        Arc::clone(&deps.media_service),
    ));
    scheduler
        .schedule_at_fixed_rate(
            IMAGE_SYNC_JOB,
            move || {
                let job = Arc::clone(&sync_job);
                async move {
                    if let Err(e) = job.run().await {
                        LogContext::error_with_context(&e, "Image sync failed");
                    }
                }
            },
            config.sync_interval,
        )
        .await?;

    let media = Arc::clone(&deps.media_service);
    scheduler
        .schedule_at_fixed_rate(
            LABEL_DETECT_JOB,
            move || {
                let media = Arc::clone(&media);
                async move {
                    if let Err(e) = media.detect_and_save_image_labels().await {
                        LogContext::error_with_context(&e, "Label detection failed");
                    }
                }
            },
            config.detect_interval,
        )
        .await?;

    let media = Arc::clone(&deps.media_service);
    scheduler
        .schedule_at_fixed_rate(
            TEXT_DETECT_JOB,
            move || {
                let media = Arc::clone(&media);
                async move {
                    if let Err(e) = media.detect_and_save_image_text().await {
                        LogContext::error_with_context(&e, "Text detection failed");
                    }
                }
            },
            config.detect_interval,
        )
        .await?;

    Ok(())
}
