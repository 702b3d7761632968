//! Periodic sync of the local image inbox into the object store
//!
//! One pass: discover every file under the inbox, give each file with an
//! extension a fresh `<uuid><ext>` name, upload the batch through the pool,
//! then record and delete what was stored. Files that failed to upload or to
//! be recorded get their discovered name back and stay in the inbox for the
//! next pass, so the record written then still names the real origin.

use crate::modules::media::{MediaService, NewImage};
use crate::modules::storage::{UploadPool, UploadResult};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::TimedOperation;
use crate::{log_debug, log_info, log_warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

/// Counts of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub discovered: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub recorded: usize,
    pub removed: usize,
    /// Kept files renamed back to their discovered name
    pub restored: usize,
}

/// A discovered file after renaming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub origin: PathBuf,
}

pub struct ImageSyncJob {
    image_dir: Option<PathBuf>,
    upload_pool: Arc<UploadPool>,
    media_service: Arc<MediaService>,
}

impl ImageSyncJob {
    pub fn new(
        image_dir: Option<PathBuf>,
        upload_pool: Arc<UploadPool>,
        media_service: Arc<MediaService>,
    ) -> Self {
        Self {
            image_dir,
            upload_pool,
            media_service,
        }
    }

    /// Run one sync pass
    pub async fn run(&self) -> AppResult<SyncReport> {
        let Some(image_dir) = self.image_dir.clone() else {
            log_debug!("Image sync: no image directory configured");
            return Ok(SyncReport::default());
        };

        if !tokio::fs::try_exists(&image_dir).await.unwrap_or(false) {
            log_warn!("Image sync: directory {} does not exist", image_dir.display());
            return Ok(SyncReport::default());
        }

        let staged = tokio::task::spawn_blocking(move || stage_files(&image_dir))
            .await
            .map_err(|e| AppError::InternalError(format!("Image discovery task failed: {}", e)))??;

        let mut report = SyncReport {
            discovered: staged.len(),
            ..SyncReport::default()
        };
        if staged.is_empty() {
            return Ok(report);
        }

        let timer = TimedOperation::new("image_sync");
        let origins: HashMap<PathBuf, PathBuf> = staged
            .into_iter()
            .map(|file| (file.path, file.origin))
            .collect();

        let results = self
            .upload_pool
            .upload_all(origins.keys().cloned().collect())
            .await;

        for result in results {
            let origin = origins
                .get(&result.source)
                .cloned()
                .unwrap_or_else(|| result.source.clone());

            if !result.is_success() {
                report.failed += 1;
                if let Some(e) = result.error() {
                    log_warn!("Image sync: {} stays for retry: {}", origin.display(), e);
                }
                if restore(&result.source, &origin).await {
                    report.restored += 1;
                }
                continue;
            }
            report.uploaded += 1;

            if self.record(&result, &origin).await {
                report.recorded += 1;
                match tokio::fs::remove_file(&result.source).await {
                    Ok(()) => report.removed += 1,
                    Err(e) => log_warn!(
                        "Image sync: failed to remove {}: {}",
                        result.source.display(),
                        e
                    ),
                }
            } else if restore(&result.source, &origin).await {
                report.restored += 1;
            }
        }

        log_info!(
            "Image sync: {} discovered, {} uploaded, {} failed, {} recorded",
            report.discovered,
            report.uploaded,
            report.failed,
            report.recorded
        );
        timer.finish();
        Ok(report)
    }

    /// Persist an uploaded file; the local copy is kept when this fails
    async fn record(&self, result: &UploadResult, origin: &Path) -> bool {
        let image = NewImage::uploaded(
            result.source.to_string_lossy(),
            origin.to_string_lossy(),
            result.bucket.as_str(),
            result.key.as_str(),
        );

        match self.media_service.create_image(image).await {
            Ok(_) => true,
            Err(e) => {
                log_warn!(
                    "Image sync: failed to record {}: {}",
                    result.source.display(),
                    e
                );
                false
            }
        }
    }
}

/// Rename a kept file back to the name it was discovered under.
///
/// Returns `false` when nothing was renamed, including when a new file
/// already took the discovered name.
async fn restore(staged: &Path, origin: &Path) -> bool {
    if staged == origin {
        return false;
    }
    if tokio::fs::try_exists(origin).await.unwrap_or(true) {
        log_warn!(
            "Image sync: {} is taken again, keeping {}",
            origin.display(),
            staged.display()
        );
        return false;
    }
    match tokio::fs::rename(staged, origin).await {
        Ok(()) => true,
        Err(e) => {
            log_warn!(
                "Image sync: failed to restore {} to {}: {}",
                staged.display(),
                origin.display(),
                e
            );
            false
        }
    }
}

/// `<uuid>.<ext>` names are already staged and keep their name
fn is_staged_name(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| Uuid::parse_str(stem).is_ok())
}

/// Walk `dir` recursively and rename every file that has an extension to
/// `<uuid><ext>` in the same directory. Files without an extension or with
/// an already staged name keep their name. Entries below `dir` that cannot
/// be read or renamed are logged and skipped; an unreadable `dir` is an
/// error.
pub fn stage_files(dir: &Path) -> AppResult<Vec<StagedFile>> {
    // renaming mid-walk could yield a renamed file twice
    let mut discovered = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => discovered.push(entry.into_path()),
            Ok(_) => {}
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => log_warn!("Image sync: skipping unreadable entry: {}", e),
        }
    }

    let mut staged = Vec::with_capacity(discovered.len());
    for origin in discovered {
        let Some(extension) = origin.extension().map(|ext| ext.to_string_lossy().into_owned())
        else {
            staged.push(StagedFile {
                path: origin.clone(),
                origin,
            });
            continue;
        };

        if is_staged_name(&origin) {
            staged.push(StagedFile {
                path: origin.clone(),
                origin,
            });
            continue;
        }

        let renamed = origin.with_file_name(format!("{}.{}", Uuid::new_v4(), extension));
        match std::fs::rename(&origin, &renamed) {
            Ok(()) => staged.push(StagedFile {
                path: renamed,
                origin,
            }),
            Err(e) => log_warn!("Image sync: failed to rename {}: {}", origin.display(), e),
        }
    }

    Ok(staged)
}
