use super::worker_pool::WorkerPool;
use crate::modules::storage::domain::{object_key_for, ObjectStore, UploadResult, UploadSummary};
use crate::shared::errors::AppError;
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::log_info;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_KEY_PREFIX: &str = "warehouse/";

/// Uploads a batch of local files through a fixed number of workers
pub struct UploadPool {
    store: Arc<dyn ObjectStore>,
    pool: WorkerPool,
    key_prefix: String,
}

impl UploadPool {
    pub fn new(store: Arc<dyn ObjectStore>, workers: usize) -> Self {
        Self {
            store,
            pool: WorkerPool::new(workers, workers),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.pool = WorkerPool::new(self.pool.workers(), capacity);
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Upload every source and return exactly one result per source.
    ///
    /// Results arrive in completion order. Local files are left in place.
    pub async fn upload_all(&self, sources: Vec<PathBuf>) -> Vec<UploadResult> {
        if sources.is_empty() {
            return Vec::new();
        }

        let timer = TimedOperation::new("upload_all");
        let total = sources.len();
        let bucket = self.store.bucket();

        let store = Arc::clone(&self.store);
        let prefix = self.key_prefix.clone();
        let work_bucket = bucket.clone();
        let work = move |source: PathBuf| {
            let store = Arc::clone(&store);
            let bucket = work_bucket.clone();
            let key = object_key_for(&prefix, &source);
            async move {
                let outcome = store.put_object(&key, &source).await;
                match &outcome {
                    Ok(()) => LogContext::storage_transfer(&bucket, &key, Ok(())),
                    Err(e) => LogContext::storage_transfer(&bucket, &key, Err(&e.to_string())),
                }
                UploadResult {
                    source,
                    bucket,
                    key,
                    outcome,
                }
            }
        };

        let prefix = self.key_prefix.clone();
        let on_panic = move |source: PathBuf, reason: String| {
            let key = object_key_for(&prefix, &source);
            UploadResult::failed(
                source,
                bucket.clone(),
                key,
                AppError::StorageError(format!("upload panicked: {}", reason)),
            )
        };

        let results = self.pool.run(sources, work, on_panic).await;

        let summary = UploadSummary::from_results(&results);
        log_info!(
            "Uploaded {}/{} files ({} failed)",
            summary.succeeded,
            total,
            summary.failed
        );
        timer.finish_with_info(&format!("{} files", total));
        results
    }
}
