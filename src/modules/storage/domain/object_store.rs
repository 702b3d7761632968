//! Port for the remote object store
//!
//! The upload pool only needs "put this local file under this key"; the
//! adapter decides how the bytes travel.
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every object of this store lands in
    fn bucket(&self) -> String;

    /// Store the file at `source` under `key`
    async fn put_object(&self, key: &str, source: &Path) -> AppResult<()>;
}
