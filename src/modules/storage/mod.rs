//! Object storage: the store port, its HTTP adapter and the bounded upload pool

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{UploadPool, WorkerPool};
pub use domain::{ObjectStore, UploadResult, UploadSummary};
pub use infrastructure::HttpObjectStore;
