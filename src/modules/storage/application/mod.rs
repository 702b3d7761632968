pub mod upload_pool;
pub mod worker_pool;

pub use upload_pool::UploadPool;
pub use worker_pool::WorkerPool;
