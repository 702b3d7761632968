pub mod jobs;
pub mod media;
pub mod scheduler;
pub mod storage;
