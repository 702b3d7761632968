//! Image records and the detection passes that enrich them

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::MediaService;
pub use domain::{DetectionSummary, Image, ImageRepository, NewImage, VisionClient};
pub use infrastructure::{HttpVisionClient, ImageRepositoryImpl};
