pub mod entities;
pub mod image_repository;
pub mod vision_client;

pub use entities::{extension_with_dot, DetectionSummary, Image, NewImage};
pub use image_repository::ImageRepository;
pub use vision_client::VisionClient;
