pub mod media_service;

pub use media_service::{dedup_preserving_order, MediaService, TextRoute};
