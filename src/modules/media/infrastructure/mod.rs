pub mod persistence;
pub mod vision;

pub use persistence::ImageRepositoryImpl;
pub use vision::HttpVisionClient;
