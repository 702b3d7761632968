mod http_vision_client;
mod models;

pub use http_vision_client::HttpVisionClient;
