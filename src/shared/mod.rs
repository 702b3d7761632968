// Shared kernel: configuration, errors, infrastructure and utilities used by
// every module.

pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod utils;

// Re-exports for convenience
pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use infrastructure::database::Database;
