/// Shared infrastructure concerns
///
/// Infrastructure used by more than one module: the database pool and the
/// rate-limited HTTP client behind the external service adapters.
pub mod database;
pub mod http_client;

// Re-exports for convenience
pub use database::{Database, DbConnection, DbPool};
pub use http_client::{RateLimitClient, RetryPolicy};
