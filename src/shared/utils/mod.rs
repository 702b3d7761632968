pub mod concurrency;
pub mod logger;
pub mod validation;

pub use concurrency::ConcurrencyCalculator;
pub use logger::{init_logger, LogContext, TimedOperation};
pub use validation::Validator;
