use log::{debug, error, info, warn};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the logging system
/// This should be called once at application startup
pub fn init_logger() {
    INIT.call_once(|| {
        let installed = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info) // Default level
            .filter_module("media_pipeline_lib", log::LevelFilter::Debug)
            .filter_module("diesel", log::LevelFilter::Warn)
            .filter_module("reqwest", log::LevelFilter::Warn)
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("tokio", log::LevelFilter::Warn)
            .format_timestamp_millis()
            .format_module_path(false)
            .try_init();

        match installed {
            Ok(()) => info!("Logging system initialized"),
            // another logger (a test harness or embedding binary) is already set
            Err(e) => debug!("Keeping the existing logger: {}", e),
        }
    });
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

/// Structured logging helpers for common patterns
pub struct LogContext;

impl LogContext {
    /// Log object store transfers
    pub fn storage_transfer(bucket: &str, key: &str, outcome: Result<(), &str>) {
        match outcome {
            Ok(()) => debug!("Storage: stored s3://{}/{}", bucket, key),
            Err(reason) => warn!("Storage: failed s3://{}/{}: {}", bucket, key, reason),
        }
    }

    /// Log detection batches
    pub fn detection_batch(kind: &str, pending: usize) {
        if pending == 0 {
            debug!("Detection: no pending images for {}", kind);
        } else {
            info!("Detection: {} pending images for {}", pending, kind);
        }
    }

    /// Log errors with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!("{}: {}", context, error);
    }

    /// Log performance metrics
    pub fn performance_metric(operation: &str, duration_ms: u64, additional_info: Option<&str>) {
        match additional_info {
            Some(info) => info!(
                "Performance: {} took {}ms ({})",
                operation, duration_ms, info
            ),
            None => info!("Performance: {} took {}ms", operation, duration_ms),
        }
    }
}

/// Helper for timing operations
pub struct TimedOperation {
    start: std::time::Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn finish(self) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, None);
        duration
    }

    pub fn finish_with_info(self, info: &str) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, Some(info));
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_tolerates_existing_logger() {
        // the test harness may already own the global logger
        let _ = env_logger::builder().is_test(true).try_init();
        init_logger();
        init_logger();
        assert!(TimedOperation::new("noop").finish() < 1_000);
    }
}
