use crate::log_info;

/// Calculates worker counts for I/O bound fan-out based on system resources
pub struct ConcurrencyCalculator;

impl ConcurrencyCalculator {
    pub const MIN_UPLOAD_CONCURRENCY: usize = 2;
    pub const MAX_UPLOAD_CONCURRENCY: usize = 16;
    const UPLOAD_CONCURRENCY_PER_CPU: usize = 2;

    /// Calculate the default number of upload workers
    pub fn calculate_upload_concurrency() -> usize {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        let optimal = Self::clamp(cpu_count * Self::UPLOAD_CONCURRENCY_PER_CPU);

        log_info!(
            "Calculated upload concurrency: {} (CPUs: {}, multiplier: {}x)",
            optimal,
            cpu_count,
            Self::UPLOAD_CONCURRENCY_PER_CPU
        );

        optimal
    }

    /// Clamp a requested worker count into the supported range
    pub fn clamp(requested: usize) -> usize {
        requested
            .max(Self::MIN_UPLOAD_CONCURRENCY)
            .min(Self::MAX_UPLOAD_CONCURRENCY)
    }
}
