//! Environment-driven application configuration
//!
//! Values are read once at startup (after `dotenvy` has loaded `.env`) and
//! handed to the components that need them; nothing below reads the
//! environment on its own.

use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{ConcurrencyCalculator, Validator};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "http://localhost:9000";
pub const DEFAULT_STORAGE_BUCKET: &str = "media-warehouse";
pub const DEFAULT_STORAGE_PREFIX: &str = "warehouse/";
pub const DEFAULT_VISION_ENDPOINT: &str = "http://localhost:8088";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_DETECT_INTERVAL_SECS: u64 = 20;

/// Object storage settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub key_prefix: String,
    pub token: Option<String>,
    pub upload_concurrency: usize,
}

/// Intervals of the periodic jobs
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub image_dir: Option<PathBuf>,
    pub sync_interval: Duration,
    pub detect_interval: Duration,
    pub run_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub vision_endpoint: String,
    pub storage: StorageConfig,
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> AppResult<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").ok_or_else(|| {
            AppError::ConfigError("DATABASE_URL environment variable not found".to_string())
        })?;

        let key_prefix = get("STORAGE_PREFIX").unwrap_or_else(|| DEFAULT_STORAGE_PREFIX.to_string());
        Validator::validate_key_prefix(&key_prefix)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        let upload_concurrency = match get("UPLOAD_CONCURRENCY") {
            Some(raw) => ConcurrencyCalculator::clamp(parse_number("UPLOAD_CONCURRENCY", &raw)? as usize),
            None => ConcurrencyCalculator::calculate_upload_concurrency(),
        };

        let sync_interval = parse_interval(
            "SYNC_INTERVAL_SECS",
            get("SYNC_INTERVAL_SECS"),
            DEFAULT_SYNC_INTERVAL_SECS,
        )?;
        let detect_interval = parse_interval(
            "DETECT_INTERVAL_SECS",
            get("DETECT_INTERVAL_SECS"),
            DEFAULT_DETECT_INTERVAL_SECS,
        )?;

        let run_timeout = match get("JOB_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = parse_number("JOB_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(AppError::ConfigError(
                        "JOB_TIMEOUT_SECS must be positive".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            database_url,
            vision_endpoint: get("VISION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string()),
            storage: StorageConfig {
                endpoint: get("STORAGE_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.to_string()),
                bucket: get("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
                key_prefix,
                token: get("STORAGE_TOKEN"),
                upload_concurrency,
            },
            jobs: JobsConfig {
                image_dir: get("IMAGE_DIR").map(PathBuf::from),
                sync_interval,
                detect_interval,
                run_timeout,
            },
        })
    }
}

fn parse_number(key: &str, raw: &str) -> AppResult<u64> {
    raw.parse::<u64>()
        .map_err(|e| AppError::ConfigError(format!("{} must be a non-negative integer: {}", key, e)))
}

fn parse_interval(key: &str, raw: Option<String>, default_secs: u64) -> AppResult<Duration> {
    let secs = match raw {
        Some(raw) => parse_number(key, &raw)?,
        None => default_secs,
    };
    if secs == 0 {
        return Err(AppError::ConfigError(format!("{} must be positive", key)));
    }
    Ok(Duration::from_secs(secs))
}
