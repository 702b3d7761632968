use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => {
                AppError::NotFound("Record not found in database".to_string())
            }
            _ => AppError::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for AppError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        AppError::DatabaseError(format!("Database pool error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ExternalServiceError("Request timeout".to_string())
        } else if err.is_connect() {
            AppError::ExternalServiceError("Failed to connect to external service".to_string())
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => AppError::RateLimitError("Too many requests".to_string()),
                404 => AppError::NotFound("External resource not found".to_string()),
                _ => AppError::ApiError(format!("HTTP {}: {}", status, err)),
            }
        } else {
            AppError::ApiError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(format!("I/O failure: {}", err))
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        AppError::StorageError(format!("Failed to walk {}: {}", path, err))
    }
}

impl AppError {
    /// Whether retrying the same operation later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RateLimitError(_)
                | AppError::ExternalServiceError(_)
                | AppError::ServiceUnavailable(_)
                | AppError::StorageError(_)
        )
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diesel_not_found_maps_to_not_found() {
        let err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_io_error_is_storage_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::StorageError(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::ValidationError("interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: interval must be positive"
        );
        assert!(!err.is_transient());
    }
}
