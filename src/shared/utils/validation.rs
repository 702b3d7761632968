use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::shared::errors::AppError;

fn task_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_\-.:]+$").expect("task name pattern is a valid regex")
    })
}

pub struct Validator;

impl Validator {
    pub fn validate_task_name(name: &str) -> Result<(), AppError> {
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Task name cannot be empty".to_string(),
            ));
        }
        if name.len() > 128 {
            return Err(AppError::ValidationError(
                "Task name too long (max 128 characters)".to_string(),
            ));
        }
        if !task_name_pattern().is_match(name) {
            return Err(AppError::ValidationError(format!(
                "Task name '{}' contains invalid characters",
                name
            )));
        }
        Ok(())
    }

    pub fn validate_interval(interval: Duration) -> Result<(), AppError> {
        if interval.is_zero() {
            return Err(AppError::ValidationError(
                "Interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_key_prefix(prefix: &str) -> Result<(), AppError> {
        if prefix.starts_with('/') {
            return Err(AppError::ValidationError(
                "Object key prefix must not start with '/'".to_string(),
            ));
        }
        if !prefix.is_empty() && !prefix.ends_with('/') {
            return Err(AppError::ValidationError(
                "Object key prefix must end with '/'".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_task_name_rules() {
        assert_ok!(Validator::validate_task_name("image_sync"));
        assert_ok!(Validator::validate_task_name("detect.labels-v2"));
        assert_err!(Validator::validate_task_name(""));
        assert_err!(Validator::validate_task_name("has space"));
        assert_err!(Validator::validate_task_name(&"x".repeat(129)));
    }

    #[test]
    fn test_interval_must_be_positive() {
        assert_err!(Validator::validate_interval(Duration::ZERO));
        assert_ok!(Validator::validate_interval(Duration::from_millis(1)));
    }

    #[test]
    fn test_key_prefix_rules() {
        assert_ok!(Validator::validate_key_prefix(""));
        assert_ok!(Validator::validate_key_prefix("warehouse/"));
        assert_err!(Validator::validate_key_prefix("warehouse"));
        assert_err!(Validator::validate_key_prefix("/warehouse/"));
    }
}
