use crate::shared::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Outcome of transferring one local file
#[derive(Debug)]
pub struct UploadResult {
    pub source: PathBuf,
    pub bucket: String,
    pub key: String,
    pub outcome: AppResult<()>,
}

impl UploadResult {
    pub fn succeeded(source: PathBuf, bucket: String, key: String) -> Self {
        Self {
            source,
            bucket,
            key,
            outcome: Ok(()),
        }
    }

    pub fn failed(source: PathBuf, bucket: String, key: String, error: AppError) -> Self {
        Self {
            source,
            bucket,
            key,
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.outcome.as_ref().err()
    }
}

/// Aggregate counts over a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn from_results(results: &[UploadResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

/// Object key for a local file: `prefix` followed by the file name
pub fn object_key_for(prefix: &str, source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string_lossy().into_owned());
    format!("{}{}", prefix, file_name)
}

/// Content type sent along with an object, derived from the extension
pub fn content_type_for(source: &Path) -> &'static str {
    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_uses_file_name_only() {
        let key = object_key_for("warehouse/", Path::new("/srv/inbox/2024/a1b2.png"));
        assert_eq!(key, "warehouse/a1b2.png");
        assert_eq!(object_key_for("", Path::new("plain.txt")), "plain.txt");
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for(Path::new("x.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("x.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("x.webp")), "image/webp");
        assert_eq!(content_type_for(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            UploadResult::succeeded("a".into(), "b".into(), "k/a".into()),
            UploadResult::failed(
                "c".into(),
                "b".into(),
                "k/c".into(),
                AppError::StorageError("denied".into()),
            ),
        ];
        let summary = UploadSummary::from_results(&results);
        assert_eq!(
            summary,
            UploadSummary {
                total: 2,
                succeeded: 1,
                failed: 1
            }
        );
        assert!(results[1].error().is_some());
    }
}
