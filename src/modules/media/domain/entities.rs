use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::schema::images;

/// Image record from database
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = images)]
pub struct Image {
    pub id: i64,
    /// Local path after renaming
    pub filename: String,
    /// Local path as discovered
    pub origin_filename: String,
    /// Extension with leading dot, empty when the file had none
    pub file_extension: String,
    pub bucket: String,
    pub object_key: String,
    pub uploaded: bool,
    pub label_detected: bool,
    pub text_detected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New image for insertion
#[derive(Debug, Clone, PartialEq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = images)]
pub struct NewImage {
    pub filename: String,
    pub origin_filename: String,
    pub file_extension: String,
    pub bucket: String,
    pub object_key: String,
    pub uploaded: bool,
}

impl NewImage {
    /// Record for a file that was stored under `bucket`/`object_key`
    pub fn uploaded(
        filename: impl Into<String>,
        origin_filename: impl Into<String>,
        bucket: impl Into<String>,
        object_key: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let file_extension = extension_with_dot(Path::new(&filename));
        Self {
            filename,
            origin_filename: origin_filename.into(),
            file_extension,
            bucket: bucket.into(),
            object_key: object_key.into(),
            uploaded: true,
        }
    }
}

/// `.ext` for a path with an extension, otherwise an empty string
pub fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Outcome counts of one detection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionSummary {
    /// Pending images looked at
    pub processed: usize,
    /// Images whose detection result was persisted
    pub succeeded: usize,
    /// Images left pending because detection or persistence failed
    pub failed: usize,
    /// Images marked detected without calling the detector
    pub skipped: usize,
}
