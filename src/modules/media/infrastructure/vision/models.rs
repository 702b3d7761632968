//! Wire types of the detection gateway
use serde::{Deserialize, Serialize};

pub const MAX_LABELS: u32 = 20;
pub const MIN_CONFIDENCE: f32 = 75.0;

/// Detection type kept from text responses
pub const WORD: &str = "WORD";

#[derive(Debug, Serialize)]
pub struct S3Object<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DetectLabelsRequest<'a> {
    pub object: S3Object<'a>,
    pub max_labels: u32,
    pub min_confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct DetectTextRequest<'a> {
    pub object: S3Object<'a>,
}

#[derive(Debug, Deserialize)]
pub struct DetectLabelsResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<LabelCategory>,
}

#[derive(Debug, Deserialize)]
pub struct LabelCategory {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DetectTextResponse {
    #[serde(default)]
    pub text_detections: Vec<TextDetection>,
}

#[derive(Debug, Deserialize)]
pub struct TextDetection {
    pub detected_text: Option<String>,
    #[serde(rename = "type")]
    pub detection_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetectDocumentTextResponse {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
pub struct Block {
    pub block_type: Option<String>,
    pub text: Option<String>,
}

impl DetectLabelsResponse {
    /// Every label name followed by its category names
    pub fn into_names(self) -> Vec<String> {
        self.labels
            .into_iter()
            .flat_map(|label| {
                std::iter::once(label.name).chain(label.categories.into_iter().map(|c| c.name))
            })
            .collect()
    }
}

impl DetectTextResponse {
    pub fn into_words(self) -> Vec<String> {
        self.text_detections
            .into_iter()
            .filter(|d| d.detection_type.as_deref() == Some(WORD))
            .filter_map(|d| d.detected_text)
            .collect()
    }
}

impl DetectDocumentTextResponse {
    pub fn into_words(self) -> Vec<String> {
        self.blocks
            .into_iter()
            .filter(|b| b.block_type.as_deref() == Some(WORD))
            .filter_map(|b| b.text)
            .collect()
    }
}
