use serde::{Deserialize, Serialize};

use crate::domain::{
    advisory::{AdvisoryBundle, AdvisoryTable},
    detection::DetectionSet,
    model::YoloParams,
    severity::{SeverityBand, SeverityLabel},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedImage {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub data_base64: String,
}

/// Payload que pinta la página tras un análisis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub severity: SeverityLabel,
    pub severity_rank: u8,
    pub spot_count: usize,
    pub average_confidence: f64,
    pub average_confidence_display: String,
    pub confidence_progress: f64,
    pub advisory: AdvisoryBundle,
    pub legend: Vec<SeverityBand>,
    pub annotated_image: AnnotatedImage,
    pub infer_ms: f32,
    pub detections: DetectionSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub model_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryResponse {
    pub advisory: AdvisoryTable,
    pub legend: Vec<SeverityBand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub yolo: YoloParams,
    pub class_names: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
