use serde::{Deserialize, Serialize};

use crate::nutrition::{AnalysisEstimate, LogMethod};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Idle,
    Submitted,
    Succeeded,
    /// Succeeded and currently being written to the log.
    Confirming,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureView {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSnapshot {
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<AnalysisEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<LogMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureView>,
}

/// User-picked reference food and portion, used when scanning is skipped or failed.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualSelection {
    pub reference: String,
    /// Grams.
    pub weight: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub method: Option<LogMethod>,
}

#[derive(Debug, Deserialize)]
pub struct QuickLogRequest {
    pub preset: String,
}

#[derive(Debug, Deserialize)]
pub struct ReferenceQuery {
    #[serde(default)]
    pub q: String,
}
