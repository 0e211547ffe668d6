use serde::{Deserialize, Serialize};

use super::services::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: String,
    pub label: String,
    pub total: f64,
    pub is_today: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { DEFAULT_RECENT_LIMIT }

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    /// Epoch millis; entries at exactly this instant are included.
    pub since: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinTotal {
    pub since: i64,
    pub protein: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyResponse {
    pub days: Vec<DaySummary>,
    pub total: f64,
}
