use serde::{Deserialize, Serialize};

/// Derived gamification state; never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub muscle_score: f64,
    pub level: u8,
    pub level_title: String,
    /// `None` (serialized as `null`) at the max level.
    pub next_level_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub streak: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: UserStats,
    pub total_protein: f64,
    pub daily_protein: f64,
    pub streak: u32,
    pub progress_percent: f64,
    pub avatar_url: String,
}
