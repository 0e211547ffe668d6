use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::dto::{StatsQuery, StatsResponse};
use super::services::{avatar_url, compute_stats, progress_percent};
use crate::{history::services as history, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

/// Streak is supplied by the caller; it is never derived from the log here.
#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    Query(q): Query<StatsQuery>,
) -> Json<StatsResponse> {
    let entries = state.store.all_entries().await;
    let total_protein = history::total_protein(&entries);
    let daily_protein =
        history::daily_protein(&entries, OffsetDateTime::now_utc(), state.config.utc_offset());

    let stats = compute_stats(total_protein, q.streak);
    debug!(score = stats.muscle_score, level = stats.level, "stats computed");

    Json(StatsResponse {
        progress_percent: progress_percent(&stats),
        avatar_url: avatar_url(stats.level),
        stats,
        total_protein,
        daily_protein,
        streak: q.streak,
    })
}
