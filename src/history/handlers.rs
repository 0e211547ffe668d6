use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::{ProteinTotal, RecentQuery, SinceQuery, WeeklyResponse};
use super::services;
use crate::{nutrition::FoodLogEntry, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_recent))
        .route("/entries/all", get(list_all))
        .route("/protein", get(protein_since))
        .route("/protein/daily", get(protein_daily))
        .route("/protein/weekly", get(protein_weekly))
}

#[instrument(skip(state))]
pub async fn list_recent(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Json<Vec<FoodLogEntry>> {
    let entries = state.store.all_entries().await;
    Json(services::recent(&entries, q.limit))
}

#[instrument(skip(state))]
pub async fn list_all(State(state): State<AppState>) -> Json<Vec<FoodLogEntry>> {
    Json(state.store.all_entries().await)
}

#[instrument(skip(state))]
pub async fn protein_since(
    State(state): State<AppState>,
    Query(q): Query<SinceQuery>,
) -> Json<ProteinTotal> {
    let protein = state.store.aggregate_since(q.since).await;
    Json(ProteinTotal { since: q.since, protein })
}

#[instrument(skip(state))]
pub async fn protein_daily(State(state): State<AppState>) -> Json<ProteinTotal> {
    let offset = state.config.utc_offset();
    let since = services::start_of_day_ms(OffsetDateTime::now_utc(), offset);
    let protein = state.store.aggregate_since(since).await;
    Json(ProteinTotal { since, protein })
}

#[instrument(skip(state))]
pub async fn protein_weekly(State(state): State<AppState>) -> Json<WeeklyResponse> {
    let entries = state.store.all_entries().await;
    let days = services::weekly_breakdown(&entries, OffsetDateTime::now_utc(), state.config.utc_offset());
    let total = days.iter().map(|d| d.total).sum();
    Json(WeeklyResponse { days, total })
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use crate::app::build_app;
    use crate::config::DEFAULT_HISTORY_KEY;
    use crate::history::repo::now_millis;
    use crate::nutrition::LogMethod;
    use crate::storage::MemoryKv;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn entry(timestamp: i64, protein: f64) -> FoodLogEntry {
        FoodLogEntry {
            id: Uuid::new_v4(),
            user_id_hash: "ANONYMOUS_USER_HASH".into(),
            timestamp,
            food_name: format!("meal {timestamp}"),
            protein,
            weight: 0.0,
            method: LogMethod::QuickLog,
        }
    }

    fn seeded(entries: &[FoodLogEntry]) -> (Arc<MemoryKv>, AppState) {
        let kv = Arc::new(MemoryKv::new());
        kv.seed(DEFAULT_HISTORY_KEY, &serde_json::to_string(entries).unwrap());
        let state = AppState::with_memory_kv(kv.clone());
        (kv, state)
    }

    async fn get_json(state: &AppState, uri: &str) -> Value {
        let res = build_app(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn protein_since_is_inclusive() {
        let (_, state) = seeded(&[entry(1_000, 10.0), entry(2_000, 20.0), entry(3_000, 30.0)]);

        let at = get_json(&state, "/api/v1/protein?since=2000").await;
        assert_eq!(at["since"], 2_000);
        assert_eq!(at["protein"], 50.0);

        assert_eq!(get_json(&state, "/api/v1/protein?since=0").await["protein"], 60.0);
        assert_eq!(get_json(&state, "/api/v1/protein?since=3001").await["protein"], 0.0);
    }

    #[tokio::test]
    async fn recent_entries_are_newest_first_and_limited() {
        let (_, state) = seeded(&[entry(1_000, 1.0), entry(2_000, 2.0), entry(3_000, 3.0)]);

        let two = get_json(&state, "/api/v1/entries?limit=2").await;
        let stamps: Vec<i64> = two
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["timestamp"].as_i64())
            .collect();
        assert_eq!(stamps, vec![3_000, 2_000]);

        let default_limit = get_json(&state, "/api/v1/entries").await;
        assert_eq!(default_limit.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn weekly_ends_today() {
        let now = now_millis();
        let eight_days = 8 * 24 * 60 * 60 * 1000;
        let (_, state) = seeded(&[entry(now - eight_days, 99.0), entry(now, 30.0)]);

        let week = get_json(&state, "/api/v1/protein/weekly").await;
        let days = week["days"].as_array().unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[6]["isToday"], true);
        assert_eq!(days[6]["total"], 30.0);
        assert_eq!(week["total"], 30.0);
    }

    #[tokio::test]
    async fn unreadable_log_serves_empty() {
        let (kv, state) = seeded(&[entry(1_000, 10.0)]);
        kv.set_fail_reads(true);

        let all = get_json(&state, "/api/v1/entries/all").await;
        assert_eq!(all, Value::Array(vec![]));
        assert_eq!(get_json(&state, "/api/v1/protein?since=0").await["protein"], 0.0);
    }

    #[tokio::test]
    async fn corrupted_log_serves_empty() {
        let kv = Arc::new(MemoryKv::new());
        kv.seed(DEFAULT_HISTORY_KEY, "{broken");
        let state = AppState::with_memory_kv(kv);

        let all = get_json(&state, "/api/v1/entries/all").await;
        assert!(all.as_array().unwrap().is_empty());
    }
}
