pub mod dto;
pub mod errors;
pub mod gemini;
pub mod handlers;
pub mod orchestrator;
pub mod provider;
pub mod reference;

use crate::state::AppState;
use axum::Router;

pub use orchestrator::Orchestrator;
pub use provider::{build_provider, AnalysisProvider};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
