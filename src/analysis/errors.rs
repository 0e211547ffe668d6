use axum::http::StatusCode;
use thiserror::Error;

use crate::errors::{api_error, ApiError};
use crate::history::StoreError;

/// Failures a provider can signal. None of them is retried by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("analysis provider is not configured: {0}")]
    Configuration(String),
    #[error("no food recognized: {0}")]
    Recognition(String),
    #[error("provider response is invalid: {0}")]
    InvalidResponse(String),
    #[error("provider call failed: {0}")]
    Transport(String),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Configuration(_) => "CONFIGURATION_ERROR",
            AnalysisError::Recognition(_) => "RECOGNITION_FAILURE",
            AnalysisError::InvalidResponse(_) => "INVALID_RESPONSE",
            AnalysisError::Transport(_) => "TRANSPORT_FAILURE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AnalysisError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalysisError::Recognition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::InvalidResponse(_) | AnalysisError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("an analysis is already in flight")]
    Busy,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("unknown reference food '{0}'")]
    UnknownReference(String),
    #[error("unknown quick-log preset '{0}'")]
    UnknownPreset(String),
    #[error("weight must be a positive number of grams, got {0}")]
    InvalidWeight(f64),
    #[error("nothing to confirm: analysis is {0}")]
    NotConfirmable(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        let message = e.to_string();
        match e {
            OrchestratorError::Busy => api_error(StatusCode::CONFLICT, "BUSY", message),
            OrchestratorError::Analysis(a) => api_error(a.status(), a.code(), message),
            OrchestratorError::UnknownReference(_) => {
                api_error(StatusCode::NOT_FOUND, "UNKNOWN_REFERENCE", message)
            }
            OrchestratorError::UnknownPreset(_) => {
                api_error(StatusCode::NOT_FOUND, "UNKNOWN_PRESET", message)
            }
            OrchestratorError::InvalidWeight(_) => {
                api_error(StatusCode::BAD_REQUEST, "INVALID_WEIGHT", message)
            }
            OrchestratorError::NotConfirmable(_) => {
                api_error(StatusCode::CONFLICT, "NOT_CONFIRMABLE", message)
            }
            OrchestratorError::Store(s) if s.is_storage_failure() => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE", message)
            }
            OrchestratorError::Store(_) => api_error(StatusCode::BAD_REQUEST, "INVALID_ENTRY", message),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn provider_failures_keep_distinct_codes() {
        let codes: Vec<_> = [
            AnalysisError::Configuration("x".into()),
            AnalysisError::Recognition("x".into()),
            AnalysisError::InvalidResponse("x".into()),
            AnalysisError::Transport("x".into()),
        ]
        .iter()
        .map(AnalysisError::code)
        .collect();
        assert_eq!(
            codes,
            vec!["CONFIGURATION_ERROR", "RECOGNITION_FAILURE", "INVALID_RESPONSE", "TRANSPORT_FAILURE"]
        );
    }

    #[test]
    fn orchestrator_errors_map_to_http() {
        let (status, body) = ApiError::from(OrchestratorError::Busy);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "BUSY");

        let (status, body) = ApiError::from(OrchestratorError::from(AnalysisError::Recognition(
            "empty plate".into(),
        )));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "RECOGNITION_FAILURE");
        assert!(body.message.contains("empty plate"));

        let (status, body) = ApiError::from(OrchestratorError::Store(StoreError::Unavailable(
            anyhow::anyhow!("disk gone"),
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "STORAGE_FAILURE");

        let (_, body) = ApiError::from(OrchestratorError::Store(StoreError::InvalidEntry("x".into())));
        assert_eq!(body.code, "INVALID_ENTRY");
    }
}
