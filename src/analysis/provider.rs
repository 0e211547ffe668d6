use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use super::errors::AnalysisError;
use super::gemini::GeminiEstimator;
use super::reference::ReferenceEstimator;
use crate::config::{AnalysisConfig, ProviderKind};
use crate::nutrition::AnalysisEstimate;

/// Raw photo handed to a provider.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Turns a photo into a nutrition estimate.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn estimate(&self, image: &ImageInput) -> Result<AnalysisEstimate, AnalysisError>;
}

pub fn is_supported_mime(ct: &str) -> bool {
    let base = ct.split(';').next().unwrap_or_default().trim();
    matches!(
        base.to_ascii_lowercase().as_str(),
        "image/jpeg" | "image/jpg" | "image/png" | "image/webp" | "image/heic"
    )
}

pub fn build_provider(cfg: &AnalysisConfig) -> anyhow::Result<Arc<dyn AnalysisProvider>> {
    let provider: Arc<dyn AnalysisProvider> = match cfg.provider {
        ProviderKind::Reference => {
            let r = &cfg.reference;
            let estimator = match r.seed {
                Some(seed) => ReferenceEstimator::with_seed(seed),
                None => ReferenceEstimator::new(),
            }
            .with_failure_rate(r.failure_rate)
            .with_latency(Duration::from_millis(r.latency_ms));
            Arc::new(estimator)
        }
        ProviderKind::Gemini => Arc::new(
            GeminiEstimator::new(cfg.gemini.api_key.clone(), Duration::from_secs(cfg.timeout_secs))?
                .with_model(cfg.gemini.model.clone())
                .with_base_url(cfg.gemini.base_url.clone()),
        ),
    };
    info!(provider = provider.name(), "analysis provider ready");
    Ok(provider)
}
