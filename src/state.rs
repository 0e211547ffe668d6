use crate::analysis::{build_provider, AnalysisProvider, Orchestrator};
use crate::config::AppConfig;
use crate::history::NutritionStore;
use crate::storage::{KeyValueStore, SqliteKv};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<NutritionStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let kv = Arc::new(SqliteKv::connect(&config.database_url).await?) as Arc<dyn KeyValueStore>;

        let provider = build_provider(&config.analysis).context("build analysis provider")?;

        Ok(Self::from_parts(config, kv, provider))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        kv: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AnalysisProvider>,
    ) -> Self {
        let store = Arc::new(NutritionStore::new(
            kv,
            config.history_key.clone(),
            config.user_id_hash.clone(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(provider, store.clone()));
        Self {
            config,
            store,
            orchestrator,
        }
    }

    /// Memory-backed state with a seeded, never-failing reference estimator.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::with_memory_kv(Arc::new(crate::storage::MemoryKv::new()))
    }

    #[cfg(test)]
    pub fn with_memory_kv(kv: Arc<crate::storage::MemoryKv>) -> Self {
        use crate::analysis::reference::ReferenceEstimator;

        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite::memory:".into()),
            _ => None,
        })
        .expect("default config");

        let provider = Arc::new(ReferenceEstimator::with_seed(7).with_failure_rate(0.0))
            as Arc<dyn AnalysisProvider>;
        Self::from_parts(Arc::new(config), kv, provider)
    }
}
