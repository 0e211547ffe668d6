use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Reference,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "local" => Ok(Self::Reference),
            "gemini" => Ok(Self::Gemini),
            other => anyhow::bail!("unknown ANALYSIS_PROVIDER '{other}' (expected reference|gemini)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub failure_rate: f64,
    pub latency_ms: u64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub provider: ProviderKind,
    pub timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub reference: ReferenceConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub history_key: String,
    pub user_id_hash: String,
    /// Offset used to find local day boundaries for daily/weekly rollups.
    pub utc_offset_minutes: i32,
    pub analysis: AnalysisConfig,
}

pub const DEFAULT_HISTORY_KEY: &str = "MUSCLE_AI_HISTORY_V1";
pub const DEFAULT_USER_ID_HASH: &str = "ANONYMOUS_USER_HASH";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = parse_var::<ProviderKind, _>(&lookup, "ANALYSIS_PROVIDER")?
            .unwrap_or(ProviderKind::Reference);

        let analysis = AnalysisConfig {
            provider,
            timeout_secs: parse_var(&lookup, "ANALYSIS_TIMEOUT_SECS")?.unwrap_or(30),
            gemini: GeminiConfig {
                api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
                model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
                base_url: lookup("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            },
            reference: ReferenceConfig {
                failure_rate: parse_var(&lookup, "REFERENCE_FAILURE_RATE")?.unwrap_or(0.10),
                latency_ms: parse_var(&lookup, "REFERENCE_LATENCY_MS")?.unwrap_or(0),
                seed: parse_var(&lookup, "REFERENCE_SEED")?,
            },
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://protein-tracker.db?mode=rwc".into()),
            history_key: lookup("HISTORY_STORAGE_KEY").unwrap_or_else(|| DEFAULT_HISTORY_KEY.into()),
            user_id_hash: lookup("USER_ID_HASH").unwrap_or_else(|| DEFAULT_USER_ID_HASH.into()),
            utc_offset_minutes: parse_var(&lookup, "UTC_OFFSET_MINUTES")?.unwrap_or(0),
            analysis,
        })
    }

    pub fn utc_offset(&self) -> time::UtcOffset {
        time::UtcOffset::from_whole_seconds(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or(time::UtcOffset::UTC)
    }
}

/// Unset or blank means `None`; a value that does not parse is an error.
fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("parse {key}={raw:?}")),
        _ => Ok(None),
    }
}
