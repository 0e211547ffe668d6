use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance of a logged entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogMethod {
    AiScan,
    ManualSearch,
    QuickLog,
}

impl LogMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogMethod::AiScan => "AI_SCAN",
            LogMethod::ManualSearch => "MANUAL_SEARCH",
            LogMethod::QuickLog => "QUICK_LOG",
        }
    }
}

impl std::fmt::Display for LogMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted meal. Only the nutrition store creates these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogEntry {
    pub id: Uuid,
    pub user_id_hash: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub food_name: String,
    pub protein: f64,
    /// Grams; `0` marks a preset or unweighed entry.
    pub weight: f64,
    pub method: LogMethod,
}

/// Caller-supplied part of an entry; the store fills id, timestamp and user hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewFoodLogEntry {
    pub food_name: String,
    pub protein: f64,
    pub weight: f64,
    pub method: LogMethod,
}

impl NewFoodLogEntry {
    pub fn validate(&self) -> Result<(), String> {
        if self.food_name.trim().is_empty() {
            return Err("foodName must not be empty".into());
        }
        if !self.protein.is_finite() || self.protein < 0.0 {
            return Err(format!("protein must be a non-negative number, got {}", self.protein));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(format!("weight must be a non-negative number, got {}", self.weight));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisDetails {
    #[serde(default)]
    pub reference_detectee: String,
    #[serde(default)]
    pub methode_calcul: String,
}

/// Unconfirmed nutrition analysis. Wire keys are fixed by the provider contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisEstimate {
    pub aliment: String,
    pub confiance_score: f64,
    pub poids_estime: f64,
    pub volume_estime_cm3: f64,
    pub proteines_calculees: f64,
    pub marge_erreur: f64,
    #[serde(default)]
    pub details_analyse: AnalysisDetails,
}

impl AnalysisEstimate {
    /// Checks the invariants every provider output must hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.aliment.trim().is_empty() {
            return Err("aliment is empty".into());
        }
        if !(0.0..=1.0).contains(&self.confiance_score) {
            return Err(format!("confiance_score {} outside [0,1]", self.confiance_score));
        }
        for (name, value) in [
            ("poids_estime", self.poids_estime),
            ("volume_estime_cm3", self.volume_estime_cm3),
            ("proteines_calculees", self.proteines_calculees),
            ("marge_erreur", self.marge_erreur),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }

    pub fn into_entry(self, method: LogMethod) -> NewFoodLogEntry {
        NewFoodLogEntry {
            food_name: self.aliment,
            protein: self.proteines_calculees,
            weight: self.poids_estime,
            method,
        }
    }
}
