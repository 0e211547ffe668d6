use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use super::dto::{AnalysisSnapshot, AnalysisStatus, FailureView, ManualSelection};
use super::errors::{AnalysisError, OrchestratorError};
use super::provider::{AnalysisProvider, ImageInput};
use crate::history::NutritionStore;
use crate::nutrition::catalog::{find_preset, find_reference};
use crate::nutrition::{AnalysisDetails, AnalysisEstimate, FoodLogEntry, LogMethod};

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Submitted { ticket: u64 },
    Succeeded { estimate: AnalysisEstimate, origin: LogMethod },
    Confirming { ticket: u64, estimate: AnalysisEstimate, origin: LogMethod },
    Failed { error: AnalysisError },
}

impl Phase {
    fn status(&self) -> AnalysisStatus {
        match self {
            Phase::Idle => AnalysisStatus::Idle,
            Phase::Submitted { .. } => AnalysisStatus::Submitted,
            Phase::Succeeded { .. } => AnalysisStatus::Succeeded,
            Phase::Confirming { .. } => AnalysisStatus::Confirming,
            Phase::Failed { .. } => AnalysisStatus::Failed,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Submitted { .. } => "submitted",
            Phase::Succeeded { .. } => "succeeded",
            Phase::Confirming { .. } => "confirming",
            Phase::Failed { .. } => "failed",
        }
    }

    fn in_flight(&self) -> bool {
        matches!(self, Phase::Submitted { .. } | Phase::Confirming { .. })
    }
}

/// Runs `f` on drop unless disarmed; used to unwind state when a caller
/// stops polling a pending submit or confirm.
struct Rollback<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> Rollback<F> {
    fn new(f: F) -> Self {
        Self { f: Some(f) }
    }

    fn disarm(&mut self) {
        self.f = None;
    }
}

impl<F: FnOnce()> Drop for Rollback<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

/// `round(protein_per_100g * weight / 100)`
pub fn manual_protein(protein_per_100g: f64, weight: f64) -> f64 {
    (protein_per_100g * weight / 100.0).round()
}

pub fn manual_estimate(selection: &ManualSelection) -> Result<AnalysisEstimate, OrchestratorError> {
    let reference = find_reference(&selection.reference)
        .ok_or_else(|| OrchestratorError::UnknownReference(selection.reference.clone()))?;
    if !selection.weight.is_finite() || selection.weight <= 0.0 {
        return Err(OrchestratorError::InvalidWeight(selection.weight));
    }
    Ok(AnalysisEstimate {
        aliment: reference.name.to_owned(),
        confiance_score: 1.0,
        poids_estime: selection.weight,
        volume_estime_cm3: 0.0,
        proteines_calculees: manual_protein(reference.protein_per_100g, selection.weight),
        marge_erreur: 0.0,
        details_analyse: AnalysisDetails {
            reference_detectee: "Manual selection".into(),
            methode_calcul: format!("{} g protein / 100 g", reference.protein_per_100g),
        },
    })
}

pub fn preset_estimate(preset_id: &str) -> Result<AnalysisEstimate, OrchestratorError> {
    let preset = find_preset(preset_id)
        .ok_or_else(|| OrchestratorError::UnknownPreset(preset_id.to_owned()))?;
    Ok(AnalysisEstimate {
        aliment: preset.name.to_owned(),
        confiance_score: 1.0,
        poids_estime: 0.0,
        volume_estime_cm3: 0.0,
        proteines_calculees: preset.protein,
        marge_erreur: 0.0,
        details_analyse: AnalysisDetails {
            reference_detectee: preset.portion.to_owned(),
            methode_calcul: "Quick log preset".into(),
        },
    })
}

/// Drives a single analysis request at a time and is the only writer of
/// confirmed entries to the nutrition store.
pub struct Orchestrator {
    provider: Arc<dyn AnalysisProvider>,
    store: Arc<NutritionStore>,
    phase: Mutex<Phase>,
    next_ticket: AtomicU64,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn AnalysisProvider>, store: Arc<NutritionStore>) -> Self {
        Self {
            provider,
            store,
            phase: Mutex::new(Phase::Idle),
            next_ticket: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn status(&self) -> AnalysisStatus {
        self.lock().status()
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        let phase = self.lock();
        let (estimate, origin, error) = match &*phase {
            Phase::Succeeded { estimate, origin } | Phase::Confirming { estimate, origin, .. } => {
                (Some(estimate.clone()), Some(*origin), None)
            }
            Phase::Failed { error } => (
                None,
                None,
                Some(FailureView {
                    code: error.code(),
                    message: error.to_string(),
                }),
            ),
            Phase::Idle | Phase::Submitted { .. } => (None, None, None),
        };
        AnalysisSnapshot {
            status: phase.status(),
            estimate,
            origin,
            error,
        }
    }

    /// Idle -> Submitted, rejecting a second request while one is in flight.
    fn begin(&self) -> Result<u64, OrchestratorError> {
        let mut phase = self.lock();
        if phase.in_flight() {
            return Err(OrchestratorError::Busy);
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        *phase = Phase::Submitted { ticket };
        Ok(ticket)
    }

    fn abandon(&self, ticket: u64) {
        let mut phase = self.lock();
        if matches!(&*phase, Phase::Submitted { ticket: t } if *t == ticket) {
            info!(ticket, "analysis abandoned by caller");
            *phase = Phase::Idle;
        }
    }

    fn settle(
        &self,
        ticket: u64,
        outcome: Result<AnalysisEstimate, AnalysisError>,
    ) -> Result<AnalysisEstimate, OrchestratorError> {
        let outcome = outcome.and_then(|estimate| {
            estimate
                .validate()
                .map(|_| estimate)
                .map_err(AnalysisError::InvalidResponse)
        });

        let mut phase = self.lock();
        if !matches!(&*phase, Phase::Submitted { ticket: t } if *t == ticket) {
            warn!(ticket, state = phase.label(), "late analysis result ignored");
            return outcome.map_err(Into::into);
        }
        match outcome {
            Ok(estimate) => {
                *phase = Phase::Succeeded {
                    estimate: estimate.clone(),
                    origin: LogMethod::AiScan,
                };
                Ok(estimate)
            }
            Err(error) => {
                warn!(ticket, code = error.code(), error = %error, "analysis failed");
                *phase = Phase::Failed { error: error.clone() };
                Err(error.into())
            }
        }
    }

    /// Calls the provider exactly once. Dropping the returned future before it
    /// completes puts the orchestrator back to `Idle`.
    #[instrument(skip(self, image), fields(provider = self.provider.name(), bytes = image.bytes.len()))]
    pub async fn submit(&self, image: ImageInput) -> Result<AnalysisEstimate, OrchestratorError> {
        let ticket = self.begin()?;
        let mut rollback = Rollback::new(move || self.abandon(ticket));
        let outcome = self.provider.estimate(&image).await;
        rollback.disarm();
        self.settle(ticket, outcome)
    }

    fn replace_with(
        &self,
        estimate: AnalysisEstimate,
        origin: LogMethod,
    ) -> Result<AnalysisEstimate, OrchestratorError> {
        let mut phase = self.lock();
        if phase.in_flight() {
            return Err(OrchestratorError::Busy);
        }
        *phase = Phase::Succeeded {
            estimate: estimate.clone(),
            origin,
        };
        Ok(estimate)
    }

    /// Bypasses the provider entirely.
    #[instrument(skip(self))]
    pub fn submit_manual(&self, selection: &ManualSelection) -> Result<AnalysisEstimate, OrchestratorError> {
        let estimate = manual_estimate(selection)?;
        debug!(aliment = %estimate.aliment, protein = estimate.proteines_calculees, "manual estimate");
        self.replace_with(estimate, LogMethod::ManualSearch)
    }

    #[instrument(skip(self))]
    pub fn submit_preset(&self, preset_id: &str) -> Result<AnalysisEstimate, OrchestratorError> {
        let estimate = preset_estimate(preset_id)?;
        self.replace_with(estimate, LogMethod::QuickLog)
    }

    /// Writes a preset entry straight to the store. Any unconfirmed estimate is left alone.
    #[instrument(skip(self))]
    pub async fn quick_log(&self, preset_id: &str) -> Result<FoodLogEntry, OrchestratorError> {
        let entry = preset_estimate(preset_id)?.into_entry(LogMethod::QuickLog);
        let entry = self.store.append(entry).await?;
        info!(id = %entry.id, food = %entry.food_name, protein = entry.protein, "quick log saved");
        Ok(entry)
    }

    /// The write may already have landed, so the estimate is dropped rather than offered again.
    fn abandon_confirm(&self, ticket: u64) {
        let mut phase = self.lock();
        if matches!(&*phase, Phase::Confirming { ticket: t, .. } if *t == ticket) {
            warn!(ticket, "confirm abandoned by caller; estimate dropped");
            *phase = Phase::Idle;
        }
    }

    fn restore_after_confirm(&self, ticket: u64) {
        let mut phase = self.lock();
        let restored = match &*phase {
            Phase::Confirming { ticket: t, estimate, origin } if *t == ticket => Some(Phase::Succeeded {
                estimate: estimate.clone(),
                origin: *origin,
            }),
            _ => None,
        };
        if let Some(restored) = restored {
            *phase = restored;
        }
    }

    /// Persists the succeeded estimate. `method` defaults to where the estimate came from.
    /// A storage failure keeps the estimate so the caller can retry; dropping the
    /// future mid-write discards it, since the entry may already be stored.
    #[instrument(skip(self))]
    pub async fn confirm(&self, method: Option<LogMethod>) -> Result<FoodLogEntry, OrchestratorError> {
        let (ticket, entry) = {
            let mut phase = self.lock();
            let (estimate, origin) = match &*phase {
                Phase::Succeeded { estimate, origin } => (estimate.clone(), *origin),
                other => return Err(OrchestratorError::NotConfirmable(other.label())),
            };
            let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
            *phase = Phase::Confirming {
                ticket,
                estimate: estimate.clone(),
                origin,
            };
            (ticket, estimate.into_entry(method.unwrap_or(origin)))
        };

        let mut rollback = Rollback::new(move || self.abandon_confirm(ticket));
        let result = self.store.append(entry).await;
        rollback.disarm();

        match result {
            Ok(entry) => {
                let mut phase = self.lock();
                if matches!(&*phase, Phase::Confirming { ticket: t, .. } if *t == ticket) {
                    *phase = Phase::Idle;
                }
                info!(id = %entry.id, food = %entry.food_name, protein = entry.protein, method = %entry.method, "entry confirmed");
                Ok(entry)
            }
            Err(e) => {
                warn!(error = %e, "confirm failed; estimate kept");
                self.restore_after_confirm(ticket);
                Err(e.into())
            }
        }
    }

    /// Drops any unconfirmed estimate or failure.
    pub fn reset(&self) -> Result<(), OrchestratorError> {
        let mut phase = self.lock();
        if phase.in_flight() {
            return Err(OrchestratorError::Busy);
        }
        *phase = Phase::Idle;
        Ok(())
    }
}
