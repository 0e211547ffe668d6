use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::errors::AnalysisError;
use super::provider::{AnalysisProvider, ImageInput};
use crate::nutrition::catalog::{display_label, DENSITY_TABLE};
use crate::nutrition::{AnalysisDetails, AnalysisEstimate};

pub const DEFAULT_FAILURE_RATE: f64 = 0.10;
const VOLUME_RANGE_CM3: std::ops::RangeInclusive<u32> = 100..=300;
const MARGIN_RANGE: std::ops::RangeInclusive<u32> = 5..=15;
const CONFIDENCE_FLOOR: f64 = 0.92;
const CONFIDENCE_SPREAD: f64 = 0.07;

/// Offline stand-in for a vision model: picks a food from the density table
/// and derives weight and protein from a synthetic volume.
pub struct ReferenceEstimator {
    rng: Mutex<StdRng>,
    failure_rate: f64,
    latency: Duration,
}

impl ReferenceEstimator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            failure_rate: DEFAULT_FAILURE_RATE,
            latency: Duration::ZERO,
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { DEFAULT_FAILURE_RATE };
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn draw(&self) -> Result<AnalysisEstimate, AnalysisError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        if rng.gen_bool(self.failure_rate) {
            return Err(AnalysisError::Recognition(
                "no food item detected on the plate".into(),
            ));
        }

        let food = DENSITY_TABLE
            .choose(&mut *rng)
            .ok_or_else(|| AnalysisError::Configuration("density table is empty".into()))?;

        let volume = f64::from(rng.gen_range(VOLUME_RANGE_CM3));
        let weight = (volume * food.density).round();
        let protein = (weight * food.protein_per_100g / 100.0).round();
        let margin = f64::from(rng.gen_range(MARGIN_RANGE));
        let confidence = CONFIDENCE_FLOOR + rng.gen::<f64>() * CONFIDENCE_SPREAD;

        Ok(AnalysisEstimate {
            aliment: display_label(food.key),
            confiance_score: confidence,
            volume_estime_cm3: volume,
            poids_estime: weight,
            proteines_calculees: protein,
            marge_erreur: margin,
            details_analyse: AnalysisDetails {
                reference_detectee: "Assiette Standard (26cm)".into(),
                methode_calcul: "Photogrammétrie Rapide".into(),
            },
        })
    }
}

impl Default for ReferenceEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisProvider for ReferenceEstimator {
    fn name(&self) -> &'static str {
        "reference"
    }

    #[instrument(skip(self, image), fields(bytes = image.bytes.len(), mime = %image.mime_type))]
    async fn estimate(&self, image: &ImageInput) -> Result<AnalysisEstimate, AnalysisError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.draw();
        match &result {
            Ok(e) => debug!(aliment = %e.aliment, protein = e.proteines_calculees, "reference estimate"),
            Err(e) => debug!(error = %e, "reference estimator simulated failure"),
        }
        result
    }
}

#[cfg(test)]
mod reference_tests {
    use super::*;

    fn image() -> ImageInput {
        ImageInput::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")
    }

    #[tokio::test]
    async fn estimates_stay_within_bounds() {
        let estimator = ReferenceEstimator::with_seed(7);
        let mut successes = 0;
        for _ in 0..500 {
            let Ok(e) = estimator.estimate(&image()).await else { continue };
            successes += 1;
            assert!(e.validate().is_ok(), "{e:?}");
            assert!((0.0..=1.0).contains(&e.confiance_score));
            assert!(e.proteines_calculees >= 0.0);
            assert!((100.0..=300.0).contains(&e.volume_estime_cm3));
            assert!((5.0..=15.0).contains(&e.marge_erreur));

            let food = DENSITY_TABLE
                .iter()
                .find(|d| display_label(d.key) == e.aliment)
                .expect("estimate names a table food");
            assert_eq!(e.poids_estime, (e.volume_estime_cm3 * food.density).round());
            assert_eq!(
                e.proteines_calculees,
                (e.poids_estime * food.protein_per_100g / 100.0).round()
            );
        }
        assert!(successes > 0);
    }

    #[tokio::test]
    async fn recognition_failure_rate_is_bounded_and_non_zero() {
        let estimator = ReferenceEstimator::with_seed(42);
        let runs = 2000;
        let mut failures = 0;
        for _ in 0..runs {
            match estimator.estimate(&image()).await {
                Err(AnalysisError::Recognition(_)) => failures += 1,
                Err(other) => panic!("unexpected error {other:?}"),
                Ok(_) => {}
            }
        }
        let rate = failures as f64 / runs as f64;
        assert!(rate > 0.04 && rate < 0.16, "failure rate {rate}");
    }

    #[tokio::test]
    async fn failure_rate_can_be_disabled_or_forced() {
        let never = ReferenceEstimator::with_seed(1).with_failure_rate(0.0);
        for _ in 0..100 {
            assert!(never.estimate(&image()).await.is_ok());
        }

        let always = ReferenceEstimator::with_seed(1).with_failure_rate(3.0);
        assert!(matches!(
            always.estimate(&image()).await,
            Err(AnalysisError::Recognition(_))
        ));
    }

    #[tokio::test]
    async fn same_seed_same_estimates() {
        let a = ReferenceEstimator::with_seed(99);
        let b = ReferenceEstimator::with_seed(99);
        for _ in 0..20 {
            assert_eq!(a.estimate(&image()).await, b.estimate(&image()).await);
        }
    }
}
