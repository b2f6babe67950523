//! Outcome-driven dimension weights.
//!
//! Weights are learned from labeled outcomes: dimensions that separate
//! positive from negative outcomes drift upward, bounded per run and in
//! total drift from the static defaults. The persisted state is validated
//! on read and falls back to the defaults when malformed.

use score_core::config::AdaptiveConfig;
use score_core::db::adaptive::{AdaptiveStateRepository, AdaptiveStateRow, WEIGHTS_STATE};
use score_core::db::outcomes::OutcomeRepository;
use score_core::types::{Dimension, DimensionScores, OutcomeSample};
use score_core::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const SUM_TOLERANCE: f64 = 1e-4;
const SAMPLE_FETCH_LIMIT: i64 = 5_000;

/// Per-dimension weights, summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub reliability: f64,
    pub viability: f64,
    pub identity: f64,
    pub capability: f64,
    pub behavior: f64,
}

impl DimensionWeights {
    /// Static defaults used until enough outcomes accumulate.
    pub const DEFAULT: Self = Self {
        reliability: 0.30,
        viability: 0.25,
        identity: 0.20,
        capability: 0.10,
        behavior: 0.15,
    };

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Reliability => self.reliability,
            Dimension::Viability => self.viability,
            Dimension::Identity => self.identity,
            Dimension::Capability => self.capability,
            Dimension::Behavior => self.behavior,
        }
    }

    pub fn set(&mut self, dimension: Dimension, value: f64) {
        match dimension {
            Dimension::Reliability => self.reliability = value,
            Dimension::Viability => self.viability = value,
            Dimension::Identity => self.identity = value,
            Dimension::Capability => self.capability = value,
            Dimension::Behavior => self.behavior = value,
        }
    }

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|&d| self.get(d)).sum()
    }

    /// Weighted composite over integer dimension scores.
    pub fn composite(&self, dims: &DimensionScores) -> f64 {
        Dimension::ALL
            .iter()
            .map(|&d| self.get(d) * dims.get(d) as f64)
            .sum()
    }

    /// All keys present as finite non-negative numbers summing to 1.0.
    pub fn is_valid(&self) -> bool {
        Dimension::ALL
            .iter()
            .all(|&d| self.get(d).is_finite() && self.get(d) >= 0.0)
            && (self.sum() - 1.0).abs() < SUM_TOLERANCE
    }
}

/// Result of one weight-learning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightLearning {
    pub weights: DimensionWeights,
    pub sample_size: usize,
    pub positive_count: usize,
    pub negative_count: usize,
}

/// Learn shifted weights from labeled samples. Returns None when the
/// sample set is too small or too one-sided to learn from.
pub fn compute_weights(
    samples: &[OutcomeSample],
    current: &DimensionWeights,
    config: &AdaptiveConfig,
) -> Option<WeightLearning> {
    if samples.len() < config.min_outcomes {
        return None;
    }
    let positive_count = samples.iter().filter(|s| s.label.is_positive()).count();
    let negative_count = samples.len() - positive_count;
    if negative_count < config.min_negative {
        return None;
    }

    let mut next = *current;
    for dimension in Dimension::ALL {
        let mean_pos = mean_of(samples, dimension, true);
        let mean_neg = mean_of(samples, dimension, false);
        let diff = mean_pos - mean_neg;
        let shift = diff.signum() * (diff.abs() / 100.0).min(config.max_shift_per_run);
        next.set(dimension, next.get(dimension) + shift);
    }

    clamp_and_normalize(&mut next, config);

    Some(WeightLearning {
        weights: next,
        sample_size: samples.len(),
        positive_count,
        negative_count,
    })
}

fn mean_of(samples: &[OutcomeSample], dimension: Dimension, positive: bool) -> f64 {
    let values: Vec<f64> = samples
        .iter()
        .filter(|s| s.label.is_positive() == positive)
        .map(|s| s.dimensions.get(dimension) as f64)
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Clamp each weight's total drift from the defaults, then renormalize to
/// sum 1.0. Renormalization can nudge a weight back across the drift
/// boundary, so the pass runs twice.
fn clamp_and_normalize(weights: &mut DimensionWeights, config: &AdaptiveConfig) {
    for _ in 0..2 {
        for dimension in Dimension::ALL {
            let default = DimensionWeights::DEFAULT.get(dimension);
            let clamped = weights
                .get(dimension)
                .clamp(default - config.max_total_drift, default + config.max_total_drift)
                .max(0.0);
            weights.set(dimension, clamped);
        }
        let sum = weights.sum();
        if sum > 0.0 {
            for dimension in Dimension::ALL {
                weights.set(dimension, weights.get(dimension) / sum);
            }
        }
    }
}

/// Process-wide adaptive state: persisted weights behind an in-memory
/// cache, with explicit construction so tests can substitute pools.
pub struct AdaptiveEngine {
    state_repo: AdaptiveStateRepository,
    outcome_repo: OutcomeRepository,
    config: AdaptiveConfig,
    cached: RwLock<Option<DimensionWeights>>,
}

impl AdaptiveEngine {
    pub fn new(pool: PgPool, config: AdaptiveConfig) -> Self {
        Self {
            state_repo: AdaptiveStateRepository::new(pool.clone()),
            outcome_repo: OutcomeRepository::new(pool),
            config,
            cached: RwLock::new(None),
        }
    }

    /// Current weights: cached, else persisted-and-valid, else defaults.
    pub async fn effective_weights(&self) -> DimensionWeights {
        if let Some(weights) = *self.cached.read().await {
            return weights;
        }

        let weights = match self.state_repo.get(WEIGHTS_STATE).await {
            Ok(Some(row)) => match serde_json::from_value::<DimensionWeights>(row.weights) {
                Ok(parsed) if parsed.is_valid() => parsed,
                Ok(_) | Err(_) => {
                    warn!("persisted adaptive weights are invalid, using defaults");
                    DimensionWeights::DEFAULT
                }
            },
            Ok(None) => DimensionWeights::DEFAULT,
            Err(e) => {
                warn!(error = %e, "failed to load adaptive weights, using defaults");
                DimensionWeights::DEFAULT
            }
        };

        *self.cached.write().await = Some(weights);
        weights
    }

    /// Recompute weights from stored outcomes and persist the result.
    pub async fn recompute(&self) -> Result<Option<WeightLearning>> {
        let samples = self.outcome_repo.samples(SAMPLE_FETCH_LIMIT).await?;
        let current = self.effective_weights().await;

        let Some(learning) = compute_weights(&samples, &current, &self.config) else {
            debug!(
                sample_size = samples.len(),
                "not enough labeled outcomes to adapt weights"
            );
            return Ok(None);
        };

        let row = AdaptiveStateRow {
            state_name: WEIGHTS_STATE.to_string(),
            weights: serde_json::to_value(learning.weights)?,
            breakpoint_offsets: serde_json::json!({}),
            sample_size: learning.sample_size as i32,
            positive_count: learning.positive_count as i32,
            negative_count: learning.negative_count as i32,
            updated_at: chrono::Utc::now(),
        };
        self.state_repo.put(&row).await?;
        *self.cached.write().await = Some(learning.weights);

        info!(
            sample_size = learning.sample_size,
            positive = learning.positive_count,
            negative = learning.negative_count,
            "adapted dimension weights"
        );
        Ok(Some(learning))
    }

    /// Drop the cache so the next read hits the store.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_core::types::OutcomeLabel;

    fn sample(label: OutcomeLabel, reliability: u32, rest: u32) -> OutcomeSample {
        OutcomeSample {
            label,
            dimensions: DimensionScores {
                reliability,
                viability: rest,
                identity: rest,
                capability: rest,
                behavior: rest,
            },
        }
    }

    fn scenario_samples(positives: usize, negatives: usize) -> Vec<OutcomeSample> {
        let mut samples = Vec::new();
        for _ in 0..positives {
            samples.push(sample(OutcomeLabel::SuccessfulTx, 90, 50));
        }
        for _ in 0..negatives {
            samples.push(sample(OutcomeLabel::FraudReport, 20, 50));
        }
        samples
    }

    #[test]
    fn test_requires_minimum_samples() {
        let config = AdaptiveConfig::default();
        let samples = scenario_samples(30, 10);
        assert!(compute_weights(&samples, &DimensionWeights::DEFAULT, &config).is_none());
    }

    #[test]
    fn test_requires_minimum_negatives() {
        let config = AdaptiveConfig::default();
        let samples = scenario_samples(60, 3);
        assert!(compute_weights(&samples, &DimensionWeights::DEFAULT, &config).is_none());
    }

    #[test]
    fn test_discriminating_dimension_gains_weight() {
        let config = AdaptiveConfig::default();
        // 45 positives with high reliability, 10 negatives with low
        let samples = scenario_samples(45, 10);
        let learning =
            compute_weights(&samples, &DimensionWeights::DEFAULT, &config).expect("enough samples");

        assert!(learning.weights.reliability > DimensionWeights::DEFAULT.reliability);
        assert!((learning.weights.sum() - 1.0).abs() < SUM_TOLERANCE);
        assert_eq!(learning.sample_size, 55);
        assert_eq!(learning.positive_count, 45);
        assert_eq!(learning.negative_count, 10);

        // Drift bound holds for every dimension
        for dimension in Dimension::ALL {
            let drift =
                (learning.weights.get(dimension) - DimensionWeights::DEFAULT.get(dimension)).abs();
            assert!(drift <= config.max_total_drift + 1e-9, "{dimension:?}");
        }
    }

    #[test]
    fn test_shift_per_run_is_bounded() {
        let config = AdaptiveConfig::default();
        let samples = scenario_samples(45, 10);
        let learning =
            compute_weights(&samples, &DimensionWeights::DEFAULT, &config).unwrap();
        // Raw shift is capped at 0.02 before renormalization; after it the
        // reliability weight cannot exceed 0.32 (and lands just under)
        assert!(learning.weights.reliability <= 0.32);
    }

    #[test]
    fn test_drift_accumulates_to_cap_only() {
        let config = AdaptiveConfig::default();
        let samples = scenario_samples(45, 10);
        let mut current = DimensionWeights::DEFAULT;
        // Ten runs on the same evidence keep drift inside the band
        for _ in 0..10 {
            current = compute_weights(&samples, &current, &config)
                .unwrap()
                .weights;
        }
        assert!(current.reliability - DimensionWeights::DEFAULT.reliability <= config.max_total_drift + 1e-6);
        assert!((current.sum() - 1.0).abs() < SUM_TOLERANCE);
    }

    #[test]
    fn test_weights_validation() {
        assert!(DimensionWeights::DEFAULT.is_valid());

        let bad_sum = DimensionWeights {
            reliability: 0.9,
            ..DimensionWeights::DEFAULT
        };
        assert!(!bad_sum.is_valid());

        let negative = DimensionWeights {
            reliability: -0.1,
            viability: 0.65,
            ..DimensionWeights::DEFAULT
        };
        assert!(!negative.is_valid());
    }

    #[test]
    fn test_composite_with_default_weights() {
        let dims = DimensionScores {
            reliability: 100,
            viability: 100,
            identity: 100,
            capability: 100,
            behavior: 100,
        };
        let composite = DimensionWeights::DEFAULT.composite(&dims);
        assert!((composite - 100.0).abs() < 1e-9);

        let mixed = DimensionScores {
            reliability: 80,
            viability: 60,
            identity: 40,
            capability: 20,
            behavior: 50,
        };
        // 24 + 15 + 8 + 2 + 7.5
        let composite = DimensionWeights::DEFAULT.composite(&mixed);
        assert!((composite - 56.5).abs() < 1e-9);
    }
}
