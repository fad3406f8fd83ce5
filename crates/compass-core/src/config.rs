//! Engine configuration. Constructed once at boot and threaded through
//! services; there is no global mutable state.

use crate::domain::FitWeights;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Default fit weights, overridable per user.
    pub default_weights: FitWeights,
    /// FitResult cache TTL in days.
    pub cache_ttl_days: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_weights: FitWeights::default(),
            cache_ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChancingConfig {
    pub clamp_min: f64,
    pub clamp_max: f64,
}

impl Default for ChancingConfig {
    fn default() -> Self {
        Self {
            clamp_min: 0.5,
            clamp_max: 99.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Study hours available per calendar day.
    pub productive_hours_per_day: f64,
    /// Buffer-ratio floor for the safe level.
    pub safe_threshold: f64,
    /// Buffer-ratio floor for the tight level.
    pub tight_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            productive_hours_per_day: 4.0,
            safe_threshold: 0.5,
            tight_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max colleges refreshed per monthly run.
    pub monthly_refresh_batch: usize,
    /// Colleges rescraped per quarterly run.
    pub quarterly_refresh_batch: usize,
    /// Minimum delay between external fetches, in milliseconds.
    pub request_delay_ms: u64,
    /// Per-URL fetch timeout, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Consecutive failures before a college is queued for manual review.
    pub max_consecutive_failures: u32,
    /// Staleness cutoff for the quarterly rescrape, in days.
    pub stale_after_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monthly_refresh_batch: 50,
            quarterly_refresh_batch: 20,
            request_delay_ms: 3000,
            fetch_timeout_ms: 10_000,
            max_consecutive_failures: 3,
            stale_after_days: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Hard cap on colleges per batch operation; excess is truncated.
    pub max_colleges: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_colleges: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Minimum samples before a college model may be trained.
    pub min_samples: i64,
    /// Required sample growth since the last trained version (fraction).
    pub growth_threshold: f64,
    /// A new version deploys only if accuracy >= previous - this tolerance.
    pub regression_tolerance: f64,
    /// Deployed models below this accuracy are not used as a chance overlay.
    pub overlay_accuracy_threshold: f64,
    /// Overlay adjustment clamp, in percentage points.
    pub max_adjustment_pp: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            growth_threshold: 0.20,
            regression_tolerance: 0.05,
            overlay_accuracy_threshold: 0.60,
            max_adjustment_pp: 5.0,
        }
    }
}

/// Per-operation time budgets (milliseconds), enforced at the facade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub single_ms: u64,
    pub batch_ms: u64,
    pub scenario_ms: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            single_ms: 5_000,
            batch_ms: 30_000,
            scenario_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub chancing: ChancingConfig,
    pub risk: RiskConfig,
    pub scheduler: SchedulerConfig,
    pub batch: BatchConfig,
    pub training: TrainingConfig,
    pub budgets: BudgetConfig,
}

impl EngineConfig {
    /// Validate cross-field constraints.
    pub fn validate(&self) -> bool {
        self.scoring.default_weights.validate()
            && self.chancing.clamp_min < self.chancing.clamp_max
            && self.risk.productive_hours_per_day > 0.0
            && self.risk.safe_threshold > self.risk.tight_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate());
        assert_eq!(config.batch.max_colleges, 50);
        assert_eq!(config.scheduler.monthly_refresh_batch, 50);
        assert_eq!(config.scheduler.quarterly_refresh_batch, 20);
        assert_eq!(config.scheduler.request_delay_ms, 3000);
        assert_eq!(config.training.min_samples, 30);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ScoringConfig::default().default_weights;
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }

    proptest::proptest! {
        /// Invariant: a four-tuple of weights validates exactly when its
        /// sum lands within 1.0 +/- 0.01.
        #[test]
        fn prop_weights_validate_iff_sum_near_one(
            academic in 0.0f64..1.5,
            profile in 0.0f64..1.5,
            financial in 0.0f64..1.5,
            timeline in 0.0f64..1.5,
        ) {
            let weights = FitWeights { academic, profile, financial, timeline };
            let expected = (weights.sum() - 1.0).abs() <= 0.01;
            proptest::prop_assert_eq!(weights.validate(), expected);
        }
    }
}
