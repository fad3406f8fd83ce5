/// Core types and tuning constants for the fit classifier.
use crate::domain::{Factor, FitCategory, FitWeights, Subscores};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Activity tier points (tier 1 national .. tier 4 participation).
pub const TIER1_POINTS: f64 = 15.0;
pub const TIER2_POINTS: f64 = 8.0;
pub const TIER3_POINTS: f64 = 3.0;
pub const TIER4_POINTS: f64 = 1.0;

/// Scale applied to summed tier points before capping at 100.
pub const ACTIVITY_SCALE: f64 = 3.0;

/// Rigor credit: points per AP/IB course, capped at this many courses.
pub const RIGOR_POINTS_PER_COURSE: f64 = 5.0;
pub const RIGOR_COURSE_CAP: usize = 5;

pub const LEADERSHIP_POINTS: f64 = 3.0;

/// Multiplier for subcomponents the college marks "very_important".
pub const CDS_BOOST: f64 = 1.2;

/// Fallback when an optional signal is absent.
pub const NEUTRAL_SUBSCORE: f64 = 50.0;

/// Assumed quartile spreads when a college publishes only the median.
pub const DEFAULT_GPA_SPREAD: f64 = 0.2;
pub const DEFAULT_SAT_SPREAD: f64 = 80.0;
pub const DEFAULT_ACT_SPREAD: f64 = 3.0;

/// Below-median credit tops out at this fraction of full points.
pub const PARTIAL_CREDIT_FACTOR: f64 = 0.7;

/// Zero floor sits at median − FLOOR_MULTIPLIER × (median − p25).
pub const FLOOR_MULTIPLIER: f64 = 1.5;

/// Aid-generous colleges (meets-full-need / need-blind) raise the
/// financial floor to this value.
pub const FINANCIAL_AID_FLOOR: f64 = 15.0;

/// Timeline is full credit at a buffer of 50% of required hours.
pub const TIMELINE_FULL_BUFFER_RATIO: f64 = 0.5;

// Category thresholds. Ties resolve toward the more conservative label:
// the higher label requires BOTH conditions.
pub const SAFETY_MIN_SCORE: f64 = 80.0;
pub const SAFETY_MIN_ACCEPTANCE: f64 = 0.40;
pub const TARGET_MIN_SCORE: f64 = 60.0;
pub const TARGET_MIN_ACCEPTANCE: f64 = 0.20;
pub const REACH_MIN_SCORE: f64 = 40.0;

/// Number of confidence signals; confidence = 1 − missing / SIGNAL_COUNT.
pub const SIGNAL_COUNT: usize = 6;

/// Confidence below this attaches a LOW_CONFIDENCE warning.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.4;

pub const LOW_CONFIDENCE_WARNING: &str = "LOW_CONFIDENCE";

// ============================================================================
// TYPES
// ============================================================================

/// One computed subscore with its factor trail.
#[derive(Debug, Clone)]
pub struct SubscoreBreakdown {
    /// Value in [0, 100].
    pub value: f64,
    pub factors: Vec<Factor>,
}

impl SubscoreBreakdown {
    pub fn neutral(name: &str) -> Self {
        Self {
            value: NEUTRAL_SUBSCORE,
            factors: vec![Factor::new(name, 0.0, 0.0, "missing")],
        }
    }
}

/// Full output of a fit computation, before caching.
#[derive(Debug, Clone)]
pub struct FitComputation {
    pub overall_score: f64,
    pub category: FitCategory,
    pub subscores: Subscores,
    pub weights: FitWeights,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub factors: Vec<Factor>,
}
