/// Types and tuning constants for the chancing calculator.
use crate::domain::{ActivityTier, ChanceCategory, Factor, Region};

// ============================================================================
// CONSTANTS
// ============================================================================

// Default (US/holistic) formula bumps.
pub const GPA_ABOVE_P75_BONUS: f64 = 20.0;
pub const GPA_ABOVE_P50_BONUS: f64 = 10.0;
pub const GPA_BELOW_P25_PENALTY: f64 = -15.0;
pub const TEST_ABOVE_P75_BONUS: f64 = 20.0;
pub const TEST_ABOVE_P50_BONUS: f64 = 10.0;
pub const TEST_BELOW_P25_PENALTY: f64 = -15.0;

pub const TIER1_CHANCE_POINTS: f64 = 4.0;
pub const TIER2_CHANCE_POINTS: f64 = 2.0;
pub const ACTIVITY_BONUS_CAP: f64 = 15.0;

pub const RIGOR_BONUS_5: f64 = 5.0;
pub const RIGOR_BONUS_8: f64 = 8.0;

pub const FIRST_GEN_BONUS: f64 = 3.0;
pub const LEGACY_BONUS: f64 = 5.0;
pub const IN_STATE_BONUS: f64 = 5.0;

// US category bands.
pub const US_SAFETY_MIN: f64 = 60.0;
pub const US_TARGET_MIN: f64 = 30.0;

// Regional formulas (JEE / UK / Germany) ride on offer or cutoff systems,
// which are more predictable; their bands sit higher.
pub const REGIONAL_SAFETY_MIN: f64 = 70.0;
pub const REGIONAL_TARGET_MIN: f64 = 40.0;

// India/JEE bracket shape.
pub const JEE_STRONG_FRACTION: f64 = 0.6;
pub const JEE_STRONG_BASE: f64 = 85.0;
pub const JEE_STRONG_SPAN: f64 = 10.0;
pub const JEE_AT_CLOSING: f64 = 50.0;
pub const JEE_PAST_CLOSING_FLOOR: f64 = 5.0;
pub const BOARD_PERCENTAGE_BONUS: f64 = 3.0;
pub const BOARD_PERCENTAGE_MIN: f64 = 90.0;

// UK offer-match shape.
pub const UK_BASE: f64 = 50.0;
pub const UK_POINTS_PER_ALEVEL_GRADE: f64 = 12.0;
pub const UK_POINTS_PER_IB_POINT: f64 = 4.0;
pub const UK_OPEN_SELECTIVITY_BONUS: f64 = 10.0;
pub const UK_TIGHT_SELECTIVITY_PENALTY: f64 = -10.0;
pub const UK_OPEN_ACCEPTANCE: f64 = 0.5;
pub const UK_TIGHT_ACCEPTANCE: f64 = 0.2;

// Germany Abitur/NC shape (lower grades are better, 1.0 best).
pub const DE_BASE: f64 = 50.0;
pub const DE_POINTS_PER_GRADE: f64 = 40.0;
pub const DE_UNRESTRICTED_CHANCE: f64 = 85.0;

// ============================================================================
// TYPES
// ============================================================================

/// Raw output of one region formula, before clamping and rounding.
#[derive(Debug, Clone)]
pub struct ChanceComputation {
    pub chance_percent: f64,
    pub category: ChanceCategory,
    pub region: Region,
    pub factors: Vec<Factor>,
}

/// Half-away-from-zero rounding to one decimal, used for display and for
/// the persisted value so identical inputs stay byte-identical.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Category bands for the US/holistic formula.
pub fn us_category(chance: f64) -> ChanceCategory {
    if chance >= US_SAFETY_MIN {
        ChanceCategory::Safety
    } else if chance >= US_TARGET_MIN {
        ChanceCategory::Target
    } else {
        ChanceCategory::Reach
    }
}

/// Category bands for the regional (offer/cutoff) formulas.
pub fn regional_category(chance: f64) -> ChanceCategory {
    if chance >= REGIONAL_SAFETY_MIN {
        ChanceCategory::Safety
    } else if chance >= REGIONAL_TARGET_MIN {
        ChanceCategory::Target
    } else {
        ChanceCategory::Reach
    }
}

/// Hypothetical profile edits for what-if analysis. Applied to a cloned
/// snapshot; nothing is persisted.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ProposedChanges {
    pub gpa_unweighted: Option<f64>,
    pub gpa_weighted: Option<f64>,
    pub sat_total: Option<i32>,
    pub act_composite: Option<i32>,
    pub jee_advanced_rank: Option<i64>,
    pub predicted_a_levels: Option<String>,
    pub ib_predicted: Option<i32>,
    pub abitur_grade: Option<f64>,
    /// Extra AP/IB courses to assume.
    pub additional_rigorous_courses: u8,
    /// Extra activities to assume, by tier.
    pub additional_activities: Vec<ActivityTier>,
}

impl ProposedChanges {
    pub fn is_empty(&self) -> bool {
        self.gpa_unweighted.is_none()
            && self.gpa_weighted.is_none()
            && self.sat_total.is_none()
            && self.act_composite.is_none()
            && self.jee_advanced_rank.is_none()
            && self.predicted_a_levels.is_none()
            && self.ib_predicted.is_none()
            && self.abitur_grade.is_none()
            && self.additional_rigorous_courses == 0
            && self.additional_activities.is_empty()
    }
}

/// Per-college outcome of a what-if scenario.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScenarioDiff {
    pub college_id: i64,
    pub old_chance: f64,
    pub new_chance: f64,
    pub change: f64,
    pub category_changed: bool,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ScenarioSummary {
    pub improved: u32,
    pub decreased: u32,
    pub avg_change: f64,
}

/// Per-college outcome of a history comparison.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChanceDelta {
    pub college_id: i64,
    pub previous: f64,
    pub current: f64,
    pub change: f64,
    pub category_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1_half_away_from_zero() {
        assert_eq!(round1(4.25), 4.3);
        assert_eq!(round1(4.24), 4.2);
        assert_eq!(round1(-4.25), -4.3);
        assert_eq!(round1(0.05), 0.1);
    }

    #[test]
    fn test_us_category_bands() {
        assert_eq!(us_category(60.0), ChanceCategory::Safety);
        assert_eq!(us_category(59.9), ChanceCategory::Target);
        assert_eq!(us_category(30.0), ChanceCategory::Target);
        assert_eq!(us_category(29.9), ChanceCategory::Reach);
    }

    #[test]
    fn test_regional_category_bands() {
        assert_eq!(regional_category(70.0), ChanceCategory::Safety);
        assert_eq!(regional_category(64.6), ChanceCategory::Target);
        assert_eq!(regional_category(39.9), ChanceCategory::Reach);
    }
}
