/// Default (US/holistic) chance formula.
///
/// Base = acceptanceRate × 100, adjusted by GPA and test-score position
/// against the college's percentiles, activity tiers, course rigor, and
/// CDS-gated demographic bumps. The caller clamps the result.
use crate::chancing::types::*;
use crate::domain::{ActivityTier, College, Factor, ProfileSnapshot, Region};

/// Bump for a metric against a (p25, p50, p75) distribution.
fn percentile_bump(
    value: f64,
    p25: Option<f64>,
    p50: Option<f64>,
    p75: Option<f64>,
    above_p75: f64,
    above_p50: f64,
    below_p25: f64,
) -> f64 {
    if let Some(p75) = p75 {
        if value >= p75 {
            return above_p75;
        }
    }
    if let Some(p50) = p50 {
        if value >= p50 {
            return above_p50;
        }
    }
    if let Some(p25) = p25 {
        if value < p25 {
            return below_p25;
        }
    }
    0.0
}

pub fn compute(snapshot: &ProfileSnapshot, college: &College) -> ChanceComputation {
    let mut factors = Vec::new();
    let academic = &snapshot.profile.academic;

    let base = college.acceptance_rate * 100.0;
    factors.push(Factor::new(
        "base_rate",
        1.0,
        base,
        format!("acceptance rate {:.1}%", base),
    ));
    let mut chance = base;

    // GPA position.
    if let Some(gpa) = academic.gpa() {
        let bump = percentile_bump(
            gpa,
            college.gpa_percentiles.p25,
            college.gpa_percentiles.p50,
            college.gpa_percentiles.p75,
            GPA_ABOVE_P75_BONUS,
            GPA_ABOVE_P50_BONUS,
            GPA_BELOW_P25_PENALTY,
        );
        if bump != 0.0 {
            chance += bump;
            factors.push(Factor::new(
                "gpa_position",
                1.0,
                bump,
                format!("gpa {:.2}", gpa),
            ));
        }
    }

    // Test-score position; ACT stands in when the SAT is absent.
    let tests = &college.test_percentiles;
    let test_bump = if let Some(sat) = academic.sat_total {
        Some((
            percentile_bump(
                sat as f64,
                tests.sat25.map(f64::from),
                tests.sat50.map(f64::from),
                tests.sat75.map(f64::from),
                TEST_ABOVE_P75_BONUS,
                TEST_ABOVE_P50_BONUS,
                TEST_BELOW_P25_PENALTY,
            ),
            format!("sat {}", sat),
        ))
    } else {
        academic.act_composite.map(|act| {
            (
                percentile_bump(
                    act as f64,
                    tests.act25.map(f64::from),
                    tests.act50().map(f64::from),
                    tests.act75.map(f64::from),
                    TEST_ABOVE_P75_BONUS,
                    TEST_ABOVE_P50_BONUS,
                    TEST_BELOW_P25_PENALTY,
                ),
                format!("act {}", act),
            )
        })
    };
    if let Some((bump, evidence)) = test_bump {
        if bump != 0.0 {
            chance += bump;
            factors.push(Factor::new("test_position", 1.0, bump, evidence));
        }
    }

    // Activity tiers, capped.
    let tier1 = snapshot.activity_tier_count(ActivityTier::Tier1) as f64;
    let tier2 = snapshot.activity_tier_count(ActivityTier::Tier2) as f64;
    let activity_bump =
        (tier1 * TIER1_CHANCE_POINTS + tier2 * TIER2_CHANCE_POINTS).min(ACTIVITY_BONUS_CAP);
    if activity_bump > 0.0 {
        chance += activity_bump;
        factors.push(Factor::new(
            "activities",
            1.0,
            activity_bump,
            format!("{:.0} tier-1, {:.0} tier-2", tier1, tier2),
        ));
    }

    // Course rigor.
    let rigorous = snapshot.rigorous_course_count();
    let rigor_bump = if rigorous >= 8 {
        RIGOR_BONUS_8
    } else if rigorous >= 5 {
        RIGOR_BONUS_5
    } else {
        0.0
    };
    if rigor_bump > 0.0 {
        chance += rigor_bump;
        factors.push(Factor::new(
            "course_rigor",
            1.0,
            rigor_bump,
            format!("{} AP/IB courses", rigorous),
        ));
    }

    // Demographic bumps apply only when the college says it considers them.
    let demo = &snapshot.profile.demographics;
    if demo.is_first_gen && college.cds.first_generation.at_least_considered() {
        chance += FIRST_GEN_BONUS;
        factors.push(Factor::new(
            "first_generation",
            1.0,
            FIRST_GEN_BONUS,
            "first-generation applicant",
        ));
    }
    if demo.is_legacy && college.cds.legacy.at_least_considered() {
        chance += LEGACY_BONUS;
        factors.push(Factor::new("legacy", 1.0, LEGACY_BONUS, "legacy applicant"));
    }
    let in_state = match (demo.state.as_deref(), college.state.as_deref()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if in_state && college.is_public && college.cds.residency.at_least_considered() {
        chance += IN_STATE_BONUS;
        factors.push(Factor::new(
            "in_state",
            1.0,
            IN_STATE_BONUS,
            "in-state applicant at public college",
        ));
    }

    ChanceComputation {
        chance_percent: chance,
        category: us_category(chance),
        region: Region::Us,
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChanceCategory;
    use crate::testing::fixtures::{college_flagship, college_ivy, snapshot_strong, snapshot_weak};

    #[test]
    fn test_unrealistic_profile_at_selective_college() {
        // gpa 2.8 / sat 1050 below both p25s at a 4% college → ≤ 5, Reach.
        let snapshot = snapshot_weak();
        let mut college = college_ivy();
        college.acceptance_rate = 0.04;
        college.gpa_percentiles.p25 = Some(3.8);
        college.test_percentiles.sat25 = Some(1450);

        let result = compute(&snapshot, &college);
        assert!(result.chance_percent <= 5.0, "{}", result.chance_percent);
        assert_eq!(result.category, ChanceCategory::Reach);
    }

    #[test]
    fn test_strong_profile_at_accessible_college() {
        let snapshot = snapshot_strong();
        let college = college_flagship();
        let result = compute(&snapshot, &college);
        // base 55 + gpa above p75 + sat above p75 + activities
        assert!(result.chance_percent > 60.0);
        assert_eq!(result.category, ChanceCategory::Safety);
    }

    #[test]
    fn test_act_used_when_sat_absent() {
        let mut snapshot = snapshot_strong();
        snapshot.profile.academic.sat_total = None;
        snapshot.profile.academic.act_composite = Some(35);
        let college = college_flagship();
        let result = compute(&snapshot, &college);
        assert!(result
            .factors
            .iter()
            .any(|f| f.name == "test_position" && f.evidence.starts_with("act")));
    }

    #[test]
    fn test_demographic_bumps_gated_on_cds() {
        let mut snapshot = snapshot_strong();
        snapshot.profile.demographics.is_first_gen = true;
        let mut college = college_flagship();
        college.cds.first_generation = crate::domain::FactorImportance::NotConsidered;

        let without = compute(&snapshot, &college);
        college.cds.first_generation = crate::domain::FactorImportance::Considered;
        let with = compute(&snapshot, &college);

        assert_eq!(
            with.chance_percent - without.chance_percent,
            FIRST_GEN_BONUS
        );
    }

    #[test]
    fn test_activity_bonus_capped() {
        let mut snapshot = snapshot_strong();
        // 6 tier-1 activities would be worth 24 uncapped.
        for _ in 0..5 {
            let mut extra = snapshot.activities[0].clone();
            extra.id += 100;
            snapshot.activities.push(extra);
        }
        let college = college_flagship();
        let result = compute(&snapshot, &college);
        let activity_factor = result
            .factors
            .iter()
            .find(|f| f.name == "activities")
            .unwrap();
        assert_eq!(activity_factor.contribution, ACTIVITY_BONUS_CAP);
    }
}
