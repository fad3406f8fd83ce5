//! Region-dispatched, deterministic admission-chance calculator.
//!
//! Not statistical: an interpretable composite that seed tests can pin
//! exactly. Same (profile, college) inputs yield byte-identical results.

pub mod default_us;
pub mod germany;
pub mod india;
pub mod region;
pub mod types;
pub mod uk;

pub use region::dispatch;
pub use types::{
    round1, ChanceComputation, ChanceDelta, ProposedChanges, ScenarioDiff, ScenarioSummary,
};

use crate::config::ChancingConfig;
use crate::domain::{College, ProfileSnapshot, Region};

/// Run the one region formula that applies, clamp to the configured range,
/// and round to one decimal (half away from zero).
pub fn calculate(
    snapshot: &ProfileSnapshot,
    college: &College,
    config: &ChancingConfig,
) -> ChanceComputation {
    let region = dispatch(college, &snapshot.profile.regional);
    let mut computation = match region {
        Region::India => india::compute(snapshot, college),
        Region::Uk => uk::compute(snapshot, college),
        Region::Germany => germany::compute(snapshot, college),
        Region::Us | Region::Eu => default_us::compute(snapshot, college),
    };

    computation.chance_percent = round1(
        computation
            .chance_percent
            .clamp(config.clamp_min, config.clamp_max),
    );
    computation
}

/// Apply hypothetical profile edits to a cloned snapshot. Pure; the stored
/// snapshot is untouched.
pub fn apply_changes(snapshot: &ProfileSnapshot, changes: &ProposedChanges) -> ProfileSnapshot {
    let mut scenario = snapshot.clone();
    let academic = &mut scenario.profile.academic;
    if let Some(gpa) = changes.gpa_unweighted {
        academic.gpa_unweighted = Some(gpa);
    }
    if let Some(gpa) = changes.gpa_weighted {
        academic.gpa_weighted = Some(gpa);
    }
    if let Some(sat) = changes.sat_total {
        academic.sat_total = Some(sat);
    }
    if let Some(act) = changes.act_composite {
        academic.act_composite = Some(act);
    }

    let regional = &mut scenario.profile.regional;
    if let Some(rank) = changes.jee_advanced_rank {
        regional.jee_advanced_rank = Some(rank);
    }
    if let Some(ref grades) = changes.predicted_a_levels {
        regional.predicted_a_levels = Some(grades.clone());
    }
    if let Some(ib) = changes.ib_predicted {
        regional.ib_predicted = Some(ib);
    }
    if let Some(abitur) = changes.abitur_grade {
        regional.abitur_grade = Some(abitur);
    }

    for i in 0..changes.additional_rigorous_courses {
        scenario.coursework.push(crate::domain::Coursework {
            id: -(i as i64) - 1,
            profile_id: scenario.profile.id,
            name: format!("Hypothetical AP course {}", i + 1),
            level: crate::domain::CourseLevel::Ap,
            final_grade: None,
            exam_score: None,
        });
    }
    for (i, tier) in changes.additional_activities.iter().enumerate() {
        scenario.activities.push(crate::domain::Activity {
            id: -(i as i64) - 1,
            profile_id: scenario.profile.id,
            name: format!("Hypothetical activity {}", i + 1),
            description: None,
            tier: *tier,
            hours_per_week: 0.0,
            weeks_per_year: 0.0,
            years_participated: 0.0,
            is_leadership: false,
        });
    }

    scenario
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActivityTier;
    use crate::testing::fixtures::{college_iit, college_ivy, snapshot_jee, snapshot_strong};

    #[test]
    fn test_calculate_clamps_into_range() {
        // Deeply unqualified default-formula case clamps at the bottom.
        let mut snapshot = snapshot_strong();
        snapshot.profile.academic.gpa_unweighted = Some(2.0);
        snapshot.profile.academic.sat_total = Some(900);
        snapshot.activities.clear();
        let mut college = college_ivy();
        college.acceptance_rate = 0.04;
        college.gpa_percentiles.p25 = Some(3.8);
        college.test_percentiles.sat25 = Some(1450);

        let config = ChancingConfig::default();
        let result = calculate(&snapshot, &college, &config);
        assert_eq!(result.chance_percent, 0.5);
    }

    #[test]
    fn test_calculate_dispatches_exactly_one_region() {
        let config = ChancingConfig::default();
        let result = calculate(&snapshot_jee(2500), &college_iit(), &config);
        assert_eq!(result.region, Region::India);
        // No default-formula factors leak into a regional result.
        assert!(result.factors.iter().all(|f| f.name != "gpa_position"));
    }

    #[test]
    fn test_calculate_is_deterministic() {
        let config = ChancingConfig::default();
        let snapshot = snapshot_strong();
        let college = college_ivy();
        let a = calculate(&snapshot, &college, &config);
        let b = calculate(&snapshot, &college, &config);
        assert_eq!(a.chance_percent, b.chance_percent);
        assert_eq!(a.factors, b.factors);
    }

    proptest::proptest! {
        /// Invariant: chancePercent stays inside [0.5, 99.5] for any
        /// academic profile against any acceptance rate.
        #[test]
        fn prop_chance_percent_always_clamped(
            gpa in 0.0f64..5.0,
            sat in 400i32..1600,
            rate in 0.0f64..1.0,
            tier1 in 0usize..6,
        ) {
            let mut snapshot = snapshot_strong();
            snapshot.profile.academic.gpa_unweighted = Some(gpa);
            snapshot.profile.academic.sat_total = Some(sat);
            snapshot.activities.truncate(tier1.min(snapshot.activities.len()));

            let mut college = college_ivy();
            college.acceptance_rate = rate;

            let config = ChancingConfig::default();
            let result = calculate(&snapshot, &college, &config);
            proptest::prop_assert!(result.chance_percent >= 0.5);
            proptest::prop_assert!(result.chance_percent <= 99.5);
        }
    }

    #[test]
    fn test_apply_changes_does_not_mutate_original() {
        let snapshot = snapshot_strong();
        let original_gpa = snapshot.profile.academic.gpa_unweighted;
        let changes = ProposedChanges {
            gpa_unweighted: Some(4.0),
            additional_activities: vec![ActivityTier::Tier1],
            ..Default::default()
        };

        let scenario = apply_changes(&snapshot, &changes);
        assert_eq!(scenario.profile.academic.gpa_unweighted, Some(4.0));
        assert_eq!(scenario.activities.len(), snapshot.activities.len() + 1);
        // Original untouched.
        assert_eq!(snapshot.profile.academic.gpa_unweighted, original_gpa);
    }
}
