/// Subscore functions for the fit classifier.
///
/// Each function is pure and returns a value in [0, 100] together with the
/// factor contributions that produced it, so the ledger can replay the
/// decision.
use crate::domain::{College, Factor, FactorImportance, ProfileSnapshot};
use crate::fit::types::*;
use chrono::{DateTime, Utc};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Credit in [0, 1] for a student metric against a college distribution.
///
/// Full credit at or above the median. Below the median, partial credit
/// decays linearly and tops out at `PARTIAL_CREDIT_FACTOR`; zero below the
/// floor `median − FLOOR_MULTIPLIER × (median − p25)`.
pub fn percentile_credit(student: f64, p25: Option<f64>, p50: f64, default_spread: f64) -> f64 {
    if student >= p50 {
        return 1.0;
    }
    let spread = match p25 {
        Some(p25) if p25 < p50 => p50 - p25,
        _ => default_spread,
    };
    let floor = p50 - FLOOR_MULTIPLIER * spread;
    if student <= floor {
        return 0.0;
    }
    PARTIAL_CREDIT_FACTOR * (student - floor) / (p50 - floor)
}

// ============================================================================
// ACADEMIC SUBSCORE
// ============================================================================

/// Piecewise-linear mapping of (GPA, test score) against the college's
/// published medians. Components present are averaged; with neither student
/// metric the caller fails PROFILE_INCOMPLETE before getting here.
pub fn academic_subscore(snapshot: &ProfileSnapshot, college: &College) -> SubscoreBreakdown {
    let mut components: Vec<f64> = Vec::new();
    let mut factors = Vec::new();

    let academic = &snapshot.profile.academic;

    if let (Some(gpa), Some(gpa50)) = (academic.gpa(), college.gpa_percentiles.p50) {
        let credit = percentile_credit(gpa, college.gpa_percentiles.p25, gpa50, DEFAULT_GPA_SPREAD);
        components.push(credit);
        factors.push(Factor::new(
            "gpa_vs_median",
            1.0,
            credit * 100.0,
            format!("gpa {:.2} vs median {:.2}", gpa, gpa50),
        ));
    } else if academic.gpa().is_some() {
        factors.push(Factor::new("gpa_vs_median", 0.0, 0.0, "missing"));
    }

    if let (Some(sat), Some(sat50)) = (academic.sat_total, college.test_percentiles.sat50) {
        let credit = percentile_credit(
            sat as f64,
            college.test_percentiles.sat25.map(f64::from),
            sat50 as f64,
            DEFAULT_SAT_SPREAD,
        );
        components.push(credit);
        factors.push(Factor::new(
            "sat_vs_median",
            1.0,
            credit * 100.0,
            format!("sat {} vs median {}", sat, sat50),
        ));
    } else if let (Some(act), Some(act50)) = (academic.act_composite, college.test_percentiles.act50())
    {
        let credit = percentile_credit(
            act as f64,
            college.test_percentiles.act25.map(f64::from),
            act50 as f64,
            DEFAULT_ACT_SPREAD,
        );
        components.push(credit);
        factors.push(Factor::new(
            "act_vs_median",
            1.0,
            credit * 100.0,
            format!("act {} vs median {}", act, act50),
        ));
    } else if academic.has_test_score() {
        factors.push(Factor::new("test_vs_median", 0.0, 0.0, "missing"));
    }

    if components.is_empty() {
        return SubscoreBreakdown::neutral("academic");
    }

    let value = components.iter().sum::<f64>() / components.len() as f64 * 100.0;
    SubscoreBreakdown { value, factors }
}

// ============================================================================
// PROFILE SUBSCORE
// ============================================================================

/// Weighted activity tiers plus course rigor and leadership, scaled by the
/// college's CDS factor importances (×1.2 for very_important, capped 100).
pub fn profile_subscore(snapshot: &ProfileSnapshot, college: &College) -> SubscoreBreakdown {
    let mut factors = Vec::new();

    let tier_points: f64 = snapshot
        .activities
        .iter()
        .map(|a| match a.tier.as_u8() {
            1 => TIER1_POINTS,
            2 => TIER2_POINTS,
            3 => TIER3_POINTS,
            _ => TIER4_POINTS,
        })
        .sum();

    let mut activity_component = tier_points * ACTIVITY_SCALE;
    if college.cds.extracurricular == FactorImportance::VeryImportant {
        activity_component *= CDS_BOOST;
    }
    factors.push(Factor::new(
        "activities",
        1.0,
        activity_component.min(100.0),
        format!(
            "{} activities, {:.0} tier points",
            snapshot.activities.len(),
            tier_points
        ),
    ));

    let rigor_count = snapshot.rigorous_course_count().min(RIGOR_COURSE_CAP);
    let mut rigor_component = rigor_count as f64 * RIGOR_POINTS_PER_COURSE;
    if college.cds.rigor == FactorImportance::VeryImportant {
        rigor_component *= CDS_BOOST;
    }
    if snapshot.coursework.is_empty() {
        factors.push(Factor::new("course_rigor", 0.0, 0.0, "missing"));
    } else {
        factors.push(Factor::new(
            "course_rigor",
            1.0,
            rigor_component,
            format!("{} AP/IB courses", snapshot.rigorous_course_count()),
        ));
    }

    let leadership_component = snapshot.leadership_count() as f64 * LEADERSHIP_POINTS;
    if leadership_component > 0.0 {
        factors.push(Factor::new(
            "leadership",
            1.0,
            leadership_component,
            format!("{} leadership roles", snapshot.leadership_count()),
        ));
    }

    let value = (activity_component + rigor_component + leadership_component).min(100.0);
    SubscoreBreakdown { value, factors }
}

// ============================================================================
// FINANCIAL SUBSCORE
// ============================================================================

/// Budget fit: 1 − clamp((cost − budget) / budget, 0, 1), scaled to 100.
/// Meets-full-need or need-blind colleges raise the floor to 15.
pub fn financial_subscore(snapshot: &ProfileSnapshot, college: &College) -> SubscoreBreakdown {
    let budget = snapshot.profile.preferences.budget_max;
    let cost = college.cost_of_attendance;

    let mut breakdown = match (budget, cost) {
        (Some(budget), Some(cost)) if budget > 0.0 => {
            let overage = ((cost - budget) / budget).clamp(0.0, 1.0);
            let value = (1.0 - overage) * 100.0;
            SubscoreBreakdown {
                value,
                factors: vec![Factor::new(
                    "budget_fit",
                    1.0,
                    value,
                    format!("cost {:.0} vs budget {:.0}", cost, budget),
                )],
            }
        }
        _ => SubscoreBreakdown::neutral("budget_fit"),
    };

    if college.meets_full_need || college.need_blind {
        breakdown.value = breakdown.value.max(FINANCIAL_AID_FLOOR);
        breakdown.factors.push(Factor::new(
            "financial_aid",
            1.0,
            FINANCIAL_AID_FLOOR,
            if college.need_blind {
                "need-blind admissions"
            } else {
                "meets full demonstrated need"
            },
        ));
    }

    breakdown
}

// ============================================================================
// TIMELINE SUBSCORE
// ============================================================================

/// Buffer against the earliest upcoming deadline: 100 at ≥ 50% slack over
/// the estimated hours, decaying linearly to 0 at no slack.
pub fn timeline_subscore(
    deadline: Option<DateTime<Utc>>,
    required_hours: f64,
    now: DateTime<Utc>,
    productive_hours_per_day: f64,
) -> SubscoreBreakdown {
    let deadline = match deadline {
        Some(d) => d,
        None => return SubscoreBreakdown::neutral("timeline"),
    };

    if required_hours <= 0.0 {
        return SubscoreBreakdown {
            value: 100.0,
            factors: vec![Factor::new("timeline", 1.0, 100.0, "no remaining work")],
        };
    }

    let hours_to_deadline = (deadline - now).num_minutes() as f64 / 60.0;
    let available = (hours_to_deadline / 24.0 * productive_hours_per_day).max(0.0);
    let buffer_ratio = (available - required_hours) / required_hours;
    let value = (buffer_ratio / TIMELINE_FULL_BUFFER_RATIO).clamp(0.0, 1.0) * 100.0;

    SubscoreBreakdown {
        value,
        factors: vec![Factor::new(
            "timeline",
            1.0,
            value,
            format!(
                "{:.1}h available vs {:.1}h required",
                available, required_hours
            ),
        )],
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{college_flagship, snapshot_strong};
    use chrono::Duration;

    #[test]
    fn test_percentile_credit_at_or_above_median() {
        assert_eq!(percentile_credit(3.8, Some(3.4), 3.7, DEFAULT_GPA_SPREAD), 1.0);
        assert_eq!(percentile_credit(3.7, Some(3.4), 3.7, DEFAULT_GPA_SPREAD), 1.0);
    }

    #[test]
    fn test_percentile_credit_below_floor_is_zero() {
        // floor = 3.7 - 1.5 * 0.3 = 3.25
        assert_eq!(percentile_credit(3.2, Some(3.4), 3.7, DEFAULT_GPA_SPREAD), 0.0);
    }

    #[test]
    fn test_percentile_credit_partial_between_floor_and_median() {
        // floor = 3.25, span = 0.45; at 3.4 → 0.7 * (0.15 / 0.45) ≈ 0.233
        let credit = percentile_credit(3.4, Some(3.4), 3.7, DEFAULT_GPA_SPREAD);
        assert!((credit - 0.2333).abs() < 0.001);
        // Partial credit never reaches full points below the median
        let near = percentile_credit(3.69, Some(3.4), 3.7, DEFAULT_GPA_SPREAD);
        assert!(near < PARTIAL_CREDIT_FACTOR);
    }

    #[test]
    fn test_percentile_credit_uses_default_spread_without_p25() {
        // floor = 4.0 - 1.5 * 0.2 = 3.7; at 3.95 → 0.7 * 0.25/0.3 ≈ 0.583
        let credit = percentile_credit(3.95, None, 4.0, DEFAULT_GPA_SPREAD);
        assert!((credit - 0.5833).abs() < 0.001);
    }

    #[test]
    fn test_academic_subscore_strong_profile_at_accessible_college() {
        let snapshot = snapshot_strong();
        let college = college_flagship();
        let breakdown = academic_subscore(&snapshot, &college);
        assert!(breakdown.value >= 90.0);
        assert_eq!(breakdown.factors.len(), 2);
    }

    #[test]
    fn test_financial_subscore_within_budget_is_full() {
        let snapshot = snapshot_strong(); // budget 60k
        let mut college = college_flagship();
        college.cost_of_attendance = Some(40_000.0);
        assert_eq!(financial_subscore(&snapshot, &college).value, 100.0);
    }

    #[test]
    fn test_financial_subscore_over_budget_decays() {
        let snapshot = snapshot_strong();
        let mut college = college_flagship();
        college.cost_of_attendance = Some(90_000.0); // 50% over 60k
        let breakdown = financial_subscore(&snapshot, &college);
        assert!((breakdown.value - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_financial_subscore_aid_floor() {
        let snapshot = snapshot_strong();
        let mut college = college_flagship();
        college.cost_of_attendance = Some(200_000.0);
        college.meets_full_need = true;
        assert_eq!(financial_subscore(&snapshot, &college).value, FINANCIAL_AID_FLOOR);
    }

    #[test]
    fn test_timeline_subscore_no_deadline_is_neutral() {
        let now = Utc::now();
        let breakdown = timeline_subscore(None, 20.0, now, 4.0);
        assert_eq!(breakdown.value, NEUTRAL_SUBSCORE);
        assert_eq!(breakdown.factors[0].evidence, "missing");
    }

    #[test]
    fn test_timeline_subscore_ample_buffer_is_full() {
        let now = Utc::now();
        // 30 days × 4h = 120h available vs 20h required → ratio 5.0
        let breakdown = timeline_subscore(Some(now + Duration::days(30)), 20.0, now, 4.0);
        assert_eq!(breakdown.value, 100.0);
    }

    #[test]
    fn test_timeline_subscore_no_slack_is_zero() {
        let now = Utc::now();
        // 5 days × 4h = 20h available vs 20h required → ratio 0.0
        let breakdown = timeline_subscore(Some(now + Duration::days(5)), 20.0, now, 4.0);
        assert!(breakdown.value < 0.001);
    }

    #[test]
    fn test_timeline_subscore_past_deadline_is_zero() {
        let now = Utc::now();
        let breakdown = timeline_subscore(Some(now - Duration::days(1)), 5.0, now, 4.0);
        assert_eq!(breakdown.value, 0.0);
    }

    #[test]
    fn test_timeline_subscore_no_work_is_full() {
        let now = Utc::now();
        let breakdown = timeline_subscore(Some(now + Duration::days(1)), 0.0, now, 4.0);
        assert_eq!(breakdown.value, 100.0);
    }
}
