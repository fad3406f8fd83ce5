/// Fit classification: weighted subscores → overall score → category.
///
/// Not a probability. An expressive composite designed to rank and
/// categorize colleges consistently for one student.
use crate::domain::{
    College, DomainError, FitCategory, FitWeights, ProfileSnapshot, Subscores,
};
use crate::fit::subscores::{
    academic_subscore, financial_subscore, profile_subscore, timeline_subscore,
};
use crate::fit::types::*;
use chrono::{DateTime, Utc};

/// Resolve the category from the overall score and the college's
/// acceptance rate. The higher label requires both conditions, so ties
/// fall toward the more conservative choice.
pub fn categorize(overall_score: f64, acceptance_rate: f64) -> FitCategory {
    if overall_score >= SAFETY_MIN_SCORE && acceptance_rate >= SAFETY_MIN_ACCEPTANCE {
        FitCategory::Safety
    } else if overall_score >= TARGET_MIN_SCORE && acceptance_rate >= TARGET_MIN_ACCEPTANCE {
        FitCategory::Target
    } else if overall_score >= REACH_MIN_SCORE {
        FitCategory::Reach
    } else {
        FitCategory::Unrealistic
    }
}

/// Count the confidence signals present for a (snapshot, college) pair.
/// The six signals: student GPA, student test score, any activities,
/// college GPA median, college test median, cost of attendance.
pub fn missing_signal_count(snapshot: &ProfileSnapshot, college: &College) -> usize {
    let present = [
        snapshot.profile.academic.has_gpa(),
        snapshot.profile.academic.has_test_score(),
        !snapshot.activities.is_empty(),
        college.gpa_percentiles.p50.is_some(),
        college.test_percentiles.sat50.is_some() || college.test_percentiles.act50().is_some(),
        college.cost_of_attendance.is_some(),
    ];
    present.iter().filter(|p| !**p).count()
}

/// Fields the caller must populate before fit can be classified.
pub fn missing_required_fields(snapshot: &ProfileSnapshot) -> Vec<String> {
    let mut missing = Vec::new();
    if !snapshot.profile.academic.has_gpa() {
        missing.push("gpa".to_string());
    }
    if !snapshot.profile.academic.has_test_score() {
        missing.push("test_score".to_string());
    }
    missing
}

/// Classify fit for a (snapshot, college) pair.
///
/// `task_estimate_hours` is the remaining-work estimate feeding the
/// timeline subscore (from existing tasks, or the decomposition template
/// when no application exists yet).
///
/// Fails with `ProfileIncomplete` when the profile has neither a GPA nor a
/// test score; any single missing optional signal degrades to a neutral
/// subscore instead.
pub fn classify(
    snapshot: &ProfileSnapshot,
    college: &College,
    weights: FitWeights,
    task_estimate_hours: Option<f64>,
    now: DateTime<Utc>,
    productive_hours_per_day: f64,
) -> Result<FitComputation, DomainError> {
    let missing = missing_required_fields(snapshot);
    if missing.len() == 2 {
        return Err(DomainError::ProfileIncomplete { missing });
    }

    let academic = academic_subscore(snapshot, college);
    let profile = profile_subscore(snapshot, college);
    let financial = financial_subscore(snapshot, college);
    let timeline = timeline_subscore(
        college.deadlines.earliest_upcoming(now),
        task_estimate_hours.unwrap_or(0.0),
        now,
        productive_hours_per_day,
    );

    let subscores = Subscores {
        academic: academic.value,
        profile: profile.value,
        financial: financial.value,
        timeline: timeline.value,
    };

    let overall_score = weights.academic * subscores.academic
        + weights.profile * subscores.profile
        + weights.financial * subscores.financial
        + weights.timeline * subscores.timeline;

    let category = categorize(overall_score, college.acceptance_rate);

    let missing_signals = missing_signal_count(snapshot, college);
    let confidence = 1.0 - missing_signals as f64 / SIGNAL_COUNT as f64;

    let mut warnings = Vec::new();
    if confidence < LOW_CONFIDENCE_THRESHOLD {
        warnings.push(LOW_CONFIDENCE_WARNING.to_string());
    }

    // Factor trail: weighted per-subscore contributions, then the raw
    // evidence from each subscore.
    let mut factors = Vec::new();
    for (name, weight, breakdown) in [
        ("academic", weights.academic, &academic),
        ("profile", weights.profile, &profile),
        ("financial", weights.financial, &financial),
        ("timeline", weights.timeline, &timeline),
    ] {
        factors.push(crate::domain::Factor::new(
            name,
            weight,
            weight * breakdown.value,
            format!("subscore {:.1}", breakdown.value),
        ));
        factors.extend(breakdown.factors.iter().cloned());
    }

    Ok(FitComputation {
        overall_score,
        category,
        subscores,
        weights,
        confidence,
        warnings,
        factors,
    })
}

// ============================================================================
// TESTS
// ============================================================================
