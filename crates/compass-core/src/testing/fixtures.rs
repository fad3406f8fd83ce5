//! Reusable test fixtures: canonical profiles, colleges, and task graphs.
//!
//! Provides pre-built test data to avoid duplication across test files.

use crate::domain::*;
use crate::tasks::TaskGraph;
use chrono::{TimeZone, Utc};

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

// ============================================================================
// Profile Fixtures
// ============================================================================

fn base_profile(id: i64, user_id: i64) -> Profile {
    Profile {
        id,
        user_id,
        academic: AcademicMetrics::default(),
        regional: RegionalMetrics::default(),
        preferences: Preferences::default(),
        demographics: Demographics {
            country: Some("US".to_string()),
            ..Default::default()
        },
        completeness: 0.0,
        updated_at: fixed_time(),
    }
}

fn snapshot_of(profile: Profile, activities: Vec<Activity>, coursework: Vec<Coursework>) -> ProfileSnapshot {
    ProfileSnapshot {
        id: profile.id * 10,
        profile_id: profile.id,
        user_id: profile.user_id,
        taken_at: fixed_time(),
        profile,
        activities,
        coursework,
    }
}

pub fn activity(id: i64, tier: ActivityTier, is_leadership: bool) -> Activity {
    Activity {
        id,
        profile_id: 1,
        name: format!("Activity {}", id),
        description: None,
        tier,
        hours_per_week: 5.0,
        weeks_per_year: 30.0,
        years_participated: 2.0,
        is_leadership,
    }
}

/// Strong US applicant: 3.95 GPA, 1520 SAT, one tier-1 and two tier-2
/// activities, 60k budget.
pub fn snapshot_strong() -> ProfileSnapshot {
    let mut profile = base_profile(1, 100);
    profile.academic.gpa_unweighted = Some(3.95);
    profile.academic.sat_total = Some(1520);
    profile.preferences.budget_max = Some(60_000.0);

    snapshot_of(
        profile,
        vec![
            activity(1, ActivityTier::Tier1, false),
            activity(2, ActivityTier::Tier2, false),
            activity(3, ActivityTier::Tier2, false),
        ],
        vec![],
    )
}

/// Weak US applicant: 2.8 GPA, 1050 SAT, no activities.
pub fn snapshot_weak() -> ProfileSnapshot {
    let mut profile = base_profile(2, 200);
    profile.academic.gpa_unweighted = Some(2.8);
    profile.academic.sat_total = Some(1050);
    snapshot_of(profile, vec![], vec![])
}

/// Profile with neither GPA nor test score.
pub fn snapshot_empty_academics() -> ProfileSnapshot {
    snapshot_of(base_profile(3, 300), vec![], vec![])
}

/// Indian applicant with a JEE Advanced rank.
pub fn snapshot_jee(rank: i64) -> ProfileSnapshot {
    let mut profile = base_profile(4, 400);
    profile.demographics.country = Some("India".to_string());
    profile.regional.jee_advanced_rank = Some(rank);
    snapshot_of(profile, vec![], vec![])
}

/// UK applicant with predicted A-levels.
pub fn snapshot_uk(predicted: &str) -> ProfileSnapshot {
    let mut profile = base_profile(5, 500);
    profile.demographics.country = Some("UK".to_string());
    profile.regional.predicted_a_levels = Some(predicted.to_string());
    snapshot_of(profile, vec![], vec![])
}

/// German applicant with an Abitur grade.
pub fn snapshot_abitur(grade: f64) -> ProfileSnapshot {
    let mut profile = base_profile(6, 600);
    profile.demographics.country = Some("Germany".to_string());
    profile.regional.abitur_grade = Some(grade);
    snapshot_of(profile, vec![], vec![])
}

// ============================================================================
// College Fixtures
// ============================================================================

fn base_college(id: i64, name: &str, country: &str, acceptance_rate: f64) -> College {
    College {
        id,
        name: name.to_string(),
        country: country.to_string(),
        state: None,
        acceptance_rate,
        test_percentiles: TestScorePercentiles::default(),
        gpa_percentiles: GpaPercentiles::default(),
        cost_of_attendance: None,
        meets_full_need: false,
        need_blind: false,
        is_public: false,
        majors: vec![],
        ranking: None,
        cds: CdsFactors::default(),
        deadlines: CollegeDeadlines::default(),
        requirements: RequirementProfile::default(),
        jee_cutoffs: None,
        typical_offer: None,
        ib_typical_offer: None,
        nc_cutoff: None,
        last_scraped: None,
        scraping_failures: 0,
        needs_manual_review: false,
    }
}

/// Accessible state flagship: 55% acceptance, 3.7 / 1380 medians.
pub fn college_flagship() -> College {
    let mut college = base_college(10, "State Flagship University", "US", 0.55);
    college.state = Some("OH".to_string());
    college.is_public = true;
    college.gpa_percentiles = GpaPercentiles {
        p25: Some(3.4),
        p50: Some(3.7),
        p75: Some(3.9),
    };
    college.test_percentiles = TestScorePercentiles {
        sat25: Some(1270),
        sat50: Some(1380),
        sat75: Some(1460),
        act25: Some(26),
        act75: Some(32),
    };
    college.cost_of_attendance = Some(38_000.0);
    college
}

/// Highly selective private: 5% acceptance, 4.0 / 1550 medians.
pub fn college_ivy() -> College {
    let mut college = base_college(11, "Ivy College", "US", 0.05);
    college.gpa_percentiles = GpaPercentiles {
        p25: Some(3.8),
        p50: Some(4.0),
        p75: None,
    };
    college.test_percentiles = TestScorePercentiles {
        sat25: Some(1480),
        sat50: Some(1550),
        sat75: Some(1580),
        act25: Some(33),
        act75: Some(36),
    };
    college.cost_of_attendance = Some(85_000.0);
    college.meets_full_need = true;
    college
}

/// Indian institute with a general-category closing rank of 3000.
pub fn college_iit() -> College {
    let mut college = base_college(12, "Indian Institute of Technology", "India", 0.02);
    college.jee_cutoffs = Some(JeeCutoffs {
        general: Some(JeeCutoff {
            opening_rank: 100,
            closing_rank: 3000,
        }),
        obc: Some(JeeCutoff {
            opening_rank: 200,
            closing_rank: 5000,
        }),
        sc: None,
        st: None,
    });
    college
}

/// UK university with the given typical offer and acceptance rate.
pub fn college_uk(offer: &str, acceptance_rate: f64) -> College {
    let mut college = base_college(13, "UK University", "UK", acceptance_rate);
    college.typical_offer = Some(offer.to_string());
    college
}

/// German university with an optional NC cutoff.
pub fn college_german(nc_cutoff: Option<f64>) -> College {
    let mut college = base_college(14, "German University", "Germany", 0.30);
    college.nc_cutoff = nc_cutoff;
    college
}

// ============================================================================
// Task Fixtures
// ============================================================================

/// Minimal task with the given id and status; callers adjust fields.
pub fn task_with(id: i64, status: TaskStatus) -> Task {
    Task {
        id,
        application_id: 1,
        user_id: 100,
        college_id: 10,
        title: format!("Task {}", id),
        task_type: TaskType::Other,
        canonical_kind: CanonicalTaskKind::MainForm,
        ordinal: 0,
        status,
        estimated_hours: 1.0,
        deadline: None,
        priority: 2,
        is_reusable: false,
        reuse_template_id: None,
        content_ready: false,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

pub fn task_graph_from(tasks: Vec<Task>, dependencies: Vec<TaskDependency>) -> TaskGraph {
    TaskGraph::new(tasks, dependencies)
}
