//! End-to-end tests over the full stack: real SQLite databases, the
//! service graph wired by AppState, a fixed clock.

use chrono::{Duration, TimeZone, Utc};
use compass_api::api::AppState;
use compass_core::domain::*;
use compass_core::{Clock, CollegeStore, EngineConfig, FixedClock};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

async fn memory_pool(migrator: &sqlx::migrate::Migrator) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    migrator.run(&pool).await.expect("migrations");
    pool
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

async fn build_state() -> AppState {
    let catalog = memory_pool(&compass_storage::catalog::MIGRATOR).await;
    let user = memory_pool(&compass_storage::user::MIGRATOR).await;
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(now()));
    AppState::build_with_clock(catalog, user, EngineConfig::default(), clock)
}

fn strong_profile(user_id: i64) -> (Profile, Vec<Activity>, Vec<Coursework>) {
    let profile = Profile {
        id: 0,
        user_id,
        academic: AcademicMetrics {
            gpa_unweighted: Some(3.95),
            sat_total: Some(1520),
            ..Default::default()
        },
        regional: RegionalMetrics::default(),
        preferences: Preferences {
            budget_max: Some(60_000.0),
            ..Default::default()
        },
        demographics: Demographics {
            country: Some("US".to_string()),
            ..Default::default()
        },
        completeness: 0.0,
        updated_at: now(),
    };
    let activities = vec![
        Activity {
            id: 0,
            profile_id: 0,
            name: "National robotics team".to_string(),
            description: None,
            tier: ActivityTier::Tier1,
            hours_per_week: 10.0,
            weeks_per_year: 40.0,
            years_participated: 3.0,
            is_leadership: false,
        },
        Activity {
            id: 0,
            profile_id: 0,
            name: "State debate".to_string(),
            description: None,
            tier: ActivityTier::Tier2,
            hours_per_week: 5.0,
            weeks_per_year: 30.0,
            years_participated: 2.0,
            is_leadership: false,
        },
        Activity {
            id: 0,
            profile_id: 0,
            name: "Regional orchestra".to_string(),
            description: None,
            tier: ActivityTier::Tier2,
            hours_per_week: 4.0,
            weeks_per_year: 30.0,
            years_participated: 2.0,
            is_leadership: false,
        },
    ];
    (profile, activities, vec![])
}

fn college_base(name: &str, country: &str, acceptance_rate: f64) -> College {
    College {
        id: 0,
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

/// A strong profile at an accessible flagship lands in the safety band.
#[tokio::test]
async fn test_safety_classification_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("State Flagship", "US", 0.55);
    college.gpa_percentiles.p50 = Some(3.7);
    college.gpa_percentiles.p25 = Some(3.4);
    college.test_percentiles.sat50 = Some(1380);
    college.test_percentiles.sat25 = Some(1270);
    college.cost_of_attendance = Some(38_000.0);
    let college = state.colleges.upsert_college(college).await.unwrap();

    let (profile, activities, coursework) = strong_profile(100);
    let (profile, _snapshot_id) = state
        .save_profile(profile, activities, coursework)
        .await
        .unwrap();

    let fit = state.classify_fit(profile.id, college.id).await.unwrap();
    assert_eq!(fit.category, "safety");
    assert!(fit.overall_score >= 80.0, "overall {}", fit.overall_score);
    assert!(fit.academic >= 90.0);

    // Ledger completeness: the decision is recoverable via explain.
    let trace = state.explain(100, college.id).await.unwrap();
    assert!(trace.fit.is_some());
    assert!(!trace.lines.is_empty());
}

/// A 2.8 GPA / 1050 SAT applicant at a 4% college gets a floor-level
/// chance and a Reach label.
#[tokio::test]
async fn test_unrealistic_chancing_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("Elite College", "US", 0.04);
    college.gpa_percentiles.p25 = Some(3.8);
    college.test_percentiles.sat25 = Some(1450);
    let college = state.colleges.upsert_college(college).await.unwrap();

    let weak = Profile {
        id: 0,
        user_id: 200,
        academic: AcademicMetrics {
            gpa_unweighted: Some(2.8),
            sat_total: Some(1050),
            ..Default::default()
        },
        regional: RegionalMetrics::default(),
        preferences: Preferences::default(),
        demographics: Demographics::default(),
        completeness: 0.0,
        updated_at: now(),
    };
    let (profile, _) = state.save_profile(weak, vec![], vec![]).await.unwrap();

    let chance = state
        .calculate_chance(profile.id, college.id)
        .await
        .unwrap();
    assert!(chance.chance_percent <= 5.0, "{}", chance.chance_percent);
    assert!(chance.chance_percent >= 0.5);
    assert_eq!(chance.category, "Reach");
}

/// A JEE rank inside the closing cutoff routes through the India formula
/// and lands in the Target band.
#[tokio::test]
async fn test_jee_dispatch_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("IIT", "India", 0.02);
    college.jee_cutoffs = Some(JeeCutoffs {
        general: Some(JeeCutoff {
            opening_rank: 100,
            closing_rank: 3000,
        }),
        ..Default::default()
    });
    let college = state.colleges.upsert_college(college).await.unwrap();

    let jee = Profile {
        id: 0,
        user_id: 300,
        academic: AcademicMetrics::default(),
        regional: RegionalMetrics {
            jee_advanced_rank: Some(2500),
            ..Default::default()
        },
        preferences: Preferences::default(),
        demographics: Demographics {
            country: Some("India".to_string()),
            ..Default::default()
        },
        completeness: 0.0,
        updated_at: now(),
    };
    let (profile, _) = state.save_profile(jee, vec![], vec![]).await.unwrap();

    let chance = state
        .calculate_chance(profile.id, college.id)
        .await
        .unwrap();
    assert_eq!(chance.region, "India");
    assert!(chance.chance_percent >= 60.0, "{}", chance.chance_percent);
    assert_eq!(chance.category, "Target");
}

/// Decomposition emits the canonical task set and the final submission
/// hard-blocks on everything else.
#[tokio::test]
async fn test_task_decomposition_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("Essay School", "US", 0.30);
    college.requirements = RequirementProfile {
        test_policy: TestPolicy::TestBlind,
        common_app_essay_required: true,
        supplemental_essays_count: 3,
        teacher_recommendations_required: 2,
        counselor_recommendation_required: true,
        toefl_min: Some(100),
        ..Default::default()
    };
    college.deadlines.regular = Some(now() + Duration::days(120));
    let college = state.colleges.upsert_college(college).await.unwrap();

    // International applicant, so the TOEFL task applies.
    let mut profile = strong_profile(400).0;
    profile.demographics.country = Some("India".to_string());
    state.save_profile(profile, vec![], vec![]).await.unwrap();

    let tasks = state.decompose_tasks(400, college.id, None).await.unwrap();
    assert_eq!(tasks.len(), 10);

    let submit = tasks
        .iter()
        .find(|t| t.title == "Submit final application")
        .unwrap();
    assert_eq!(submit.status, "blocked");

    // Idempotency: decomposing again returns the same set.
    let again = state.decompose_tasks(400, college.id, None).await.unwrap();
    assert_eq!(again.len(), tasks.len());
    assert_eq!(again[0].id, tasks[0].id);

    // Completing everything else unblocks the submission.
    let mut unblocked_submit = false;
    for task in &tasks {
        if task.id == submit.id {
            continue;
        }
        let (_updated, unblocked) = state
            .update_task_status(task.id, TaskStatus::Complete, None)
            .await
            .unwrap();
        if unblocked.iter().any(|t| t.id == submit.id) {
            unblocked_submit = true;
        }
    }
    assert!(unblocked_submit);

    let blocked = state.get_blocked_tasks(400, Some(college.id)).await.unwrap();
    assert!(blocked.is_empty());

    let path = state
        .get_critical_path(400, college.id)
        .await
        .unwrap()
        .unwrap();
    // Only the submission remains open.
    assert!((path.total_hours - 1.0).abs() < 1e-9);
}

/// With 48h to the deadline and 20h of open work the application is
/// impossible; the college is flagged and the overview carries the alert.
#[tokio::test]
async fn test_deadline_risk_impossible_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("Portfolio School", "US", 0.40);
    college.requirements = RequirementProfile {
        test_policy: TestPolicy::TestBlind,
        portfolio_required: true,
        ..Default::default()
    };
    // form 3h + portfolio 20h + final 1h = 24h of work, 48h on the clock.
    college.deadlines.regular = Some(now() + Duration::hours(48));
    let college = state.colleges.upsert_college(college).await.unwrap();

    let (profile, activities, coursework) = strong_profile(500);
    state
        .save_profile(profile, activities, coursework)
        .await
        .unwrap();
    state.decompose_tasks(500, college.id, None).await.unwrap();

    let risk = state.calculate_risk(500, college.id).await.unwrap();
    assert_eq!(risk.risk_level, "impossible");
    // H_available = 48/24 × 4 = 8h against 24h of work.
    assert!((risk.buffer_hours - (8.0 - 24.0)).abs() < 1e-6);

    let impossible = state.flag_impossible_colleges(500).await.unwrap();
    assert_eq!(impossible, vec![college.id]);

    let overview = state.get_risk_overview(500).await.unwrap();
    assert_eq!(overview.impossible_count, 1);
    assert!(overview
        .alerts
        .iter()
        .any(|alert| alert.level == "impossible"));
}

/// Profile rewrites invalidate cached decisions before returning.
#[tokio::test]
async fn test_profile_rewrite_invalidates_caches() {
    let state = build_state().await;

    let mut college = college_base("State Flagship", "US", 0.55);
    college.gpa_percentiles.p50 = Some(3.7);
    college.test_percentiles.sat50 = Some(1380);
    let college = state.colleges.upsert_college(college).await.unwrap();

    let (profile, activities, coursework) = strong_profile(600);
    let (stored, first_snapshot) = state
        .save_profile(profile, activities.clone(), coursework.clone())
        .await
        .unwrap();

    let first = state.classify_fit(stored.id, college.id).await.unwrap();

    // Rewrite with a lower GPA: new snapshot, caches dropped.
    let mut weaker = stored.clone();
    weaker.academic.gpa_unweighted = Some(3.0);
    weaker.academic.sat_total = Some(1150);
    let (_stored, second_snapshot) = state
        .save_profile(weaker, activities, coursework)
        .await
        .unwrap();
    assert_ne!(first_snapshot, second_snapshot);

    let second = state.classify_fit(stored.id, college.id).await.unwrap();
    assert!(
        second.overall_score < first.overall_score,
        "{} vs {}",
        second.overall_score,
        first.overall_score
    );
}

/// Weights follow the user override and reject invalid sums end-to-end.
#[tokio::test]
async fn test_user_weights_end_to_end() {
    let state = build_state().await;

    let err = state
        .set_user_weights(
            700,
            FitWeights {
                academic: 0.9,
                profile: 0.4,
                financial: 0.1,
                timeline: 0.1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::InvalidWeights { .. })
    ));

    state
        .set_user_weights(
            700,
            FitWeights {
                academic: 0.7,
                profile: 0.1,
                financial: 0.1,
                timeline: 0.1,
            },
        )
        .await
        .unwrap();
}

/// Manual override shadows the computed category; clearing restores it.
#[tokio::test]
async fn test_override_lifecycle_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("State Flagship", "US", 0.55);
    college.gpa_percentiles.p50 = Some(3.7);
    college.test_percentiles.sat50 = Some(1380);
    let college = state.colleges.upsert_college(college).await.unwrap();

    let (profile, activities, coursework) = strong_profile(800);
    let (stored, _) = state
        .save_profile(profile, activities, coursework)
        .await
        .unwrap();

    let computed = state.classify_fit(stored.id, college.id).await.unwrap();
    assert_eq!(computed.category, "safety");

    let overridden = state
        .override_fit(800, college.id, FitCategory::Reach, Some("gut feel".to_string()))
        .await
        .unwrap();
    assert_eq!(overridden.category, "reach");
    assert!(overridden.is_manual_override);

    // Subsequent reads keep the override.
    let read_back = state.classify_fit(stored.id, college.id).await.unwrap();
    assert_eq!(read_back.category, "reach");

    assert!(state.clear_fit_override(800, college.id).await.unwrap());
    let restored = state.classify_fit(stored.id, college.id).await.unwrap();
    assert_eq!(restored.category, "safety");
    assert!(!restored.is_manual_override);
}

/// Chance history feeds compare; scenario analysis persists nothing.
#[tokio::test]
async fn test_chance_history_and_scenario_end_to_end() {
    let state = build_state().await;

    let mut college = college_base("Reach College", "US", 0.10);
    college.gpa_percentiles = GpaPercentiles {
        p25: Some(3.6),
        p50: Some(3.85),
        p75: Some(3.97),
    };
    college.test_percentiles.sat25 = Some(1400);
    college.test_percentiles.sat50 = Some(1500);
    college.test_percentiles.sat75 = Some(1560);
    let college = state.colleges.upsert_college(college).await.unwrap();

    let (profile, activities, coursework) = strong_profile(900);
    let (stored, _) = state
        .save_profile(profile, activities, coursework)
        .await
        .unwrap();

    // An application so compare() has a college list.
    state.decompose_tasks(900, college.id, None).await.unwrap();

    let first = state
        .calculate_chance(stored.id, college.id)
        .await
        .unwrap();
    state
        .save_chance_history(
            900,
            college.id,
            first.chance_percent - 6.0,
            ChanceCategory::Target,
            vec![],
        )
        .await
        .unwrap();
    state
        .save_chance_history(
            900,
            college.id,
            first.chance_percent,
            ChanceCategory::Target,
            vec![],
        )
        .await
        .unwrap();

    let comparison = state.compare_chances(900).await.unwrap();
    assert_eq!(comparison.deltas.len(), 1);
    assert!((comparison.deltas[0].change - 6.0).abs() < 0.11);

    // Scenario: a perfect SAT should help and must not touch the cache.
    let outcome = state
        .calculate_chance_scenario(
            stored.id,
            compass_core::ProposedChanges {
                sat_total: Some(1600),
                ..Default::default()
            },
            vec![college.id],
        )
        .await
        .unwrap();
    assert_eq!(outcome.diffs.len(), 1);
    assert!(outcome.diffs[0].new_chance >= outcome.diffs[0].old_chance);

    let cached = state
        .calculate_chance(stored.id, college.id)
        .await
        .unwrap();
    assert_eq!(cached.chance_percent, first.chance_percent);
}
