/// Unit tests for the user-database repositories.
///
/// Tests cover:
/// - profile save-with-snapshot atomicity and readback
/// - application uniqueness and task-graph insertion
/// - the atomic status update (history + unblocking)
/// - the decision caches (including the computed_at compare-and-swap)
/// - overrides, chance history ordering, and alert dedup lookups
use super::application_repository::SqliteApplicationStore;
use super::decision_repository::SqliteDecisionStore;
use super::profile_repository::SqliteProfileStore;
use chrono::{Duration, TimeZone, Utc};
use compass_core::domain::*;
use compass_core::ports::{ApplicationStore, DecisionStore, ProfileStore};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// In-memory database; one connection so every query sees the same DB.
async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::migrate!("./migrations_user")
        .run(&pool)
        .await
        .expect("Failed to run user migrations");
    pool
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

fn sample_profile(user_id: i64) -> Profile {
    Profile {
        id: 0,
        user_id,
        academic: AcademicMetrics {
            gpa_unweighted: Some(3.9),
            sat_total: Some(1480),
            ..Default::default()
        },
        regional: RegionalMetrics::default(),
        preferences: Preferences {
            intended_majors: vec!["CS".to_string()],
            budget_max: Some(50_000.0),
            ..Default::default()
        },
        demographics: Demographics {
            country: Some("US".to_string()),
            ..Default::default()
        },
        completeness: 0.0,
        updated_at: now(),
    }
}

fn sample_activity(name: &str, tier: ActivityTier) -> Activity {
    Activity {
        id: 0,
        profile_id: 0,
        name: name.to_string(),
        description: None,
        tier,
        hours_per_week: 6.0,
        weeks_per_year: 30.0,
        years_participated: 2.0,
        is_leadership: false,
    }
}

fn sample_task(application_id: i64, user_id: i64, college_id: i64, title: &str) -> Task {
    Task {
        id: 0,
        application_id,
        user_id,
        college_id,
        title: title.to_string(),
        task_type: TaskType::Essay,
        canonical_kind: CanonicalTaskKind::MainEssay,
        ordinal: 0,
        status: TaskStatus::NotStarted,
        estimated_hours: 5.0,
        deadline: None,
        priority: 2,
        is_reusable: false,
        reuse_template_id: None,
        content_ready: false,
        created_at: now(),
        updated_at: now(),
    }
}

// ============================================================================
// Profile repository
// ============================================================================

#[tokio::test]
async fn test_save_profile_with_snapshot_roundtrip() {
    let store = SqliteProfileStore::new(create_test_pool().await);

    let (profile, snapshot) = store
        .save_profile_with_snapshot(
            sample_profile(100),
            vec![sample_activity("Robotics", ActivityTier::Tier1)],
            vec![],
            now(),
        )
        .await
        .unwrap();

    assert!(profile.id > 0);
    assert!(snapshot.id > 0);
    assert_eq!(snapshot.activities.len(), 1);
    assert!(snapshot.activities[0].id > 0);

    let loaded = store.get_profile_by_user(100).await.unwrap().unwrap();
    assert_eq!(loaded.id, profile.id);
    assert_eq!(loaded.academic.sat_total, Some(1480));
    assert_eq!(loaded.preferences.intended_majors, vec!["CS".to_string()]);

    let latest = store.latest_snapshot(100).await.unwrap().unwrap();
    assert_eq!(latest.id, snapshot.id);
    assert_eq!(latest.profile.academic.gpa_unweighted, Some(3.9));
}

#[tokio::test]
async fn test_second_save_replaces_activities_and_snapshots_again() {
    let store = SqliteProfileStore::new(create_test_pool().await);

    store
        .save_profile_with_snapshot(
            sample_profile(100),
            vec![sample_activity("Robotics", ActivityTier::Tier1)],
            vec![],
            now(),
        )
        .await
        .unwrap();

    let (profile, second_snapshot) = store
        .save_profile_with_snapshot(
            sample_profile(100),
            vec![
                sample_activity("Robotics", ActivityTier::Tier1),
                sample_activity("Debate", ActivityTier::Tier2),
            ],
            vec![],
            now() + Duration::hours(1),
        )
        .await
        .unwrap();

    let activities = store.get_activities(profile.id).await.unwrap();
    assert_eq!(activities.len(), 2);

    let latest = store.latest_snapshot(100).await.unwrap().unwrap();
    assert_eq!(latest.id, second_snapshot.id);
    assert_eq!(latest.activities.len(), 2);
}

#[tokio::test]
async fn test_user_weights_upsert() {
    let store = SqliteProfileStore::new(create_test_pool().await);

    assert!(store.get_user_weights(100).await.unwrap().is_none());

    let weights = FitWeights {
        academic: 0.5,
        profile: 0.3,
        financial: 0.1,
        timeline: 0.1,
    };
    store.set_user_weights(100, weights).await.unwrap();
    let loaded = store.get_user_weights(100).await.unwrap().unwrap();
    assert!((loaded.academic - 0.5).abs() < 1e-9);

    store
        .set_user_weights(
            100,
            FitWeights {
                academic: 0.25,
                profile: 0.25,
                financial: 0.25,
                timeline: 0.25,
            },
        )
        .await
        .unwrap();
    let reloaded = store.get_user_weights(100).await.unwrap().unwrap();
    assert!((reloaded.academic - 0.25).abs() < 1e-9);
}

// ============================================================================
// Application repository
// ============================================================================

#[tokio::test]
async fn test_duplicate_application_is_rejected() {
    let store = SqliteApplicationStore::new(create_test_pool().await);

    store
        .create_application(100, 10, ApplicationRound::Regular)
        .await
        .unwrap();
    let err = store
        .create_application(100, 10, ApplicationRound::Regular)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::AlreadyExists(_))
    ));

    // A different round for the same pair is allowed.
    store
        .create_application(100, 10, ApplicationRound::EarlyAction)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_insert_task_graph_wires_dependencies() {
    let store = SqliteApplicationStore::new(create_test_pool().await);
    let application = store
        .create_application(100, 10, ApplicationRound::Regular)
        .await
        .unwrap();

    let mut essay = sample_task(application.id, 100, 10, "Main essay");
    essay.is_reusable = true;
    let mut submit = sample_task(application.id, 100, 10, "Submit final application");
    submit.canonical_kind = CanonicalTaskKind::FinalSubmit;
    submit.status = TaskStatus::Blocked;

    let stored = store
        .insert_task_graph(
            vec![essay, submit],
            vec![(1, 0, DependencyType::Blocks, None)],
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|t| t.id > 0));

    let deps = store.dependencies_for_user(100).await.unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].task_id, stored[1].id);
    assert_eq!(deps[0].depends_on_task_id, stored[0].id);
}

#[tokio::test]
async fn test_update_task_status_atomic_unblocks_and_logs_history() {
    let store = SqliteApplicationStore::new(create_test_pool().await);
    let application = store
        .create_application(100, 10, ApplicationRound::Regular)
        .await
        .unwrap();

    let essay = sample_task(application.id, 100, 10, "Main essay");
    let mut submit = sample_task(application.id, 100, 10, "Submit final application");
    submit.status = TaskStatus::Blocked;
    let stored = store
        .insert_task_graph(
            vec![essay, submit],
            vec![(1, 0, DependencyType::Blocks, None)],
        )
        .await
        .unwrap();
    let (essay_id, submit_id) = (stored[0].id, stored[1].id);

    store
        .update_task_status_atomic(
            essay_id,
            TaskStatus::Complete,
            TaskStatusChange {
                id: 0,
                task_id: essay_id,
                from_status: TaskStatus::NotStarted,
                to_status: TaskStatus::Complete,
                reason: Some("finished".to_string()),
                changed_at: now(),
            },
            vec![submit_id],
            vec![],
        )
        .await
        .unwrap();

    let essay = store.get_task(essay_id).await.unwrap().unwrap();
    assert_eq!(essay.status, TaskStatus::Complete);
    let submit = store.get_task(submit_id).await.unwrap().unwrap();
    assert_eq!(submit.status, TaskStatus::NotStarted);

    let history = store.status_history_for_task(essay_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to_status, TaskStatus::Complete);
    assert_eq!(history[0].reason.as_deref(), Some("finished"));
}

#[tokio::test]
async fn test_find_reuse_template_prefers_earliest_root() {
    let store = SqliteApplicationStore::new(create_test_pool().await);
    let application = store
        .create_application(100, 10, ApplicationRound::Regular)
        .await
        .unwrap();

    let mut first = sample_task(application.id, 100, 10, "Main essay");
    first.is_reusable = true;
    let stored = store.insert_task_graph(vec![first], vec![]).await.unwrap();

    // A derived task pointing at the template must not itself be a template.
    let application2 = store
        .create_application(100, 11, ApplicationRound::Regular)
        .await
        .unwrap();
    let mut derived = sample_task(application2.id, 100, 11, "Main essay");
    derived.is_reusable = true;
    derived.reuse_template_id = Some(stored[0].id);
    store.insert_task_graph(vec![derived], vec![]).await.unwrap();

    let template = store
        .find_reuse_template(100, CanonicalTaskKind::MainEssay, 0)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(template.id, stored[0].id);

    let reusing = store.tasks_reusing(stored[0].id).await.unwrap();
    assert_eq!(reusing.len(), 1);
    assert_eq!(reusing[0].college_id, 11);
}

#[tokio::test]
async fn test_user_deadlines_roundtrip_and_risk_update() {
    let store = SqliteApplicationStore::new(create_test_pool().await);

    let deadline = store
        .insert_user_deadline(UserDeadline {
            id: 0,
            user_id: 100,
            college_id: Some(10),
            application_id: None,
            title: "Regular decision".to_string(),
            deadline_date: now() + Duration::days(60),
            deadline_type: DeadlineType::Official,
            risk_level: RiskLevel::Safe,
            buffer_hours: 0.0,
        })
        .await
        .unwrap();

    store
        .update_deadline_risk(deadline.id, RiskLevel::Critical, -3.5)
        .await
        .unwrap();

    let deadlines = store.deadlines_for_user_college(100, 10).await.unwrap();
    assert_eq!(deadlines.len(), 1);
    assert_eq!(deadlines[0].risk_level, RiskLevel::Critical);
    assert!((deadlines[0].buffer_hours - (-3.5)).abs() < 1e-9);
}

// ============================================================================
// Decision repository
// ============================================================================

fn sample_fit(snapshot_id: i64, college_id: i64, computed_at: chrono::DateTime<Utc>) -> FitResult {
    FitResult {
        profile_snapshot_id: snapshot_id,
        college_id,
        overall_score: 82.5,
        category: FitCategory::Safety,
        subscores: Subscores {
            academic: 95.0,
            profile: 80.0,
            financial: 70.0,
            timeline: 60.0,
        },
        confidence: 0.83,
        warnings: vec![],
        factors: vec![Factor::new("academic", 0.4, 38.0, "subscore 95.0")],
        computed_at,
        expires_at: computed_at + Duration::days(30),
        is_manual_override: false,
    }
}

#[tokio::test]
async fn test_fit_cache_roundtrip_and_cas() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    let newer = sample_fit(1, 10, now());
    store.put_fit(100, newer.clone()).await.unwrap();

    // An older computation must not clobber the newer entry.
    let mut older = sample_fit(1, 10, now() - Duration::hours(5));
    older.overall_score = 10.0;
    store.put_fit(100, older).await.unwrap();

    let loaded = store.get_fit(1, 10).await.unwrap().unwrap();
    assert!((loaded.overall_score - 82.5).abs() < 1e-9);
    assert_eq!(loaded.computed_at, newer.computed_at);

    // A newer computation wins.
    let mut newest = sample_fit(1, 10, now() + Duration::hours(1));
    newest.overall_score = 90.0;
    store.put_fit(100, newest).await.unwrap();
    let loaded = store.get_fit(1, 10).await.unwrap().unwrap();
    assert!((loaded.overall_score - 90.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_fit_cache_invalidation_paths() {
    let store = SqliteDecisionStore::new(create_test_pool().await);
    store.put_fit(100, sample_fit(1, 10, now())).await.unwrap();
    store.put_fit(100, sample_fit(1, 11, now())).await.unwrap();
    store.put_fit(200, sample_fit(2, 10, now())).await.unwrap();

    assert_eq!(store.delete_fits_for_user(100).await.unwrap(), 2);
    assert!(store.get_fit(1, 10).await.unwrap().is_none());
    assert_eq!(store.delete_fits_for_college(10).await.unwrap(), 1);
    assert!(store.get_fit(2, 10).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_fit_keys() {
    let store = SqliteDecisionStore::new(create_test_pool().await);
    // Expires 30 days after computed_at.
    store
        .put_fit(100, sample_fit(1, 10, now() - Duration::days(45)))
        .await
        .unwrap();
    store.put_fit(100, sample_fit(1, 11, now())).await.unwrap();

    let expired = store.expired_fit_keys(now(), 10).await.unwrap();
    assert_eq!(expired, vec![(100, 1, 10)]);

    assert!(store.delete_fit(1, 10).await.unwrap());
    assert!(!store.delete_fit(1, 10).await.unwrap());
}

#[tokio::test]
async fn test_decision_ledger_latest_by_kind() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    for (i, kind) in [DecisionKind::Fit, DecisionKind::Chance, DecisionKind::Fit]
        .into_iter()
        .enumerate()
    {
        store
            .append_decision(DecisionRecord {
                id: 0,
                user_id: 100,
                college_id: 10,
                snapshot_id: 1,
                kind,
                inputs: serde_json::json!({"i": i}),
                weights: serde_json::Value::Null,
                factors: vec![],
                output: serde_json::json!({"score": i}),
                created_at: now() + Duration::minutes(i as i64),
            })
            .await
            .unwrap();
    }

    let latest_fit = store
        .latest_decision(100, 10, DecisionKind::Fit)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest_fit.output["score"], 2);

    let all = store.decisions_for(100, 10, 10).await.unwrap();
    assert_eq!(all.len(), 3);
    // Newest first.
    assert_eq!(all[0].output["score"], 2);
}

#[tokio::test]
async fn test_override_lifecycle() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    store
        .insert_override(Override {
            id: 0,
            user_id: 100,
            entity_type: "fit".to_string(),
            entity_id: 10,
            field_name: "category".to_string(),
            original_value: "target".to_string(),
            override_value: "safety".to_string(),
            reason: Some("visited campus".to_string()),
            expires_at: Some(now() + Duration::days(7)),
            created_at: now(),
        })
        .await
        .unwrap();

    let active = store
        .get_active_override(100, "fit".to_string(), 10, "category".to_string(), now())
        .await
        .unwrap();
    assert_eq!(active.unwrap().override_value, "safety");

    // Expired overrides are invisible.
    let later = now() + Duration::days(8);
    let expired = store
        .get_active_override(100, "fit".to_string(), 10, "category".to_string(), later)
        .await
        .unwrap();
    assert!(expired.is_none());

    assert!(store
        .delete_override(100, "fit".to_string(), 10, "category".to_string())
        .await
        .unwrap());
    assert!(!store
        .delete_override(100, "fit".to_string(), 10, "category".to_string())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_chance_history_newest_first() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    for (i, chance) in [30.0, 35.5, 42.0].into_iter().enumerate() {
        store
            .append_chance_history(ChanceHistoryEntry {
                id: 0,
                user_id: 100,
                college_id: 10,
                chance_percent: chance,
                category: ChanceCategory::Target,
                factors: vec![],
                recorded_at: now() + Duration::days(i as i64),
            })
            .await
            .unwrap();
    }

    let history = store.chance_history(100, 10, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!((history[0].chance_percent - 42.0).abs() < 1e-9);
    assert!((history[1].chance_percent - 35.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_alert_dedup_window_lookup() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    store
        .insert_alert(DeadlineAlert {
            id: 0,
            user_id: 100,
            deadline_id: 7,
            college_id: Some(10),
            level: AlertLevel::Critical,
            message: "risk is now critical".to_string(),
            created_at: now(),
        })
        .await
        .unwrap();

    // Same level inside the window: present.
    assert!(store
        .recent_alert_exists(7, AlertLevel::Critical, now() - Duration::hours(24))
        .await
        .unwrap());
    // Different level: absent.
    assert!(!store
        .recent_alert_exists(7, AlertLevel::Warning, now() - Duration::hours(24))
        .await
        .unwrap());
    // Outside the window: absent.
    assert!(!store
        .recent_alert_exists(7, AlertLevel::Critical, now() + Duration::hours(1))
        .await
        .unwrap());

    let alerts = store
        .alerts_for_user(100, now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn test_change_log_ordering_per_entity() {
    let store = SqliteDecisionStore::new(create_test_pool().await);

    for i in 0..3 {
        store
            .append_change(ChangeLogEntry {
                id: 0,
                user_id: Some(100),
                entity_type: "profile".to_string(),
                entity_id: 1,
                action: format!("edit_{}", i),
                field_name: None,
                old_value: None,
                new_value: None,
                changed_by: ChangedBy::User,
                at: now() + Duration::minutes(i as i64),
            })
            .await
            .unwrap();
    }

    let changes = store
        .changes_for_entity("profile".to_string(), 1, 10)
        .await
        .unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].action, "edit_2");
}
