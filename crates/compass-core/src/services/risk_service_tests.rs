#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::domain::{
        AlertLevel, Application, ApplicationRound, DeadlineType, RiskLevel, TaskStatus,
        UserDeadline,
    };
    use crate::ports::{
        FixedClock, MockApplicationStore, MockCollegeStore, MockDecisionStore, MockProfileStore,
    };
    use crate::services::{LedgerService, RiskService};
    use crate::testing::fixtures::{college_flagship, task_with};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    fn make_service(
        profiles: MockProfileStore,
        colleges: MockCollegeStore,
        applications: MockApplicationStore,
        decisions: MockDecisionStore,
    ) -> RiskService {
        let decisions: Arc<MockDecisionStore> = Arc::new(decisions);
        let ledger = Arc::new(LedgerService::new(decisions.clone()));
        RiskService::new(
            Arc::new(profiles),
            Arc::new(colleges),
            Arc::new(applications),
            decisions,
            ledger,
            Arc::new(FixedClock(now())),
            EngineConfig::default(),
        )
    }

    fn deadline_in(hours: i64, risk_level: RiskLevel) -> UserDeadline {
        UserDeadline {
            id: 7,
            user_id: 100,
            college_id: Some(10),
            application_id: Some(1),
            title: "State Flagship University regular".to_string(),
            deadline_date: now() + Duration::hours(hours),
            deadline_type: DeadlineType::Official,
            risk_level,
            buffer_hours: 0.0,
        }
    }

    fn profiles_without_snapshot() -> MockProfileStore {
        let mut profiles = MockProfileStore::new();
        profiles.expect_latest_snapshot().returning(|_| Ok(None));
        profiles
    }

    /// 48h to the deadline, 20h of open work → impossible (8h available).
    #[tokio::test]
    async fn test_impossible_deadline_assessment() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_deadlines_for_user_college()
            .returning(|_, _| Ok(vec![deadline_in(48, RiskLevel::Safe)]));
        let mut work = task_with(1, TaskStatus::NotStarted);
        work.estimated_hours = 20.0;
        let tasks = vec![work];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications
            .expect_dependencies_for_user()
            .returning(|_| Ok(vec![]));
        applications
            .expect_update_deadline_risk()
            .times(1)
            .withf(|_, level, buffer| {
                *level == RiskLevel::Impossible && (*buffer - (-12.0)).abs() < 1e-6
            })
            .returning(|_, _, _| Ok(()));

        let mut decisions = MockDecisionStore::new();
        decisions.expect_put_risk().times(1).returning(|_| Ok(()));
        decisions
            .expect_recent_alert_exists()
            .returning(|_, _, _| Ok(false));
        decisions
            .expect_insert_alert()
            .times(1)
            .withf(|alert| alert.level == AlertLevel::Impossible)
            .returning(|alert| Ok(alert));
        decisions
            .expect_append_decision()
            .returning(|record| Ok(record));

        let service = make_service(
            profiles_without_snapshot(),
            MockCollegeStore::new(),
            applications,
            decisions,
        );

        let assessment = service.calculate_risk(100, 10).await.unwrap();
        assert_eq!(assessment.time_risk_level, RiskLevel::Impossible);
        assert!((assessment.time_buffer_hours - (-12.0)).abs() < 1e-6);
        assert!(assessment
            .risk_factors
            .iter()
            .any(|f| f.name == "deadline_unreachable"));
        assert!(assessment
            .mitigations
            .iter()
            .any(|m| m.contains("later application cycle")));
        // ratio = (8 − 20) / 20 = −0.6 → 75 + 25 × 0.6 = 90.
        assert!((assessment.overall_risk_score - 90.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_no_open_work_is_safe() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_deadlines_for_user_college()
            .returning(|_, _| Ok(vec![deadline_in(48, RiskLevel::Safe)]));
        let tasks = vec![task_with(1, TaskStatus::Complete)];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications
            .expect_dependencies_for_user()
            .returning(|_| Ok(vec![]));
        applications
            .expect_update_deadline_risk()
            .returning(|_, _, _| Ok(()));

        let mut decisions = MockDecisionStore::new();
        decisions.expect_put_risk().returning(|_| Ok(()));
        decisions
            .expect_append_decision()
            .returning(|record| Ok(record));
        // Safe → Safe is not a transition; inserting an alert panics.

        let service = make_service(
            profiles_without_snapshot(),
            MockCollegeStore::new(),
            applications,
            decisions,
        );

        let assessment = service.calculate_risk(100, 10).await.unwrap();
        assert_eq!(assessment.time_risk_level, RiskLevel::Safe);
        assert_eq!(assessment.overall_risk_score, 0.0);
        assert_eq!(assessment.tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_alert_dedup_within_24_hours() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_deadlines_for_user_college()
            .returning(|_, _| Ok(vec![deadline_in(48, RiskLevel::Safe)]));
        let mut work = task_with(1, TaskStatus::NotStarted);
        work.estimated_hours = 20.0;
        let tasks = vec![work];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications
            .expect_dependencies_for_user()
            .returning(|_| Ok(vec![]));
        applications
            .expect_update_deadline_risk()
            .returning(|_, _, _| Ok(()));

        let mut decisions = MockDecisionStore::new();
        decisions.expect_put_risk().returning(|_| Ok(()));
        decisions
            .expect_append_decision()
            .returning(|record| Ok(record));
        // An impossible alert already fired within the window.
        decisions
            .expect_recent_alert_exists()
            .returning(|_, _, _| Ok(true));
        // insert_alert has no expectation: a duplicate alert panics.

        let service = make_service(
            profiles_without_snapshot(),
            MockCollegeStore::new(),
            applications,
            decisions,
        );

        let assessment = service.calculate_risk(100, 10).await.unwrap();
        assert_eq!(assessment.time_risk_level, RiskLevel::Impossible);
    }

    #[tokio::test]
    async fn test_sync_copies_canonical_deadlines_once() {
        let mut college = college_flagship();
        college.deadlines.early_action = Some(now() + Duration::days(60));
        college.deadlines.regular = Some(now() + Duration::days(120));

        let mut colleges = MockCollegeStore::new();
        colleges
            .expect_get_college()
            .returning(move |_| Ok(Some(college.clone())));

        let mut applications = MockApplicationStore::new();
        applications
            .expect_deadlines_for_user_college()
            .returning(|_, _| Ok(vec![]));
        applications
            .expect_get_application()
            .returning(|user_id, college_id| {
                Ok(Some(Application {
                    id: 1,
                    user_id,
                    college_id,
                    round: ApplicationRound::Regular,
                    is_active: true,
                    created_at: now(),
                }))
            });
        applications
            .expect_insert_user_deadline()
            .times(2)
            .returning(|mut deadline| {
                deadline.id = 42;
                Ok(deadline)
            });

        let service = make_service(
            profiles_without_snapshot(),
            colleges,
            applications,
            MockDecisionStore::new(),
        );

        let deadlines = service.sync_from_college_deadlines(100, 10).await.unwrap();
        assert_eq!(deadlines.len(), 2);
        assert!(deadlines
            .iter()
            .all(|d| d.deadline_type == DeadlineType::Official));
    }

    #[tokio::test]
    async fn test_flag_impossible_colleges() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_applications_for_user()
            .returning(|user_id| {
                Ok(vec![Application {
                    id: 1,
                    user_id,
                    college_id: 10,
                    round: ApplicationRound::Regular,
                    is_active: true,
                    created_at: now(),
                }])
            });
        applications
            .expect_deadlines_for_user_college()
            .returning(|_, _| Ok(vec![deadline_in(48, RiskLevel::Impossible)]));
        let mut work = task_with(1, TaskStatus::NotStarted);
        work.estimated_hours = 20.0;
        let tasks = vec![work];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications
            .expect_dependencies_for_user()
            .returning(|_| Ok(vec![]));
        applications
            .expect_update_deadline_risk()
            .returning(|_, _, _| Ok(()));

        let mut decisions = MockDecisionStore::new();
        decisions.expect_put_risk().returning(|_| Ok(()));
        decisions
            .expect_append_decision()
            .returning(|record| Ok(record));
        // Level was already impossible: no transition, no alert.

        let service = make_service(
            profiles_without_snapshot(),
            MockCollegeStore::new(),
            applications,
            decisions,
        );

        let impossible = service.flag_impossible_colleges(100).await.unwrap();
        assert_eq!(impossible, vec![10]);
    }
}
