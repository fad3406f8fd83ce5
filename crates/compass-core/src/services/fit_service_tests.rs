#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::domain::{DomainError, FitCategory, FitResult, FitWeights, Override, Subscores};
    use crate::ports::{
        FixedClock, MockApplicationStore, MockCollegeStore, MockDecisionStore, MockProfileStore,
    };
    use crate::services::{FitService, LedgerService};
    use crate::testing::fixtures::{college_flagship, snapshot_strong};
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
    ) -> FitService {
        let decisions: Arc<MockDecisionStore> = Arc::new(decisions);
        let ledger = Arc::new(LedgerService::new(decisions.clone()));
        FitService::new(
            Arc::new(profiles),
            Arc::new(colleges),
            Arc::new(applications),
            decisions,
            ledger,
            Arc::new(FixedClock(now())),
            EngineConfig::default(),
        )
    }

    fn profiles_with_snapshot() -> MockProfileStore {
        let mut profiles = MockProfileStore::new();
        let snapshot = snapshot_strong();
        let profile = snapshot.profile.clone();
        profiles
            .expect_get_profile()
            .returning(move |_| Ok(Some(profile.clone())));
        profiles
            .expect_latest_snapshot()
            .returning(move |_| Ok(Some(snapshot.clone())));
        profiles.expect_get_user_weights().returning(|_| Ok(None));
        profiles
    }

    fn colleges_with_flagship() -> MockCollegeStore {
        let mut colleges = MockCollegeStore::new();
        colleges.expect_get_college().returning(|id| {
            if id == college_flagship().id {
                Ok(Some(college_flagship()))
            } else {
                Ok(None)
            }
        });
        colleges
    }

    fn empty_applications() -> MockApplicationStore {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_tasks_for_user_college()
            .returning(|_, _| Ok(vec![]));
        applications
    }

    fn cached_fit(category: FitCategory, expires_at: chrono::DateTime<Utc>) -> FitResult {
        FitResult {
            profile_snapshot_id: snapshot_strong().id,
            college_id: college_flagship().id,
            overall_score: 85.0,
            category,
            subscores: Subscores {
                academic: 100.0,
                profile: 93.0,
                financial: 100.0,
                timeline: 50.0,
            },
            confidence: 0.83,
            warnings: vec![],
            factors: vec![],
            computed_at: now() - Duration::days(1),
            expires_at,
            is_manual_override: false,
        }
    }

    #[tokio::test]
    async fn test_classify_fit_computes_caches_and_ledgers() {
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_get_active_override()
            .returning(|_, _, _, _, _| Ok(None));
        decisions.expect_get_fit().returning(|_, _| Ok(None));
        decisions
            .expect_append_decision()
            .times(1)
            .returning(|record| Ok(record));
        decisions
            .expect_put_fit()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = make_service(
            profiles_with_snapshot(),
            colleges_with_flagship(),
            empty_applications(),
            decisions,
        );

        let fit = service.classify_fit(1, college_flagship().id).await.unwrap();
        assert_eq!(fit.category, FitCategory::Safety);
        assert!(fit.overall_score >= 80.0);
        assert_eq!(fit.expires_at, now() + Duration::days(30));
        assert!(!fit.is_manual_override);
    }

    #[tokio::test]
    async fn test_classify_fit_serves_fresh_cache_entry() {
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_get_active_override()
            .returning(|_, _, _, _, _| Ok(None));
        decisions
            .expect_get_fit()
            .returning(|_, _| Ok(Some(cached_fit_helper())));
        // No append_decision / put_fit expectations: a recompute would panic.

        fn cached_fit_helper() -> FitResult {
            FitResult {
                profile_snapshot_id: 10,
                college_id: 10,
                overall_score: 85.0,
                category: FitCategory::Safety,
                subscores: Subscores {
                    academic: 100.0,
                    profile: 93.0,
                    financial: 100.0,
                    timeline: 50.0,
                },
                confidence: 0.83,
                warnings: vec![],
                factors: vec![],
                computed_at: Utc.with_ymd_and_hms(2025, 8, 31, 12, 0, 0).unwrap(),
                expires_at: Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap(),
                is_manual_override: false,
            }
        }

        let service = make_service(
            profiles_with_snapshot(),
            colleges_with_flagship(),
            empty_applications(),
            decisions,
        );

        let fit = service.classify_fit(1, college_flagship().id).await.unwrap();
        assert_eq!(fit.overall_score, 85.0);
    }

    #[tokio::test]
    async fn test_classify_fit_recomputes_expired_cache_entry() {
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_get_active_override()
            .returning(|_, _, _, _, _| Ok(None));
        let expired = cached_fit(FitCategory::Safety, now() - Duration::days(1));
        decisions
            .expect_get_fit()
            .returning(move |_, _| Ok(Some(expired.clone())));
        decisions
            .expect_append_decision()
            .times(1)
            .returning(|record| Ok(record));
        decisions.expect_put_fit().times(1).returning(|_, _| Ok(()));

        let service = make_service(
            profiles_with_snapshot(),
            colleges_with_flagship(),
            empty_applications(),
            decisions,
        );

        let fit = service.classify_fit(1, college_flagship().id).await.unwrap();
        assert_eq!(fit.computed_at, now());
    }

    #[tokio::test]
    async fn test_active_override_shadows_category() {
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_get_active_override()
            .returning(|user_id, _, college_id, _, _| {
                Ok(Some(Override {
                    id: 1,
                    user_id,
                    entity_type: "fit".to_string(),
                    entity_id: college_id,
                    field_name: "category".to_string(),
                    original_value: "safety".to_string(),
                    override_value: "reach".to_string(),
                    reason: None,
                    expires_at: None,
                    created_at: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
                }))
            });
        let fresh = cached_fit(FitCategory::Safety, now() + Duration::days(10));
        decisions
            .expect_get_fit()
            .returning(move |_, _| Ok(Some(fresh.clone())));

        let service = make_service(
            profiles_with_snapshot(),
            colleges_with_flagship(),
            empty_applications(),
            decisions,
        );

        let fit = service.classify_fit(1, college_flagship().id).await.unwrap();
        // Shadowed for the caller; the cached computed value is unchanged.
        assert_eq!(fit.category, FitCategory::Reach);
        assert!(fit.is_manual_override);
    }

    #[tokio::test]
    async fn test_batch_truncates_at_cap_and_reports_per_item_errors() {
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_get_active_override()
            .returning(|_, _, _, _, _| Ok(None));
        decisions.expect_get_fit().returning(|_, _| Ok(None));
        decisions
            .expect_append_decision()
            .returning(|record| Ok(record));
        decisions.expect_put_fit().returning(|_, _| Ok(()));

        let service = make_service(
            profiles_with_snapshot(),
            colleges_with_flagship(),
            empty_applications(),
            decisions,
        );

        // 49 unknown colleges + the flagship + 10 overflow entries.
        let mut ids: Vec<i64> = (1000..1049).collect();
        ids.push(college_flagship().id);
        ids.extend(2000..2010);

        let outcome = service.classify_fit_batch(1, ids).await.unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.results.len() + outcome.errors.len(), 50);
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome
            .errors
            .iter()
            .all(|e| e.kind == "COLLEGE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_set_user_weights_rejects_bad_sum() {
        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            MockApplicationStore::new(),
            MockDecisionStore::new(),
        );

        let err = service
            .set_user_weights(
                100,
                FitWeights {
                    academic: 0.5,
                    profile: 0.5,
                    financial: 0.15,
                    timeline: 0.15,
                },
            )
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::InvalidWeights { sum }) => {
                assert!((sum - 1.3).abs() < 1e-9);
            }
            other => panic!("expected InvalidWeights, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_user_weights_accepts_tolerance_and_invalidates() {
        let mut profiles = MockProfileStore::new();
        profiles
            .expect_set_user_weights()
            .times(1)
            .returning(|_, _| Ok(()));
        let mut decisions = MockDecisionStore::new();
        decisions
            .expect_delete_fits_for_user()
            .times(1)
            .returning(|_| Ok(3));
        decisions
            .expect_append_change()
            .times(1)
            .returning(|entry| Ok(entry));

        let service = make_service(
            profiles,
            MockCollegeStore::new(),
            MockApplicationStore::new(),
            decisions,
        );

        // Sums to 1.005, inside the +/-0.01 tolerance.
        service
            .set_user_weights(
                100,
                FitWeights {
                    academic: 0.405,
                    profile: 0.30,
                    financial: 0.15,
                    timeline: 0.15,
                },
            )
            .await
            .unwrap();
    }
}
