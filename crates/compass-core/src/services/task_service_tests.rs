#[cfg(test)]
mod tests {
    use crate::domain::{
        Application, ApplicationRound, CanonicalTaskKind, DependencyType, DomainError, Task,
        TaskDependency, TaskStatus, TestPolicy,
    };
    use crate::ports::{
        FixedClock, MockApplicationStore, MockCollegeStore, MockProfileStore,
    };
    use crate::services::TaskService;
    use crate::testing::fixtures::{college_flagship, task_with};
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    fn make_service(
        profiles: MockProfileStore,
        colleges: MockCollegeStore,
        applications: MockApplicationStore,
    ) -> TaskService {
        TaskService::new(
            Arc::new(profiles),
            Arc::new(colleges),
            Arc::new(applications),
            Arc::new(FixedClock(now())),
            4.0,
        )
    }

    fn scenario_college() -> crate::domain::College {
        let mut college = college_flagship();
        college.requirements.test_policy = TestPolicy::TestBlind;
        college.requirements.common_app_essay_required = true;
        college.requirements.supplemental_essays_count = 3;
        college.requirements.teacher_recommendations_required = 2;
        college.requirements.counselor_recommendation_required = true;
        college.requirements.toefl_min = Some(100);
        college
    }

    fn application_for(user_id: i64, college_id: i64) -> Application {
        Application {
            id: 1,
            user_id,
            college_id,
            round: ApplicationRound::Regular,
            is_active: true,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn test_create_application_tasks_is_idempotent() {
        let mut applications = MockApplicationStore::new();
        let existing = vec![task_with(1, TaskStatus::InProgress)];
        let existing_clone = existing.clone();
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(existing_clone.clone()));
        // insert_task_graph has no expectation: a second decomposition panics.

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let tasks = service
            .create_application_tasks(100, 10, None)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, existing[0].id);
    }

    #[tokio::test]
    async fn test_create_application_tasks_decomposes_requirements() {
        let mut colleges = MockCollegeStore::new();
        colleges
            .expect_get_college()
            .returning(|_| Ok(Some(scenario_college())));

        let mut profiles = MockProfileStore::new();
        profiles.expect_get_profile_by_user().returning(|user_id| {
            let mut profile = crate::testing::fixtures::snapshot_strong().profile;
            profile.user_id = user_id;
            // Applying from abroad: the TOEFL task applies.
            profile.demographics.country = Some("India".to_string());
            Ok(Some(profile))
        });

        let mut applications = MockApplicationStore::new();
        applications
            .expect_tasks_for_user_college()
            .returning(|_, _| Ok(vec![]));
        applications
            .expect_get_application()
            .returning(|user_id, college_id| Ok(Some(application_for(user_id, college_id))));
        applications
            .expect_find_reuse_template()
            .returning(|_, _, _| Ok(None));
        applications
            .expect_insert_task_graph()
            .times(1)
            .returning(|mut tasks, deps| {
                for (i, task) in tasks.iter_mut().enumerate() {
                    task.id = i as i64 + 1;
                }
                assert!(!deps.is_empty());
                Ok(tasks)
            });

        let service = make_service(profiles, colleges, applications);
        let tasks = service
            .create_application_tasks(100, 10, None)
            .await
            .unwrap();

        // form + essay + 3 supplementals + 2 teacher recs + counselor
        // + TOEFL + final submit
        assert_eq!(tasks.len(), 10);
        let submit = tasks
            .iter()
            .find(|t| t.canonical_kind == CanonicalTaskKind::FinalSubmit)
            .unwrap();
        // The final submission starts out blocked on everything else.
        assert_eq!(submit.status, TaskStatus::Blocked);
    }

    #[tokio::test]
    async fn test_reuse_template_linking_marks_content_ready() {
        let mut colleges = MockCollegeStore::new();
        colleges.expect_get_college().returning(|_| {
            let mut college = college_flagship();
            college.requirements.common_app_essay_required = true;
            Ok(Some(college))
        });

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_get_profile_by_user()
            .returning(|_| Ok(None));

        let mut applications = MockApplicationStore::new();
        applications
            .expect_tasks_for_user_college()
            .returning(|_, _| Ok(vec![]));
        applications
            .expect_get_application()
            .returning(|user_id, college_id| Ok(Some(application_for(user_id, college_id))));
        applications
            .expect_find_reuse_template()
            .returning(|_, kind, _| {
                if kind == CanonicalTaskKind::MainEssay {
                    let mut template = task_with(50, TaskStatus::Complete);
                    template.canonical_kind = CanonicalTaskKind::MainEssay;
                    template.is_reusable = true;
                    Ok(Some(template))
                } else {
                    Ok(None)
                }
            });
        applications
            .expect_insert_task_graph()
            .returning(|mut tasks, _| {
                for (i, task) in tasks.iter_mut().enumerate() {
                    task.id = i as i64 + 1;
                }
                Ok(tasks)
            });

        let service = make_service(profiles, colleges, applications);
        let tasks = service
            .create_application_tasks(100, 10, None)
            .await
            .unwrap();

        let essay = tasks
            .iter()
            .find(|t| t.canonical_kind == CanonicalTaskKind::MainEssay)
            .unwrap();
        assert_eq!(essay.reuse_template_id, Some(50));
        // The template already completed, so the content is ready; the
        // submission itself stays per-college.
        assert!(essay.content_ready);
        assert_ne!(essay.status, TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_update_status_rejects_manual_blocked() {
        let mut applications = MockApplicationStore::new();
        applications
            .expect_get_task()
            .returning(|id| Ok(Some(task_with(id, TaskStatus::NotStarted))));

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let err = service
            .update_status(1, TaskStatus::Blocked, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::InvalidStatus(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_rejects_completing_blocked_task() {
        let essay = task_with(1, TaskStatus::NotStarted);
        let mut submit = task_with(2, TaskStatus::Blocked);
        submit.canonical_kind = CanonicalTaskKind::FinalSubmit;

        let mut applications = MockApplicationStore::new();
        let submit_clone = submit.clone();
        applications
            .expect_get_task()
            .with(eq(2))
            .returning(move |_| Ok(Some(submit_clone.clone())));
        let tasks = vec![essay.clone(), submit.clone()];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications.expect_dependencies_for_user().returning(|_| {
            Ok(vec![TaskDependency {
                task_id: 2,
                depends_on_task_id: 1,
                dependency_type: DependencyType::Blocks,
                lead_time_days: None,
            }])
        });

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let err = service
            .update_status(2, TaskStatus::Complete, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::InvalidStatus(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_complete_unblocks_dependents() {
        let essay = task_with(1, TaskStatus::NotStarted);
        let mut submit = task_with(2, TaskStatus::Blocked);
        submit.canonical_kind = CanonicalTaskKind::FinalSubmit;

        let dependency = TaskDependency {
            task_id: 2,
            depends_on_task_id: 1,
            dependency_type: DependencyType::Blocks,
            lead_time_days: None,
        };

        let mut applications = MockApplicationStore::new();
        let essay_clone = essay.clone();
        applications
            .expect_get_task()
            .with(eq(1))
            .returning(move |_| Ok(Some(essay_clone.clone())));
        let submit_clone = submit.clone();
        applications
            .expect_get_task()
            .with(eq(2))
            .returning(move |_| Ok(Some(submit_clone.clone())));

        let tasks = vec![essay.clone(), submit.clone()];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        let dep_clone = dependency.clone();
        applications
            .expect_dependencies_for_user()
            .returning(move |_| Ok(vec![dep_clone.clone()]));
        let dep_clone2 = dependency.clone();
        applications
            .expect_dependencies_for_application()
            .returning(move |_| Ok(vec![dep_clone2.clone()]));
        applications.expect_tasks_reusing().returning(|_| Ok(vec![]));
        applications
            .expect_update_task_status_atomic()
            .times(1)
            .withf(|task_id, status, _, unblocked, _| {
                *task_id == 1 && *status == TaskStatus::Complete && *unblocked == [2]
            })
            .returning(|_, _, _, _, _| Ok(()));

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let outcome = service
            .update_status(1, TaskStatus::Complete, Some("done".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.task.id, 1);
        assert_eq!(outcome.unblocked.len(), 1);
        assert_eq!(outcome.unblocked[0].id, 2);
    }

    #[tokio::test]
    async fn test_create_dependency_rejects_cycle() {
        let task1 = task_with(1, TaskStatus::NotStarted);
        let task2 = task_with(2, TaskStatus::NotStarted);

        let mut applications = MockApplicationStore::new();
        let t1 = task1.clone();
        applications
            .expect_get_task()
            .with(eq(1))
            .returning(move |_| Ok(Some(t1.clone())));
        let t2 = task2.clone();
        applications
            .expect_get_task()
            .with(eq(2))
            .returning(move |_| Ok(Some(t2.clone())));
        applications
            .expect_applications_for_user()
            .returning(|user_id| {
                Ok(vec![Application {
                    id: 1,
                    user_id,
                    college_id: 10,
                    round: ApplicationRound::Regular,
                    is_active: true,
                    created_at: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
                }])
            });
        let all_tasks = vec![task1.clone(), task2.clone()];
        applications
            .expect_tasks_for_application()
            .returning(move |_| Ok(all_tasks.clone()));
        applications.expect_dependencies_for_user().returning(|_| {
            Ok(vec![TaskDependency {
                task_id: 2,
                depends_on_task_id: 1,
                dependency_type: DependencyType::Blocks,
                lead_time_days: None,
            }])
        });
        // insert_dependency has no expectation: inserting the cycle panics.

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let err = service
            .create_dependency(1, 2, DependencyType::Blocks)
            .await
            .unwrap_err();
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::DependencyCycle { task_ids }) => {
                assert_eq!(task_ids, &vec![1, 2]);
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_blocked_returns_unsatisfied_closure() {
        let essay = task_with(1, TaskStatus::NotStarted);
        let mut submit = task_with(2, TaskStatus::NotStarted);
        submit.canonical_kind = CanonicalTaskKind::FinalSubmit;

        let mut applications = MockApplicationStore::new();
        let tasks = vec![essay, submit];
        applications
            .expect_tasks_for_user_college()
            .returning(move |_, _| Ok(tasks.clone()));
        applications.expect_dependencies_for_user().returning(|_| {
            Ok(vec![TaskDependency {
                task_id: 2,
                depends_on_task_id: 1,
                dependency_type: DependencyType::Blocks,
                lead_time_days: None,
            }])
        });

        let service = make_service(
            MockProfileStore::new(),
            MockCollegeStore::new(),
            applications,
        );

        let blocked = service.get_blocked(100, Some(10)).await.unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].id, 2);
    }
}
