use crate::domain::{
    ApplicationRound, DependencyType, DomainError, Task, TaskDependency, TaskStatus,
    TaskStatusChange,
};
use crate::ports::{ApplicationStore, Clock, CollegeStore, ProfileStore};
use crate::tasks::{self, CriticalPath, TaskGraph, TaskTemplate};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result of a status update: the stored task plus everything it unblocked.
#[derive(Debug, Clone)]
pub struct StatusUpdateOutcome {
    pub task: Task,
    pub unblocked: Vec<Task>,
}

/// Task decomposition and dependency management: expands college
/// requirements into task DAGs, enforces blocking semantics, and exposes
/// the critical path.
pub struct TaskService {
    profiles: Arc<dyn ProfileStore>,
    colleges: Arc<dyn CollegeStore>,
    applications: Arc<dyn ApplicationStore>,
    clock: Arc<dyn Clock>,
    productive_hours_per_day: f64,
}

impl TaskService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        colleges: Arc<dyn CollegeStore>,
        applications: Arc<dyn ApplicationStore>,
        clock: Arc<dyn Clock>,
        productive_hours_per_day: f64,
    ) -> Self {
        Self {
            profiles,
            colleges,
            applications,
            clock,
            productive_hours_per_day,
        }
    }

    /// Template-only decomposition for a college; nothing is persisted.
    pub async fn decompose(&self, college_id: i64) -> Result<Vec<TaskTemplate>> {
        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or(DomainError::CollegeNotFound(college_id))?;
        Ok(tasks::decompose(&college.requirements, false))
    }

    /// Create the task set for an application. Idempotent: when tasks
    /// already exist for the (user, college) pair, the existing set is
    /// returned untouched.
    #[instrument(skip(self))]
    pub async fn create_application_tasks(
        &self,
        user_id: i64,
        college_id: i64,
        application_id: Option<i64>,
    ) -> Result<Vec<Task>> {
        let existing = self
            .applications
            .tasks_for_user_college(user_id, college_id)
            .await?;
        if !existing.is_empty() {
            debug!(user_id, college_id, "tasks already exist; returning them");
            return Ok(existing);
        }

        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or(DomainError::CollegeNotFound(college_id))?;

        // The caller may name an application; otherwise the active one for
        // the pair is used, created on first touch.
        let application = match self.applications.get_application(user_id, college_id).await? {
            Some(app) => app,
            None => {
                let round = default_round(&college);
                self.applications
                    .create_application(user_id, college_id, round)
                    .await?
            }
        };
        if let Some(requested) = application_id {
            if requested != application.id {
                return Err(DomainError::InvalidArgument(format!(
                    "application {} does not belong to user {} and college {}",
                    requested, user_id, college_id
                ))
                .into());
            }
        }

        let international = match self.profiles.get_profile_by_user(user_id).await? {
            Some(profile) => profile.is_international_for(&college.country),
            None => false,
        };

        let templates = tasks::decompose(&college.requirements, international);
        let template_deps = tasks::dependencies(&templates);
        let deadline = college
            .deadlines
            .for_round(application.round)
            .or_else(|| college.deadlines.earliest_upcoming(self.clock.now()));

        let now = self.clock.now();
        let mut new_tasks = Vec::with_capacity(templates.len());
        for template in &templates {
            // Cross-college reuse: point at the earliest matching reusable
            // task. Completing the template marks this one content-ready,
            // but the submission itself stays per-college.
            let reuse_template = if template.is_reusable() {
                self.applications
                    .find_reuse_template(user_id, template.canonical_kind, template.ordinal)
                    .await?
            } else {
                None
            };

            let content_ready = reuse_template
                .as_ref()
                .map(|t| t.status == TaskStatus::Complete)
                .unwrap_or(false);

            new_tasks.push(Task {
                id: 0,
                application_id: application.id,
                user_id,
                college_id,
                title: template.title.clone(),
                task_type: template.task_type,
                canonical_kind: template.canonical_kind,
                ordinal: template.ordinal,
                status: TaskStatus::NotStarted,
                estimated_hours: template.estimated_hours,
                deadline,
                priority: template.priority,
                is_reusable: template.is_reusable(),
                reuse_template_id: reuse_template.map(|t| t.id),
                content_ready,
                created_at: now,
                updated_at: now,
            });
        }

        // Tasks with unmet hard prerequisites start out blocked (the final
        // submission, as decomposed).
        for (task_idx, _, dep_type, _) in &template_deps {
            if *dep_type == DependencyType::Blocks {
                new_tasks[*task_idx].status = TaskStatus::Blocked;
            }
        }

        let stored = self
            .applications
            .insert_task_graph(new_tasks, template_deps)
            .await?;
        Ok(stored)
    }

    /// Add a dependency edge between two existing tasks, rejecting cycles.
    pub async fn create_dependency(
        &self,
        task_id: i64,
        depends_on_task_id: i64,
        dependency_type: DependencyType,
    ) -> Result<()> {
        let task = self
            .applications
            .get_task(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;
        self.applications
            .get_task(depends_on_task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(depends_on_task_id))?;

        let graph = self.load_graph(task.user_id, None).await?;
        if graph.would_create_cycle(task_id, depends_on_task_id) {
            return Err(DomainError::DependencyCycle {
                task_ids: vec![task_id, depends_on_task_id],
            }
            .into());
        }

        self.applications
            .insert_dependency(TaskDependency {
                task_id,
                depends_on_task_id,
                dependency_type,
                lead_time_days: None,
            })
            .await?;
        Ok(())
    }

    /// Update a task's status, writing history and unblocking dependents
    /// whose only unmet hard dependency was this task.
    #[instrument(skip(self, reason))]
    pub async fn update_status(
        &self,
        task_id: i64,
        status: TaskStatus,
        reason: Option<String>,
    ) -> Result<StatusUpdateOutcome> {
        let task = self
            .applications
            .get_task(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        // Blocked is derived from dependencies, never set by hand.
        if status == TaskStatus::Blocked {
            return Err(
                DomainError::InvalidStatus("blocked is derived, not settable".to_string()).into(),
            );
        }

        let graph = self
            .load_graph(task.user_id, Some(task.college_id))
            .await?;

        // A task whose hard prerequisites are unmet cannot move forward.
        if matches!(status, TaskStatus::InProgress | TaskStatus::Complete) {
            let unmet = graph.unmet_hard_prerequisites(task_id);
            if !unmet.is_empty() {
                return Err(DomainError::InvalidStatus(format!(
                    "task {} is blocked by incomplete tasks {:?}",
                    task_id, unmet
                ))
                .into());
            }
        }

        let now = self.clock.now();
        let change = TaskStatusChange {
            id: 0,
            task_id,
            from_status: task.status,
            to_status: status,
            reason,
            changed_at: now,
        };

        // Completion (or skipping) can unblock dependents and mark
        // reuse-linked tasks content-ready.
        let (unblocked_ids, content_ready_ids) = if status.satisfies_dependency() {
            let mut updated_tasks: Vec<Task> = graph.tasks().cloned().collect();
            if let Some(t) = updated_tasks.iter_mut().find(|t| t.id == task_id) {
                t.status = status;
            }
            let dependencies = self
                .applications
                .dependencies_for_application(task.application_id)
                .await?;
            let updated_graph = TaskGraph::new(updated_tasks, dependencies);
            let unblocked: Vec<i64> = updated_graph
                .unblocked_by_completion(task_id)
                .into_iter()
                .filter(|id| {
                    updated_graph
                        .get(*id)
                        .map(|t| t.status == TaskStatus::Blocked)
                        .unwrap_or(false)
                })
                .collect();

            let content_ready: Vec<i64> = if status == TaskStatus::Complete {
                self.applications
                    .tasks_reusing(task_id)
                    .await?
                    .into_iter()
                    .map(|t| t.id)
                    .collect()
            } else {
                vec![]
            };
            (unblocked, content_ready)
        } else {
            (vec![], vec![])
        };

        self.applications
            .update_task_status_atomic(
                task_id,
                status,
                change,
                unblocked_ids.clone(),
                content_ready_ids,
            )
            .await?;

        let mut unblocked = Vec::with_capacity(unblocked_ids.len());
        for id in unblocked_ids {
            if let Some(t) = self.applications.get_task(id).await? {
                unblocked.push(t);
            }
        }
        let task = self
            .applications
            .get_task(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        Ok(StatusUpdateOutcome { task, unblocked })
    }

    /// Tasks whose dependency closure is unsatisfied.
    pub async fn get_blocked(&self, user_id: i64, college_id: Option<i64>) -> Result<Vec<Task>> {
        let graph = self.load_graph(user_id, college_id).await?;
        let blocked_ids = graph.blocked_task_ids();
        Ok(blocked_ids
            .into_iter()
            .filter_map(|id| graph.get(id).cloned())
            .collect())
    }

    /// Longest incomplete chain to the final submission for a college.
    pub async fn get_critical_path(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> Result<Option<CriticalPath>> {
        let graph = self.load_graph(user_id, Some(college_id)).await?;
        let deadline = graph
            .tasks()
            .filter_map(|t| t.deadline)
            .min();
        Ok(graph.critical_path(deadline, self.clock.now(), self.productive_hours_per_day))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn load_graph(&self, user_id: i64, college_id: Option<i64>) -> Result<TaskGraph> {
        let tasks = match college_id {
            Some(college_id) => {
                self.applications
                    .tasks_for_user_college(user_id, college_id)
                    .await?
            }
            None => {
                let mut all = Vec::new();
                for application in self.applications.applications_for_user(user_id).await? {
                    all.extend(
                        self.applications
                            .tasks_for_application(application.id)
                            .await?,
                    );
                }
                all
            }
        };
        let dependencies = self.applications.dependencies_for_user(user_id).await?;
        Ok(TaskGraph::new(tasks, dependencies))
    }
}

/// Round used when an application is created implicitly: the earliest
/// round with a published deadline, falling back to regular decision.
fn default_round(college: &crate::domain::College) -> ApplicationRound {
    college
        .deadlines
        .iter_rounds()
        .into_iter()
        .min_by_key(|(_, date)| *date)
        .map(|(round, _)| round)
        .unwrap_or(ApplicationRound::Regular)
}
