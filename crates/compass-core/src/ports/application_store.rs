use crate::domain::{
    Application, ApplicationRound, CanonicalTaskKind, DependencyType, RiskLevel, Task,
    TaskDependency, TaskStatus, TaskStatusChange, UserDeadline,
};
use async_trait::async_trait;

/// Dependency edge expressed against positions in a not-yet-inserted task
/// batch: (task index, depends-on index, type, advisory lead days).
pub type PendingDependency = (usize, usize, DependencyType, Option<i64>);

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    // ========================================================================
    // Applications
    // ========================================================================

    /// Create an application; fails if the (user, college, round) triple exists
    async fn create_application(
        &self,
        user_id: i64,
        college_id: i64,
        round: ApplicationRound,
    ) -> anyhow::Result<Application>;

    /// Get the active application for a user × college pair
    async fn get_application(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<Application>>;

    async fn applications_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Application>>;

    /// Distinct college ids that have at least one active application,
    /// oldest-scraped first, at most `limit`
    async fn college_ids_with_active_applications(&self, limit: u32)
        -> anyhow::Result<Vec<i64>>;

    /// Distinct user ids with at least one active application
    async fn user_ids_with_active_applications(&self) -> anyhow::Result<Vec<i64>>;

    // ========================================================================
    // Tasks & dependencies
    // ========================================================================

    async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>>;

    async fn tasks_for_application(&self, application_id: i64) -> anyhow::Result<Vec<Task>>;

    async fn tasks_for_user_college(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Vec<Task>>;

    /// Insert a task batch and its internal dependency edges in one
    /// transaction. Edges reference batch positions because ids are not
    /// assigned until insertion. Returns the stored tasks with ids.
    async fn insert_task_graph(
        &self,
        tasks: Vec<Task>,
        dependencies: Vec<PendingDependency>,
    ) -> anyhow::Result<Vec<Task>>;

    /// All dependency edges among a user's tasks
    async fn dependencies_for_user(&self, user_id: i64) -> anyhow::Result<Vec<TaskDependency>>;

    async fn dependencies_for_application(
        &self,
        application_id: i64,
    ) -> anyhow::Result<Vec<TaskDependency>>;

    /// Insert a single dependency edge (acyclicity is checked by the caller)
    async fn insert_dependency(&self, dependency: TaskDependency) -> anyhow::Result<()>;

    /// Atomically apply a status change: update the task row, append the
    /// status-history entry, flip newly unblocked tasks to their restored
    /// status, and mark reuse-dependent tasks content-ready.
    async fn update_task_status_atomic(
        &self,
        task_id: i64,
        new_status: TaskStatus,
        change: TaskStatusChange,
        unblocked_task_ids: Vec<i64>,
        content_ready_task_ids: Vec<i64>,
    ) -> anyhow::Result<()>;

    async fn status_history_for_task(
        &self,
        task_id: i64,
    ) -> anyhow::Result<Vec<TaskStatusChange>>;

    /// Earliest-created reusable task of the given canonical kind/ordinal for
    /// a user (the reuse template candidate)
    async fn find_reuse_template(
        &self,
        user_id: i64,
        kind: CanonicalTaskKind,
        ordinal: u8,
    ) -> anyhow::Result<Option<Task>>;

    /// Tasks across colleges that point at this task as their reuse template
    async fn tasks_reusing(&self, template_task_id: i64) -> anyhow::Result<Vec<Task>>;

    // ========================================================================
    // User deadlines
    // ========================================================================

    async fn deadlines_for_user(&self, user_id: i64) -> anyhow::Result<Vec<UserDeadline>>;

    async fn deadlines_for_user_college(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Vec<UserDeadline>>;

    async fn insert_user_deadline(&self, deadline: UserDeadline) -> anyhow::Result<UserDeadline>;

    /// Persist a recomputed risk level/buffer on a deadline row
    async fn update_deadline_risk(
        &self,
        deadline_id: i64,
        risk_level: RiskLevel,
        buffer_hours: f64,
    ) -> anyhow::Result<()>;
}
