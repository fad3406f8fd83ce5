use super::models::{
    ApplicationRow, DeadlineRow, DependencyRow, StatusHistoryRow, TaskRow,
};
use crate::convert::{opt_to_millis, to_millis};
use async_trait::async_trait;
use compass_core::domain::{
    Application, ApplicationRound, CanonicalTaskKind, RiskLevel, Task, TaskDependency,
    TaskStatus, TaskStatusChange, UserDeadline,
};
use compass_core::ports::{ApplicationStore, PendingDependency};
use sqlx::{query, query_as, SqlitePool};

const TASK_COLUMNS: &str = "id, application_id, user_id, college_id, title, task_type, \
     canonical_kind, ordinal, status, estimated_hours, deadline, priority, is_reusable, \
     reuse_template_id, content_ready, created_at, updated_at";

const DEADLINE_COLUMNS: &str = "id, user_id, college_id, application_id, title, deadline_date, \
     deadline_type, risk_level, buffer_hours";

pub struct SqliteApplicationStore {
    pool: SqlitePool,
}

impl SqliteApplicationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_tasks(&self, sql: &str, binds: &[i64]) -> anyhow::Result<Vec<Task>> {
        let mut q = query_as::<_, TaskRow>(sql);
        for bind in binds {
            q = q.bind(bind);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TaskRow::into_domain).collect()
    }
}

#[async_trait]
impl ApplicationStore for SqliteApplicationStore {
    // ========================================================================
    // Applications
    // ========================================================================

    async fn create_application(
        &self,
        user_id: i64,
        college_id: i64,
        round: ApplicationRound,
    ) -> anyhow::Result<Application> {
        let now = chrono::Utc::now();
        let result = query(
            "INSERT INTO applications (user_id, college_id, round, is_active, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(user_id)
        .bind(college_id)
        .bind(round.as_str())
        .bind(to_millis(now))
        .execute(&self.pool)
        .await;

        match result {
            Ok(result) => Ok(Application {
                id: result.last_insert_rowid(),
                user_id,
                college_id,
                round,
                is_active: true,
                created_at: now,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                compass_core::domain::DomainError::AlreadyExists(format!(
                    "application for user {} college {} round {}",
                    user_id, college_id, round
                ))
                .into(),
            ),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_application(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<Application>> {
        let row = query_as::<_, ApplicationRow>(
            "SELECT id, user_id, college_id, round, is_active, created_at
             FROM applications
             WHERE user_id = ? AND college_id = ? AND is_active = 1
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ApplicationRow::into_domain).transpose()
    }

    async fn applications_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Application>> {
        let rows = query_as::<_, ApplicationRow>(
            "SELECT id, user_id, college_id, round, is_active, created_at
             FROM applications WHERE user_id = ? AND is_active = 1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ApplicationRow::into_domain).collect()
    }

    async fn college_ids_with_active_applications(
        &self,
        limit: u32,
    ) -> anyhow::Result<Vec<i64>> {
        let rows: Vec<(i64,)> = query_as(
            "SELECT DISTINCT college_id FROM applications WHERE is_active = 1
             ORDER BY college_id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn user_ids_with_active_applications(&self) -> anyhow::Result<Vec<i64>> {
        let rows: Vec<(i64,)> = query_as(
            "SELECT DISTINCT user_id FROM applications WHERE is_active = 1 ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // ========================================================================
    // Tasks & dependencies
    // ========================================================================

    async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let row = query_as::<_, TaskRow>(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TaskRow::into_domain).transpose()
    }

    async fn tasks_for_application(&self, application_id: i64) -> anyhow::Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE application_id = ? ORDER BY id",
            TASK_COLUMNS
        );
        self.fetch_tasks(&sql, &[application_id]).await
    }

    async fn tasks_for_user_college(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = ? AND college_id = ? ORDER BY id",
            TASK_COLUMNS
        );
        self.fetch_tasks(&sql, &[user_id, college_id]).await
    }

    async fn insert_task_graph(
        &self,
        tasks: Vec<Task>,
        dependencies: Vec<PendingDependency>,
    ) -> anyhow::Result<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(tasks.len());

        for task in tasks {
            let result = query(
                "INSERT INTO tasks (application_id, user_id, college_id, title, task_type,
                        canonical_kind, ordinal, status, estimated_hours, deadline, priority,
                        is_reusable, reuse_template_id, content_ready, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(task.application_id)
            .bind(task.user_id)
            .bind(task.college_id)
            .bind(&task.title)
            .bind(task.task_type.as_str())
            .bind(task.canonical_kind.as_str())
            .bind(task.ordinal as i64)
            .bind(task.status.as_str())
            .bind(task.estimated_hours)
            .bind(opt_to_millis(task.deadline))
            .bind(task.priority as i64)
            .bind(task.is_reusable as i64)
            .bind(task.reuse_template_id)
            .bind(task.content_ready as i64)
            .bind(to_millis(task.created_at))
            .bind(to_millis(task.updated_at))
            .execute(&mut *tx)
            .await?;

            let mut task = task;
            task.id = result.last_insert_rowid();
            stored.push(task);
        }

        for (task_idx, depends_on_idx, dep_type, lead_days) in dependencies {
            query(
                "INSERT INTO task_dependencies
                    (task_id, depends_on_task_id, dependency_type, lead_time_days)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(stored[task_idx].id)
            .bind(stored[depends_on_idx].id)
            .bind(dep_type.as_str())
            .bind(lead_days)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn dependencies_for_user(&self, user_id: i64) -> anyhow::Result<Vec<TaskDependency>> {
        let rows = query_as::<_, DependencyRow>(
            "SELECT d.task_id, d.depends_on_task_id, d.dependency_type, d.lead_time_days
             FROM task_dependencies d
             JOIN tasks t ON t.id = d.task_id
             WHERE t.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DependencyRow::into_domain).collect()
    }

    async fn dependencies_for_application(
        &self,
        application_id: i64,
    ) -> anyhow::Result<Vec<TaskDependency>> {
        let rows = query_as::<_, DependencyRow>(
            "SELECT d.task_id, d.depends_on_task_id, d.dependency_type, d.lead_time_days
             FROM task_dependencies d
             JOIN tasks t ON t.id = d.task_id
             WHERE t.application_id = ?",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DependencyRow::into_domain).collect()
    }

    async fn insert_dependency(&self, dependency: TaskDependency) -> anyhow::Result<()> {
        query(
            "INSERT INTO task_dependencies
                (task_id, depends_on_task_id, dependency_type, lead_time_days)
             VALUES (?, ?, ?, ?)",
        )
        .bind(dependency.task_id)
        .bind(dependency.depends_on_task_id)
        .bind(dependency.dependency_type.as_str())
        .bind(dependency.lead_time_days)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_task_status_atomic(
        &self,
        task_id: i64,
        new_status: TaskStatus,
        change: TaskStatusChange,
        unblocked_task_ids: Vec<i64>,
        content_ready_task_ids: Vec<i64>,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let now_ms = to_millis(change.changed_at);

        query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(new_status.as_str())
            .bind(now_ms)
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        query(
            "INSERT INTO task_status_history (task_id, from_status, to_status, reason, changed_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(change.task_id)
        .bind(change.from_status.as_str())
        .bind(change.to_status.as_str())
        .bind(&change.reason)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?;

        for unblocked_id in unblocked_task_ids {
            query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(TaskStatus::NotStarted.as_str())
                .bind(now_ms)
                .bind(unblocked_id)
                .bind(TaskStatus::Blocked.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for ready_id in content_ready_task_ids {
            query("UPDATE tasks SET content_ready = 1, updated_at = ? WHERE id = ?")
                .bind(now_ms)
                .bind(ready_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn status_history_for_task(
        &self,
        task_id: i64,
    ) -> anyhow::Result<Vec<TaskStatusChange>> {
        let rows = query_as::<_, StatusHistoryRow>(
            "SELECT id, task_id, from_status, to_status, reason, changed_at
             FROM task_status_history WHERE task_id = ? ORDER BY changed_at, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StatusHistoryRow::into_domain).collect()
    }

    async fn find_reuse_template(
        &self,
        user_id: i64,
        kind: CanonicalTaskKind,
        ordinal: u8,
    ) -> anyhow::Result<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks
             WHERE user_id = ? AND canonical_kind = ? AND ordinal = ? AND is_reusable = 1
               AND reuse_template_id IS NULL
             ORDER BY created_at, id LIMIT 1",
            TASK_COLUMNS
        );
        let row = query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .bind(kind.as_str())
            .bind(ordinal as i64)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TaskRow::into_domain).transpose()
    }

    async fn tasks_reusing(&self, template_task_id: i64) -> anyhow::Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE reuse_template_id = ? ORDER BY id",
            TASK_COLUMNS
        );
        self.fetch_tasks(&sql, &[template_task_id]).await
    }

    // ========================================================================
    // User deadlines
    // ========================================================================

    async fn deadlines_for_user(&self, user_id: i64) -> anyhow::Result<Vec<UserDeadline>> {
        let sql = format!(
            "SELECT {} FROM user_deadlines WHERE user_id = ? ORDER BY deadline_date",
            DEADLINE_COLUMNS
        );
        let rows = query_as::<_, DeadlineRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(DeadlineRow::into_domain).collect()
    }

    async fn deadlines_for_user_college(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Vec<UserDeadline>> {
        let sql = format!(
            "SELECT {} FROM user_deadlines
             WHERE user_id = ? AND college_id = ? ORDER BY deadline_date",
            DEADLINE_COLUMNS
        );
        let rows = query_as::<_, DeadlineRow>(&sql)
            .bind(user_id)
            .bind(college_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(DeadlineRow::into_domain).collect()
    }

    async fn insert_user_deadline(
        &self,
        deadline: UserDeadline,
    ) -> anyhow::Result<UserDeadline> {
        let result = query(
            "INSERT INTO user_deadlines (user_id, college_id, application_id, title,
                    deadline_date, deadline_type, risk_level, buffer_hours)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(deadline.user_id)
        .bind(deadline.college_id)
        .bind(deadline.application_id)
        .bind(&deadline.title)
        .bind(to_millis(deadline.deadline_date))
        .bind(deadline.deadline_type.as_str())
        .bind(deadline.risk_level.as_str())
        .bind(deadline.buffer_hours)
        .execute(&self.pool)
        .await?;

        let mut stored = deadline;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn update_deadline_risk(
        &self,
        deadline_id: i64,
        risk_level: RiskLevel,
        buffer_hours: f64,
    ) -> anyhow::Result<()> {
        query("UPDATE user_deadlines SET risk_level = ?, buffer_hours = ? WHERE id = ?")
            .bind(risk_level.as_str())
            .bind(buffer_hours)
            .bind(deadline_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
