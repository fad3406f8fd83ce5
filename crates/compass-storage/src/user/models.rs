/// Database row types for user.db
use crate::convert::{from_millis, opt_from_millis};
use compass_core::domain::{
    AcademicMetrics, Activity, ActivityTier, AlertLevel, Application, ApplicationRound,
    CanonicalTaskKind, ChanceHistoryEntry, ChangeLogEntry, ChangedBy, CourseLevel, Coursework,
    DeadlineAlert, DeadlineType, DecisionKind, DecisionRecord, Demographics, DependencyType,
    Override, Preferences, Profile, ProfileSnapshot, RegionalMetrics, RiskLevel, Task,
    TaskDependency, TaskStatus, TaskStatusChange, TaskType, UserDeadline,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

fn parse_error(column: &str, reason: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("invalid stored value in {}: {}", column, reason)
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: i64,
    pub gpa_unweighted: Option<f64>,
    pub gpa_weighted: Option<f64>,
    pub sat_total: Option<i64>,
    pub sat_math: Option<i64>,
    pub sat_ebrw: Option<i64>,
    pub act_composite: Option<i64>,
    pub class_rank_percentile: Option<f64>,
    pub jee_advanced_rank: Option<i64>,
    pub jee_main_percentile: Option<f64>,
    pub predicted_a_levels: Option<String>,
    pub ib_predicted: Option<i64>,
    pub abitur_grade: Option<f64>,
    pub board_percentage: Option<f64>,
    pub preferences: String,
    pub is_first_gen: i64,
    pub is_legacy: i64,
    pub state: Option<String>,
    pub country: Option<String>,
    pub completeness: f64,
    pub updated_at: i64,
}

impl ProfileRow {
    pub fn into_domain(self) -> anyhow::Result<Profile> {
        let preferences: Preferences =
            serde_json::from_str(&self.preferences).unwrap_or_default();
        Ok(Profile {
            id: self.id,
            user_id: self.user_id,
            academic: AcademicMetrics {
                gpa_unweighted: self.gpa_unweighted,
                gpa_weighted: self.gpa_weighted,
                sat_total: self.sat_total.map(|v| v as i32),
                sat_math: self.sat_math.map(|v| v as i32),
                sat_ebrw: self.sat_ebrw.map(|v| v as i32),
                act_composite: self.act_composite.map(|v| v as i32),
                class_rank_percentile: self.class_rank_percentile,
            },
            regional: RegionalMetrics {
                jee_advanced_rank: self.jee_advanced_rank,
                jee_main_percentile: self.jee_main_percentile,
                predicted_a_levels: self.predicted_a_levels,
                ib_predicted: self.ib_predicted.map(|v| v as i32),
                abitur_grade: self.abitur_grade,
                board_percentage: self.board_percentage,
            },
            preferences,
            demographics: Demographics {
                is_first_gen: self.is_first_gen != 0,
                is_legacy: self.is_legacy != 0,
                state: self.state,
                country: self.country,
            },
            completeness: self.completeness,
            updated_at: from_millis(self.updated_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tier: i64,
    pub hours_per_week: f64,
    pub weeks_per_year: f64,
    pub years_participated: f64,
    pub is_leadership: i64,
}

impl ActivityRow {
    pub fn into_domain(self) -> anyhow::Result<Activity> {
        Ok(Activity {
            id: self.id,
            profile_id: self.profile_id,
            name: self.name,
            description: self.description,
            tier: ActivityTier::parse(self.tier as u8)
                .map_err(|e| parse_error("activities.tier", e))?,
            hours_per_week: self.hours_per_week,
            weeks_per_year: self.weeks_per_year,
            years_participated: self.years_participated,
            is_leadership: self.is_leadership != 0,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CourseworkRow {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub level: String,
    pub final_grade: Option<String>,
    pub exam_score: Option<i64>,
}

impl CourseworkRow {
    pub fn into_domain(self) -> anyhow::Result<Coursework> {
        Ok(Coursework {
            id: self.id,
            profile_id: self.profile_id,
            name: self.name,
            level: CourseLevel::parse(&self.level)
                .map_err(|e| parse_error("coursework.level", e))?,
            final_grade: self.final_grade,
            exam_score: self.exam_score.map(|v| v as i32),
        })
    }
}

/// Snapshot payload serialized into the `data` column; the single
/// serialization boundary for the immutable profile copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub profile: Profile,
    pub activities: Vec<Activity>,
    pub coursework: Vec<Coursework>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub profile_id: i64,
    pub user_id: i64,
    pub taken_at: i64,
    pub data: String,
}

impl SnapshotRow {
    pub fn into_domain(self) -> anyhow::Result<ProfileSnapshot> {
        let payload: SnapshotPayload = serde_json::from_str(&self.data)
            .map_err(|e| parse_error("profile_snapshots.data", e))?;
        Ok(ProfileSnapshot {
            id: self.id,
            profile_id: self.profile_id,
            user_id: self.user_id,
            taken_at: from_millis(self.taken_at),
            profile: payload.profile,
            activities: payload.activities,
            coursework: payload.coursework,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub round: String,
    pub is_active: i64,
    pub created_at: i64,
}

impl ApplicationRow {
    pub fn into_domain(self) -> anyhow::Result<Application> {
        Ok(Application {
            id: self.id,
            user_id: self.user_id,
            college_id: self.college_id,
            round: ApplicationRound::parse(&self.round)
                .map_err(|e| parse_error("applications.round", e))?,
            is_active: self.is_active != 0,
            created_at: from_millis(self.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub application_id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub title: String,
    pub task_type: String,
    pub canonical_kind: String,
    pub ordinal: i64,
    pub status: String,
    pub estimated_hours: f64,
    pub deadline: Option<i64>,
    pub priority: i64,
    pub is_reusable: i64,
    pub reuse_template_id: Option<i64>,
    pub content_ready: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskRow {
    pub fn into_domain(self) -> anyhow::Result<Task> {
        Ok(Task {
            id: self.id,
            application_id: self.application_id,
            user_id: self.user_id,
            college_id: self.college_id,
            title: self.title,
            task_type: TaskType::parse(&self.task_type)
                .map_err(|e| parse_error("tasks.task_type", e))?,
            canonical_kind: CanonicalTaskKind::parse(&self.canonical_kind)
                .map_err(|e| parse_error("tasks.canonical_kind", e))?,
            ordinal: self.ordinal as u8,
            status: TaskStatus::parse(&self.status)
                .map_err(|e| parse_error("tasks.status", e))?,
            estimated_hours: self.estimated_hours,
            deadline: opt_from_millis(self.deadline),
            priority: self.priority as u8,
            is_reusable: self.is_reusable != 0,
            reuse_template_id: self.reuse_template_id,
            content_ready: self.content_ready != 0,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DependencyRow {
    pub task_id: i64,
    pub depends_on_task_id: i64,
    pub dependency_type: String,
    pub lead_time_days: Option<i64>,
}

impl DependencyRow {
    pub fn into_domain(self) -> anyhow::Result<TaskDependency> {
        Ok(TaskDependency {
            task_id: self.task_id,
            depends_on_task_id: self.depends_on_task_id,
            dependency_type: DependencyType::parse(&self.dependency_type)
                .map_err(|e| parse_error("task_dependencies.dependency_type", e))?,
            lead_time_days: self.lead_time_days,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusHistoryRow {
    pub id: i64,
    pub task_id: i64,
    pub from_status: String,
    pub to_status: String,
    pub reason: Option<String>,
    pub changed_at: i64,
}

impl StatusHistoryRow {
    pub fn into_domain(self) -> anyhow::Result<TaskStatusChange> {
        Ok(TaskStatusChange {
            id: self.id,
            task_id: self.task_id,
            from_status: TaskStatus::parse(&self.from_status)
                .map_err(|e| parse_error("task_status_history.from_status", e))?,
            to_status: TaskStatus::parse(&self.to_status)
                .map_err(|e| parse_error("task_status_history.to_status", e))?,
            reason: self.reason,
            changed_at: from_millis(self.changed_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DeadlineRow {
    pub id: i64,
    pub user_id: i64,
    pub college_id: Option<i64>,
    pub application_id: Option<i64>,
    pub title: String,
    pub deadline_date: i64,
    pub deadline_type: String,
    pub risk_level: String,
    pub buffer_hours: f64,
}

impl DeadlineRow {
    pub fn into_domain(self) -> anyhow::Result<UserDeadline> {
        Ok(UserDeadline {
            id: self.id,
            user_id: self.user_id,
            college_id: self.college_id,
            application_id: self.application_id,
            title: self.title,
            deadline_date: from_millis(self.deadline_date),
            deadline_type: DeadlineType::parse(&self.deadline_type)
                .map_err(|e| parse_error("user_deadlines.deadline_type", e))?,
            risk_level: RiskLevel::parse(&self.risk_level)
                .map_err(|e| parse_error("user_deadlines.risk_level", e))?,
            buffer_hours: self.buffer_hours,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DecisionRow {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub snapshot_id: i64,
    pub kind: String,
    pub inputs: String,
    pub weights: String,
    pub factors: String,
    pub output: String,
    pub created_at: i64,
}

impl DecisionRow {
    pub fn into_domain(self) -> anyhow::Result<DecisionRecord> {
        Ok(DecisionRecord {
            id: self.id,
            user_id: self.user_id,
            college_id: self.college_id,
            snapshot_id: self.snapshot_id,
            kind: DecisionKind::parse(&self.kind)
                .map_err(|e| parse_error("decision_records.kind", e))?,
            inputs: serde_json::from_str(&self.inputs)
                .map_err(|e| parse_error("decision_records.inputs", e))?,
            weights: serde_json::from_str(&self.weights)
                .map_err(|e| parse_error("decision_records.weights", e))?,
            factors: serde_json::from_str(&self.factors)
                .map_err(|e| parse_error("decision_records.factors", e))?,
            output: serde_json::from_str(&self.output)
                .map_err(|e| parse_error("decision_records.output", e))?,
            created_at: from_millis(self.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChanceHistoryRow {
    pub id: i64,
    pub user_id: i64,
    pub college_id: i64,
    pub chance_percent: f64,
    pub category: String,
    pub factors: String,
    pub recorded_at: i64,
}

impl ChanceHistoryRow {
    pub fn into_domain(self) -> anyhow::Result<ChanceHistoryEntry> {
        Ok(ChanceHistoryEntry {
            id: self.id,
            user_id: self.user_id,
            college_id: self.college_id,
            chance_percent: self.chance_percent,
            category: compass_core::domain::ChanceCategory::parse(&self.category)
                .map_err(|e| parse_error("chance_history.category", e))?,
            factors: serde_json::from_str(&self.factors)
                .map_err(|e| parse_error("chance_history.factors", e))?,
            recorded_at: from_millis(self.recorded_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OverrideRow {
    pub id: i64,
    pub user_id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub field_name: String,
    pub original_value: String,
    pub override_value: String,
    pub reason: Option<String>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl OverrideRow {
    pub fn into_domain(self) -> Override {
        Override {
            id: self.id,
            user_id: self.user_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            field_name: self.field_name,
            original_value: self.original_value,
            override_value: self.override_value,
            reason: self.reason,
            expires_at: opt_from_millis(self.expires_at),
            created_at: from_millis(self.created_at),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChangeLogRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub at: i64,
}

impl ChangeLogRow {
    pub fn into_domain(self) -> anyhow::Result<ChangeLogEntry> {
        Ok(ChangeLogEntry {
            id: self.id,
            user_id: self.user_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action,
            field_name: self.field_name,
            old_value: self.old_value,
            new_value: self.new_value,
            changed_by: ChangedBy::parse(&self.changed_by)
                .map_err(|e| parse_error("change_log.changed_by", e))?,
            at: from_millis(self.at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub user_id: i64,
    pub deadline_id: i64,
    pub college_id: Option<i64>,
    pub level: String,
    pub message: String,
    pub created_at: i64,
}

impl AlertRow {
    pub fn into_domain(self) -> anyhow::Result<DeadlineAlert> {
        Ok(DeadlineAlert {
            id: self.id,
            user_id: self.user_id,
            deadline_id: self.deadline_id,
            college_id: self.college_id,
            level: AlertLevel::parse(&self.level)
                .map_err(|e| parse_error("deadline_alerts.level", e))?,
            message: self.message,
            created_at: from_millis(self.created_at),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct WeightsRow {
    pub academic: f64,
    pub profile: f64,
    pub financial: f64,
    pub timeline: f64,
}
