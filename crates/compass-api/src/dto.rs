//! Result-shape normalization for the transport layer. Domain types carry
//! everything; the DTOs flatten what callers actually render.

use compass_core::domain::{
    ChanceResult, DeadlineAlert, FitResult, RiskAssessment, Task, UserDeadline,
};
use serde::{Deserialize, Serialize};

/// Opaque cursor for paginated listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cursor {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FitResultDto {
    pub college_id: i64,
    pub overall_score: f64,
    pub category: String,
    pub academic: f64,
    pub profile: f64,
    pub financial: f64,
    pub timeline: f64,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub is_manual_override: bool,
    pub expires_at: String,
}

impl From<FitResult> for FitResultDto {
    fn from(fit: FitResult) -> Self {
        Self {
            college_id: fit.college_id,
            overall_score: fit.overall_score,
            category: fit.category.as_str().to_string(),
            academic: fit.subscores.academic,
            profile: fit.subscores.profile,
            financial: fit.subscores.financial,
            timeline: fit.subscores.timeline,
            confidence: fit.confidence,
            warnings: fit.warnings,
            is_manual_override: fit.is_manual_override,
            expires_at: fit.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChanceResultDto {
    pub college_id: i64,
    pub chance_percent: f64,
    pub category: String,
    pub region: String,
    pub factors: Vec<FactorDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorDto {
    pub name: String,
    pub contribution: f64,
    pub evidence: String,
}

impl From<ChanceResult> for ChanceResultDto {
    fn from(chance: ChanceResult) -> Self {
        Self {
            college_id: chance.college_id,
            chance_percent: chance.chance_percent,
            category: chance.category.as_str().to_string(),
            region: chance.region.as_str().to_string(),
            factors: chance
                .factors
                .into_iter()
                .map(|f| FactorDto {
                    name: f.name,
                    contribution: f.contribution,
                    evidence: f.evidence,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDto {
    pub id: i64,
    pub college_id: i64,
    pub title: String,
    pub task_type: String,
    pub status: String,
    pub estimated_hours: f64,
    pub priority: u8,
    pub deadline: Option<String>,
    pub is_reusable: bool,
    pub content_ready: bool,
}

impl From<Task> for TaskDto {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            college_id: task.college_id,
            title: task.title,
            task_type: task.task_type.as_str().to_string(),
            status: task.status.as_str().to_string(),
            estimated_hours: task.estimated_hours,
            priority: task.priority,
            deadline: task.deadline.map(|d| d.to_rfc3339()),
            is_reusable: task.is_reusable,
            content_ready: task.content_ready,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadlineDto {
    pub id: i64,
    pub college_id: Option<i64>,
    pub title: String,
    pub deadline_date: String,
    pub deadline_type: String,
    pub risk_level: String,
    pub buffer_hours: f64,
}

impl From<UserDeadline> for DeadlineDto {
    fn from(deadline: UserDeadline) -> Self {
        Self {
            id: deadline.id,
            college_id: deadline.college_id,
            title: deadline.title,
            deadline_date: deadline.deadline_date.to_rfc3339(),
            deadline_type: deadline.deadline_type.as_str().to_string(),
            risk_level: deadline.risk_level.as_str().to_string(),
            buffer_hours: deadline.buffer_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskDto {
    pub college_id: i64,
    pub risk_level: String,
    pub buffer_hours: f64,
    pub overall_risk_score: f64,
    pub tasks_total: u32,
    pub tasks_completed: u32,
    pub tasks_blocked: u32,
    pub next_critical_date: Option<String>,
    pub mitigations: Vec<String>,
}

impl From<RiskAssessment> for RiskDto {
    fn from(risk: RiskAssessment) -> Self {
        Self {
            college_id: risk.college_id,
            risk_level: risk.time_risk_level.as_str().to_string(),
            buffer_hours: risk.time_buffer_hours,
            overall_risk_score: risk.overall_risk_score,
            tasks_total: risk.tasks_total,
            tasks_completed: risk.tasks_completed,
            tasks_blocked: risk.tasks_blocked,
            next_critical_date: risk.next_critical_date.map(|d| d.to_rfc3339()),
            mitigations: risk.mitigations,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDto {
    pub level: String,
    pub message: String,
    pub created_at: String,
}

impl From<DeadlineAlert> for AlertDto {
    fn from(alert: DeadlineAlert) -> Self {
        Self {
            level: alert.level.as_str().to_string(),
            message: alert.message,
            created_at: alert.created_at.to_rfc3339(),
        }
    }
}
