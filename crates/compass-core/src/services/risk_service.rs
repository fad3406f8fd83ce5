use crate::config::EngineConfig;
use crate::domain::{
    DeadlineAlert, DeadlineType, DecisionKind, DomainError, RiskAssessment, RiskFactor,
    RiskLevel, TaskStatus, UserDeadline,
};
use crate::ports::{ApplicationStore, Clock, CollegeStore, DecisionStore, ProfileStore};
use crate::risk::{alert_for_transition, compute_risk};
use crate::services::ledger_service::LedgerService;
use crate::tasks::{TaskGraph, RECOMMENDATION_LEAD_DAYS};
use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Aggregate view over a user's deadline risk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskOverview {
    pub total_colleges: u32,
    pub safe: u32,
    pub tight: u32,
    pub critical_count: u32,
    pub impossible_count: u32,
    pub critical: Vec<RiskAssessment>,
    pub impossible: Vec<RiskAssessment>,
    pub alerts: Vec<DeadlineAlert>,
}

/// Deadline-risk engine: derives per-deadline risk levels from remaining
/// tasks and calendar time, emits deduplicated alerts on transitions, and
/// flags colleges that can no longer be finished on time.
pub struct RiskService {
    profiles: Arc<dyn ProfileStore>,
    colleges: Arc<dyn CollegeStore>,
    applications: Arc<dyn ApplicationStore>,
    decisions: Arc<dyn DecisionStore>,
    ledger: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl RiskService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        colleges: Arc<dyn CollegeStore>,
        applications: Arc<dyn ApplicationStore>,
        decisions: Arc<dyn DecisionStore>,
        ledger: Arc<LedgerService>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            profiles,
            colleges,
            applications,
            decisions,
            ledger,
            clock,
            config,
        }
    }

    /// Copy the college's canonical deadlines into the user's deadline list
    /// when none exist yet for the pair.
    #[instrument(skip(self))]
    pub async fn sync_from_college_deadlines(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> Result<Vec<UserDeadline>> {
        let existing = self
            .applications
            .deadlines_for_user_college(user_id, college_id)
            .await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or(DomainError::CollegeNotFound(college_id))?;
        let application = self.applications.get_application(user_id, college_id).await?;

        let mut created = Vec::new();
        for (round, date) in college.deadlines.iter_rounds() {
            let deadline = self
                .applications
                .insert_user_deadline(UserDeadline {
                    id: 0,
                    user_id,
                    college_id: Some(college_id),
                    application_id: application.as_ref().map(|a| a.id),
                    title: format!("{} {}", college.name, round),
                    deadline_date: date,
                    deadline_type: DeadlineType::Official,
                    risk_level: RiskLevel::Safe,
                    buffer_hours: 0.0,
                })
                .await?;
            created.push(deadline);
        }
        info!(user_id, college_id, count = created.len(), "synced deadlines");
        Ok(created)
    }

    /// Compute the risk assessment for a (user, college) pair, persist it,
    /// and emit transition alerts.
    #[instrument(skip(self))]
    pub async fn calculate_risk(&self, user_id: i64, college_id: i64) -> Result<RiskAssessment> {
        let now = self.clock.now();
        let deadlines = self.sync_from_college_deadlines(user_id, college_id).await?;
        let tasks = self
            .applications
            .tasks_for_user_college(user_id, college_id)
            .await?;
        let dependencies = self.applications.dependencies_for_user(user_id).await?;
        let graph = TaskGraph::new(tasks.clone(), dependencies);

        let needed_hours: f64 = tasks
            .iter()
            .filter(|t| t.status.is_open())
            .map(|t| t.estimated_hours)
            .sum();

        let tasks_total = tasks.len() as u32;
        let tasks_completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Complete)
            .count() as u32;
        let tasks_blocked = graph.blocked_task_ids().len() as u32;

        // Nearest upcoming deadline drives the assessment; with none ahead,
        // the most recent one keeps the impossible flag honest.
        let nearest = deadlines
            .iter()
            .filter(|d| d.deadline_date > now)
            .min_by_key(|d| d.deadline_date)
            .or_else(|| deadlines.iter().max_by_key(|d| d.deadline_date));

        let (computation, next_critical_date) = match nearest {
            Some(deadline) => {
                let computation =
                    compute_risk(deadline.deadline_date, needed_hours, now, &self.config.risk);
                (computation, Some(deadline.deadline_date))
            }
            None => (
                // No deadline on file at all: nothing to race against.
                compute_risk(now + Duration::days(365), needed_hours, now, &self.config.risk),
                None,
            ),
        };

        let mut risk_factors = Vec::new();
        let mut mitigations = Vec::new();

        if computation.level == RiskLevel::Impossible {
            risk_factors.push(RiskFactor {
                name: "deadline_unreachable".to_string(),
                severity: RiskLevel::Impossible,
                detail: format!(
                    "{:.1}h of work remain but only {:.1}h of study time are left",
                    computation.needed_hours, computation.available_hours
                ),
            });
            mitigations
                .push("Drop this college or switch to a later application cycle".to_string());
        } else if computation.level >= RiskLevel::Tight {
            risk_factors.push(RiskFactor {
                name: "schedule_pressure".to_string(),
                severity: computation.level,
                detail: format!("buffer down to {:.1}h", computation.buffer_hours),
            });
            mitigations.push("Prioritize the critical path and defer reusable work".to_string());
        }

        if tasks_blocked > 0 {
            risk_factors.push(RiskFactor {
                name: "blocked_tasks".to_string(),
                severity: RiskLevel::Tight,
                detail: format!("{} tasks are waiting on prerequisites", tasks_blocked),
            });
        }

        // Advisory recommendation lead time: requests still open within the
        // lead window surface as a factor, never a block.
        if let Some(submit_deadline) = next_critical_date {
            let lead_cutoff = submit_deadline - Duration::days(RECOMMENDATION_LEAD_DAYS);
            let late_recommendations = tasks
                .iter()
                .filter(|t| {
                    t.task_type == crate::domain::TaskType::Recommendation
                        && t.status.is_open()
                        && now > lead_cutoff
                })
                .count();
            if late_recommendations > 0 {
                risk_factors.push(RiskFactor {
                    name: "recommendation_lead_time".to_string(),
                    severity: RiskLevel::Tight,
                    detail: format!(
                        "{} recommendation requests inside the {}-day lead window",
                        late_recommendations, RECOMMENDATION_LEAD_DAYS
                    ),
                });
                mitigations.push("Send recommendation requests today".to_string());
            }
        }

        let blocked_penalty = (tasks_blocked as f64 * 2.0).min(10.0);
        let overall_risk_score = (computation.score + blocked_penalty).min(100.0);

        let assessment = RiskAssessment {
            user_id,
            college_id,
            time_risk_level: computation.level,
            time_buffer_hours: computation.buffer_hours,
            tasks_total,
            tasks_completed,
            tasks_blocked,
            overall_risk_score,
            risk_factors,
            mitigations,
            next_critical_date,
            computed_at: now,
        };

        self.decisions.put_risk(assessment.clone()).await?;

        // Persist per-deadline levels and fire transition alerts against
        // the previously stored level.
        for deadline in &deadlines {
            let deadline_risk =
                compute_risk(deadline.deadline_date, needed_hours, now, &self.config.risk);
            self.applications
                .update_deadline_risk(deadline.id, deadline_risk.level, deadline_risk.buffer_hours)
                .await?;

            if let Some(level) =
                alert_for_transition(Some(deadline.risk_level), deadline_risk.level)
            {
                self.emit_alert(user_id, deadline, level, &deadline_risk.level, now)
                    .await?;
            }
        }

        let snapshot_id = self
            .profiles
            .latest_snapshot(user_id)
            .await?
            .map(|s| s.id)
            .unwrap_or(0);
        self.ledger
            .record(
                DecisionKind::Risk,
                user_id,
                college_id,
                snapshot_id,
                serde_json::json!({
                    "needed_hours": computation.needed_hours,
                    "available_hours": computation.available_hours,
                    "tasks_total": tasks_total,
                    "tasks_blocked": tasks_blocked,
                }),
                serde_json::Value::Null,
                vec![],
                serde_json::json!({
                    "risk_level": assessment.time_risk_level.as_str(),
                    "overall_risk_score": assessment.overall_risk_score,
                    "buffer_hours": assessment.time_buffer_hours,
                }),
                now,
            )
            .await?;

        Ok(assessment)
    }

    /// Aggregate risk across the user's applications.
    #[instrument(skip(self))]
    pub async fn get_overview(&self, user_id: i64) -> Result<RiskOverview> {
        let applications = self.applications.applications_for_user(user_id).await?;
        let mut overview = RiskOverview {
            total_colleges: 0,
            safe: 0,
            tight: 0,
            critical_count: 0,
            impossible_count: 0,
            critical: Vec::new(),
            impossible: Vec::new(),
            alerts: Vec::new(),
        };

        for application in &applications {
            let assessment = self
                .calculate_risk(user_id, application.college_id)
                .await?;
            overview.total_colleges += 1;
            match assessment.time_risk_level {
                RiskLevel::Safe => overview.safe += 1,
                RiskLevel::Tight => overview.tight += 1,
                RiskLevel::Critical => {
                    overview.critical_count += 1;
                    overview.critical.push(assessment);
                }
                RiskLevel::Impossible => {
                    overview.impossible_count += 1;
                    overview.impossible.push(assessment);
                }
            }
        }

        overview.alerts = self
            .decisions
            .alerts_for_user(user_id, self.clock.now() - Duration::days(7))
            .await?;
        Ok(overview)
    }

    /// Daily recheck over every application; returns the alerts fired.
    #[instrument(skip(self))]
    pub async fn run_daily_check(&self, user_id: i64) -> Result<Vec<DeadlineAlert>> {
        let since = self.clock.now();
        let applications = self.applications.applications_for_user(user_id).await?;
        for application in &applications {
            if let Err(err) = self.calculate_risk(user_id, application.college_id).await {
                warn!(
                    user_id,
                    college_id = application.college_id,
                    error = %err,
                    "daily risk recheck failed for college"
                );
            }
        }
        self.decisions.alerts_for_user(user_id, since).await
    }

    /// Colleges whose nearest active deadline can no longer be met.
    pub async fn flag_impossible_colleges(&self, user_id: i64) -> Result<Vec<i64>> {
        let applications = self.applications.applications_for_user(user_id).await?;
        let mut impossible = Vec::new();
        for application in &applications {
            let assessment = self
                .calculate_risk(user_id, application.college_id)
                .await?;
            if assessment.time_risk_level == RiskLevel::Impossible {
                impossible.push(application.college_id);
            }
        }
        Ok(impossible)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn emit_alert(
        &self,
        user_id: i64,
        deadline: &UserDeadline,
        level: crate::domain::AlertLevel,
        risk_level: &RiskLevel,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        // Dedup: one alert per level per deadline per 24h.
        let since = now - Duration::hours(24);
        if self
            .decisions
            .recent_alert_exists(deadline.id, level, since)
            .await?
        {
            return Ok(());
        }
        self.decisions
            .insert_alert(DeadlineAlert {
                id: 0,
                user_id,
                deadline_id: deadline.id,
                college_id: deadline.college_id,
                level,
                message: format!(
                    "{}: risk is now {} ({})",
                    deadline.title,
                    risk_level,
                    deadline.deadline_date.format("%Y-%m-%d")
                ),
                created_at: now,
            })
            .await?;
        Ok(())
    }
}
