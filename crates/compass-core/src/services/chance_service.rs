use crate::chancing::{self, ChanceDelta, ProposedChanges, ScenarioDiff, ScenarioSummary};
use crate::config::EngineConfig;
use crate::domain::{
    ChanceCategory, ChanceHistoryEntry, ChanceResult, College, DecisionKind, DomainError, Factor,
    ProfileSnapshot,
};
use crate::ports::{ApplicationStore, Clock, CollegeStore, DecisionStore, ProfileStore};
use crate::services::fit_service::{error_kind, BatchError, BatchOutcome};
use crate::services::ledger_service::LedgerService;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outcome of a what-if scenario across a college list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScenarioOutcome {
    pub diffs: Vec<ScenarioDiff>,
    pub summary: ScenarioSummary,
    pub truncated: bool,
}

/// Outcome of a history comparison across the user's application list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CompareOutcome {
    pub deltas: Vec<ChanceDelta>,
    pub improved: u32,
    pub decreased: u32,
    pub avg_change: f64,
}

/// Chancing service: region-dispatched deterministic estimates with a
/// cache, an append-only history, scenario diffing, and the optional
/// validated-model overlay.
pub struct ChanceService {
    profiles: Arc<dyn ProfileStore>,
    colleges: Arc<dyn CollegeStore>,
    applications: Arc<dyn ApplicationStore>,
    decisions: Arc<dyn DecisionStore>,
    ledger: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ChanceService {
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

    /// Calculate the admission chance for a (profile, college) pair.
    #[instrument(skip(self))]
    pub async fn calculate(&self, profile_id: i64, college_id: i64) -> Result<ChanceResult> {
        let snapshot = self.resolve_snapshot(profile_id).await?;
        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or(DomainError::CollegeNotFound(college_id))?;

        if !snapshot.profile.academic.has_gpa()
            && !snapshot.profile.academic.has_test_score()
            && !snapshot.profile.regional.has_jee()
            && !snapshot.profile.regional.has_uk_predictions()
            && !snapshot.profile.regional.has_abitur()
        {
            return Err(DomainError::ProfileIncomplete {
                missing: vec!["gpa".to_string(), "test_score".to_string()],
            }
            .into());
        }

        if let Some(cached) = self.decisions.get_chance(snapshot.id, college_id).await? {
            debug!(snapshot_id = snapshot.id, college_id, "chance cache hit");
            return Ok(cached);
        }

        let result = self.compute(&snapshot, &college).await?;

        self.ledger
            .record(
                DecisionKind::Chance,
                snapshot.user_id,
                college_id,
                snapshot.id,
                serde_json::json!({
                    "region": result.region.as_str(),
                    "acceptance_rate": college.acceptance_rate,
                }),
                serde_json::Value::Null,
                result.factors.clone(),
                serde_json::json!({
                    "chance_percent": result.chance_percent,
                    "category": result.category.as_str(),
                }),
                result.computed_at,
            )
            .await?;

        self.decisions
            .put_chance(snapshot.user_id, result.clone())
            .await?;
        Ok(result)
    }

    /// Batch chancing with the shared college cap.
    #[instrument(skip(self, college_ids))]
    pub async fn calculate_batch(
        &self,
        profile_id: i64,
        mut college_ids: Vec<i64>,
    ) -> Result<BatchOutcome<ChanceResult>> {
        let cap = self.config.batch.max_colleges;
        let truncated = college_ids.len() > cap;
        if truncated {
            college_ids.truncate(cap);
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for college_id in college_ids {
            match self.calculate(profile_id, college_id).await {
                Ok(result) => results.push(result),
                Err(err) => errors.push(BatchError {
                    college_id,
                    kind: error_kind(&err),
                }),
            }
        }

        Ok(BatchOutcome {
            results,
            errors,
            truncated,
        })
    }

    /// What-if analysis: apply `changes` to a cloned snapshot and diff the
    /// chance per college. Purely functional; persists nothing. Both sides
    /// use the rule-based formula so diffs isolate the proposed changes.
    #[instrument(skip(self, changes, college_ids))]
    pub async fn scenario(
        &self,
        profile_id: i64,
        changes: ProposedChanges,
        mut college_ids: Vec<i64>,
    ) -> Result<ScenarioOutcome> {
        let cap = self.config.batch.max_colleges;
        let truncated = college_ids.len() > cap;
        if truncated {
            college_ids.truncate(cap);
        }

        let snapshot = self.resolve_snapshot(profile_id).await?;
        let scenario_snapshot = chancing::apply_changes(&snapshot, &changes);

        let colleges = self.colleges.get_colleges(college_ids).await?;
        let mut diffs = Vec::new();
        let mut improved = 0u32;
        let mut decreased = 0u32;
        let mut total_change = 0.0;

        for college in &colleges {
            let old = chancing::calculate(&snapshot, college, &self.config.chancing);
            let new = chancing::calculate(&scenario_snapshot, college, &self.config.chancing);
            let change = chancing::round1(new.chance_percent - old.chance_percent);
            if change > 0.0 {
                improved += 1;
            } else if change < 0.0 {
                decreased += 1;
            }
            total_change += change;
            diffs.push(ScenarioDiff {
                college_id: college.id,
                old_chance: old.chance_percent,
                new_chance: new.chance_percent,
                change,
                category_changed: old.category != new.category,
            });
        }

        let avg_change = if diffs.is_empty() {
            0.0
        } else {
            chancing::round1(total_change / diffs.len() as f64)
        };

        Ok(ScenarioOutcome {
            diffs,
            summary: ScenarioSummary {
                improved,
                decreased,
                avg_change,
            },
            truncated,
        })
    }

    /// Append a chance snapshot to the history log.
    pub async fn save_history(
        &self,
        user_id: i64,
        college_id: i64,
        chance_percent: f64,
        category: ChanceCategory,
        factors: Vec<Factor>,
    ) -> Result<i64> {
        let entry = self
            .decisions
            .append_chance_history(ChanceHistoryEntry {
                id: 0,
                user_id,
                college_id,
                chance_percent,
                category,
                factors,
                recorded_at: self.clock.now(),
            })
            .await?;
        Ok(entry.id)
    }

    /// Diff each college in the user's application list against the most
    /// recent prior history entry. Reads the ledgered history only.
    #[instrument(skip(self))]
    pub async fn compare(&self, user_id: i64) -> Result<CompareOutcome> {
        let applications = self.applications.applications_for_user(user_id).await?;
        let mut deltas = Vec::new();
        let mut improved = 0u32;
        let mut decreased = 0u32;
        let mut total_change = 0.0;

        for application in applications {
            let history = self
                .decisions
                .chance_history(user_id, application.college_id, 2)
                .await?;
            if history.len() < 2 {
                continue;
            }
            let current = &history[0];
            let previous = &history[1];
            let change = chancing::round1(current.chance_percent - previous.chance_percent);
            if change > 0.0 {
                improved += 1;
            } else if change < 0.0 {
                decreased += 1;
            }
            total_change += change;
            deltas.push(ChanceDelta {
                college_id: application.college_id,
                previous: previous.chance_percent,
                current: current.chance_percent,
                change,
                category_changed: current.category != previous.category,
            });
        }

        let avg_change = if deltas.is_empty() {
            0.0
        } else {
            chancing::round1(total_change / deltas.len() as f64)
        };

        Ok(CompareOutcome {
            deltas,
            improved,
            decreased,
            avg_change,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn resolve_snapshot(&self, profile_id: i64) -> Result<ProfileSnapshot> {
        let profile = self
            .profiles
            .get_profile(profile_id)
            .await?
            .ok_or(DomainError::ProfileNotFound(profile_id))?;

        match self.profiles.latest_snapshot(profile.user_id).await? {
            Some(snapshot) => Ok(snapshot),
            None => Ok(self
                .profiles
                .create_snapshot(profile_id, self.clock.now())
                .await?),
        }
    }

    /// Rule-based chance plus, when a validated model is deployed, a small
    /// learned overlay. The rule-based calculator stays authoritative.
    async fn compute(
        &self,
        snapshot: &ProfileSnapshot,
        college: &College,
    ) -> Result<ChanceResult> {
        let mut computation = chancing::calculate(snapshot, college, &self.config.chancing);

        if let Some(model) = self.colleges.get_deployed_model(college.id).await? {
            if model.accuracy >= self.config.training.overlay_accuracy_threshold {
                let cap = self.config.training.max_adjustment_pp;
                let adjustment = model.adjustment_pp.clamp(-cap, cap);
                let nudged = (computation.chance_percent + adjustment)
                    .clamp(self.config.chancing.clamp_min, self.config.chancing.clamp_max);
                computation.factors.push(Factor::new(
                    "model_overlay",
                    1.0,
                    chancing::round1(nudged - computation.chance_percent),
                    format!(
                        "model v{} accuracy {:.2}",
                        model.version, model.accuracy
                    ),
                ));
                computation.chance_percent = chancing::round1(nudged);
            }
        }

        Ok(ChanceResult {
            profile_snapshot_id: snapshot.id,
            college_id: college.id,
            chance_percent: computation.chance_percent,
            category: computation.category,
            region: computation.region,
            factors: computation.factors,
            computed_at: self.clock.now(),
        })
    }
}
