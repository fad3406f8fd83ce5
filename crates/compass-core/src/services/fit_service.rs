use crate::config::EngineConfig;
use crate::domain::{
    ChangeLogEntry, ChangedBy, College, DecisionKind, DomainError, FitCategory, FitResult,
    FitWeights, Override, ProfileSnapshot,
};
use crate::fit;
use crate::ports::{ApplicationStore, Clock, CollegeStore, DecisionStore, ProfileStore};
use crate::services::ledger_service::LedgerService;
use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, instrument};

const OVERRIDE_ENTITY: &str = "fit";
const OVERRIDE_FIELD: &str = "category";

/// One failed item in a batch operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchError {
    pub college_id: i64,
    pub kind: String,
}

/// Batch operations never fail wholesale on single-item errors.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub errors: Vec<BatchError>,
    /// Set when the input list exceeded the batch cap and was cut.
    pub truncated: bool,
}

/// Fit classification service: orchestrates snapshot resolution, scoring,
/// the result cache, user weights, manual overrides, and ledger writes.
pub struct FitService {
    profiles: Arc<dyn ProfileStore>,
    colleges: Arc<dyn CollegeStore>,
    applications: Arc<dyn ApplicationStore>,
    decisions: Arc<dyn DecisionStore>,
    ledger: Arc<LedgerService>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl FitService {
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

    /// Classify fit for a (profile, college) pair, serving from the cache
    /// when a fresh entry exists.
    #[instrument(skip(self))]
    pub async fn classify_fit(&self, profile_id: i64, college_id: i64) -> Result<FitResult> {
        let snapshot = self.resolve_snapshot(profile_id).await?;
        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or(DomainError::CollegeNotFound(college_id))?;

        let now = self.clock.now();
        let override_entry = self
            .decisions
            .get_active_override(
                snapshot.user_id,
                OVERRIDE_ENTITY.to_string(),
                college_id,
                OVERRIDE_FIELD.to_string(),
                now,
            )
            .await?;

        if let Some(cached) = self.decisions.get_fit(snapshot.id, college_id).await? {
            if cached.expires_at > now {
                debug!(snapshot_id = snapshot.id, college_id, "fit cache hit");
                return Ok(apply_override(cached, override_entry.as_ref()));
            }
        }

        let computed = self.compute_fit(&snapshot, &college).await?;

        // The ledger always records the computed value; the override only
        // shadows what callers see.
        self.ledger
            .record(
                DecisionKind::Fit,
                snapshot.user_id,
                college_id,
                snapshot.id,
                serde_json::json!({
                    "gpa": snapshot.profile.academic.gpa(),
                    "sat_total": snapshot.profile.academic.sat_total,
                    "act_composite": snapshot.profile.academic.act_composite,
                    "activities": snapshot.activities.len(),
                    "acceptance_rate": college.acceptance_rate,
                }),
                serde_json::to_value(computed.weights)?,
                computed.factors.clone(),
                serde_json::json!({
                    "overall_score": computed.overall_score,
                    "category": computed.category.as_str(),
                    "confidence": computed.confidence,
                }),
                now,
            )
            .await?;

        let result = FitResult {
            profile_snapshot_id: snapshot.id,
            college_id,
            overall_score: computed.overall_score,
            category: computed.category,
            subscores: computed.subscores,
            confidence: computed.confidence,
            warnings: computed.warnings,
            factors: computed.factors,
            computed_at: now,
            expires_at: now + Duration::days(self.config.scoring.cache_ttl_days),
            is_manual_override: false,
        };
        self.decisions
            .put_fit(snapshot.user_id, result.clone())
            .await?;

        Ok(apply_override(result, override_entry.as_ref()))
    }

    /// Batch classification, capped at `batch.max_colleges`; the overflow is
    /// dropped and reported via `truncated`.
    #[instrument(skip(self, college_ids))]
    pub async fn classify_fit_batch(
        &self,
        profile_id: i64,
        mut college_ids: Vec<i64>,
    ) -> Result<BatchOutcome<FitResult>> {
        let cap = self.config.batch.max_colleges;
        let truncated = college_ids.len() > cap;
        if truncated {
            tracing::warn!(
                requested = college_ids.len(),
                cap,
                "fit batch truncated to cap"
            );
            college_ids.truncate(cap);
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for college_id in college_ids {
            match self.classify_fit(profile_id, college_id).await {
                Ok(fit) => results.push(fit),
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

    /// Replace a user's fit weights. Rejects tuples not summing to
    /// 1.0 ± 0.01 and invalidates the user's cached fits.
    pub async fn set_user_weights(&self, user_id: i64, weights: FitWeights) -> Result<()> {
        if !weights.validate() {
            return Err(DomainError::InvalidWeights {
                sum: weights.sum(),
            }
            .into());
        }
        self.profiles.set_user_weights(user_id, weights).await?;
        self.decisions.delete_fits_for_user(user_id).await?;
        self.ledger
            .log_change(ChangeLogEntry {
                id: 0,
                user_id: Some(user_id),
                entity_type: "fit_weights".to_string(),
                entity_id: user_id,
                action: "updated".to_string(),
                field_name: None,
                old_value: None,
                new_value: Some(serde_json::to_string(&weights)?),
                changed_by: ChangedBy::User,
                at: self.clock.now(),
            })
            .await?;
        Ok(())
    }

    /// Pin a fit category manually. The computed category keeps flowing to
    /// the ledger; reads see the pinned value until `clear_override`.
    pub async fn override_fit(
        &self,
        user_id: i64,
        college_id: i64,
        category: FitCategory,
        reason: Option<String>,
    ) -> Result<FitResult> {
        let now = self.clock.now();
        if let Some(existing) = self
            .decisions
            .get_active_override(
                user_id,
                OVERRIDE_ENTITY.to_string(),
                college_id,
                OVERRIDE_FIELD.to_string(),
                now,
            )
            .await?
        {
            if existing.override_value != category.as_str() {
                return Err(DomainError::ConflictingOverride {
                    entity_type: OVERRIDE_ENTITY.to_string(),
                    entity_id: college_id,
                    field: OVERRIDE_FIELD.to_string(),
                }
                .into());
            }
        }

        let profile = self
            .profiles
            .get_profile_by_user(user_id)
            .await?
            .ok_or(DomainError::ProfileNotFound(user_id))?;

        // Compute first so the override stores the shadowed original.
        let computed = self.classify_fit(profile.id, college_id).await?;

        self.decisions
            .insert_override(Override {
                id: 0,
                user_id,
                entity_type: OVERRIDE_ENTITY.to_string(),
                entity_id: college_id,
                field_name: OVERRIDE_FIELD.to_string(),
                original_value: computed.category.as_str().to_string(),
                override_value: category.as_str().to_string(),
                reason: reason.clone(),
                expires_at: None,
                created_at: now,
            })
            .await?;

        self.ledger
            .log_change(ChangeLogEntry {
                id: 0,
                user_id: Some(user_id),
                entity_type: OVERRIDE_ENTITY.to_string(),
                entity_id: college_id,
                action: "override_set".to_string(),
                field_name: Some(OVERRIDE_FIELD.to_string()),
                old_value: Some(computed.category.as_str().to_string()),
                new_value: Some(category.as_str().to_string()),
                changed_by: ChangedBy::User,
                at: now,
            })
            .await?;

        let mut overridden = computed;
        overridden.category = category;
        overridden.is_manual_override = true;
        Ok(overridden)
    }

    /// Remove a manual override and invalidate the affected cache entries
    /// so recomputation takes over.
    pub async fn clear_override(&self, user_id: i64, college_id: i64) -> Result<bool> {
        let removed = self
            .decisions
            .delete_override(
                user_id,
                OVERRIDE_ENTITY.to_string(),
                college_id,
                OVERRIDE_FIELD.to_string(),
            )
            .await?;
        if removed {
            self.decisions.delete_fits_for_user(user_id).await?;
            self.ledger
                .log_change(ChangeLogEntry {
                    id: 0,
                    user_id: Some(user_id),
                    entity_type: OVERRIDE_ENTITY.to_string(),
                    entity_id: college_id,
                    action: "override_cleared".to_string(),
                    field_name: Some(OVERRIDE_FIELD.to_string()),
                    old_value: None,
                    new_value: None,
                    changed_by: ChangedBy::User,
                    at: self.clock.now(),
                })
                .await?;
        }
        Ok(removed)
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

    async fn compute_fit(
        &self,
        snapshot: &ProfileSnapshot,
        college: &College,
    ) -> Result<fit::FitComputation> {
        let weights = self
            .profiles
            .get_user_weights(snapshot.user_id)
            .await?
            .unwrap_or(self.config.scoring.default_weights);

        // Timeline feeds off the remaining task estimate: real tasks when an
        // application exists, the decomposition template otherwise.
        let tasks = self
            .applications
            .tasks_for_user_college(snapshot.user_id, college.id)
            .await?;
        let estimate_hours: f64 = if tasks.is_empty() {
            let international = snapshot.profile.is_international_for(&college.country);
            crate::tasks::decompose(&college.requirements, international)
                .iter()
                .map(|t| t.estimated_hours)
                .sum()
        } else {
            tasks
                .iter()
                .filter(|t| t.status.is_open())
                .map(|t| t.estimated_hours)
                .sum()
        };

        let computation = fit::classify(
            snapshot,
            college,
            weights,
            Some(estimate_hours),
            self.clock.now(),
            self.config.risk.productive_hours_per_day,
        )?;
        Ok(computation)
    }
}

fn apply_override(mut fit: FitResult, override_entry: Option<&Override>) -> FitResult {
    if let Some(entry) = override_entry {
        if let Ok(category) = FitCategory::parse(&entry.override_value) {
            fit.category = category;
            fit.is_manual_override = true;
        }
    }
    fit
}

/// Stable error kind for batch reporting.
pub(crate) fn error_kind(err: &anyhow::Error) -> String {
    err.downcast_ref::<DomainError>()
        .map(|e| e.kind().to_string())
        .unwrap_or_else(|| "INTERNAL".to_string())
}
