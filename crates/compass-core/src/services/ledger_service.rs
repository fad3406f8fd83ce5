use crate::domain::{
    ChangeLogEntry, DecisionKind, DecisionRecord, DomainError, Factor,
};
use crate::ports::DecisionStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Assembled, human-readable trace of the decisions recorded for one
/// user × college pair.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExplainTrace {
    pub user_id: i64,
    pub college_id: i64,
    pub fit: Option<DecisionRecord>,
    pub chance: Option<DecisionRecord>,
    pub risk: Option<DecisionRecord>,
    pub lines: Vec<String>,
}

/// Explanation ledger: every fit, chance, and risk computation writes an
/// immutable record here. The ledger is the single source of truth for
/// explanations and history diffs; history is never recomputed on the fly.
pub struct LedgerService {
    decisions: Arc<dyn DecisionStore>,
}

impl LedgerService {
    pub fn new(decisions: Arc<dyn DecisionStore>) -> Self {
        Self { decisions }
    }

    /// Append one decision record. `output` must contain the *computed*
    /// value even when a user override shadows it.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        kind: DecisionKind,
        user_id: i64,
        college_id: i64,
        snapshot_id: i64,
        inputs: serde_json::Value,
        weights: serde_json::Value,
        factors: Vec<Factor>,
        output: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<DecisionRecord> {
        let record = DecisionRecord {
            id: 0,
            user_id,
            college_id,
            snapshot_id,
            kind,
            inputs,
            weights,
            factors,
            output,
            created_at: at,
        };
        self.decisions.append_decision(record).await
    }

    /// Record an audit entry in the append-only change log.
    pub async fn log_change(&self, entry: ChangeLogEntry) -> Result<ChangeLogEntry> {
        self.decisions.append_change(entry).await
    }

    /// Reassemble the latest fit/chance/risk records into a readable trace.
    /// Fails with NOT_FOUND when nothing was ever recorded for the pair.
    pub async fn explain(&self, user_id: i64, college_id: i64) -> Result<ExplainTrace> {
        let fit = self
            .decisions
            .latest_decision(user_id, college_id, DecisionKind::Fit)
            .await?;
        let chance = self
            .decisions
            .latest_decision(user_id, college_id, DecisionKind::Chance)
            .await?;
        let risk = self
            .decisions
            .latest_decision(user_id, college_id, DecisionKind::Risk)
            .await?;

        if fit.is_none() && chance.is_none() && risk.is_none() {
            return Err(DomainError::NotFound(format!(
                "no decisions recorded for user {} college {}",
                user_id, college_id
            ))
            .into());
        }

        let mut lines = Vec::new();
        for record in [&fit, &chance, &risk].into_iter().flatten() {
            lines.push(format!(
                "{} (snapshot {}, {}):",
                record.kind.as_str(),
                record.snapshot_id,
                record.created_at.format("%Y-%m-%d %H:%M")
            ));
            lines.push(format!("  output: {}", record.output));
            for factor in &record.factors {
                lines.push(format!(
                    "  {:<24} weight {:>5.2}  contribution {:>+7.2}  ({})",
                    factor.name, factor.weight, factor.contribution, factor.evidence
                ));
            }
        }

        Ok(ExplainTrace {
            user_id,
            college_id,
            fit,
            chance,
            risk,
            lines,
        })
    }
}
