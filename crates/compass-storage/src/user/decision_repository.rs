use super::models::{AlertRow, ChanceHistoryRow, ChangeLogRow, DecisionRow, OverrideRow};
use crate::convert::{opt_to_millis, to_millis};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compass_core::domain::{
    AlertLevel, ChanceHistoryEntry, ChanceResult, ChangeLogEntry, DeadlineAlert, DecisionKind,
    DecisionRecord, FitResult, Override, RiskAssessment,
};
use compass_core::ports::DecisionStore;
use sqlx::{query, query_as, SqlitePool};

/// Cache payload row shared by the fit/chance/risk caches: the full result
/// is stored as one JSON payload column.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PayloadRow {
    payload: String,
}

pub struct SqliteDecisionStore {
    pool: SqlitePool,
}

impl SqliteDecisionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DecisionStore for SqliteDecisionStore {
    // ========================================================================
    // Fit cache
    // ========================================================================

    async fn get_fit(
        &self,
        snapshot_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<FitResult>> {
        let row = query_as::<_, PayloadRow>(
            "SELECT payload FROM fit_cache WHERE snapshot_id = ? AND college_id = ?",
        )
        .bind(snapshot_id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| serde_json::from_str(&r.payload).map_err(Into::into))
            .transpose()
    }

    async fn put_fit(&self, user_id: i64, fit: FitResult) -> anyhow::Result<()> {
        // Compare-and-swap on computed_at: a racing refresh job cannot
        // clobber a newer entry with an older computation.
        query(
            "INSERT INTO fit_cache (snapshot_id, college_id, user_id, payload, computed_at,
                    expires_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(snapshot_id, college_id) DO UPDATE SET
                payload = excluded.payload,
                computed_at = excluded.computed_at,
                expires_at = excluded.expires_at
             WHERE excluded.computed_at >= fit_cache.computed_at",
        )
        .bind(fit.profile_snapshot_id)
        .bind(fit.college_id)
        .bind(user_id)
        .bind(serde_json::to_string(&fit)?)
        .bind(to_millis(fit.computed_at))
        .bind(to_millis(fit.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_fit(&self, snapshot_id: i64, college_id: i64) -> anyhow::Result<bool> {
        let result = query("DELETE FROM fit_cache WHERE snapshot_id = ? AND college_id = ?")
            .bind(snapshot_id)
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_fits_for_user(&self, user_id: i64) -> anyhow::Result<u64> {
        let result = query("DELETE FROM fit_cache WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_fits_for_college(&self, college_id: i64) -> anyhow::Result<u64> {
        let result = query("DELETE FROM fit_cache WHERE college_id = ?")
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn expired_fit_keys(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<(i64, i64, i64)>> {
        let rows: Vec<(i64, i64, i64)> = query_as(
            "SELECT user_id, snapshot_id, college_id FROM fit_cache
             WHERE expires_at <= ? LIMIT ?",
        )
        .bind(to_millis(now))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ========================================================================
    // Chance cache
    // ========================================================================

    async fn get_chance(
        &self,
        snapshot_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<ChanceResult>> {
        let row = query_as::<_, PayloadRow>(
            "SELECT payload FROM chance_cache WHERE snapshot_id = ? AND college_id = ?",
        )
        .bind(snapshot_id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| serde_json::from_str(&r.payload).map_err(Into::into))
            .transpose()
    }

    async fn put_chance(&self, user_id: i64, chance: ChanceResult) -> anyhow::Result<()> {
        query(
            "INSERT INTO chance_cache (snapshot_id, college_id, user_id, payload, computed_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(snapshot_id, college_id) DO UPDATE SET
                payload = excluded.payload,
                computed_at = excluded.computed_at
             WHERE excluded.computed_at >= chance_cache.computed_at",
        )
        .bind(chance.profile_snapshot_id)
        .bind(chance.college_id)
        .bind(user_id)
        .bind(serde_json::to_string(&chance)?)
        .bind(to_millis(chance.computed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_chances_for_user(&self, user_id: i64) -> anyhow::Result<u64> {
        let result = query("DELETE FROM chance_cache WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_chances_for_college(&self, college_id: i64) -> anyhow::Result<u64> {
        let result = query("DELETE FROM chance_cache WHERE college_id = ?")
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Risk cache
    // ========================================================================

    async fn get_risk(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<RiskAssessment>> {
        let row = query_as::<_, PayloadRow>(
            "SELECT payload FROM risk_cache WHERE user_id = ? AND college_id = ?",
        )
        .bind(user_id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| serde_json::from_str(&r.payload).map_err(Into::into))
            .transpose()
    }

    async fn put_risk(&self, risk: RiskAssessment) -> anyhow::Result<()> {
        query(
            "INSERT INTO risk_cache (user_id, college_id, payload, computed_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, college_id) DO UPDATE SET
                payload = excluded.payload,
                computed_at = excluded.computed_at
             WHERE excluded.computed_at >= risk_cache.computed_at",
        )
        .bind(risk.user_id)
        .bind(risk.college_id)
        .bind(serde_json::to_string(&risk)?)
        .bind(to_millis(risk.computed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_risks_for_college(&self, college_id: i64) -> anyhow::Result<u64> {
        let result = query("DELETE FROM risk_cache WHERE college_id = ?")
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Decision ledger
    // ========================================================================

    async fn append_decision(&self, record: DecisionRecord) -> anyhow::Result<DecisionRecord> {
        let result = query(
            "INSERT INTO decision_records (user_id, college_id, snapshot_id, kind, inputs,
                    weights, factors, output, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.college_id)
        .bind(record.snapshot_id)
        .bind(record.kind.as_str())
        .bind(serde_json::to_string(&record.inputs)?)
        .bind(serde_json::to_string(&record.weights)?)
        .bind(serde_json::to_string(&record.factors)?)
        .bind(serde_json::to_string(&record.output)?)
        .bind(to_millis(record.created_at))
        .execute(&self.pool)
        .await?;

        let mut stored = record;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn decisions_for(
        &self,
        user_id: i64,
        college_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<DecisionRecord>> {
        let rows = query_as::<_, DecisionRow>(
            "SELECT id, user_id, college_id, snapshot_id, kind, inputs, weights, factors,
                    output, created_at
             FROM decision_records
             WHERE user_id = ? AND college_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(college_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DecisionRow::into_domain).collect()
    }

    async fn latest_decision(
        &self,
        user_id: i64,
        college_id: i64,
        kind: DecisionKind,
    ) -> anyhow::Result<Option<DecisionRecord>> {
        let row = query_as::<_, DecisionRow>(
            "SELECT id, user_id, college_id, snapshot_id, kind, inputs, weights, factors,
                    output, created_at
             FROM decision_records
             WHERE user_id = ? AND college_id = ? AND kind = ?
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(college_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DecisionRow::into_domain).transpose()
    }

    // ========================================================================
    // Chance history
    // ========================================================================

    async fn append_chance_history(
        &self,
        entry: ChanceHistoryEntry,
    ) -> anyhow::Result<ChanceHistoryEntry> {
        let result = query(
            "INSERT INTO chance_history (user_id, college_id, chance_percent, category,
                    factors, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.college_id)
        .bind(entry.chance_percent)
        .bind(entry.category.as_str())
        .bind(serde_json::to_string(&entry.factors)?)
        .bind(to_millis(entry.recorded_at))
        .execute(&self.pool)
        .await?;

        let mut stored = entry;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn chance_history(
        &self,
        user_id: i64,
        college_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<ChanceHistoryEntry>> {
        let rows = query_as::<_, ChanceHistoryRow>(
            "SELECT id, user_id, college_id, chance_percent, category, factors, recorded_at
             FROM chance_history
             WHERE user_id = ? AND college_id = ?
             ORDER BY recorded_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(college_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ChanceHistoryRow::into_domain).collect()
    }

    // ========================================================================
    // Change log
    // ========================================================================

    async fn append_change(&self, entry: ChangeLogEntry) -> anyhow::Result<ChangeLogEntry> {
        let result = query(
            "INSERT INTO change_log (user_id, entity_type, entity_id, action, field_name,
                    old_value, new_value, changed_by, at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.field_name)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.changed_by.as_str())
        .bind(to_millis(entry.at))
        .execute(&self.pool)
        .await?;

        let mut stored = entry;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn changes_for_entity(
        &self,
        entity_type: String,
        entity_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<ChangeLogEntry>> {
        let rows = query_as::<_, ChangeLogRow>(
            "SELECT id, user_id, entity_type, entity_id, action, field_name, old_value,
                    new_value, changed_by, at
             FROM change_log
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY at DESC, id DESC LIMIT ?",
        )
        .bind(&entity_type)
        .bind(entity_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ChangeLogRow::into_domain).collect()
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    async fn get_active_override(
        &self,
        user_id: i64,
        entity_type: String,
        entity_id: i64,
        field_name: String,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Override>> {
        let row = query_as::<_, OverrideRow>(
            "SELECT id, user_id, entity_type, entity_id, field_name, original_value,
                    override_value, reason, expires_at, created_at
             FROM overrides
             WHERE user_id = ? AND entity_type = ? AND entity_id = ? AND field_name = ?
               AND (expires_at IS NULL OR expires_at > ?)
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(&entity_type)
        .bind(entity_id)
        .bind(&field_name)
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(OverrideRow::into_domain))
    }

    async fn insert_override(&self, entry: Override) -> anyhow::Result<Override> {
        let result = query(
            "INSERT INTO overrides (user_id, entity_type, entity_id, field_name,
                    original_value, override_value, reason, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.field_name)
        .bind(&entry.original_value)
        .bind(&entry.override_value)
        .bind(&entry.reason)
        .bind(opt_to_millis(entry.expires_at))
        .bind(to_millis(entry.created_at))
        .execute(&self.pool)
        .await?;

        let mut stored = entry;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn delete_override(
        &self,
        user_id: i64,
        entity_type: String,
        entity_id: i64,
        field_name: String,
    ) -> anyhow::Result<bool> {
        let result = query(
            "DELETE FROM overrides
             WHERE user_id = ? AND entity_type = ? AND entity_id = ? AND field_name = ?",
        )
        .bind(user_id)
        .bind(&entity_type)
        .bind(entity_id)
        .bind(&field_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Deadline alerts
    // ========================================================================

    async fn insert_alert(&self, alert: DeadlineAlert) -> anyhow::Result<DeadlineAlert> {
        let result = query(
            "INSERT INTO deadline_alerts (user_id, deadline_id, college_id, level, message,
                    created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(alert.user_id)
        .bind(alert.deadline_id)
        .bind(alert.college_id)
        .bind(alert.level.as_str())
        .bind(&alert.message)
        .bind(to_millis(alert.created_at))
        .execute(&self.pool)
        .await?;

        let mut stored = alert;
        stored.id = result.last_insert_rowid();
        Ok(stored)
    }

    async fn recent_alert_exists(
        &self,
        deadline_id: i64,
        level: AlertLevel,
        since: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let row: Option<(i64,)> = query_as(
            "SELECT id FROM deadline_alerts
             WHERE deadline_id = ? AND level = ? AND created_at >= ? LIMIT 1",
        )
        .bind(deadline_id)
        .bind(level.as_str())
        .bind(to_millis(since))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn alerts_for_user(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DeadlineAlert>> {
        let rows = query_as::<_, AlertRow>(
            "SELECT id, user_id, deadline_id, college_id, level, message, created_at
             FROM deadline_alerts
             WHERE user_id = ? AND created_at >= ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AlertRow::into_domain).collect()
    }
}
