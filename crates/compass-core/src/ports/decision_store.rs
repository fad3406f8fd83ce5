use crate::domain::{
    ChanceHistoryEntry, ChanceResult, ChangeLogEntry, DeadlineAlert, DecisionKind,
    DecisionRecord, FitResult, Override, RiskAssessment,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Cache + ledger store. Fit/Chance/Risk results are derived entities owned
/// by the cache; decision records and the change log are append-only.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DecisionStore: Send + Sync {
    // ========================================================================
    // Fit cache
    // ========================================================================

    async fn get_fit(
        &self,
        snapshot_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<FitResult>>;

    /// Upsert with compare-and-swap on computed_at: an entry already holding
    /// a newer computation wins over this write.
    async fn put_fit(&self, user_id: i64, fit: FitResult) -> anyhow::Result<()>;

    async fn delete_fit(&self, snapshot_id: i64, college_id: i64) -> anyhow::Result<bool>;

    async fn delete_fits_for_user(&self, user_id: i64) -> anyhow::Result<u64>;

    async fn delete_fits_for_college(&self, college_id: i64) -> anyhow::Result<u64>;

    /// (user_id, snapshot_id, college_id) keys whose fit entry has expired
    async fn expired_fit_keys(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<(i64, i64, i64)>>;

    // ========================================================================
    // Chance cache
    // ========================================================================

    async fn get_chance(
        &self,
        snapshot_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<ChanceResult>>;

    async fn put_chance(&self, user_id: i64, chance: ChanceResult) -> anyhow::Result<()>;

    async fn delete_chances_for_user(&self, user_id: i64) -> anyhow::Result<u64>;

    async fn delete_chances_for_college(&self, college_id: i64) -> anyhow::Result<u64>;

    // ========================================================================
    // Risk cache
    // ========================================================================

    async fn get_risk(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> anyhow::Result<Option<RiskAssessment>>;

    async fn put_risk(&self, risk: RiskAssessment) -> anyhow::Result<()>;

    async fn delete_risks_for_college(&self, college_id: i64) -> anyhow::Result<u64>;

    // ========================================================================
    // Decision ledger
    // ========================================================================

    async fn append_decision(&self, record: DecisionRecord) -> anyhow::Result<DecisionRecord>;

    /// Records for a user × college, newest first
    async fn decisions_for(
        &self,
        user_id: i64,
        college_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<DecisionRecord>>;

    async fn latest_decision(
        &self,
        user_id: i64,
        college_id: i64,
        kind: DecisionKind,
    ) -> anyhow::Result<Option<DecisionRecord>>;

    // ========================================================================
    // Chance history
    // ========================================================================

    async fn append_chance_history(
        &self,
        entry: ChanceHistoryEntry,
    ) -> anyhow::Result<ChanceHistoryEntry>;

    /// History entries for a user × college, newest first
    async fn chance_history(
        &self,
        user_id: i64,
        college_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<ChanceHistoryEntry>>;

    // ========================================================================
    // Change log
    // ========================================================================

    async fn append_change(&self, entry: ChangeLogEntry) -> anyhow::Result<ChangeLogEntry>;

    async fn changes_for_entity(
        &self,
        entity_type: String,
        entity_id: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<ChangeLogEntry>>;

    // ========================================================================
    // Overrides
    // ========================================================================

    /// Active (non-expired) override for an entity field, if any
    async fn get_active_override(
        &self,
        user_id: i64,
        entity_type: String,
        entity_id: i64,
        field_name: String,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Override>>;

    async fn insert_override(&self, entry: Override) -> anyhow::Result<Override>;

    /// Remove an override; returns whether one existed
    async fn delete_override(
        &self,
        user_id: i64,
        entity_type: String,
        entity_id: i64,
        field_name: String,
    ) -> anyhow::Result<bool>;

    // ========================================================================
    // Deadline alerts
    // ========================================================================

    async fn insert_alert(&self, alert: DeadlineAlert) -> anyhow::Result<DeadlineAlert>;

    /// Whether an alert of this level already fired for the deadline since
    /// `since` (the 24 h dedup window)
    async fn recent_alert_exists(
        &self,
        deadline_id: i64,
        level: crate::domain::AlertLevel,
        since: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    async fn alerts_for_user(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DeadlineAlert>>;
}
