use crate::domain::{College, CollegeDeadlines, ModelVersion};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CollegeStore: Send + Sync {
    /// Get a college by id
    async fn get_college(&self, college_id: i64) -> anyhow::Result<Option<College>>;

    /// Get several colleges at once; missing ids are silently absent
    async fn get_colleges(&self, college_ids: Vec<i64>) -> anyhow::Result<Vec<College>>;

    /// Insert or update a college record (ingestion-side reconciliation)
    async fn upsert_college(&self, college: College) -> anyhow::Result<College>;

    /// Replace a college's published deadlines and stamp the scrape time;
    /// resets the consecutive-failure counter.
    async fn update_deadlines(
        &self,
        college_id: i64,
        deadlines: CollegeDeadlines,
        scraped_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Increment the consecutive scrape-failure counter; returns the new count
    async fn record_scrape_failure(&self, college_id: i64) -> anyhow::Result<u32>;

    /// Queue a college for manual review after repeated scrape failures
    async fn mark_manual_review(&self, college_id: i64) -> anyhow::Result<()>;

    /// Random sample of colleges whose last_scraped is older than `cutoff`
    /// (or never scraped), at most `limit`
    async fn stale_colleges(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<College>>;

    // ========================================================================
    // Model registry (chance-overlay models)
    // ========================================================================

    /// Currently deployed model version for a college, if any
    async fn get_deployed_model(&self, college_id: i64) -> anyhow::Result<Option<ModelVersion>>;

    /// Most recently trained version regardless of deployment
    async fn latest_model_version(&self, college_id: i64)
        -> anyhow::Result<Option<ModelVersion>>;

    /// Insert a new trained version (not deployed)
    async fn insert_model_version(&self, version: ModelVersion) -> anyhow::Result<ModelVersion>;

    /// Atomically flip the deployed pointer to `model_id`, undeploying the
    /// previous version in the same transaction. Readers never observe a
    /// half-installed model.
    async fn deploy_model(&self, college_id: i64, model_id: i64) -> anyhow::Result<()>;

    /// Number of training samples collected for a college
    async fn training_sample_count(&self, college_id: i64) -> anyhow::Result<i64>;

    /// Record one training sample (admission outcome observation)
    async fn add_training_sample(
        &self,
        college_id: i64,
        features: String,
        admitted: bool,
        recorded_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}
