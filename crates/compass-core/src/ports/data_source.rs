use crate::domain::{College, CollegeDeadlines};
use async_trait::async_trait;

/// Boundary to the external college-data acquisition system (the scraper).
/// The engine only models the contract; implementations live outside the
/// core. Fetches are expected to respect the per-URL timeout and may fail
/// with `DomainError::RateLimited` wrapped in the error chain.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CollegeDataSource: Send + Sync {
    /// Re-fetch a college's published deadlines
    async fn fetch_deadlines(&self, college_id: i64) -> anyhow::Result<CollegeDeadlines>;

    /// Re-fetch a college's baseline record
    async fn fetch_college(&self, college_id: i64) -> anyhow::Result<College>;
}

/// Output of one training run for a per-college chance-overlay model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainedModel {
    /// Validated accuracy in [0, 1].
    pub accuracy: f64,
    /// Suggested chance adjustment in percentage points.
    pub adjustment_pp: f64,
}

/// Boundary to the model-training worker. Runs off the request path; the
/// scheduler decides *when* to train, the trainer decides *how*.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    async fn train(&self, college_id: i64, sample_count: i64) -> anyhow::Result<TrainedModel>;
}
