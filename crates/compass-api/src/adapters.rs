//! Boundary stand-ins for the external collaborators. Real deployments
//! wire a scraper-backed data source and a training worker; these offline
//! adapters keep the engine and its jobs runnable without either.

use async_trait::async_trait;
use compass_core::domain::{College, CollegeDeadlines};
use compass_core::ports::{CollegeDataSource, CollegeStore, ModelTrainer, TrainedModel};
use std::sync::Arc;

/// Serves "fetches" straight from the catalog store. Refresh jobs run
/// against current data, exercising the bookkeeping without network I/O.
pub struct StoredDataSource {
    colleges: Arc<dyn CollegeStore>,
}

impl StoredDataSource {
    pub fn new(colleges: Arc<dyn CollegeStore>) -> Self {
        Self { colleges }
    }
}

#[async_trait]
impl CollegeDataSource for StoredDataSource {
    async fn fetch_deadlines(&self, college_id: i64) -> anyhow::Result<CollegeDeadlines> {
        let college = self
            .colleges
            .get_college(college_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("college {} not in catalog", college_id))?;
        Ok(college.deadlines)
    }

    async fn fetch_college(&self, college_id: i64) -> anyhow::Result<College> {
        self.colleges
            .get_college(college_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("college {} not in catalog", college_id))
    }
}

/// Deterministic trainer stand-in: validated accuracy grows slowly with
/// the sample count and the adjustment stays neutral, so the overlay gate
/// behaves sensibly long before a real training worker is attached.
pub struct SampleGrowthTrainer;

#[async_trait]
impl ModelTrainer for SampleGrowthTrainer {
    async fn train(&self, _college_id: i64, sample_count: i64) -> anyhow::Result<TrainedModel> {
        let capped = sample_count.clamp(0, 500) as f64;
        Ok(TrainedModel {
            accuracy: 0.55 + capped / 2000.0,
            adjustment_pp: 0.0,
        })
    }
}

/// Per-user admission gate consulted before each operation. The default
/// lets everything through; deployments can drop in a real limiter.
pub trait RateGate: Send + Sync {
    fn check(&self, user_id: i64) -> bool;
}

pub struct AllowAll;

impl RateGate for AllowAll {
    fn check(&self, _user_id: i64) -> bool {
        true
    }
}
