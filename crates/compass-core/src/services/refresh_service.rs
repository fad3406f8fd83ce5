use crate::config::EngineConfig;
use crate::domain::{DomainError, ModelVersion};
use crate::ports::{
    ApplicationStore, Clock, CollegeDataSource, CollegeStore, DecisionStore, ModelTrainer,
};
use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of one refresh run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RefreshOutcome {
    pub attempted: u32,
    pub refreshed: u32,
    pub failed: u32,
    pub queued_for_review: u32,
}

/// Outcome of one per-college retraining attempt.
#[derive(Debug, Clone, serde::Serialize)]
pub enum RetrainOutcome {
    /// Not enough samples or growth since the last version.
    Skipped { college_id: i64, reason: String },
    /// Trained and deployed atomically.
    Deployed { college_id: i64, version: i32, accuracy: f64 },
    /// Trained but kept undeployed: accuracy regressed past tolerance.
    Held { college_id: i64, version: i32, accuracy: f64 },
}

/// Refresh & retraining jobs: monthly deadline rescrapes, quarterly
/// baseline refreshes, model retraining with a validation gate, and
/// rolling of expired cache entries. At most one instance of each job runs
/// at a time (the runner enforces the singleton).
pub struct RefreshService {
    colleges: Arc<dyn CollegeStore>,
    applications: Arc<dyn ApplicationStore>,
    decisions: Arc<dyn DecisionStore>,
    data_source: Arc<dyn CollegeDataSource>,
    trainer: Arc<dyn ModelTrainer>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl RefreshService {
    pub fn new(
        colleges: Arc<dyn CollegeStore>,
        applications: Arc<dyn ApplicationStore>,
        decisions: Arc<dyn DecisionStore>,
        data_source: Arc<dyn CollegeDataSource>,
        trainer: Arc<dyn ModelTrainer>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            colleges,
            applications,
            decisions,
            data_source,
            trainer,
            clock,
            config,
        }
    }

    /// Monthly: refresh deadlines for colleges with at least one active
    /// application. Rate-limited; failures increment the per-college
    /// counter and queue for manual review after three in a row.
    #[instrument(skip(self))]
    pub async fn monthly_deadline_refresh(&self) -> Result<RefreshOutcome> {
        let batch = self.config.scheduler.monthly_refresh_batch as u32;
        let college_ids = self
            .applications
            .college_ids_with_active_applications(batch)
            .await?;

        let mut outcome = RefreshOutcome::default();
        for (i, college_id) in college_ids.iter().enumerate() {
            if i > 0 {
                self.inter_request_delay().await;
            }
            outcome.attempted += 1;
            match self.fetch_deadlines_with_retry(*college_id).await {
                Ok(deadlines) => {
                    self.colleges
                        .update_deadlines(*college_id, deadlines, self.clock.now())
                        .await?;
                    self.invalidate_college(*college_id).await?;
                    outcome.refreshed += 1;
                }
                Err(err) => {
                    warn!(college_id, error = %err, "deadline refresh failed");
                    outcome.failed += 1;
                    let failures = self.colleges.record_scrape_failure(*college_id).await?;
                    if failures >= self.config.scheduler.max_consecutive_failures {
                        self.colleges.mark_manual_review(*college_id).await?;
                        outcome.queued_for_review += 1;
                    }
                }
            }
        }

        info!(
            refreshed = outcome.refreshed,
            failed = outcome.failed,
            "monthly deadline refresh done"
        );
        Ok(outcome)
    }

    /// Quarterly: rescrape baseline data for a random sample of colleges
    /// whose last scrape is more than three months old.
    #[instrument(skip(self))]
    pub async fn quarterly_baseline_refresh(&self) -> Result<RefreshOutcome> {
        let cutoff =
            self.clock.now() - Duration::days(self.config.scheduler.stale_after_days);
        let stale = self
            .colleges
            .stale_colleges(cutoff, self.config.scheduler.quarterly_refresh_batch as u32)
            .await?;

        let mut outcome = RefreshOutcome::default();
        for (i, college) in stale.iter().enumerate() {
            if i > 0 {
                self.inter_request_delay().await;
            }
            outcome.attempted += 1;
            match self.fetch_college_with_retry(college.id).await {
                Ok(mut fresh) => {
                    fresh.last_scraped = Some(self.clock.now());
                    fresh.scraping_failures = 0;
                    self.colleges.upsert_college(fresh).await?;
                    self.invalidate_college(college.id).await?;
                    outcome.refreshed += 1;
                }
                Err(err) => {
                    warn!(college_id = college.id, error = %err, "baseline refresh failed");
                    outcome.failed += 1;
                    let failures = self.colleges.record_scrape_failure(college.id).await?;
                    if failures >= self.config.scheduler.max_consecutive_failures {
                        self.colleges.mark_manual_review(college.id).await?;
                        outcome.queued_for_review += 1;
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Retraining trigger for one college: requires the minimum sample
    /// count and ≥ 20% growth since the last trained version. A new version
    /// deploys only when its validated accuracy has not regressed more than
    /// the tolerance below the currently deployed one; the flip is atomic.
    #[instrument(skip(self))]
    pub async fn retrain_college(&self, college_id: i64) -> Result<RetrainOutcome> {
        let samples = self.colleges.training_sample_count(college_id).await?;
        if samples < self.config.training.min_samples {
            return Ok(RetrainOutcome::Skipped {
                college_id,
                reason: format!(
                    "{} samples below minimum {}",
                    samples, self.config.training.min_samples
                ),
            });
        }

        let latest = self.colleges.latest_model_version(college_id).await?;
        if let Some(ref latest) = latest {
            let required = latest.sample_count as f64
                * (1.0 + self.config.training.growth_threshold);
            if (samples as f64) < required {
                return Ok(RetrainOutcome::Skipped {
                    college_id,
                    reason: format!(
                        "sample growth {} below required {:.0}",
                        samples, required
                    ),
                });
            }
        }

        let trained = self.trainer.train(college_id, samples).await?;
        let version = latest.map(|l| l.version + 1).unwrap_or(1);
        let stored = self
            .colleges
            .insert_model_version(ModelVersion {
                id: 0,
                college_id,
                version,
                sample_count: samples,
                accuracy: trained.accuracy,
                adjustment_pp: trained.adjustment_pp,
                deployed: false,
                trained_at: self.clock.now(),
            })
            .await?;

        let deployed = self.colleges.get_deployed_model(college_id).await?;
        let gate_passed = match deployed {
            Some(ref current) => {
                trained.accuracy >= current.accuracy - self.config.training.regression_tolerance
            }
            None => true,
        };

        if gate_passed {
            // Keeps the previous version serving until this commit lands.
            self.colleges.deploy_model(college_id, stored.id).await?;
            info!(college_id, version, accuracy = trained.accuracy, "model deployed");
            Ok(RetrainOutcome::Deployed {
                college_id,
                version,
                accuracy: trained.accuracy,
            })
        } else {
            warn!(college_id, version, accuracy = trained.accuracy, "model held back");
            Ok(RetrainOutcome::Held {
                college_id,
                version,
                accuracy: trained.accuracy,
            })
        }
    }

    /// Nightly sweep: run the retraining trigger for every college with an
    /// active application.
    #[instrument(skip(self))]
    pub async fn nightly_retraining_sweep(&self) -> Result<Vec<RetrainOutcome>> {
        let college_ids = self
            .applications
            .college_ids_with_active_applications(u32::MAX)
            .await?;
        let mut outcomes = Vec::with_capacity(college_ids.len());
        for college_id in college_ids {
            outcomes.push(self.retrain_college(college_id).await?);
        }
        Ok(outcomes)
    }

    /// Roll expired fit entries out of the cache; callers recompute lazily
    /// on their next query.
    #[instrument(skip(self))]
    pub async fn roll_expired_fits(&self, limit: u32) -> Result<u64> {
        let now = self.clock.now();
        let expired = self.decisions.expired_fit_keys(now, limit).await?;
        let mut rolled = 0u64;
        for (_user_id, snapshot_id, college_id) in expired {
            if self.decisions.delete_fit(snapshot_id, college_id).await? {
                rolled += 1;
            }
        }
        if rolled > 0 {
            info!(rolled, "expired fit entries rolled");
        }
        Ok(rolled)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn inter_request_delay(&self) {
        let delay = self.config.scheduler.request_delay_ms;
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }

    /// Fetch with the per-URL timeout; rate-limited fetches are retried
    /// once after the inter-request delay.
    async fn fetch_deadlines_with_retry(
        &self,
        college_id: i64,
    ) -> Result<crate::domain::CollegeDeadlines> {
        match self.fetch_deadlines_once(college_id).await {
            Err(err) if is_rate_limited(&err) => {
                self.inter_request_delay().await;
                self.fetch_deadlines_once(college_id).await
            }
            other => other,
        }
    }

    async fn fetch_deadlines_once(
        &self,
        college_id: i64,
    ) -> Result<crate::domain::CollegeDeadlines> {
        let timeout = std::time::Duration::from_millis(self.config.scheduler.fetch_timeout_ms);
        match tokio::time::timeout(timeout, self.data_source.fetch_deadlines(college_id)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout(self.config.scheduler.fetch_timeout_ms).into()),
        }
    }

    async fn fetch_college_with_retry(&self, college_id: i64) -> Result<crate::domain::College> {
        let timeout = std::time::Duration::from_millis(self.config.scheduler.fetch_timeout_ms);
        let fetch = || async {
            match tokio::time::timeout(timeout, self.data_source.fetch_college(college_id)).await {
                Ok(result) => result,
                Err(_) => {
                    Err(DomainError::Timeout(self.config.scheduler.fetch_timeout_ms).into())
                }
            }
        };
        match fetch().await {
            Err(err) if is_rate_limited(&err) => {
                self.inter_request_delay().await;
                fetch().await
            }
            other => other,
        }
    }

    /// A refreshed college invalidates every cached decision that depended
    /// on its data; callers re-enter scoring lazily.
    async fn invalidate_college(&self, college_id: i64) -> Result<()> {
        self.decisions.delete_fits_for_college(college_id).await?;
        self.decisions.delete_chances_for_college(college_id).await?;
        self.decisions.delete_risks_for_college(college_id).await?;
        Ok(())
    }
}

fn is_rate_limited(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DomainError>(),
        Some(DomainError::RateLimited(_))
    )
}
