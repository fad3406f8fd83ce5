use crate::adapters::{AllowAll, RateGate, SampleGrowthTrainer, StoredDataSource};
use crate::dto::{
    AlertDto, ChanceResultDto, DeadlineDto, FitResultDto, RiskDto, TaskDto,
};
use anyhow::Result;
use compass_core::{
    Activity, ApplicationStore, BatchOutcome, ChanceService, Clock, CollegeStore, CompareOutcome,
    Coursework, DecisionStore, DomainError, EngineConfig, ExplainTrace, FitCategory, FitService,
    FitWeights, LedgerService, Profile, ProfileService, ProfileStore, ProposedChanges,
    RefreshOutcome, RefreshService, RetrainOutcome, RiskService, ScenarioOutcome, SystemClock,
    TaskService, TaskStatus,
};
use compass_storage::{
    init_catalog_db, init_user_db, SqliteApplicationStore, SqliteCollegeStore,
    SqliteDecisionStore, SqliteProfileStore,
};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Everything the engine needs, wired once at boot.
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    pub colleges: Arc<dyn CollegeStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub decisions: Arc<dyn DecisionStore>,
    pub ledger: Arc<LedgerService>,
    pub profile_service: Arc<ProfileService>,
    pub fit_service: Arc<FitService>,
    pub chance_service: Arc<ChanceService>,
    pub task_service: Arc<TaskService>,
    pub risk_service: Arc<RiskService>,
    pub refresh_service: Arc<RefreshService>,
    pub rate_gate: Arc<dyn RateGate>,
    pub config: EngineConfig,
}

static APP: OnceCell<AppState> = OnceCell::new();

/// Get app state (helper function)
pub fn app() -> &'static AppState {
    APP.get().expect("App not initialized - call setup first")
}

/// One-time setup: opens both databases and wires the service graph.
pub async fn setup(catalog_db_path: &str, user_db_path: &str) -> Result<&'static AppState> {
    tracing::info!("Initializing databases...");
    let catalog_pool = init_catalog_db(catalog_db_path).await?;
    let user_pool = init_user_db(user_db_path).await?;

    let state = AppState::build(catalog_pool, user_pool, EngineConfig::default());
    APP.set(state)
        .map_err(|_| anyhow::anyhow!("App already initialized"))?;
    Ok(app())
}

impl AppState {
    /// Wire the full service graph over the given pools. Used directly by
    /// tests and by the CLI, which keeps its own state.
    pub fn build(
        catalog_pool: sqlx::SqlitePool,
        user_pool: sqlx::SqlitePool,
        config: EngineConfig,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::build_with_clock(catalog_pool, user_pool, config, clock)
    }

    pub fn build_with_clock(
        catalog_pool: sqlx::SqlitePool,
        user_pool: sqlx::SqlitePool,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles: Arc<dyn ProfileStore> = Arc::new(SqliteProfileStore::new(user_pool.clone()));
        let colleges: Arc<dyn CollegeStore> = Arc::new(SqliteCollegeStore::new(catalog_pool));
        let applications: Arc<dyn ApplicationStore> =
            Arc::new(SqliteApplicationStore::new(user_pool.clone()));
        let decisions: Arc<dyn DecisionStore> = Arc::new(SqliteDecisionStore::new(user_pool));

        let ledger = Arc::new(LedgerService::new(Arc::clone(&decisions)));

        let profile_service = Arc::new(ProfileService::new(
            Arc::clone(&profiles),
            Arc::clone(&decisions),
            Arc::clone(&ledger),
            Arc::clone(&clock),
        ));
        let fit_service = Arc::new(FitService::new(
            Arc::clone(&profiles),
            Arc::clone(&colleges),
            Arc::clone(&applications),
            Arc::clone(&decisions),
            Arc::clone(&ledger),
            Arc::clone(&clock),
            config.clone(),
        ));
        let chance_service = Arc::new(ChanceService::new(
            Arc::clone(&profiles),
            Arc::clone(&colleges),
            Arc::clone(&applications),
            Arc::clone(&decisions),
            Arc::clone(&ledger),
            Arc::clone(&clock),
            config.clone(),
        ));
        let task_service = Arc::new(TaskService::new(
            Arc::clone(&profiles),
            Arc::clone(&colleges),
            Arc::clone(&applications),
            Arc::clone(&clock),
            config.risk.productive_hours_per_day,
        ));
        let risk_service = Arc::new(RiskService::new(
            Arc::clone(&profiles),
            Arc::clone(&colleges),
            Arc::clone(&applications),
            Arc::clone(&decisions),
            Arc::clone(&ledger),
            Arc::clone(&clock),
            config.clone(),
        ));
        let refresh_service = Arc::new(RefreshService::new(
            Arc::clone(&colleges),
            Arc::clone(&applications),
            Arc::clone(&decisions),
            Arc::new(StoredDataSource::new(Arc::clone(&colleges))),
            Arc::new(SampleGrowthTrainer),
            Arc::clone(&clock),
            config.clone(),
        ));

        Self {
            profiles,
            colleges,
            applications,
            decisions,
            ledger,
            profile_service,
            fit_service,
            chance_service,
            task_service,
            risk_service,
            refresh_service,
            rate_gate: Arc::new(AllowAll),
            config,
        }
    }

    fn gate(&self, user_id: i64) -> Result<()> {
        if self.rate_gate.check(user_id) {
            Ok(())
        } else {
            Err(DomainError::RateLimited(format!("user {}", user_id)).into())
        }
    }

    // ========================================================================
    // Fit operations
    // ========================================================================

    pub async fn classify_fit(&self, profile_id: i64, college_id: i64) -> Result<FitResultDto> {
        let fit = with_budget(
            self.config.budgets.single_ms,
            self.fit_service.classify_fit(profile_id, college_id),
        )
        .await?;
        Ok(fit.into())
    }

    pub async fn classify_fit_batch(
        &self,
        profile_id: i64,
        college_ids: Vec<i64>,
    ) -> Result<BatchOutcome<FitResultDto>> {
        let outcome = with_budget(
            self.config.budgets.batch_ms,
            self.fit_service.classify_fit_batch(profile_id, college_ids),
        )
        .await?;
        Ok(BatchOutcome {
            results: outcome.results.into_iter().map(Into::into).collect(),
            errors: outcome.errors,
            truncated: outcome.truncated,
        })
    }

    pub async fn set_user_weights(&self, user_id: i64, weights: FitWeights) -> Result<()> {
        self.gate(user_id)?;
        self.fit_service.set_user_weights(user_id, weights).await
    }

    pub async fn override_fit(
        &self,
        user_id: i64,
        college_id: i64,
        category: FitCategory,
        reason: Option<String>,
    ) -> Result<FitResultDto> {
        self.gate(user_id)?;
        let fit = self
            .fit_service
            .override_fit(user_id, college_id, category, reason)
            .await?;
        Ok(fit.into())
    }

    pub async fn clear_fit_override(&self, user_id: i64, college_id: i64) -> Result<bool> {
        self.fit_service.clear_override(user_id, college_id).await
    }

    // ========================================================================
    // Chance operations
    // ========================================================================

    pub async fn calculate_chance(
        &self,
        profile_id: i64,
        college_id: i64,
    ) -> Result<ChanceResultDto> {
        let chance = with_budget(
            self.config.budgets.single_ms,
            self.chance_service.calculate(profile_id, college_id),
        )
        .await?;
        Ok(chance.into())
    }

    pub async fn calculate_chance_batch(
        &self,
        profile_id: i64,
        college_ids: Vec<i64>,
    ) -> Result<BatchOutcome<ChanceResultDto>> {
        let outcome = with_budget(
            self.config.budgets.batch_ms,
            self.chance_service.calculate_batch(profile_id, college_ids),
        )
        .await?;
        Ok(BatchOutcome {
            results: outcome.results.into_iter().map(Into::into).collect(),
            errors: outcome.errors,
            truncated: outcome.truncated,
        })
    }

    pub async fn calculate_chance_scenario(
        &self,
        profile_id: i64,
        changes: ProposedChanges,
        college_ids: Vec<i64>,
    ) -> Result<ScenarioOutcome> {
        with_budget(
            self.config.budgets.scenario_ms,
            self.chance_service.scenario(profile_id, changes, college_ids),
        )
        .await
    }

    pub async fn save_chance_history(
        &self,
        user_id: i64,
        college_id: i64,
        chance_percent: f64,
        category: compass_core::ChanceCategory,
        factors: Vec<compass_core::Factor>,
    ) -> Result<i64> {
        self.gate(user_id)?;
        self.chance_service
            .save_history(user_id, college_id, chance_percent, category, factors)
            .await
    }

    pub async fn compare_chances(&self, user_id: i64) -> Result<CompareOutcome> {
        self.chance_service.compare(user_id).await
    }

    // ========================================================================
    // Task operations
    // ========================================================================

    pub async fn decompose_tasks(
        &self,
        user_id: i64,
        college_id: i64,
        application_id: Option<i64>,
    ) -> Result<Vec<TaskDto>> {
        self.gate(user_id)?;
        let tasks = self
            .task_service
            .create_application_tasks(user_id, college_id, application_id)
            .await?;
        Ok(tasks.into_iter().map(Into::into).collect())
    }

    pub async fn update_task_status(
        &self,
        task_id: i64,
        status: TaskStatus,
        reason: Option<String>,
    ) -> Result<(TaskDto, Vec<TaskDto>)> {
        let outcome = self.task_service.update_status(task_id, status, reason).await?;
        Ok((
            outcome.task.into(),
            outcome.unblocked.into_iter().map(Into::into).collect(),
        ))
    }

    pub async fn get_blocked_tasks(
        &self,
        user_id: i64,
        college_id: Option<i64>,
    ) -> Result<Vec<TaskDto>> {
        let tasks = self.task_service.get_blocked(user_id, college_id).await?;
        Ok(tasks.into_iter().map(Into::into).collect())
    }

    pub async fn get_critical_path(
        &self,
        user_id: i64,
        college_id: i64,
    ) -> Result<Option<compass_core::CriticalPath>> {
        self.task_service.get_critical_path(user_id, college_id).await
    }

    // ========================================================================
    // Risk operations
    // ========================================================================

    pub async fn get_risk_overview(&self, user_id: i64) -> Result<RiskOverviewDto> {
        let overview = with_budget(
            self.config.budgets.batch_ms,
            self.risk_service.get_overview(user_id),
        )
        .await?;
        Ok(RiskOverviewDto {
            total_colleges: overview.total_colleges,
            safe: overview.safe,
            tight: overview.tight,
            critical_count: overview.critical_count,
            impossible_count: overview.impossible_count,
            critical: overview.critical.into_iter().map(Into::into).collect(),
            impossible: overview.impossible.into_iter().map(Into::into).collect(),
            alerts: overview.alerts.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn calculate_risk(&self, user_id: i64, college_id: i64) -> Result<RiskDto> {
        let assessment = self.risk_service.calculate_risk(user_id, college_id).await?;
        Ok(assessment.into())
    }

    pub async fn sync_deadlines(&self, user_id: i64, college_id: i64) -> Result<Vec<DeadlineDto>> {
        let deadlines = self
            .risk_service
            .sync_from_college_deadlines(user_id, college_id)
            .await?;
        Ok(deadlines.into_iter().map(Into::into).collect())
    }

    pub async fn run_daily_check(&self, user_id: i64) -> Result<Vec<AlertDto>> {
        let alerts = self.risk_service.run_daily_check(user_id).await?;
        Ok(alerts.into_iter().map(Into::into).collect())
    }

    pub async fn flag_impossible_colleges(&self, user_id: i64) -> Result<Vec<i64>> {
        self.risk_service.flag_impossible_colleges(user_id).await
    }

    // ========================================================================
    // Profile & explain operations
    // ========================================================================

    pub async fn save_profile(
        &self,
        profile: Profile,
        activities: Vec<Activity>,
        coursework: Vec<Coursework>,
    ) -> Result<(Profile, i64)> {
        self.gate(profile.user_id)?;
        let (stored, snapshot) = self
            .profile_service
            .save_profile(profile, activities, coursework)
            .await?;
        Ok((stored, snapshot.id))
    }

    pub async fn explain(&self, user_id: i64, college_id: i64) -> Result<ExplainTrace> {
        self.ledger.explain(user_id, college_id).await
    }

    // ========================================================================
    // Jobs (driven by the runner or the CLI)
    // ========================================================================

    pub async fn run_monthly_refresh(&self) -> Result<RefreshOutcome> {
        self.refresh_service.monthly_deadline_refresh().await
    }

    pub async fn run_quarterly_refresh(&self) -> Result<RefreshOutcome> {
        self.refresh_service.quarterly_baseline_refresh().await
    }

    pub async fn run_retraining_sweep(&self) -> Result<Vec<RetrainOutcome>> {
        self.refresh_service.nightly_retraining_sweep().await
    }

    pub async fn run_daily_risk_sweep(&self) -> Result<u32> {
        let user_ids = self.applications.user_ids_with_active_applications().await?;
        let mut checked = 0u32;
        for user_id in user_ids {
            self.risk_service.run_daily_check(user_id).await?;
            checked += 1;
        }
        Ok(checked)
    }

    pub async fn roll_expired_caches(&self) -> Result<u64> {
        self.refresh_service.roll_expired_fits(500).await
    }
}

/// Aggregate risk DTO for the overview endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskOverviewDto {
    pub total_colleges: u32,
    pub safe: u32,
    pub tight: u32,
    pub critical_count: u32,
    pub impossible_count: u32,
    pub critical: Vec<RiskDto>,
    pub impossible: Vec<RiskDto>,
    pub alerts: Vec<AlertDto>,
}

/// Enforce a per-operation time budget; overruns surface as TIMEOUT.
async fn with_budget<T, F>(budget_ms: u64, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_millis(budget_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::Timeout(budget_ms).into()),
    }
}
