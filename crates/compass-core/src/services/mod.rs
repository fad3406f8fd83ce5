mod chance_service;
mod fit_service;
mod ledger_service;
mod profile_service;
mod refresh_service;
mod risk_service;
mod task_service;


#[cfg(test)]
mod fit_service_tests;


#[cfg(test)]
mod risk_service_tests;

#[cfg(test)]
mod task_service_tests;

pub use chance_service::{ChanceService, CompareOutcome, ScenarioOutcome};
pub use fit_service::{BatchError, BatchOutcome, FitService};
pub use ledger_service::{ExplainTrace, LedgerService};
pub use profile_service::ProfileService;
pub use refresh_service::{RefreshOutcome, RefreshService, RetrainOutcome};
pub use risk_service::{RiskOverview, RiskService};
pub use task_service::{StatusUpdateOutcome, TaskService};
