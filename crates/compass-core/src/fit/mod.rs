pub mod classifier;
pub mod subscores;
pub mod types;

pub use classifier::{categorize, classify, missing_required_fields, missing_signal_count};
pub use subscores::{
    academic_subscore, financial_subscore, percentile_credit, profile_subscore,
    timeline_subscore,
};
pub use types::{FitComputation, SubscoreBreakdown};
