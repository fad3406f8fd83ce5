pub mod engine;

pub use engine::{
    alert_for_transition, available_hours, compute_risk, risk_score, RiskComputation,
};
