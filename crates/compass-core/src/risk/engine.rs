/// Deadline-risk math: buffer hours against remaining work, risk levels,
/// a monotone overall risk score, and alert-transition rules.
use crate::config::RiskConfig;
use crate::domain::{AlertLevel, RiskLevel};
use chrono::{DateTime, Utc};

/// Study hours still available before a deadline:
/// `(deadline − now) in hours / 24 × productive hours per day`.
pub fn available_hours(
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    productive_hours_per_day: f64,
) -> f64 {
    let hours = (deadline - now).num_minutes() as f64 / 60.0;
    hours / 24.0 * productive_hours_per_day
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskComputation {
    pub level: RiskLevel,
    /// `H_available − H_needed`; negative when the work no longer fits.
    pub buffer_hours: f64,
    pub needed_hours: f64,
    pub available_hours: f64,
    /// Monotone overall score in [0, 100]; higher is worse.
    pub score: f64,
}

/// Risk level and buffer for one deadline.
///
/// Edge cases follow the contract: no remaining work is safe regardless of
/// the calendar; a past deadline with work remaining is impossible.
pub fn compute_risk(
    deadline: DateTime<Utc>,
    needed_hours: f64,
    now: DateTime<Utc>,
    config: &RiskConfig,
) -> RiskComputation {
    let available = available_hours(deadline, now, config.productive_hours_per_day).max(0.0);
    let buffer = available - needed_hours;

    let level = if needed_hours <= 0.0 {
        RiskLevel::Safe
    } else if available <= 0.0 || buffer < 0.0 {
        RiskLevel::Impossible
    } else {
        let ratio = buffer / needed_hours;
        if ratio >= config.safe_threshold {
            RiskLevel::Safe
        } else if ratio >= config.tight_threshold {
            RiskLevel::Tight
        } else {
            RiskLevel::Critical
        }
    };

    let score = risk_score(needed_hours, available, config);

    RiskComputation {
        level,
        buffer_hours: buffer,
        needed_hours,
        available_hours: available,
        score,
    }
}

/// Piecewise-linear monotone map of the buffer ratio onto [0, 100].
///
/// Strictly decreasing in the ratio, so completing a task (which raises the
/// ratio) can never raise the score, and a closer deadline can never lower
/// it.
pub fn risk_score(needed_hours: f64, available_hours: f64, config: &RiskConfig) -> f64 {
    if needed_hours <= 0.0 {
        return 0.0;
    }
    if available_hours <= 0.0 {
        return 100.0;
    }
    let ratio = (available_hours - needed_hours) / needed_hours;
    let safe = config.safe_threshold;
    let tight = config.tight_threshold;

    if ratio >= 1.0 {
        5.0
    } else if ratio >= safe {
        // 20 at the safe threshold, easing to 5 at a 100% buffer.
        20.0 - 15.0 * (ratio - safe) / (1.0 - safe)
    } else if ratio >= tight {
        // 50 at tight, 20 at safe.
        50.0 - 30.0 * (ratio - tight) / (safe - tight)
    } else if ratio >= 0.0 {
        // 75 with no slack, 50 at tight.
        75.0 - 25.0 * ratio / tight
    } else {
        // Underwater: grow toward 100 as the deficit reaches 100%.
        (75.0 + 25.0 * (-ratio).min(1.0)).min(100.0)
    }
}

/// Alert emitted when a deadline's risk level transitions. Recomputation at
/// the same level stays silent; recovery back to safe sends a reminder.
pub fn alert_for_transition(
    previous: Option<RiskLevel>,
    current: RiskLevel,
) -> Option<AlertLevel> {
    if previous == Some(current) {
        return None;
    }
    match current {
        RiskLevel::Impossible => Some(AlertLevel::Impossible),
        RiskLevel::Critical => Some(AlertLevel::Critical),
        RiskLevel::Tight => Some(AlertLevel::Warning),
        RiskLevel::Safe => match previous {
            // Recovered from a worse state.
            Some(prev) if prev > RiskLevel::Safe => Some(AlertLevel::Reminder),
            _ => None,
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
