//! Terminal rendering helpers.

use colored::Colorize;
use compass_api::{
    AlertDto, ChanceResultDto, DeadlineDto, FitResultDto, RiskOverviewDto, TaskDto,
};
use compass_core::services::{BatchOutcome, CompareOutcome, ScenarioOutcome};
use compass_core::{CriticalPath, RetrainOutcome};

fn category_colored(category: &str) -> colored::ColoredString {
    match category {
        "safety" | "Safety" | "safe" => category.green(),
        "target" | "Target" | "tight" => category.yellow(),
        "reach" | "Reach" | "critical" => category.red(),
        "unrealistic" | "impossible" => category.red().bold(),
        other => other.normal(),
    }
}

pub fn print_fit(fit: &FitResultDto) {
    println!(
        "College {}: {} (overall {:.1}, confidence {:.2}{})",
        fit.college_id,
        category_colored(&fit.category),
        fit.overall_score,
        fit.confidence,
        if fit.is_manual_override {
            ", manual override"
        } else {
            ""
        }
    );
    println!(
        "  academic {:.1} | profile {:.1} | financial {:.1} | timeline {:.1}",
        fit.academic, fit.profile, fit.financial, fit.timeline
    );
    for warning in &fit.warnings {
        println!("  {} {}", "warning:".yellow(), warning);
    }
}

pub fn print_fit_batch(outcome: &BatchOutcome<FitResultDto>) {
    for fit in &outcome.results {
        print_fit(fit);
    }
    for err in &outcome.errors {
        println!(
            "  {} college {}: {}",
            "error:".red(),
            err.college_id,
            err.kind
        );
    }
    if outcome.truncated {
        println!("{}", "(list truncated at the batch cap)".dimmed());
    }
}

pub fn print_chance(chance: &ChanceResultDto) {
    println!(
        "College {}: {:.1}% {} ({} formula)",
        chance.college_id,
        chance.chance_percent,
        category_colored(&chance.category),
        chance.region
    );
    for factor in &chance.factors {
        println!(
            "  {:<24} {:>+7.1}  {}",
            factor.name,
            factor.contribution,
            factor.evidence.dimmed()
        );
    }
}

pub fn print_scenario(outcome: &ScenarioOutcome) {
    for diff in &outcome.diffs {
        let arrow = if diff.change > 0.0 {
            format!("+{:.1}", diff.change).green()
        } else if diff.change < 0.0 {
            format!("{:.1}", diff.change).red()
        } else {
            "±0.0".normal()
        };
        println!(
            "College {}: {:.1}% → {:.1}% ({}){}",
            diff.college_id,
            diff.old_chance,
            diff.new_chance,
            arrow,
            if diff.category_changed {
                " (category changed)"
            } else {
                ""
            }
        );
    }
    println!(
        "{} improved, {} decreased, average change {:+.1}",
        outcome.summary.improved, outcome.summary.decreased, outcome.summary.avg_change
    );
}

pub fn print_compare(outcome: &CompareOutcome) {
    if outcome.deltas.is_empty() {
        println!("No history to compare yet");
        return;
    }
    for delta in &outcome.deltas {
        println!(
            "College {}: {:.1}% → {:.1}% ({:+.1})",
            delta.college_id, delta.previous, delta.current, delta.change
        );
    }
    println!(
        "{} improved, {} decreased, average change {:+.1}",
        outcome.improved, outcome.decreased, outcome.avg_change
    );
}

pub fn print_tasks(tasks: &[TaskDto]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    for task in tasks {
        println!(
            "  [{}] #{:<4} {:<36} {:>5.1}h  p{}  {}{}",
            category_colored(&task.status),
            task.id,
            task.title,
            task.estimated_hours,
            task.priority,
            task.deadline.as_deref().unwrap_or("no deadline"),
            if task.content_ready {
                "  (content ready)"
            } else {
                ""
            }
        );
    }
}

pub fn print_status_update(task: &TaskDto, unblocked: &[TaskDto]) {
    println!("Task #{} is now {}", task.id, category_colored(&task.status));
    for task in unblocked {
        println!("  unblocked: #{} {}", task.id, task.title);
    }
}

pub fn print_critical_path(path: &CriticalPath) {
    println!(
        "Critical path: {:.1}h of work, {:.1}h of study time{}",
        path.total_hours,
        path.available_hours,
        if path.exceeds_available {
            " DOES NOT FIT".red().bold().to_string()
        } else {
            String::new()
        }
    );
    println!("  tasks: {:?}", path.task_ids);
}

pub fn print_risk_overview(overview: &RiskOverviewDto) {
    println!(
        "{} colleges: {} safe, {} tight, {} critical, {} impossible",
        overview.total_colleges,
        overview.safe.to_string().green(),
        overview.tight.to_string().yellow(),
        overview.critical_count.to_string().red(),
        overview.impossible_count.to_string().red().bold()
    );
    for risk in overview.critical.iter().chain(overview.impossible.iter()) {
        println!(
            "  college {}: {} (score {:.0}, buffer {:.1}h, {}/{} tasks done)",
            risk.college_id,
            category_colored(&risk.risk_level),
            risk.overall_risk_score,
            risk.buffer_hours,
            risk.tasks_completed,
            risk.tasks_total
        );
        for mitigation in &risk.mitigations {
            println!("    → {}", mitigation);
        }
    }
    print_alerts(&overview.alerts);
}

pub fn print_alerts(alerts: &[AlertDto]) {
    for alert in alerts {
        println!(
            "  [{}] {} ({})",
            category_colored(&alert.level),
            alert.message,
            alert.created_at.dimmed()
        );
    }
}

pub fn print_deadlines(deadlines: &[DeadlineDto]) {
    for deadline in deadlines {
        println!(
            "  #{:<4} {:<40} {}  [{}]",
            deadline.id,
            deadline.title,
            deadline.deadline_date,
            category_colored(&deadline.risk_level)
        );
    }
}

pub fn print_retrain_outcomes(outcomes: &[RetrainOutcome]) {
    for outcome in outcomes {
        match outcome {
            RetrainOutcome::Skipped { college_id, reason } => {
                println!("  college {}: skipped ({})", college_id, reason.dimmed());
            }
            RetrainOutcome::Deployed {
                college_id,
                version,
                accuracy,
            } => {
                println!(
                    "  college {}: {} v{} (accuracy {:.2})",
                    college_id,
                    "deployed".green(),
                    version,
                    accuracy
                );
            }
            RetrainOutcome::Held {
                college_id,
                version,
                accuracy,
            } => {
                println!(
                    "  college {}: {} v{} (accuracy {:.2})",
                    college_id,
                    "held".yellow(),
                    version,
                    accuracy
                );
            }
        }
    }
}
