use anyhow::Result;
use clap::{Parser, Subcommand};
use compass_core::domain::{FitCategory, FitWeights, TaskStatus};
use compass_core::ProposedChanges;

mod output;
mod seed;

/// Compass CLI - drives the college-application decision engine locally
#[derive(Parser)]
#[command(name = "compass")]
#[command(about = "College application decision engine", long_about = None)]
struct Cli {
    /// Catalog database path
    #[arg(long, default_value = "compass_catalog.db")]
    catalog_db: String,

    /// User database path
    #[arg(long, default_value = "compass_user.db")]
    user_db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify fit for a profile × college pair
    Fit {
        profile_id: i64,
        college_id: i64,
    },
    /// Classify fit for a profile against several colleges
    FitBatch {
        profile_id: i64,
        /// Comma-separated college ids
        college_ids: String,
    },
    /// Calculate the admission chance for a profile × college pair
    Chance {
        profile_id: i64,
        college_id: i64,
    },
    /// What-if analysis over a college list
    Scenario {
        profile_id: i64,
        /// Comma-separated college ids
        college_ids: String,
        /// Hypothetical SAT total
        #[arg(long)]
        sat: Option<i32>,
        /// Hypothetical unweighted GPA
        #[arg(long)]
        gpa: Option<f64>,
        /// Extra AP/IB courses to assume
        #[arg(long, default_value_t = 0)]
        extra_rigor: u8,
    },
    /// Compare current chances against the saved history
    Compare { user_id: i64 },
    /// Task commands
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Deadline-risk commands
    Risk {
        #[command(subcommand)]
        command: RiskCommands,
    },
    /// Set custom fit weights (must sum to 1.0)
    Weights {
        user_id: i64,
        academic: f64,
        profile: f64,
        financial: f64,
        timeline: f64,
    },
    /// Fit-category override commands
    Override {
        #[command(subcommand)]
        command: OverrideCommands,
    },
    /// Reassemble the decision trace for a user × college pair
    Explain { user_id: i64, college_id: i64 },
    /// Run a scheduler job once
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Load demo colleges and a demo profile
    Seed,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create (or fetch) the task set for an application
    Create { user_id: i64, college_id: i64 },
    /// Update a task status (not_started, in_progress, complete, skipped)
    Status {
        task_id: i64,
        status: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List blocked tasks
    Blocked {
        user_id: i64,
        #[arg(long)]
        college_id: Option<i64>,
    },
    /// Show the critical path for an application
    CriticalPath { user_id: i64, college_id: i64 },
}

#[derive(Subcommand)]
enum RiskCommands {
    /// Aggregate risk overview for a user
    Overview { user_id: i64 },
    /// Recompute risk for every application (daily check)
    Check { user_id: i64 },
    /// Copy the college's official deadlines into the user's list
    Sync { user_id: i64, college_id: i64 },
    /// List colleges whose nearest deadline can no longer be met
    Impossible { user_id: i64 },
}

#[derive(Subcommand)]
enum OverrideCommands {
    /// Pin a fit category (safety, target, reach, unrealistic)
    Set {
        user_id: i64,
        college_id: i64,
        category: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Clear a pinned category
    Clear { user_id: i64, college_id: i64 },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Monthly deadline refresh for colleges with active applications
    Monthly,
    /// Quarterly baseline rescrape of stale colleges
    Quarterly,
    /// Retraining sweep over colleges with active applications
    Retrain,
    /// Daily risk recheck across all users
    DailyRisk,
    /// Roll expired fit-cache entries
    RollCache,
}

fn parse_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let state = compass_api::setup(&cli.catalog_db, &cli.user_db).await?;

    match cli.command {
        Commands::Fit {
            profile_id,
            college_id,
        } => {
            let fit = state.classify_fit(profile_id, college_id).await?;
            output::print_fit(&fit);
        }
        Commands::FitBatch {
            profile_id,
            college_ids,
        } => {
            let outcome = state
                .classify_fit_batch(profile_id, parse_ids(&college_ids))
                .await?;
            output::print_fit_batch(&outcome);
        }
        Commands::Chance {
            profile_id,
            college_id,
        } => {
            let chance = state.calculate_chance(profile_id, college_id).await?;
            output::print_chance(&chance);
        }
        Commands::Scenario {
            profile_id,
            college_ids,
            sat,
            gpa,
            extra_rigor,
        } => {
            let changes = ProposedChanges {
                sat_total: sat,
                gpa_unweighted: gpa,
                additional_rigorous_courses: extra_rigor,
                ..Default::default()
            };
            let outcome = state
                .calculate_chance_scenario(profile_id, changes, parse_ids(&college_ids))
                .await?;
            output::print_scenario(&outcome);
        }
        Commands::Compare { user_id } => {
            let outcome = state.compare_chances(user_id).await?;
            output::print_compare(&outcome);
        }
        Commands::Tasks { command } => match command {
            TaskCommands::Create {
                user_id,
                college_id,
            } => {
                let tasks = state.decompose_tasks(user_id, college_id, None).await?;
                output::print_tasks(&tasks);
            }
            TaskCommands::Status {
                task_id,
                status,
                reason,
            } => {
                let status = TaskStatus::parse(&status)
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                let (task, unblocked) =
                    state.update_task_status(task_id, status, reason).await?;
                output::print_status_update(&task, &unblocked);
            }
            TaskCommands::Blocked {
                user_id,
                college_id,
            } => {
                let tasks = state.get_blocked_tasks(user_id, college_id).await?;
                output::print_tasks(&tasks);
            }
            TaskCommands::CriticalPath {
                user_id,
                college_id,
            } => {
                match state.get_critical_path(user_id, college_id).await? {
                    Some(path) => output::print_critical_path(&path),
                    None => println!("No final-submission task for this application yet"),
                }
            }
        },
        Commands::Risk { command } => match command {
            RiskCommands::Overview { user_id } => {
                let overview = state.get_risk_overview(user_id).await?;
                output::print_risk_overview(&overview);
            }
            RiskCommands::Check { user_id } => {
                let alerts = state.run_daily_check(user_id).await?;
                output::print_alerts(&alerts);
            }
            RiskCommands::Sync {
                user_id,
                college_id,
            } => {
                let deadlines = state.sync_deadlines(user_id, college_id).await?;
                output::print_deadlines(&deadlines);
            }
            RiskCommands::Impossible { user_id } => {
                let colleges = state.flag_impossible_colleges(user_id).await?;
                if colleges.is_empty() {
                    println!("No impossible colleges");
                } else {
                    println!("Colleges past the point of no return: {:?}", colleges);
                }
            }
        },
        Commands::Weights {
            user_id,
            academic,
            profile,
            financial,
            timeline,
        } => {
            state
                .set_user_weights(
                    user_id,
                    FitWeights {
                        academic,
                        profile,
                        financial,
                        timeline,
                    },
                )
                .await?;
            println!("Weights updated for user {}", user_id);
        }
        Commands::Override { command } => match command {
            OverrideCommands::Set {
                user_id,
                college_id,
                category,
                reason,
            } => {
                let category = FitCategory::parse(&category)
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                let fit = state
                    .override_fit(user_id, college_id, category, reason)
                    .await?;
                output::print_fit(&fit);
            }
            OverrideCommands::Clear {
                user_id,
                college_id,
            } => {
                let removed = state.clear_fit_override(user_id, college_id).await?;
                println!(
                    "{}",
                    if removed {
                        "Override cleared"
                    } else {
                        "No override was set"
                    }
                );
            }
        },
        Commands::Explain {
            user_id,
            college_id,
        } => {
            let trace = state.explain(user_id, college_id).await?;
            for line in &trace.lines {
                println!("{}", line);
            }
        }
        Commands::Jobs { command } => match command {
            JobCommands::Monthly => {
                let outcome = state.run_monthly_refresh().await?;
                println!(
                    "Monthly refresh: {} refreshed, {} failed, {} queued for review",
                    outcome.refreshed, outcome.failed, outcome.queued_for_review
                );
            }
            JobCommands::Quarterly => {
                let outcome = state.run_quarterly_refresh().await?;
                println!(
                    "Quarterly refresh: {} refreshed, {} failed",
                    outcome.refreshed, outcome.failed
                );
            }
            JobCommands::Retrain => {
                let outcomes = state.run_retraining_sweep().await?;
                output::print_retrain_outcomes(&outcomes);
            }
            JobCommands::DailyRisk => {
                let checked = state.run_daily_risk_sweep().await?;
                println!("Daily risk recheck done for {} users", checked);
            }
            JobCommands::RollCache => {
                let rolled = state.roll_expired_caches().await?;
                println!("Rolled {} expired cache entries", rolled);
            }
        },
        Commands::Seed => {
            seed::run(state).await?;
        }
    }

    Ok(())
}
