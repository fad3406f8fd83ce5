//! Recurring job runner for the refresh/retraining schedules. Each job is
//! a singleton per name: a tick that fires while the previous run is still
//! going is skipped.

use crate::api::AppState;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct JobIntervals {
    pub monthly: Duration,
    pub quarterly: Duration,
    pub nightly_retrain: Duration,
    pub daily_risk: Duration,
    pub cache_roll: Duration,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self {
            monthly: Duration::from_secs(30 * 24 * 3600),
            quarterly: Duration::from_secs(90 * 24 * 3600),
            nightly_retrain: Duration::from_secs(24 * 3600),
            daily_risk: Duration::from_secs(24 * 3600),
            cache_roll: Duration::from_secs(6 * 3600),
        }
    }
}

pub struct JobRunner {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    running: Arc<Mutex<HashSet<&'static str>>>,
}

impl JobRunner {
    /// Spawn all recurring jobs. Jobs fire after their first full interval;
    /// `trigger_*` on AppState covers on-demand runs.
    pub fn start(state: Arc<AppState>, intervals: JobIntervals) -> Self {
        let (shutdown, _) = watch::channel(false);
        let running = Arc::new(Mutex::new(HashSet::new()));

        let mut runner = Self {
            handles: Vec::new(),
            shutdown,
            running,
        };

        runner.spawn_job("monthly_deadline_refresh", intervals.monthly, {
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    state.run_monthly_refresh().await.map(|outcome| {
                        info!(
                            refreshed = outcome.refreshed,
                            failed = outcome.failed,
                            "monthly refresh finished"
                        );
                    })
                }
            }
        });

        runner.spawn_job("quarterly_baseline_refresh", intervals.quarterly, {
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    state.run_quarterly_refresh().await.map(|outcome| {
                        info!(refreshed = outcome.refreshed, "quarterly refresh finished");
                    })
                }
            }
        });

        runner.spawn_job("nightly_retraining", intervals.nightly_retrain, {
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    state.run_retraining_sweep().await.map(|outcomes| {
                        info!(colleges = outcomes.len(), "retraining sweep finished");
                    })
                }
            }
        });

        runner.spawn_job("daily_risk_recheck", intervals.daily_risk, {
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    state.run_daily_risk_sweep().await.map(|checked| {
                        info!(users = checked, "daily risk recheck finished");
                    })
                }
            }
        });

        runner.spawn_job("expired_cache_roll", intervals.cache_roll, {
            let state = Arc::clone(&state);
            move || {
                let state = Arc::clone(&state);
                async move {
                    state.roll_expired_caches().await.map(|rolled| {
                        if rolled > 0 {
                            info!(rolled, "expired cache entries rolled");
                        }
                    })
                }
            }
        });

        runner
    }

    fn spawn_job<F, Fut>(&mut self, name: &'static str, interval: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
    {
        let mut shutdown_rx = self.shutdown.subscribe();
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would run every job at boot.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Singleton per job name: skip the tick if the
                        // previous run is still in flight.
                        let acquired = running.lock().map(|mut set| set.insert(name)).unwrap_or(false);
                        if !acquired {
                            warn!(job = name, "previous run still active; skipping tick");
                            continue;
                        }
                        if let Err(err) = job().await {
                            error!(job = name, error = %err, "job failed");
                        }
                        if let Ok(mut set) = running.lock() {
                            set.remove(name);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!(job = name, "job loop stopped");
                            break;
                        }
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// Signal all loops to stop and wait for them to wind down.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::EngineConfig;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_state() -> Arc<AppState> {
        let catalog = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        compass_storage::catalog::MIGRATOR.run(&catalog).await.unwrap();
        let user = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        compass_storage::user::MIGRATOR.run(&user).await.unwrap();
        Arc::new(AppState::build(catalog, user, EngineConfig::default()))
    }

    #[tokio::test]
    async fn test_runner_fires_ticks_and_shuts_down() {
        let state = test_state().await;
        let intervals = JobIntervals {
            monthly: Duration::from_millis(40),
            quarterly: Duration::from_secs(3600),
            nightly_retrain: Duration::from_secs(3600),
            daily_risk: Duration::from_secs(3600),
            cache_roll: Duration::from_millis(40),
        };

        // Empty databases: the monthly refresh and cache roll tick a few
        // times and do nothing; the loops must still wind down cleanly.
        let runner = JobRunner::start(Arc::clone(&state), intervals);
        tokio::time::sleep(Duration::from_millis(150)).await;
        runner.shutdown().await;
    }
}
