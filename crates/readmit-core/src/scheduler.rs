//! Background retraining.
//!
//! The loop wakes every `poll_interval`, asks [`RetrainPolicy::decide`]
//! whether a run is due, and if so runs [`ModelManager::train`] on the
//! blocking pool. Errors and panics inside a run are logged and the loop
//! carries on; only [`SchedulerHandle::shutdown`] stops it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::manager::ModelManager;

/// Scheduler settings, in seconds so they read naturally in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub retrain_interval_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
            retrain_interval_secs: 6 * 60 * 60,
            cooldown_secs: 60 * 60,
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn policy(&self) -> RetrainPolicy {
        RetrainPolicy {
            retrain_interval: Duration::from_secs(self.retrain_interval_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    /// Human-readable retrain cadence, e.g. `"6 hours"`.
    pub fn cadence(&self) -> String {
        let secs = self.retrain_interval_secs;
        if secs > 0 && secs % 3600 == 0 {
            let hours = secs / 3600;
            format!("{hours} hour{}", if hours == 1 { "" } else { "s" })
        } else if secs > 0 && secs % 60 == 0 {
            let minutes = secs / 60;
            format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
        } else {
            format!("{secs} seconds")
        }
    }
}

/// Outcome of one scheduler check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainDecision {
    Retrain,
    /// The current bundle is younger than the retrain interval.
    NotDue,
    SourceUnreachable,
    /// A run started less than one cooldown ago.
    CoolingDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrainPolicy {
    pub retrain_interval: Duration,
    pub cooldown: Duration,
}

fn elapsed_at_least(now: DateTime<Utc>, since: DateTime<Utc>, span: Duration) -> bool {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed >= span,
        // `since` is in the future.
        Err(_) => span.is_zero(),
    }
}

impl RetrainPolicy {
    pub fn decide(
        &self,
        now: DateTime<Utc>,
        last_trained: Option<DateTime<Utc>>,
        last_attempt: Option<DateTime<Utc>>,
        source_reachable: bool,
    ) -> RetrainDecision {
        let due = last_trained.is_none_or(|trained| elapsed_at_least(now, trained, self.retrain_interval));
        if !due {
            return RetrainDecision::NotDue;
        }
        if !source_reachable {
            return RetrainDecision::SourceUnreachable;
        }
        if last_attempt.is_some_and(|attempt| !elapsed_at_least(now, attempt, self.cooldown)) {
            return RetrainDecision::CoolingDown;
        }
        RetrainDecision::Retrain
    }
}

/// A running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for it to exit. A run already in progress
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            error!(%error, "scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the retraining loop on the current tokio runtime.
pub fn spawn_scheduler(
    manager: Arc<ModelManager>,
    poll_interval: Duration,
    policy: RetrainPolicy,
) -> SchedulerHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let poll_interval = poll_interval.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            poll_secs = poll_interval.as_secs_f64(),
            retrain_secs = policy.retrain_interval.as_secs(),
            "scheduler started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => run_check(&manager, policy).await,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped");
    });

    SchedulerHandle { shutdown, task }
}

async fn run_check(manager: &Arc<ModelManager>, policy: RetrainPolicy) {
    let source = Arc::clone(manager);
    let reachable = match tokio::task::spawn_blocking(move || source.is_source_reachable()).await {
        Ok(reachable) => reachable,
        Err(error) => {
            error!(%error, "reachability check panicked");
            return;
        }
    };
    let last_trained = match manager.current() {
        Ok(bundle) => bundle.map(|bundle| bundle.trained_at()),
        Err(error) => {
            error!(%error, "cannot read the published model");
            return;
        }
    };

    let decision = policy.decide(Utc::now(), last_trained, manager.last_attempt(), reachable);
    debug!(?decision, "scheduler check");
    if decision != RetrainDecision::Retrain {
        return;
    }

    info!("starting scheduled retraining");
    let worker = Arc::clone(manager);
    match tokio::task::spawn_blocking(move || worker.train(true)).await {
        Ok(Ok(outcome)) => info!(
            accuracy = outcome.bundle.accuracy(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "scheduled retraining completed"
        ),
        Ok(Err(error)) => warn!(%error, "scheduled retraining failed"),
        Err(error) => error!(%error, "scheduled retraining panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn policy() -> RetrainPolicy {
        ScheduleConfig::default().policy()
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn no_bundle_means_due() {
        assert_eq!(policy().decide(now(), None, None, true), RetrainDecision::Retrain);
    }

    #[test]
    fn young_bundle_is_not_due() {
        let trained = now() - TimeDelta::hours(5);
        assert_eq!(policy().decide(now(), Some(trained), None, true), RetrainDecision::NotDue);
        let trained = now() - TimeDelta::hours(6);
        assert_eq!(policy().decide(now(), Some(trained), None, true), RetrainDecision::Retrain);
    }

    #[test]
    fn unreachable_source_blocks_retrain() {
        assert_eq!(
            policy().decide(now(), None, None, false),
            RetrainDecision::SourceUnreachable
        );
    }

    #[test]
    fn cooldown_follows_last_attempt() {
        let trained = now() - TimeDelta::hours(7);
        let attempt = now() - TimeDelta::minutes(59);
        assert_eq!(
            policy().decide(now(), Some(trained), Some(attempt), true),
            RetrainDecision::CoolingDown
        );
        let attempt = now() - TimeDelta::minutes(60);
        assert_eq!(
            policy().decide(now(), Some(trained), Some(attempt), true),
            RetrainDecision::Retrain
        );
    }

    #[test]
    fn future_timestamps_do_not_trigger() {
        let trained = now() + TimeDelta::minutes(5);
        assert_eq!(policy().decide(now(), Some(trained), None, true), RetrainDecision::NotDue);
    }

    #[test]
    fn cadence_reads_naturally() {
        assert_eq!(ScheduleConfig::default().cadence(), "6 hours");
        let config = ScheduleConfig {
            retrain_interval_secs: 90,
            ..ScheduleConfig::default()
        };
        assert_eq!(config.cadence(), "90 seconds");
    }
}
