use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::TrackerConfig,
    domain::TrackerAccount,
    github::{Tracker, TrackerError},
    reconcile::{NotificationIds, NotificationStore, ReconcilePlan, plan_pending},
};

/// Fires once per `interval`.
pub struct RefreshScheduler {
    interval: Duration,
    last_run: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    pub fn should_trigger(&self) -> bool {
        match self.last_run {
            None => true,
            Some(instant) => instant.elapsed() >= self.interval,
        }
    }

    pub fn mark_triggered(&mut self) {
        self.last_run = Some(Instant::now());
    }
}

#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("Background worker disconnected before returning a result")]
    WorkerGone,
}

#[derive(Debug)]
pub enum CycleReport {
    Applied { upserts: usize, removals: usize },
    Failed(CycleError),
}

/// Drives reconciliation cycles for one identity.
///
/// Discovery runs on a worker thread; the resulting plan is applied to the
/// store on the polling thread. At most one cycle is in flight at a time, so
/// every cycle starts from the baseline the previous one produced.
pub struct AccountWorker<S> {
    account: TrackerAccount,
    baseline: NotificationIds,
    store: S,
    pending: Option<PendingCycle>,
    last_error: Option<String>,
    last_synced: Option<DateTime<Utc>>,
}

impl<S: NotificationStore> AccountWorker<S> {
    pub fn new(account: TrackerAccount, baseline: NotificationIds, store: S) -> Self {
        Self {
            account,
            baseline,
            store,
            pending: None,
            last_error: None,
            last_synced: None,
        }
    }

    pub fn login(&self) -> &str {
        &self.account.login
    }

    pub fn baseline(&self) -> &NotificationIds {
        &self.baseline
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns `false` without doing anything while a cycle is already running.
    pub fn start_cycle(
        &mut self,
        tracker: &Arc<dyn Tracker>,
        config: &Arc<TrackerConfig>,
    ) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(PendingCycle::spawn(
            Arc::clone(tracker),
            self.account.clone(),
            Arc::clone(config),
            self.baseline.clone(),
        ));
        true
    }

    /// Applies a finished cycle, if any. A failed cycle keeps the old baseline.
    pub fn poll(&mut self) -> Option<CycleReport> {
        let outcome = self.pending.as_ref()?.try_take()?;
        self.pending = None;
        match outcome {
            Ok(plan) => {
                let upserts = plan.upserted_ids().count();
                let removals = plan.removed_ids().count();
                self.baseline = plan.apply(&mut self.store);
                self.last_error = None;
                self.last_synced = Some(Utc::now());
                info!(login = %self.account.login, upserts, removals, "cycle applied");
                Some(CycleReport::Applied { upserts, removals })
            }
            Err(err) => {
                warn!(login = %self.account.login, error = %err, "cycle failed");
                self.last_error = Some(err.to_string());
                Some(CycleReport::Failed(err))
            }
        }
    }

    pub fn needs_refresh(&self, threshold: Duration) -> bool {
        match self.last_synced {
            None => true,
            Some(synced) => match chrono::Duration::from_std(threshold) {
                Ok(delta) => (Utc::now() - synced) >= delta,
                Err(_) => true,
            },
        }
    }
}

struct PendingCycle {
    receiver: Receiver<Result<ReconcilePlan, TrackerError>>,
}

impl PendingCycle {
    fn spawn(
        tracker: Arc<dyn Tracker>,
        account: TrackerAccount,
        config: Arc<TrackerConfig>,
        previous: NotificationIds,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = plan_pending(tracker.as_ref(), &account, &config, &previous);
            let _ = tx.send(outcome);
        });
        Self { receiver: rx }
    }

    fn try_take(&self) -> Option<Result<ReconcilePlan, CycleError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result.map_err(CycleError::from)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CycleError::WorkerGone)),
        }
    }
}
