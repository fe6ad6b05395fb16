use std::{collections::BTreeMap, env, process::ExitCode, sync::Arc, thread, time::Duration};

use review_sync::{
    GitHubTracker, Tracker, TrackerConfig, TrackerError,
    config::ConfigError,
    domain::NotificationRecord,
    reconcile::NotificationStore,
    scheduler::{AccountWorker, CycleReport, RefreshScheduler},
    storage::{StateStore, StoreError},
};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const LOGIN_ENV: &str = "REVIEW_SYNC_LOGIN";
const TOKEN_ENV: &str = "REVIEW_SYNC_TOKEN";
const TICK: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "review-sync stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_sync=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn run() -> Result<(), AppError> {
    let state = StateStore::initialize()?;
    let config = Arc::new(TrackerConfig::load(state.dir())?);

    if let (Ok(login), Ok(token)) = (env::var(LOGIN_ENV), env::var(TOKEN_ENV))
        && !login.trim().is_empty()
    {
        state.persist_account(login.trim(), token.trim())?;
    }

    let accounts = state.accounts()?;
    if accounts.is_empty() {
        return Err(AppError::NoAccounts);
    }

    let tracker: Arc<dyn Tracker> = Arc::new(GitHubTracker::new(&config)?);
    let mut workers = accounts
        .into_iter()
        .map(|account| {
            let baseline = state.baseline(&account.login)?;
            Ok(AccountWorker::new(account, baseline, LoggingStore::default()))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    info!(
        accounts = workers.len(),
        repo = %config.repo_path(),
        "watching review requests"
    );

    let mut scheduler = RefreshScheduler::new(config.poll_interval());
    loop {
        for worker in &mut workers {
            if let Some(CycleReport::Applied { .. }) = worker.poll()
                && let Err(err) = state.persist_baseline(worker.login(), worker.baseline())
            {
                warn!(login = worker.login(), error = %err, "failed to persist baseline");
            }
        }

        if scheduler.should_trigger() {
            for worker in &mut workers {
                if worker.needs_refresh(config.poll_interval()) {
                    worker.start_cycle(&tracker, &config);
                }
            }
            scheduler.mark_triggered();
        }

        thread::sleep(TICK);
    }
}

/// Prints notification changes instead of rendering them.
#[derive(Default)]
struct LoggingStore {
    records: BTreeMap<String, NotificationRecord>,
}

impl NotificationStore for LoggingStore {
    fn upsert(&mut self, record: NotificationRecord) {
        if !self.records.contains_key(&record.id) {
            info!(id = %record.id, title = %record.title, detail = %record.description, "notification raised");
        }
        self.records.insert(record.id.clone(), record);
    }

    fn remove(&mut self, id: &str) {
        if self.records.remove(id).is_some() {
            info!(%id, "notification cleared");
        }
    }
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("No account configured; set REVIEW_SYNC_LOGIN and REVIEW_SYNC_TOKEN")]
    NoAccounts,
}
