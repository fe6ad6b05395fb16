//! Keeps the caller's notification set in step with the tracker.
//!
//! Reconciliation is a function of the previous id baseline and the freshly
//! discovered pending requests. It yields a [`ReconcilePlan`]: upserts for
//! every pending request followed by removals for ids that dropped out, and
//! the next baseline the caller has to hand back on the following cycle.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info, warn};

use crate::{
    config::TrackerConfig,
    domain::{
        Credential, NotificationAction, NotificationLevel, NotificationRecord, ReviewRequest,
        TrackerAccount,
    },
    github::{Tracker, TrackerError},
    pagination::{PageLimits, walk_pages},
};

pub const NOTIFICATION_SOURCE: &str = "review";

pub type NotificationIds = BTreeSet<String>;

/// Notification storage owned by the caller. `upsert` overwrites by id.
pub trait NotificationStore {
    fn upsert(&mut self, record: NotificationRecord);
    fn remove(&mut self, id: &str);
}

pub fn notification_id(request_id: u64) -> String {
    format!("review-update-{request_id}")
}

pub fn pending_notification(request: &ReviewRequest) -> NotificationRecord {
    NotificationRecord {
        id: notification_id(request.id),
        title: format!("Review request #{} needs an update", request.id),
        description: request.title.clone(),
        level: NotificationLevel::Warning,
        source: NOTIFICATION_SOURCE.to_owned(),
        pinned: true,
        dismissible: false,
        action: Some(NotificationAction {
            request_id: request.id,
            title: request.title.clone(),
        }),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreCommand {
    Upsert(NotificationRecord),
    Remove(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReconcilePlan {
    pub commands: Vec<StoreCommand>,
    pub next_ids: NotificationIds,
}

impl ReconcilePlan {
    pub fn apply<S: NotificationStore + ?Sized>(self, store: &mut S) -> NotificationIds {
        for command in self.commands {
            match command {
                StoreCommand::Upsert(record) => store.upsert(record),
                StoreCommand::Remove(id) => store.remove(&id),
            }
        }
        self.next_ids
    }

    pub fn removed_ids(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            StoreCommand::Remove(id) => Some(id.as_str()),
            StoreCommand::Upsert(_) => None,
        })
    }

    pub fn upserted_ids(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            StoreCommand::Upsert(record) => Some(record.id.as_str()),
            StoreCommand::Remove(_) => None,
        })
    }
}

/// Diffs `pending` against `previous`. All upserts precede all removals.
pub fn plan_reconciliation(previous: &NotificationIds, pending: &[ReviewRequest]) -> ReconcilePlan {
    let mut seen = HashSet::new();
    let mut commands = Vec::with_capacity(pending.len());
    let mut next_ids = NotificationIds::new();

    // Search pages can shift under us, so the same request may show up twice.
    for request in pending.iter().filter(|request| seen.insert(request.id)) {
        let record = pending_notification(request);
        next_ids.insert(record.id.clone());
        commands.push(StoreCommand::Upsert(record));
    }

    commands.extend(
        previous
            .difference(&next_ids)
            .map(|id| StoreCommand::Remove(id.clone())),
    );

    ReconcilePlan { commands, next_ids }
}

pub fn pending_query(login: &str, config: &TrackerConfig) -> String {
    format!(
        "repo:{} is:pr is:open label:\"{}\" mentions:{}",
        config.repo_path(),
        config.pending_label,
        login.trim()
    )
}

pub fn discover_pending<T: Tracker + ?Sized>(
    tracker: &T,
    account: &TrackerAccount,
    config: &TrackerConfig,
) -> Result<Vec<ReviewRequest>, TrackerError> {
    let query = pending_query(&account.login, config);
    let limits = PageLimits::new(config.search_per_page, config.search_max_pages);
    let pending = walk_pages(limits, |page| {
        tracker
            .search(&account.credential, &query, page, limits.per_page)
            .map(|result| result.items)
    })?;
    debug!(login = %account.login, count = pending.len(), "discovered pending requests");
    Ok(pending)
}

pub fn plan_pending<T: Tracker + ?Sized>(
    tracker: &T,
    account: &TrackerAccount,
    config: &TrackerConfig,
    previous: &NotificationIds,
) -> Result<ReconcilePlan, TrackerError> {
    let pending = discover_pending(tracker, account, config)?;
    Ok(plan_reconciliation(previous, &pending))
}

/// On failure nothing is applied and the caller should keep `previous`.
pub fn reconcile_pending<T, S>(
    tracker: &T,
    account: &TrackerAccount,
    config: &TrackerConfig,
    previous: &NotificationIds,
    store: &mut S,
) -> Result<NotificationIds, TrackerError>
where
    T: Tracker + ?Sized,
    S: NotificationStore + ?Sized,
{
    let plan = plan_pending(tracker, account, config, previous)?;
    info!(
        login = %account.login,
        upserts = plan.upserted_ids().count(),
        removals = plan.removed_ids().count(),
        "reconciled pending notifications"
    );
    Ok(plan.apply(store))
}

#[derive(Debug, Default)]
pub struct LabelRefresh {
    pub refreshed: Vec<u64>,
    pub failed: Vec<(u64, TrackerError)>,
}

/// Only requests carrying the pending label are refreshed. A failed lookup
/// keeps that request's cached labels.
pub fn refresh_pending_labels<T: Tracker + ?Sized>(
    tracker: &T,
    credential: &Credential,
    requests: &mut [ReviewRequest],
    config: &TrackerConfig,
) -> LabelRefresh {
    let mut outcome = LabelRefresh::default();
    for request in requests
        .iter_mut()
        .filter(|request| request.has_label(&config.pending_label))
    {
        match tracker.list_labels(credential, request.id, config.labels_per_page) {
            Ok(labels) => {
                request.labels = labels;
                outcome.refreshed.push(request.id);
            }
            Err(err) => {
                warn!(request = request.id, error = %err, "label refresh failed");
                outcome.failed.push((request.id, err));
            }
        }
    }
    outcome
}
