//! Detects review feedback that predates the submitter's latest update.
//!
//! Two timestamps are compared: when the needs-update label was last applied
//! to a request, and when its head revision was committed. Each lookup
//! reports its own outcome so a transport failure can be told apart from a
//! label that was simply never applied. Either way, a missing timestamp
//! means "not stale".

use std::{panic, thread};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::{
    config::TrackerConfig,
    domain::Credential,
    github::{Tracker, TrackerError},
    pagination::{PageLimits, walk_pages},
};

pub type TimestampLookup = Result<Option<DateTime<Utc>>, TrackerError>;

#[derive(Debug)]
pub struct StalenessReport {
    pub request_id: u64,
    pub label_applied_at: TimestampLookup,
    pub revised_at: TimestampLookup,
    pub stale: bool,
}

/// Strict comparison: a revision committed at the same instant as the label
/// (or within `tolerance` after it) is not considered newer.
pub fn is_stale(
    label_applied_at: Option<DateTime<Utc>>,
    revised_at: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> bool {
    match (label_applied_at, revised_at) {
        (Some(labeled), Some(revised)) => labeled
            .checked_add_signed(tolerance)
            .is_some_and(|threshold| revised > threshold),
        _ => false,
    }
}

/// Most recent time `label` was applied to the request.
pub fn label_applied_at<T: Tracker + ?Sized>(
    tracker: &T,
    credential: &Credential,
    id: u64,
    label: &str,
    limits: PageLimits,
) -> TimestampLookup {
    let events = walk_pages(limits, |page| {
        tracker.list_request_events(credential, id, page, limits.per_page)
    })?;
    Ok(events
        .iter()
        .filter(|event| event.is_labeled_with(label))
        .map(|event| event.created_at)
        .max())
}

pub fn detect_staleness<T: Tracker + ?Sized>(
    tracker: &T,
    credential: &Credential,
    id: u64,
    config: &TrackerConfig,
) -> StalenessReport {
    let limits = PageLimits::new(config.events_per_page, config.events_max_pages);
    let (label_applied_at, revised_at) = thread::scope(|scope| {
        let revision = scope.spawn(|| tracker.latest_revision_timestamp(credential, id));
        let labeled = label_applied_at(tracker, credential, id, &config.needs_update_label, limits);
        let revised = revision
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));
        (labeled, revised)
    });

    if let Err(err) = &label_applied_at {
        warn!(request = id, error = %err, "label history lookup failed");
    }
    if let Err(err) = &revised_at {
        warn!(request = id, error = %err, "head revision lookup failed");
    }

    let stale = is_stale(
        label_applied_at.as_ref().ok().copied().flatten(),
        revised_at.as_ref().ok().copied().flatten(),
        config.staleness_tolerance(),
    );
    debug!(request = id, stale, "staleness evaluated");

    StalenessReport {
        request_id: id,
        label_applied_at,
        revised_at,
        stale,
    }
}
