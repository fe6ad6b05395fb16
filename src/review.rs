use tracing::{info, warn};

use crate::{
    domain::{Credential, Verdict},
    github::{Tracker, TrackerError},
};

/// Result of a review submission.
///
/// Posting the verdict is the primary effect; labeling afterwards is
/// bookkeeping, so a label failure is reported next to a successful post
/// rather than instead of it.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The verdict was not recorded.
    Rejected(TrackerError),
    /// The verdict was recorded, and the label as well when one was due.
    Posted,
    /// The change request was recorded but the needs-update label was not applied.
    PostedLabelFailed(TrackerError),
}

impl SubmissionOutcome {
    pub fn ok(&self) -> bool {
        !matches!(self, SubmissionOutcome::Rejected(_))
    }

    /// HTTP status of the failed review post.
    pub fn status(&self) -> Option<u16> {
        match self {
            SubmissionOutcome::Rejected(err) => err.status(),
            _ => None,
        }
    }

    /// HTTP status of the failed label step.
    pub fn label_status(&self) -> Option<u16> {
        match self {
            SubmissionOutcome::PostedLabelFailed(err) => err.status(),
            _ => None,
        }
    }
}

pub fn submit_review<T: Tracker + ?Sized>(
    tracker: &T,
    credential: &Credential,
    request_id: u64,
    verdict: Verdict,
    body: Option<&str>,
    needs_update_label: &str,
) -> SubmissionOutcome {
    if let Err(err) = tracker.post_review(credential, request_id, verdict, body) {
        warn!(request = request_id, ?verdict, error = %err, "review submission failed");
        return SubmissionOutcome::Rejected(err);
    }
    info!(request = request_id, ?verdict, "review submitted");

    if verdict != Verdict::RequestChanges {
        return SubmissionOutcome::Posted;
    }

    match tracker.add_label(credential, request_id, needs_update_label) {
        Ok(()) => SubmissionOutcome::Posted,
        Err(err) => {
            warn!(request = request_id, error = %err, "review posted but labeling failed");
            SubmissionOutcome::PostedLabelFailed(err)
        }
    }
}
