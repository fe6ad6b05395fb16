//! Review-request bookkeeping against a remote issue tracker.
//!
//! Discovers review requests waiting on their submitter, keeps a caller-owned
//! notification set reconciled with them, tells when review feedback has been
//! overtaken by a newer revision, and submits review verdicts.

pub mod config;
pub mod content;
pub mod domain;
pub mod github;
pub mod pagination;
pub mod reconcile;
pub mod review;
pub mod scheduler;
pub mod session;
pub mod staleness;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::TrackerConfig;
pub use domain::{Credential, ReviewRequest, TrackerAccount, Verdict};
pub use github::{GitHubTracker, Tracker, TrackerError};
