use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Domain data structures shared across modules.

/// Opaque bearer token. Blank or whitespace-only tokens count as absent.
#[derive(Clone, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> Option<&str> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bearer() {
            Some(_) => f.write_str("Credential(<redacted>)"),
            None => f.write_str("Credential(<missing>)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackerAccount {
    pub login: String,
    pub credential: Credential,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewRequest {
    pub id: u64,
    pub title: String,
    pub html_url: String,
    pub labels: Vec<Label>,
    pub head_revision: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelEvent {
    pub kind: String,
    pub label_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LabelEvent {
    pub fn is_labeled_with(&self, name: &str) -> bool {
        self.kind == "labeled" && self.label_name.as_deref() == Some(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchPage {
    pub total_count: u64,
    pub items: Vec<ReviewRequest>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FileCandidate {
    pub filename: String,
    pub raw_url: String,
}

impl FileCandidate {
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.rsplit('/').next().unwrap_or(&self.filename);
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    RequestChanges,
}

impl Verdict {
    pub fn event(&self) -> &'static str {
        match self {
            Verdict::Approve => "APPROVE",
            Verdict::RequestChanges => "REQUEST_CHANGES",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub request_id: u64,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
    pub source: String,
    pub pinned: bool,
    pub dismissible: bool,
    pub action: Option<NotificationAction>,
}
