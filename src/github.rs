use chrono::{DateTime, Utc};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::TrackerConfig,
    domain::{Credential, FileCandidate, Label, LabelEvent, ReviewRequest, SearchPage, Verdict},
    pagination::{PageLimits, walk_pages},
};

const USER_AGENT_HEADER: &str = "review-sync/0.1";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
// The pull request files endpoint stops listing after 3000 entries.
const FILES_PAGE_LIMITS: PageLimits = PageLimits {
    per_page: 100,
    max_pages: 30,
};

/// REST surface of the remote tracker, as far as review bookkeeping needs it.
///
/// Every call takes the credential explicitly; implementations must reject a
/// blank credential with [`TrackerError::MissingCredential`] before doing any
/// I/O.
pub trait Tracker: Send + Sync {
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, TrackerError>;

    fn get_request(&self, credential: &Credential, id: u64) -> Result<ReviewRequest, TrackerError>;

    fn list_request_files(
        &self,
        credential: &Credential,
        id: u64,
    ) -> Result<Vec<FileCandidate>, TrackerError>;

    fn list_request_events(
        &self,
        credential: &Credential,
        id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<LabelEvent>, TrackerError>;

    fn list_labels(
        &self,
        credential: &Credential,
        id: u64,
        per_page: u32,
    ) -> Result<Vec<Label>, TrackerError>;

    fn post_review(
        &self,
        credential: &Credential,
        id: u64,
        verdict: Verdict,
        body: Option<&str>,
    ) -> Result<(), TrackerError>;

    fn add_label(&self, credential: &Credential, id: u64, label: &str) -> Result<(), TrackerError>;

    fn fetch_raw_content(&self, credential: &Credential, url: &str) -> Result<Vec<u8>, TrackerError>;

    /// Timestamp of a single revision, `None` when the remote has no date for it.
    fn revision_timestamp(
        &self,
        credential: &Credential,
        revision: &str,
    ) -> Result<Option<DateTime<Utc>>, TrackerError>;

    /// Timestamp of the request's head revision.
    ///
    /// `Ok(None)` when the request has no head revision or the revision
    /// carries no date.
    fn latest_revision_timestamp(
        &self,
        credential: &Credential,
        id: u64,
    ) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let request = self.get_request(credential, id)?;
        match request.head_revision.as_deref() {
            Some(revision) => self.revision_timestamp(credential, revision),
            None => Ok(None),
        }
    }
}

pub fn build_client(config: &TrackerConfig) -> Result<Client, TrackerError> {
    Client::builder()
        .user_agent(USER_AGENT_HEADER)
        .timeout(config.request_timeout())
        .build()
        .map_err(TrackerError::Network)
}

pub struct GitHubTracker {
    client: Client,
    api_base: String,
    repo_path: String,
    bypass_cache: bool,
}

impl GitHubTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        Ok(Self::with_client(build_client(config)?, config))
    }

    pub fn with_client(client: Client, config: &TrackerConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            repo_path: config.repo_path(),
            bypass_cache: config.bypass_cache,
        }
    }

    fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{tail}", self.api_base, self.repo_path)
    }

    fn authorized(
        &self,
        builder: RequestBuilder,
        credential: &Credential,
    ) -> Result<RequestBuilder, TrackerError> {
        let token = credential.bearer().ok_or(TrackerError::MissingCredential)?;
        let builder = builder.header(ACCEPT, GITHUB_MEDIA_TYPE).bearer_auth(token);
        Ok(if self.bypass_cache {
            builder.header(CACHE_CONTROL, "no-cache")
        } else {
            builder
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        debug!(%url, "GET");
        let response = self
            .authorized(self.client.get(url).query(query), credential)?
            .send()?;
        decode(check_status(response)?)
    }

    fn post_json(
        &self,
        credential: &Credential,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TrackerError> {
        debug!(%url, "POST");
        let response = self
            .authorized(self.client.post(url), credential)?
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

impl Tracker for GitHubTracker {
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, TrackerError> {
        let url = format!("{}/search/issues", self.api_base);
        let response: SearchResponse = self.get_json(
            credential,
            &url,
            &[
                ("q", query.to_owned()),
                ("sort", "updated".to_owned()),
                ("order", "desc".to_owned()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )?;

        Ok(SearchPage {
            total_count: response.total_count,
            items: response
                .items
                .into_iter()
                .map(|item| ReviewRequest {
                    id: item.number,
                    title: item.title,
                    html_url: item.html_url,
                    labels: item.labels,
                    head_revision: None,
                    created_at: item.created_at,
                })
                .collect(),
        })
    }

    fn get_request(&self, credential: &Credential, id: u64) -> Result<ReviewRequest, TrackerError> {
        let url = self.repo_url(&format!("pulls/{id}"));
        let pull: PullResponse = self.get_json(credential, &url, &[])?;
        Ok(ReviewRequest {
            id: pull.number,
            title: pull.title,
            html_url: pull.html_url,
            labels: pull.labels,
            head_revision: pull.head.and_then(|head| head.sha),
            created_at: pull.created_at,
        })
    }

    fn list_request_files(
        &self,
        credential: &Credential,
        id: u64,
    ) -> Result<Vec<FileCandidate>, TrackerError> {
        let url = self.repo_url(&format!("pulls/{id}/files"));
        let limits = FILES_PAGE_LIMITS;
        // Short-page detection counts every entry, removed files included.
        let files: Vec<FileResponse> = walk_pages(limits, |page| {
            self.get_json(
                credential,
                &url,
                &[("page", page.to_string()), ("per_page", limits.per_page.to_string())],
            )
        })?;
        Ok(files
            .into_iter()
            // A deleted file has nothing left to review.
            .filter(|file| file.status.as_deref() != Some("removed"))
            .filter_map(|file| {
                Some(FileCandidate {
                    filename: file.filename,
                    raw_url: file.raw_url?,
                })
            })
            .collect())
    }

    fn list_request_events(
        &self,
        credential: &Credential,
        id: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<LabelEvent>, TrackerError> {
        let url = self.repo_url(&format!("issues/{id}/events"));
        let events: Vec<EventResponse> = self.get_json(
            credential,
            &url,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )?;
        Ok(events
            .into_iter()
            .map(|event| LabelEvent {
                kind: event.event,
                label_name: event.label.map(|label| label.name),
                created_at: event.created_at,
            })
            .collect())
    }

    fn list_labels(
        &self,
        credential: &Credential,
        id: u64,
        per_page: u32,
    ) -> Result<Vec<Label>, TrackerError> {
        let url = self.repo_url(&format!("issues/{id}/labels"));
        self.get_json(credential, &url, &[("per_page", per_page.to_string())])
    }

    fn post_review(
        &self,
        credential: &Credential,
        id: u64,
        verdict: Verdict,
        body: Option<&str>,
    ) -> Result<(), TrackerError> {
        let url = self.repo_url(&format!("pulls/{id}/reviews"));
        let mut payload = json!({ "event": verdict.event() });
        if let Some(body) = body.map(str::trim).filter(|body| !body.is_empty()) {
            payload["body"] = json!(body);
        }
        self.post_json(credential, &url, &payload)
    }

    fn add_label(
        &self,
        credential: &Credential,
        id: u64,
        label: &str,
    ) -> Result<(), TrackerError> {
        let url = self.repo_url(&format!("issues/{id}/labels"));
        self.post_json(credential, &url, &json!({ "labels": [label] }))
    }

    fn fetch_raw_content(
        &self,
        credential: &Credential,
        url: &str,
    ) -> Result<Vec<u8>, TrackerError> {
        debug!(%url, "GET raw");
        let response = self.authorized(self.client.get(url), credential)?.send()?;
        let bytes = check_status(response)?.bytes()?;
        Ok(bytes.to_vec())
    }

    fn revision_timestamp(
        &self,
        credential: &Credential,
        revision: &str,
    ) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let url = self.repo_url(&format!("commits/{revision}"));
        let commit: CommitResponse = self.get_json(credential, &url, &[])?;
        let detail = commit.commit;
        Ok(detail
            .committer
            .and_then(|signature| signature.date)
            .or_else(|| detail.author.and_then(|signature| signature.date)))
    }
}

fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorResponse>(&body).ok())
        .and_then(|body| body.message);
    Err(TrackerError::from_status(status.as_u16(), message))
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TrackerError> {
    let body = response.text()?;
    serde_json::from_str(&body).map_err(|err| TrackerError::Malformed(err.to_string()))
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker credential is missing")]
    MissingCredential,
    #[error("Tracker rejected the credential")]
    InvalidCredential,
    #[error("Requested resource was not found")]
    NotFound,
    #[error("Tracker responded with HTTP {status}{}", detail(.message))]
    Remote { status: u16, message: Option<String> },
    #[error("Tracker request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Tracker returned an unexpected payload: {0}")]
    Malformed(String),
}

impl TrackerError {
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => TrackerError::InvalidCredential,
            404 => TrackerError::NotFound,
            _ => TrackerError::Remote { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TrackerError::InvalidCredential => Some(401),
            TrackerError::NotFound => Some(404),
            TrackerError::Remote { status, .. } => Some(*status),
            TrackerError::Network(err) => err.status().map(|status| status.as_u16()),
            TrackerError::MissingCredential | TrackerError::Malformed(_) => None,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

// Response payloads ---------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    labels: Vec<Label>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    labels: Vec<Label>,
    head: Option<PullHead>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PullHead {
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    filename: String,
    status: Option<String>,
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    event: String,
    label: Option<Label>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitSignature>,
    committer: Option<CommitSignature>,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------
