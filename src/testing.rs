//! In-memory [`Tracker`] used by unit tests across the crate.

use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{
        Credential, FileCandidate, Label, LabelEvent, ReviewRequest, SearchPage, Verdict,
    },
    github::{Tracker, TrackerError},
};

/// A scripted response. `TrackerError` is not `Clone`, so failures are
/// described here and materialized on every call.
#[derive(Clone, Debug)]
pub enum Scripted<T> {
    Ok(T),
    Network,
    Status(u16),
}

impl<T: Clone> Scripted<T> {
    fn resolve(&self) -> Result<T, TrackerError> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::Network => Err(network_error()),
            Scripted::Status(status) => Err(TrackerError::from_status(*status, None)),
        }
    }
}

/// A genuine transport-level `reqwest::Error`, produced without touching the network.
pub fn network_error() -> TrackerError {
    let err = reqwest::blocking::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid URL must fail to build");
    TrackerError::Network(err)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Search { query: String, page: u32 },
    GetRequest(u64),
    Files(u64),
    Events { id: u64, page: u32 },
    Labels(u64),
    PostReview { id: u64, verdict: Verdict },
    AddLabel { id: u64, label: String },
    Raw(String),
    Revision(String),
}

pub struct FakeTracker {
    /// Search results by page, starting at page 1. Missing pages are empty.
    pub search_pages: Vec<Scripted<Vec<ReviewRequest>>>,
    pub requests: HashMap<u64, Scripted<ReviewRequest>>,
    pub files: HashMap<u64, Scripted<Vec<FileCandidate>>>,
    /// Event history by request, then by page starting at page 1.
    pub events: HashMap<u64, Vec<Scripted<Vec<LabelEvent>>>>,
    pub labels: HashMap<u64, Scripted<Vec<Label>>>,
    pub revisions: HashMap<String, Scripted<Option<DateTime<Utc>>>>,
    pub raw: HashMap<String, Scripted<Vec<u8>>>,
    pub review_result: Scripted<()>,
    pub label_result: Scripted<()>,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self {
            search_pages: Vec::new(),
            requests: HashMap::new(),
            files: HashMap::new(),
            events: HashMap::new(),
            labels: HashMap::new(),
            revisions: HashMap::new(),
            raw: HashMap::new(),
            review_result: Scripted::Ok(()),
            label_result: Scripted::Ok(()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeTracker {
    pub fn with_review_result(mut self, result: Scripted<()>) -> Self {
        self.review_result = result;
        self
    }

    pub fn with_label_result(mut self, result: Scripted<()>) -> Self {
        self.label_result = result;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, credential: &Credential, call: Call) -> Result<(), TrackerError> {
        credential.bearer().ok_or(TrackerError::MissingCredential)?;
        self.calls.lock().expect("calls lock").push(call);
        Ok(())
    }
}

fn page_of<T: Clone>(pages: &[Scripted<Vec<T>>], page: u32) -> Result<Vec<T>, TrackerError> {
    let index = page.saturating_sub(1) as usize;
    pages
        .get(index)
        .map_or_else(|| Ok(Vec::new()), Scripted::resolve)
}

impl Tracker for FakeTracker {
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        page: u32,
        _per_page: u32,
    ) -> Result<SearchPage, TrackerError> {
        self.record(
            credential,
            Call::Search {
                query: query.to_owned(),
                page,
            },
        )?;
        let items = page_of(&self.search_pages, page)?;
        Ok(SearchPage {
            total_count: items.len() as u64,
            items,
        })
    }

    fn get_request(&self, credential: &Credential, id: u64) -> Result<ReviewRequest, TrackerError> {
        self.record(credential, Call::GetRequest(id))?;
        self.requests
            .get(&id)
            .map_or(Err(TrackerError::NotFound), Scripted::resolve)
    }

    fn list_request_files(
        &self,
        credential: &Credential,
        id: u64,
    ) -> Result<Vec<FileCandidate>, TrackerError> {
        self.record(credential, Call::Files(id))?;
        self.files
            .get(&id)
            .map_or_else(|| Ok(Vec::new()), Scripted::resolve)
    }

    fn list_request_events(
        &self,
        credential: &Credential,
        id: u64,
        page: u32,
        _per_page: u32,
    ) -> Result<Vec<LabelEvent>, TrackerError> {
        self.record(credential, Call::Events { id, page })?;
        match self.events.get(&id) {
            Some(pages) => page_of(pages, page),
            None => Ok(Vec::new()),
        }
    }

    fn list_labels(
        &self,
        credential: &Credential,
        id: u64,
        _per_page: u32,
    ) -> Result<Vec<Label>, TrackerError> {
        self.record(credential, Call::Labels(id))?;
        self.labels
            .get(&id)
            .map_or(Err(TrackerError::NotFound), Scripted::resolve)
    }

    fn post_review(
        &self,
        credential: &Credential,
        id: u64,
        verdict: Verdict,
        _body: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.record(credential, Call::PostReview { id, verdict })?;
        self.review_result.resolve()
    }

    fn add_label(
        &self,
        credential: &Credential,
        id: u64,
        label: &str,
    ) -> Result<(), TrackerError> {
        self.record(
            credential,
            Call::AddLabel {
                id,
                label: label.to_owned(),
            },
        )?;
        self.label_result.resolve()
    }

    fn fetch_raw_content(
        &self,
        credential: &Credential,
        url: &str,
    ) -> Result<Vec<u8>, TrackerError> {
        self.record(credential, Call::Raw(url.to_owned()))?;
        self.raw
            .get(url)
            .map_or(Err(TrackerError::NotFound), Scripted::resolve)
    }

    fn revision_timestamp(
        &self,
        credential: &Credential,
        revision: &str,
    ) -> Result<Option<DateTime<Utc>>, TrackerError> {
        self.record(credential, Call::Revision(revision.to_owned()))?;
        self.revisions
            .get(revision)
            .map_or(Ok(None), Scripted::resolve)
    }
}

pub fn token() -> Credential {
    Credential::new("ghp_test")
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub fn label(name: &str) -> Label {
    Label {
        name: name.to_owned(),
        color: "ededed".to_owned(),
    }
}

pub fn request(id: u64, labels: &[&str]) -> ReviewRequest {
    ReviewRequest {
        id,
        title: format!("Lyrics submission {id}"),
        html_url: format!("https://github.com/acme/lyrics/pull/{id}"),
        labels: labels.iter().map(|name| label(name)).collect(),
        head_revision: None,
        created_at: at(9, 0),
    }
}

pub fn labeled(name: &str, when: DateTime<Utc>) -> LabelEvent {
    LabelEvent {
        kind: "labeled".to_owned(),
        label_name: Some(name.to_owned()),
        created_at: when,
    }
}
