use std::{fs, io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.json";

/// GitHub serves at most this many items per page.
pub const MAX_PER_PAGE: u32 = 100;

/// Knobs for talking to the content repository's tracker.
///
/// Every field has a default so a partial (or missing) config file still
/// produces a usable value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    /// Label marking a review request as waiting on its submitter.
    pub pending_label: String,
    /// Label applied alongside a change-request review.
    pub needs_update_label: String,
    pub search_per_page: u32,
    pub search_max_pages: u32,
    pub events_per_page: u32,
    pub events_max_pages: u32,
    pub labels_per_page: u32,
    /// A revision must land this many seconds after the label to count as newer.
    pub staleness_tolerance_secs: u64,
    pub request_timeout_secs: u64,
    pub bypass_cache: bool,
    pub poll_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_owned(),
            owner: "Steve-xmh".to_owned(),
            repo: "amll-ttml-db".to_owned(),
            pending_label: "待更新".to_owned(),
            needs_update_label: "待更新".to_owned(),
            search_per_page: 50,
            search_max_pages: 10,
            events_per_page: 100,
            events_max_pages: 25,
            labels_per_page: 100,
            staleness_tolerance_secs: 0,
            request_timeout_secs: 30,
            bypass_cache: true,
            poll_interval_secs: 180,
        }
    }
}

impl TrackerConfig {
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let config: Self = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(err.into()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "owner and repo must both be set".to_owned(),
            ));
        }
        let pages = [
            ("search_per_page", self.search_per_page),
            ("search_max_pages", self.search_max_pages),
            ("events_per_page", self.events_per_page),
            ("events_max_pages", self.events_max_pages),
            ("labels_per_page", self.labels_per_page),
        ];
        for (name, value) in pages {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }
        // An oversized page comes back short and would end a walk early.
        let page_sizes = [
            ("search_per_page", self.search_per_page),
            ("events_per_page", self.events_per_page),
            ("labels_per_page", self.labels_per_page),
        ];
        for (name, value) in page_sizes {
            if value > MAX_PER_PAGE {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not exceed {MAX_PER_PAGE}"
                )));
            }
        }
        Ok(())
    }

    pub fn repo_path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn staleness_tolerance(&self) -> chrono::Duration {
        i64::try_from(self.staleness_tolerance_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading configuration: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
