use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    domain::{Credential, TrackerAccount},
    reconcile::NotificationIds,
};

const STORAGE_DIR_NAME: &str = ".review-sync";
const ACCOUNTS_FILE: &str = "accounts.json";
const BASELINES_FILE: &str = "baselines.json";

#[derive(Default, Serialize, Deserialize, Clone)]
pub struct StoredAccounts {
    pub accounts: Vec<StoredAccount>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    pub login: String,
    pub token: String,
}

impl StoredAccounts {
    fn upsert(&mut self, login: &str, token: &str) {
        if let Some(existing) = self.accounts.iter_mut().find(|entry| entry.login == login) {
            existing.token = token.to_owned();
        } else {
            self.accounts.push(StoredAccount {
                login: login.to_owned(),
                token: token.to_owned(),
            });
            self.accounts.sort_by(|a, b| a.login.cmp(&b.login));
        }
    }

    fn remove(&mut self, login: &str) {
        self.accounts.retain(|entry| entry.login != login);
    }
}

/// Last reconciled notification ids, keyed by login.
#[derive(Default, Serialize, Deserialize, Clone)]
pub struct StoredBaselines {
    pub baselines: BTreeMap<String, NotificationIds>,
}

/// Caller-side state kept between runs: accounts and reconciliation baselines.
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn initialize() -> Result<Self, StoreError> {
        let home = env::var("HOME").map_err(|_| StoreError::HomeDirMissing)?;
        Self::at(PathBuf::from(home).join(STORAGE_DIR_NAME))
    }

    pub fn at(dir: PathBuf) -> Result<Self, StoreError> {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn accounts(&self) -> Result<Vec<TrackerAccount>, StoreError> {
        let registry: StoredAccounts = self.read(ACCOUNTS_FILE)?;
        Ok(registry
            .accounts
            .into_iter()
            .map(|entry| TrackerAccount {
                login: entry.login,
                credential: Credential::new(entry.token),
            })
            .collect())
    }

    pub fn persist_account(&self, login: &str, token: &str) -> Result<(), StoreError> {
        let mut registry: StoredAccounts = self.read(ACCOUNTS_FILE)?;
        registry.upsert(login, token);
        self.write(ACCOUNTS_FILE, &registry)
    }

    /// Drops the account together with its baseline.
    pub fn forget(&self, login: &str) -> Result<(), StoreError> {
        let mut registry: StoredAccounts = self.read(ACCOUNTS_FILE)?;
        registry.remove(login);
        self.write(ACCOUNTS_FILE, &registry)?;

        let mut baselines: StoredBaselines = self.read(BASELINES_FILE)?;
        if baselines.baselines.remove(login).is_some() {
            self.write(BASELINES_FILE, &baselines)?;
        }
        Ok(())
    }

    pub fn baseline(&self, login: &str) -> Result<NotificationIds, StoreError> {
        let mut stored: StoredBaselines = self.read(BASELINES_FILE)?;
        Ok(stored.baselines.remove(login).unwrap_or_default())
    }

    pub fn persist_baseline(&self, login: &str, ids: &NotificationIds) -> Result<(), StoreError> {
        let mut stored: StoredBaselines = self.read(BASELINES_FILE)?;
        stored.baselines.insert(login.to_owned(), ids.clone());
        self.write(BASELINES_FILE, &stored)
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        match fs::read_to_string(self.dir.join(file)) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(file), data)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HOME environment variable is not set; cannot keep state under ~/.review-sync")]
    HomeDirMissing,
    #[error("I/O error while handling stored state: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize stored state: {0}")]
    Serialization(#[from] serde_json::Error),
}
