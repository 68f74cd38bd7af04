use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wanderlust_core::worker::WorkerState;

/// Registration file name in the storage directory
const REGISTRATION_FILE: &str = "registration.json";

/// What the host remembers about the installed worker between invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationData {
    pub cache_name: String,
    pub state: WorkerState,
    pub installed_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl RegistrationData {
    pub fn new(cache_name: &str) -> Self {
        Self {
            cache_name: cache_name.to_string(),
            state: WorkerState::Parsed,
            installed_at: None,
            activated_at: None,
        }
    }
}

pub struct Registration {
    storage_dir: PathBuf,
    pub data: Option<RegistrationData>,
}

impl Registration {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            data: None,
        }
    }

    fn registration_path(&self) -> PathBuf {
        self.storage_dir.join(REGISTRATION_FILE)
    }

    /// Load the registration from disk. Returns false if none exists.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.registration_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read registration file")?;
        let data: RegistrationData =
            serde_json::from_str(&contents).context("Failed to parse registration file")?;
        self.data = Some(data);
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.registration_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// State of the registered worker for `cache_name`.
    ///
    /// A registration for a different cache version belongs to an older
    /// worker; the new one starts from scratch.
    pub fn state_for(&self, cache_name: &str) -> WorkerState {
        match self.data {
            Some(ref data) if data.cache_name == cache_name => data.state,
            _ => WorkerState::Parsed,
        }
    }

    /// Record a new lifecycle state for `cache_name`
    pub fn record(&mut self, cache_name: &str, state: WorkerState) {
        let now = Utc::now();
        let data = match self.data.take() {
            Some(data) if data.cache_name == cache_name => data,
            _ => RegistrationData::new(cache_name),
        };
        let mut data = RegistrationData { state, ..data };
        match state {
            WorkerState::Waiting => data.installed_at = Some(now),
            WorkerState::Active => data.activated_at = Some(now),
            _ => {}
        }
        self.data = Some(data);
    }
}
