//! Worker configuration and host settings.
//!
//! `WorkerConfig` holds the fixed cache layout of the offline layer: the
//! current bucket name, the legacy bucket names and the seed resources. It is
//! built once at startup and never mutated.
//!
//! `Settings` holds the host's deployment settings (origin, storage location,
//! request timeout). They are stored at
//! `~/.config/wanderlust-sw/settings.json` and can be overridden from the
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// Cache Layout
// ============================================================================

/// Name of the bucket that serves traffic.
pub const CACHE_NAME: &str = "wanderlust-v3";

/// Buckets left behind by earlier releases.
pub const LEGACY_CACHES: &[&str] = &["wanderlust-v1", "wanderlust-v2"];

/// Resources stored in the current bucket at install time.
pub const SEED_URLS: &[&str] = &[
    "/",
    "/css/style.css",
    "/css/rating.css",
    "/js/script.js",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.7/dist/css/bootstrap.min.css",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.7/dist/js/bootstrap.bundle.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.7.2/css/all.min.css",
];

/// Path segments routed network-first.
pub const NETWORK_FIRST_MARKERS: &[&str] = &["/css/", "/js/"];

/// Path segment identifying icon assets.
pub const ICON_MARKER: &str = "/icons/";

/// Origin used when nothing else is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub cache_name: String,
    pub legacy_caches: Vec<String>,
    pub seed_urls: Vec<String>,
    pub network_first_markers: Vec<String>,
    pub icon_marker: String,
}

impl WorkerConfig {
    /// Build the Wanderlust cache layout for the given origin
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_name: CACHE_NAME.to_string(),
            legacy_caches: LEGACY_CACHES.iter().map(|s| s.to_string()).collect(),
            seed_urls: SEED_URLS.iter().map(|s| s.to_string()).collect(),
            network_first_markers: NETWORK_FIRST_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            icon_marker: ICON_MARKER.to_string(),
        }
    }

    /// Resolve a seed entry (same-origin path or absolute URL) against the origin
    pub fn resolve(&self, raw: &str) -> Result<Url, url::ParseError> {
        self.origin.join(raw)
    }
}

// ============================================================================
// Host Settings
// ============================================================================

/// Application name used for config/storage directory paths
const APP_NAME: &str = "wanderlust-sw";

/// Settings file name
const SETTINGS_FILE: &str = "settings.json";

const ENV_ORIGIN: &str = "WANDERLUST_ORIGIN";
const ENV_STORAGE_DIR: &str = "WANDERLUST_STORAGE_DIR";
const ENV_TIMEOUT_SECS: &str = "WANDERLUST_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    pub origin: Option<String>,
    pub storage_dir: Option<PathBuf>,
    /// Network fetches never time out unless this is set.
    pub request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = Self::settings_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `WANDERLUST_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(origin) = std::env::var(ENV_ORIGIN) {
            self.origin = Some(origin);
        }
        if let Ok(dir) = std::env::var(ENV_STORAGE_DIR) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Ok(secs) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs = secs
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
            self.request_timeout_secs = Some(secs);
        }
        Ok(self)
    }

    fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(SETTINGS_FILE))
    }

    pub fn origin(&self) -> Result<Url> {
        let raw = self.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
        Url::parse(raw).with_context(|| format!("Invalid origin: {}", raw))
    }

    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn worker_config(&self) -> Result<WorkerConfig> {
        Ok(WorkerConfig::new(self.origin()?))
    }
}
