//! Command implementations for the `wanderlust-sw` host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};
use wanderlust_core::cache::{CacheStorage, FsStorage};
use wanderlust_core::host::{LogNotifier, PageClients};
use wanderlust_core::models::Request;
use wanderlust_core::network::HttpNetwork;
use wanderlust_core::validation::{validate_listing, validate_review};
use wanderlust_core::worker::{FetchOutcome, Host, PushMessage, WorkerState};
use wanderlust_core::{OfflineCacheManager, Settings, WorkerConfig};

use crate::registration::Registration;

/// Buckets live in this subdirectory of the storage directory
const BUCKETS_DIR: &str = "buckets";

/// Everything a command needs: configuration, substrates and the
/// registration record.
pub struct HostContext {
    pub config: Arc<WorkerConfig>,
    pub storage_dir: PathBuf,
    storage: Arc<FsStorage>,
    host: Host,
    registration: Registration,
}

impl HostContext {
    pub fn new(settings: &Settings) -> Result<Self> {
        let config = Arc::new(settings.worker_config()?);
        let storage_dir = settings.storage_dir()?;
        let storage = Arc::new(FsStorage::new(storage_dir.join(BUCKETS_DIR)));
        let network = HttpNetwork::new(settings.request_timeout())?;

        let host = Host {
            network: Arc::new(network),
            storage: storage.clone(),
            clients: Arc::new(PageClients::default()),
            notifier: Arc::new(LogNotifier),
        };

        let mut registration = Registration::new(storage_dir.clone());
        registration.load()?;

        Ok(Self {
            config,
            storage_dir,
            storage,
            host,
            registration,
        })
    }

    fn state(&self) -> WorkerState {
        self.registration.state_for(&self.config.cache_name)
    }

    fn worker(&self) -> OfflineCacheManager {
        OfflineCacheManager::resume(Arc::clone(&self.config), self.host.clone(), self.state())
    }

    fn record(&mut self, state: WorkerState) -> Result<()> {
        self.registration.record(&self.config.cache_name, state);
        self.registration.save()
    }
}

/// Deliver the install signal, then activate right away since the worker
/// asks to skip waiting.
pub async fn install(ctx: &mut HostContext) -> Result<()> {
    match ctx.state() {
        WorkerState::Parsed | WorkerState::Terminated => {}
        state => {
            println!("{} is already installed ({})", ctx.config.cache_name, state);
            return Ok(());
        }
    }

    let worker = OfflineCacheManager::new(Arc::clone(&ctx.config), ctx.host.clone());
    let report = worker.install().await?;
    ctx.record(worker.state())?;

    println!("Installed {}", ctx.config.cache_name);
    for name in &report.legacy_deleted {
        println!("  removed legacy cache {}", name);
    }
    println!("  cached {} of {} resources", report.seeded.len(), ctx.config.seed_urls.len());
    for failure in &report.failed {
        println!("  ✗ {}: {}", failure.url, failure.reason);
    }

    if worker.skip_waiting() {
        activate_worker(ctx, &worker).await?;
    }
    Ok(())
}

pub async fn activate(ctx: &mut HostContext) -> Result<()> {
    let worker = ctx.worker();
    activate_worker(ctx, &worker).await
}

async fn activate_worker(ctx: &mut HostContext, worker: &OfflineCacheManager) -> Result<()> {
    let report = worker.activate().await?;
    ctx.record(worker.state())?;

    println!("Activated {}", ctx.config.cache_name);
    for name in &report.deleted {
        println!("  removed cache {}", name);
    }
    if !report.clients_claimed {
        warn!("Open pages were not claimed");
    }
    Ok(())
}

/// Fetch each target (path or absolute URL) through the worker
pub async fn fetch(ctx: &HostContext, targets: &[String]) -> Result<()> {
    if targets.is_empty() {
        bail!("fetch needs at least one URL or path");
    }

    let worker = ctx.worker();
    let mut failures = 0;
    for target in targets {
        let url = ctx
            .config
            .resolve(target)
            .with_context(|| format!("Invalid URL: {}", target))?;

        match worker.handle_fetch(Request::get(url.clone())).await {
            Ok(FetchOutcome::Served { response, source }) => {
                println!(
                    "{} {} ({:?}, {} bytes)",
                    response.status,
                    url,
                    source,
                    response.body.len()
                );
            }
            Ok(FetchOutcome::NoResponse) => {
                failures += 1;
                println!("--- {} (no response)", url);
            }
            Err(e) => {
                failures += 1;
                println!("--- {} ({})", url, e);
            }
        }
    }

    // Let background cache refreshes land before the process exits
    worker.terminate().await;

    if failures > 0 {
        bail!("{} of {} requests failed", failures, targets.len());
    }
    Ok(())
}

pub async fn push(ctx: &HostContext, words: &[String]) -> Result<()> {
    let message = if words.is_empty() {
        PushMessage::empty()
    } else {
        PushMessage::text(&words.join(" "))
    };
    ctx.worker().handle_push(&message).await?;
    Ok(())
}

pub async fn status(ctx: &HostContext) -> Result<()> {
    println!("Worker:   {} ({})", ctx.config.cache_name, ctx.state());
    println!("Origin:   {}", ctx.config.origin);
    println!("Storage:  {}", ctx.storage_dir.display());

    let names = ctx.storage.keys().await?;
    if names.is_empty() {
        println!("No caches");
        return Ok(());
    }

    for name in names {
        let marker = if name == ctx.config.cache_name { "*" } else { " " };
        let bucket = ctx.storage.open(&name).await?;
        let entries = bucket.entries().await?;
        println!("{} {} ({} entries)", marker, name, entries.len());
        for entry in entries {
            println!(
                "    {:>3} {:<8} {}",
                entry.response.status,
                entry.age_display(),
                entry.request.url
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Listing,
    Review,
}

impl Schema {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "listing" => Some(Schema::Listing),
            "review" => Some(Schema::Review),
            _ => None,
        }
    }
}

/// Run a JSON body through the validation gate and print the converted body
pub fn validate(schema: Schema, path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let body: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let validated = match schema {
        Schema::Listing => validate_listing(&body),
        Schema::Review => validate_review(&body),
    }?;

    info!(file = %path.display(), ?schema, "Body is valid");
    Ok(validated)
}
