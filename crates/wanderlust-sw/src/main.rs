//! Wanderlust offline worker host.
//!
//! Runs the Wanderlust offline cache manager outside a browser: lifecycle
//! signals, fetches and pushes are delivered from the command line against
//! an on-disk cache store.

mod commands;
mod registration;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wanderlust_core::Settings;

use commands::{HostContext, Schema};

/// Log files go in this subdirectory of the storage directory
const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "wanderlust-sw.log";

const USAGE: &str = "\
Usage: wanderlust-sw <command> [args]

Commands:
  install                         Install the worker and seed the offline cache
  activate                        Activate the installed worker
  fetch <url-or-path>...          Fetch resources through the worker
  push [text]                     Deliver a push message
  status                          Show the worker state and cached entries
  validate <listing|review> FILE  Validate a JSON request body
  help                            Show this message

Environment:
  WANDERLUST_ORIGIN         Origin the worker serves (default http://localhost:8080)
  WANDERLUST_STORAGE_DIR    Directory for caches, registration and logs
  WANDERLUST_TIMEOUT_SECS   Network request timeout
  RUST_LOG                  Log filter (default warn)";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily rolling file under the storage directory.
/// The returned guard must be held until exit so buffered lines are flushed.
fn init_tracing(storage_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(storage_dir.join(LOG_DIR), LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let settings = Settings::load()?.with_env_overrides()?;
    let storage_dir = settings.storage_dir()?;
    let _guard = init_tracing(&storage_dir);
    info!(command, "wanderlust-sw starting");

    let rest = &args[1..];
    match command {
        "validate" => validate(rest),
        "install" => commands::install(&mut HostContext::new(&settings)?).await,
        "activate" => commands::activate(&mut HostContext::new(&settings)?).await,
        "fetch" => commands::fetch(&HostContext::new(&settings)?, rest).await,
        "push" => commands::push(&HostContext::new(&settings)?, rest).await,
        "status" => commands::status(&HostContext::new(&settings)?).await,
        other => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    }
}

fn validate(args: &[String]) -> Result<()> {
    let (Some(kind), Some(file)) = (args.first(), args.get(1)) else {
        bail!("Usage: wanderlust-sw validate <listing|review> FILE");
    };
    let Some(schema) = Schema::parse(kind) else {
        bail!("Unknown schema '{}', expected listing or review", kind);
    };

    let validated = commands::validate(schema, &PathBuf::from(file))?;
    println!("{}", serde_json::to_string_pretty(&validated)?);
    Ok(())
}
