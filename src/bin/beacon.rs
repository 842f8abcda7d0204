//! Beacon - session lifecycle tracking from the command line
//!
//! Drives the session controller against a local SQLite store and inspects
//! what it recorded.
//!
//! # Usage
//!
//! ```bash
//! # Simulate 10s in the foreground, 5s in the background, then terminate
//! beacon run --foreground-secs 10 --background-secs 5
//!
//! # Inspect recorded sessions and spans
//! beacon sessions
//! beacon sessions --json
//! beacon spans
//!
//! # Close sessions left open by crashed processes
//! beacon recover
//!
//! # Use a throwaway database with a fast heartbeat
//! BEACON_HEARTBEAT_INTERVAL=0.5 beacon --database /tmp/b.sqlite run
//!
//! # Enable debug logging
//! RUST_LOG=beacon_session=debug beacon run
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use beacon_core::SessionRecord;
use beacon_otel::{Attributes, LogSeverity, StorageEmitter, TelemetryEmitter};
use beacon_session::{BeaconConfig, LifecycleEvent, SessionController};
use beacon_storage::{SpanRecord, Storage, StorageOptions};

/// Beacon - session lifecycle and telemetry correlation
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about)]
struct Args {
    /// Config file (defaults to <config_dir>/beacon/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding config and environment
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a foreground, background, terminate cycle
    Run {
        /// Seconds to stay in the foreground
        #[arg(long, default_value_t = 5)]
        foreground_secs: u64,

        /// Seconds to stay in the background
        #[arg(long, default_value_t = 5)]
        background_secs: u64,
    },
    /// List recorded sessions
    Sessions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded spans
    Spans,
    /// Close sessions left open by previous processes
    Recover,
    /// Delete one session row
    Delete {
        /// Session id
        id: String,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for krate in [
        "beacon",
        "beacon_core",
        "beacon_storage",
        "beacon_otel",
        "beacon_session",
    ] {
        filter = filter.add_directive(format!("{krate}={level}").parse()?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_storage(args: &Args, config: &BeaconConfig) -> Result<Storage> {
    let path = args
        .database
        .clone()
        .unwrap_or_else(|| config.storage.database_path());
    Storage::open(StorageOptions::from_path(&path))
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = BeaconConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let storage = open_storage(&args, &config)?;

    match args.command {
        Command::Run {
            foreground_secs,
            background_secs,
        } => {
            run(
                storage,
                config,
                Duration::from_secs(foreground_secs),
                Duration::from_secs(background_secs),
            )
            .await
        }
        Command::Sessions { json } => list_sessions(&storage, json).await,
        Command::Spans => list_spans(&storage).await,
        Command::Recover => {
            let controller = SessionController::builder(storage.clone(), StorageEmitter::new(storage))
                .config(config.session)
                .build()
                .context("Invalid session config")?;
            let closed = controller
                .recover_orphaned_sessions()
                .context("Failed to recover orphaned sessions")?;
            println!("Closed {closed} orphaned session(s).");
            Ok(())
        }
        Command::Delete { id } => delete_session(&storage, &id).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run(
    storage: Storage,
    config: BeaconConfig,
    foreground: Duration,
    background: Duration,
) -> Result<()> {
    let emitter = StorageEmitter::new(storage.clone());
    let controller = SessionController::builder(storage, emitter.clone())
        .config(config.session)
        .build()
        .context("Invalid session config")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        process_id = %controller.process().identifier,
        "Starting simulated app"
    );

    match controller.recover_orphaned_sessions() {
        Ok(0) => {}
        Ok(closed) => info!(closed, "Recovered orphaned sessions"),
        Err(e) => warn!(error = %e, "Orphan recovery failed"),
    }

    let mut events = controller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{event}"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let steps = [
        (LifecycleEvent::Foregrounded, foreground),
        (LifecycleEvent::Backgrounded, background),
    ];
    for (event, hold) in steps {
        deliver(&controller, &emitter, event);
        tokio::select! {
            _ = tokio::time::sleep(hold) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
    deliver(&controller, &emitter, LifecycleEvent::WillTerminate);

    // Closing the channel lets the printer drain and exit.
    drop(controller);
    if let Err(e) = printer.await {
        warn!(error = %e, "Event printer failed");
    }
    Ok(())
}

fn deliver(controller: &SessionController, emitter: &StorageEmitter, event: LifecycleEvent) {
    let attributes = Attributes::from([("lifecycle.event".to_string(), event.to_string())]);
    emitter.emit_log("app lifecycle event", attributes, LogSeverity::Info);

    if let Err(e) = controller.handle_lifecycle(event) {
        warn!(%event, error = %e, "Lifecycle transition was not persisted");
    }
}

async fn list_sessions(storage: &Storage, json: bool) -> Result<()> {
    let sessions = storage
        .fetch_all_async::<SessionRecord>()
        .await
        .context("Failed to read sessions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions recorded.");
        return Ok(());
    }

    println!(
        "{:<10} {:<10} {:<8} {:<25} {:<25} {:<5} {:<5}",
        "ID", "STATE", "PROCESS", "START", "END", "COLD", "TERM"
    );
    for s in &sessions {
        println!(
            "{:<10} {:<10} {:<8} {:<25} {:<25} {:<5} {:<5}",
            s.id().short(),
            s.state(),
            s.process_id(),
            s.start_time().to_rfc3339(),
            s.end_time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "open".to_string()),
            s.cold_start(),
            s.app_terminated(),
        );
    }
    Ok(())
}

async fn list_spans(storage: &Storage) -> Result<()> {
    let spans = storage
        .fetch_all_async::<SpanRecord>()
        .await
        .context("Failed to read spans")?;

    if spans.is_empty() {
        println!("No spans recorded.");
        return Ok(());
    }

    for span in &spans {
        println!(
            "{} {} {} {} -> {} {}",
            span.id,
            span.name,
            span.span_type,
            span.start_time.to_rfc3339(),
            span.end_time
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "open".to_string()),
            span.data,
        );
    }
    Ok(())
}

async fn delete_session(storage: &Storage, id: &str) -> Result<()> {
    let sessions = storage
        .fetch_all_async::<SessionRecord>()
        .await
        .context("Failed to read sessions")?;

    let Some(session) = sessions.into_iter().find(|s| s.id().as_str() == id) else {
        bail!("No session with id {id}");
    };

    if storage.delete_async(session).await? {
        println!("Deleted session {id}.");
    }
    Ok(())
}
