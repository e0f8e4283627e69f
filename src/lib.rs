pub mod classifier;
pub mod clock;
pub mod db;
pub mod drift;
pub mod events;
pub mod graph;
pub mod models;
pub mod objective;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod snapshot;
mod utils;

#[cfg(test)]
mod testutil;

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use classifier::Classifier;
use clock::{Clock, SystemClock};
use db::{Database, Persistence};
use drift::{DriftDetector, DriftHost, HeadlessActivator, HeadlessInterventionUi};
use events::EventBus;
use graph::{ContextGraphBuilder, GraphConfig};
use objective::ObjectiveLedger;
use scheduler::{Scheduler, TokioScheduler};
use service::{Command, FocusService, ServiceHandle};
use settings::SettingsStore;

const DATA_DIR_ENV: &str = "SOLFOCUS_DATA_DIR";
const DEBUG_ENV: &str = "SOLFOCUS_DEBUG";
const DEFAULT_DATA_DIR: &str = ".solfocus";
const DEBUG_DRIFT_THRESHOLD: Duration = Duration::from_secs(5);

pub fn data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn debug_mode() -> bool {
    env::var(DEBUG_ENV).is_ok_and(|value| value == "1")
}

/// Build the coordinator from persisted state: restores the open objective and
/// recent history, closes context nodes a crash left open, and wires the drift
/// detector to `scheduler`.
pub async fn build_service(
    database: &Database,
    settings: &SettingsStore,
    scheduler: Arc<dyn Scheduler>,
    host: DriftHost,
    clock: Arc<dyn Clock>,
    bus: EventBus,
) -> Result<FocusService> {
    let store: Arc<dyn Persistence> = Arc::new(database.clone());
    let classifier: Arc<dyn Classifier> = Arc::new(settings.classifier());

    let ledger = ObjectiveLedger::restore(database, clock.clone(), store.clone(), bus.clone())
        .await
        .context("failed to restore objectives")?;

    let graph = ContextGraphBuilder::restore(
        database,
        GraphConfig::from(&settings.graph()),
        classifier.clone(),
        clock.clone(),
        store.clone(),
        bus.clone(),
    )
    .await
    .context("failed to restore context graph")?;

    let mut threshold = settings.drift().threshold();
    if debug_mode() {
        warn!("{DEBUG_ENV}=1: drift threshold lowered to {}s", DEBUG_DRIFT_THRESHOLD.as_secs());
        threshold = DEBUG_DRIFT_THRESHOLD;
    }

    let drift = DriftDetector::new(
        threshold,
        classifier,
        scheduler,
        host,
        store,
        clock.clone(),
        bus.clone(),
    );

    Ok(FocusService::new(ledger, drift, graph, clock, bus))
}

/// Headless host: newline-delimited JSON commands on stdin, replies and
/// broadcast events as JSON lines on stdout.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("SolFocus starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("solfocus.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let (scheduler, timers) = TokioScheduler::new(tokio::runtime::Handle::current());
    let bus = EventBus::new();
    let host = DriftHost {
        ui: Arc::new(HeadlessInterventionUi),
        activator: Arc::new(HeadlessActivator),
    };

    let service = build_service(
        &database,
        &settings,
        Arc::new(scheduler),
        host,
        Arc::new(SystemClock),
        bus.clone(),
    )
    .await?;

    let shutdown = CancellationToken::new();
    let events_task = tokio::spawn(forward_events(bus.subscribe(), shutdown.clone()));
    let (handle, service_task) = ServiceHandle::spawn(service, timers, shutdown.clone());

    read_commands(&handle).await?;

    shutdown.cancel();
    drop(handle);
    service_task.await.context("focus service task panicked")?;
    let _ = events_task.await;

    info!("SolFocus stopped");
    Ok(())
}

async fn read_commands(handle: &ServiceHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(err) => {
                warn!("Ignoring malformed command: {err}");
                continue;
            }
        };
        let is_shutdown = matches!(command, Command::Shutdown);

        let reply = handle.send(command).await?;
        write_line(&serde_json::to_string(&reply)?).await?;

        if is_shutdown {
            break;
        }
    }

    Ok(())
}

async fn forward_events(
    mut events: tokio::sync::broadcast::Receiver<events::FocusEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let line = match serde_json::to_string(&event) {
                        Ok(line) => line,
                        Err(err) => {
                            warn!("Failed to encode {}: {err}", event.name());
                            continue;
                        }
                    };
                    if let Err(err) = write_line(&line).await {
                        warn!("Failed to write event: {err}");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged; {skipped} events skipped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }
}

async fn write_line(line: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
