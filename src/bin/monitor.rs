use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use uptime_monitoring::{
    actors::{Collaborators, MonitorError, MonitorEvent, MonitorHandle, MonitorSettings},
    config::{Config, StorageConfig, read_config_file},
    diagnosis::{Diagnoser, RemoteDiagnoser, Unavailable},
    notify::{AlertManager, NoopNotifier, Notifier},
    probe::NetworkProbe,
    storage::{MemoryStore, TargetStore},
    util::{get_config_path, get_interval_override},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, default_value_t = get_config_path())]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("uptime_monitoring", LevelFilter::TRACE),
        ("monitor", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let mut config = read_config_file(&args.file)?;
    if let Some(interval) = get_interval_override() {
        debug!("interval overridden from environment: {interval}s");
        config.interval = interval;
    }

    let store = open_store(&config).await?;
    let collaborators = Collaborators::new(Arc::new(NetworkProbe::new(Duration::from_secs(
        config.http_timeout,
    ))?))
    .with_store(Arc::clone(&store))
    .with_notifier(build_notifier(&config))
    .with_diagnoser(build_diagnoser(&config)?);

    let monitor = MonitorHandle::spawn(MonitorSettings::from_config(&config), collaborators);
    let events = tokio::spawn(log_events(monitor.clone()));

    seed_targets(&monitor, &config).await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    monitor.shutdown().await;
    events.abort();

    if let Err(e) = store.close().await {
        error!("failed to close store: {e}");
    }

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn TargetStore>> {
    match config.storage.clone().unwrap_or_default() {
        StorageConfig::None => {
            debug!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            debug!("using sqlite store at {}", path.display());
            let store = uptime_monitoring::storage::sqlite::SqliteStore::new(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            warn!("sqlite storage requested but not compiled in, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.alert {
        Some(alert) => Arc::new(AlertManager::new(alert.clone())),
        None => Arc::new(NoopNotifier),
    }
}

fn build_diagnoser(config: &Config) -> anyhow::Result<Arc<dyn Diagnoser>> {
    Ok(match &config.diagnosis {
        Some(diagnosis) => Arc::new(RemoteDiagnoser::new(diagnosis.clone())?),
        None => Arc::new(Unavailable),
    })
}

async fn seed_targets(monitor: &MonitorHandle, config: &Config) {
    for spec in &config.targets {
        match monitor.add_target(spec.clone()).await {
            Ok(id) => debug!("seeded target {} ({id})", spec.name),
            Err(MonitorError::DuplicateTarget { .. }) => {
                trace!("target {} already stored", spec.name)
            }
            Err(e) => error!("failed to seed target {}: {e}", spec.name),
        }
    }
}

async fn log_events(monitor: MonitorHandle) {
    let mut events = monitor.events();
    loop {
        match events.recv().await {
            Ok(MonitorEvent::ProbeRecorded { name, result, .. }) => {
                info!(
                    "{name}: {} in {}ms ({})",
                    result.status, result.latency_ms, result.message
                );
            }
            Ok(MonitorEvent::WentDown { name, reason, .. }) => {
                warn!("{name} is DOWN: {reason}");
            }
            Ok(MonitorEvent::Recovered { name, .. }) => {
                info!("{name} recovered");
            }
            Ok(MonitorEvent::Advisory { message }) => {
                warn!("{message}");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("event log lagged, skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
