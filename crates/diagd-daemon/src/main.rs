//! diagd - Device diagnostics daemon
//!
//! This binary handles:
//! - Classifying the last reboot and reporting it once per boot
//! - Periodic diagnostic snapshots (annotations + attachments)
//! - Adapting the inspect budget to the archive size
//! - Serving the collected metrics on `/metrics`
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! Every component reports through one shared `MetricsLogger`. The snapshot
//! loop owns the `Datastore` and is controlled by a `CancellationToken`
//! that is triggered on receipt of SIGTERM or SIGINT.

mod adapters;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use diagd_collect::{Archive, Datastore};
use diagd_core::config::Config;
use diagd_core::domain::metrics::{SnapshotFlow, SNAPSHOT_GENERATION_METRIC_ID};
use diagd_core::ports::CrashIntake;
use diagd_reboot::{read_reboot_log, Reporter};
use diagd_telemetry::{
    LocalCrashIntake, MetricsLogger, MetricsLoggerConfig, MetricsRegistry, MetricsServer,
    PrometheusSink,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "diagd", version, about = "Device diagnostics daemon")]
struct Cli {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Take a single snapshot and exit
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Snapshots
// ============================================================================

/// Collects, archives and writes one snapshot, then feeds the budget.
///
/// Returns the directory the snapshot was written to.
async fn take_snapshot(
    datastore: &mut Datastore,
    timeout: Duration,
    output_dir: &Path,
) -> Result<PathBuf> {
    let (annotations, attachments) = {
        let datastore = &*datastore;
        tokio::join!(
            datastore.get_annotations(timeout),
            datastore.get_attachments(timeout)
        )
    };

    let archive = Archive::build(&annotations, &attachments).context("Failed to build archive")?;
    let path = archive.write_to(output_dir)?;
    datastore.update_budget(&archive.compressed_sizes());
    Ok(path)
}

/// Takes a snapshot and measures how long it took.
async fn timed_snapshot(
    datastore: &mut Datastore,
    logger: &MetricsLogger,
    config: &Config,
) -> Result<PathBuf> {
    let timer = logger.start_timer();
    let result = take_snapshot(
        datastore,
        config.datastore.collection_timeout(),
        &config.snapshot.output_dir,
    )
    .await;

    let flow = match &result {
        Ok(_) => SnapshotFlow::Success,
        Err(_) => SnapshotFlow::Failure,
    };
    logger.log_elapsed(SNAPSHOT_GENERATION_METRIC_ID, vec![flow.code()], timer);
    result
}

// ============================================================================
// Daemon
// ============================================================================

struct Daemon {
    config: Config,
    logger: Arc<MetricsLogger>,
    datastore: Datastore,
    /// Kept alive so the delayed crash report can fire
    reporter: Reporter,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Wires every component together and reports the last reboot.
    fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let registry = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);

        if config.metrics.server_enabled {
            let server = MetricsServer::new(Arc::clone(&registry), &config.metrics.server_endpoint)
                .context("Invalid metrics server endpoint")?;
            let token = shutdown.child_token();
            tokio::spawn(async move {
                if let Err(e) = server.run(token).await {
                    error!(error = %e, "Metrics server failed");
                }
            });
        }

        let logger = Arc::new(MetricsLogger::new(
            Arc::new(PrometheusSink::new(registry)),
            MetricsLoggerConfig::from(&config.metrics),
        ));

        let reboot_log = read_reboot_log(&config.reboot);
        let crash_intake: Arc<dyn CrashIntake> =
            Arc::new(LocalCrashIntake::new(&config.reboot.reports_dir));
        let services = adapters::build_services(&config.sources, &reboot_log, crash_intake);

        let mut reporter = Reporter::new(
            Arc::clone(&logger),
            services.crash_intake.clone(),
            &config.reboot.has_reported_marker,
        );
        reporter.report_on(&reboot_log, config.reboot.crash_report_delay());

        let datastore = Datastore::new(
            &config.datastore,
            &config.budget,
            services,
            Arc::clone(&logger),
        );

        Ok(Self {
            config,
            logger,
            datastore,
            reporter,
            shutdown,
        })
    }

    /// Takes a snapshot right away, then every `snapshot.interval_secs`.
    ///
    /// With `once`, stops after the first snapshot but still lets a scheduled
    /// crash report be filed unless a shutdown signal arrives first.
    async fn run(&mut self, once: bool) -> Result<()> {
        let period = Duration::from_secs(self.config.snapshot.interval_secs);
        info!(interval_secs = period.as_secs(), once, "Starting snapshot loop");

        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match timed_snapshot(&mut self.datastore, &self.logger, &self.config).await {
                        Ok(path) => info!(path = %path.display(), "Snapshot complete"),
                        Err(e) => warn!(error = %e, "Snapshot failed"),
                    }
                    if once {
                        break;
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if once && !self.shutdown.is_cancelled() {
            debug!("Waiting for any scheduled crash report");
            tokio::select! {
                _ = self.reporter.wait_for_pending() => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, abandoning crash report");
                }
            }
        }

        self.shutdown.cancel();
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "diagd starting");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let mut daemon = Daemon::new(config, shutdown_token)?;
    let result = daemon.run(cli.once).await;

    match &result {
        Ok(()) => info!("diagd shut down gracefully"),
        Err(e) => error!(error = %e, "diagd exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
