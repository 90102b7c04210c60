//! Reboot reporter
//!
//! Reports the classified reboot once per boot: one uptime measurement for
//! every reboot, plus a delayed crash report when the reboot was a crash.
//! The has-reported marker lives on a partition cleared on every boot, so
//! its presence means this boot was already reported by an earlier run of
//! the process.
//!
//! The delay gives slow diagnostic sources a chance to come up before the
//! crash intake snapshots the device. The delayed filing is cancelled when
//! the reporter is dropped, unless the owner waits for it with
//! [`Reporter::wait_for_pending`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use diagd_core::domain::metrics::LAST_REBOOT_UPTIME_METRIC_ID;
use diagd_core::domain::{RebootLog, RebootReason};
use diagd_core::ports::{CrashIntake, CrashReport, Services};
use diagd_telemetry::MetricsLogger;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::files::create_marker;

/// Crash report waiting for its delay to elapse
struct PendingReport {
    /// Cancels the filing when dropped
    _guard: DropGuard,
    /// `None` once waited for
    task: Option<JoinHandle<()>>,
}

/// Files the reboot report exactly once per boot
pub struct Reporter {
    logger: Arc<MetricsLogger>,
    crash_intake: Option<Arc<dyn CrashIntake>>,
    has_reported_marker: PathBuf,
    pending: Option<PendingReport>,
}

impl Reporter {
    /// Creates a reporter.
    ///
    /// # Arguments
    /// * `logger` - Destination for the uptime measurement
    /// * `crash_intake` - Where crash reports go; `None` behaves like an unreachable intake
    /// * `has_reported_marker` - Marker recording that this boot was reported
    pub fn new(
        logger: Arc<MetricsLogger>,
        crash_intake: Option<Arc<dyn CrashIntake>>,
        has_reported_marker: &Path,
    ) -> Self {
        Self {
            logger,
            crash_intake,
            has_reported_marker: has_reported_marker.to_path_buf(),
            pending: None,
        }
    }

    /// Reports `reboot_log`, filing crash reports after `delay`.
    ///
    /// Does nothing, not even the uptime measurement, when this boot was
    /// already reported or a crash report is still waiting to be filed.
    pub fn report_on(&mut self, reboot_log: &RebootLog, delay: Duration) {
        if self.has_reported_marker.exists() {
            info!("Reboot already reported for this boot");
            return;
        }
        if self.pending.is_some() {
            debug!("Crash report already scheduled");
            return;
        }

        let reason = reboot_log.reason();
        let uptime_ms = reboot_log.uptime().map(|uptime| uptime.as_millis() as u64);
        self.logger.log_integer(
            LAST_REBOOT_UPTIME_METRIC_ID,
            vec![reason.metric_code()],
            uptime_ms.unwrap_or(0),
        );

        if !reason.is_crash() {
            info!(reason = %reason, "Reporting non-crash reboot");
            write_marker(&self.has_reported_marker);
            return;
        }

        let report = CrashReport::new(
            reason.crash_program_name(),
            &reason.crash_signature(reboot_log.critical_process()),
        )
        .with_reboot_log(reboot_log.raw_text())
        .with_uptime_ms(uptime_ms)
        .with_is_fatal(fatal_flag(reason));

        info!(
            reason = %reason,
            signature = %report.crash_signature,
            delay_secs = delay.as_secs(),
            "Scheduling crash report"
        );

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let intake = self.crash_intake.clone();
        let marker = self.has_reported_marker.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Crash report cancelled before filing");
                }
                _ = async {
                    tokio::time::sleep(delay).await;
                    file_report(intake, report).await;
                    write_marker(&marker);
                } => {}
            }
        });

        self.pending = Some(PendingReport {
            _guard: token.drop_guard(),
            task: Some(task),
        });
    }

    /// Waits until a scheduled crash report is filed and the boot is marked
    /// as reported. Returns immediately when nothing is scheduled.
    pub async fn wait_for_pending(&mut self) {
        let Some(task) = self.pending.as_mut().and_then(|pending| pending.task.take()) else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "Crash report task failed");
        }
    }
}

/// Fatality is unknown for an unparseable record, so it is left out.
fn fatal_flag(reason: RebootReason) -> Option<bool> {
    match reason {
        RebootReason::NotParseable => None,
        _ => Some(reason.is_fatal()),
    }
}

async fn file_report(intake: Option<Arc<dyn CrashIntake>>, report: CrashReport) {
    let result = match Services::require(&intake, "crash_intake") {
        Ok(intake) => intake.file(report).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => info!("Crash report filed"),
        Err(e) => warn!(error = %e, "Failed to file crash report"),
    }
}

fn write_marker(path: &Path) {
    if let Err(e) = create_marker(path) {
        warn!(path = %path.display(), error = %e, "Failed to create has-reported marker");
    }
}
