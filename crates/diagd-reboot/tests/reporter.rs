//! Integration tests for the reboot Reporter.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use diagd_core::domain::metrics::LAST_REBOOT_UPTIME_METRIC_ID;
use diagd_core::domain::{parse_reboot_log, Event, RebootLog, RebootReason};
use diagd_core::ports::{
    CrashIntake, CrashReport, MetricsConnection, MetricsSink, RpcError, SinkError, SubmitStatus,
};
use diagd_reboot::Reporter;
use diagd_telemetry::{MetricsLogger, MetricsLoggerConfig};
use tempfile::TempDir;

const DELAY: Duration = Duration::from_secs(90);

// ============================================================================
// Fakes
// ============================================================================

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

#[async_trait]
impl MetricsConnection for RecordingSink {
    async fn submit(&self, event: &Event) -> Result<SubmitStatus, SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(SubmitStatus::Ok)
    }
}

#[async_trait]
impl MetricsSink for RecordingSink {
    async fn connect(&self) -> Result<Arc<dyn MetricsConnection>, SinkError> {
        Ok(Arc::new(self.clone()))
    }
}

#[derive(Default)]
struct FakeIntake {
    reports: Mutex<Vec<CrashReport>>,
    fail: bool,
}

#[async_trait]
impl CrashIntake for FakeIntake {
    async fn file(&self, report: CrashReport) -> Result<(), RpcError> {
        if self.fail {
            return Err(RpcError::Failed("intake is full".to_string()));
        }
        self.reports.lock().unwrap().push(report);
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    marker: PathBuf,
    sink: RecordingSink,
    logger: Arc<MetricsLogger>,
    intake: Arc<FakeIntake>,
}

impl Fixture {
    fn new(intake: FakeIntake) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordingSink::default();
        let logger = Arc::new(MetricsLogger::new(
            Arc::new(sink.clone()),
            MetricsLoggerConfig::default(),
        ));
        Self {
            marker: dir.path().join("tmp").join("has_reported.txt"),
            _dir: dir,
            sink,
            logger,
            intake: Arc::new(intake),
        }
    }

    fn reporter(&self) -> Reporter {
        let intake: Arc<dyn CrashIntake> = self.intake.clone();
        Reporter::new(Arc::clone(&self.logger), Some(intake), &self.marker)
    }

    fn events(&self) -> Vec<Event> {
        self.sink.events.lock().unwrap().clone()
    }

    fn reports(&self) -> Vec<CrashReport> {
        self.intake.reports.lock().unwrap().clone()
    }
}

fn kernel_panic() -> RebootLog {
    parse_reboot_log(
        Some("ZIRCON REBOOT REASON (KERNEL PANIC)\n\nUPTIME (ms)\n65487494\n"),
        None,
        false,
    )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_non_crash_reports_uptime_and_marks_immediately() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&parse_reboot_log(None, None, false), DELAY);
    settle().await;

    assert_eq!(
        f.events(),
        vec![Event::integer(
            LAST_REBOOT_UPTIME_METRIC_ID,
            vec![RebootReason::Cold.metric_code()],
            0
        )]
    );
    assert!(f.marker.exists());

    tokio::time::sleep(DELAY * 2).await;
    assert!(f.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_crash_is_filed_after_delay() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&kernel_panic(), DELAY);
    settle().await;

    assert_eq!(
        f.events(),
        vec![Event::integer(
            LAST_REBOOT_UPTIME_METRIC_ID,
            vec![RebootReason::KernelPanic.metric_code()],
            65487494
        )]
    );
    assert!(f.reports().is_empty());
    assert!(!f.marker.exists());

    tokio::time::sleep(DELAY).await;

    let reports = f.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].crash_signature, "fuchsia-kernel-panic");
    assert_eq!(reports[0].program_name, "kernel");
    assert_eq!(reports[0].uptime_ms, Some(65487494));
    assert_eq!(reports[0].is_fatal, Some(true));
    assert!(reports[0]
        .reboot_log
        .as_deref()
        .is_some_and(|text| text.starts_with("ZIRCON REBOOT REASON (KERNEL PANIC)")));
    assert!(f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_second_call_in_same_boot_emits_nothing() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&kernel_panic(), DELAY);
    reporter.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY * 2).await;
    reporter.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY * 2).await;

    assert_eq!(f.events().len(), 1);
    assert_eq!(f.reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_reporter_cancels_crash_report() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY / 2).await;
    drop(reporter);
    tokio::time::sleep(DELAY * 2).await;

    assert!(f.reports().is_empty());
    assert!(!f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_waiting_for_pending_report_files_it_before_drop() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&kernel_panic(), DELAY);
    reporter.wait_for_pending().await;
    drop(reporter);

    assert_eq!(f.reports().len(), 1);
    assert!(f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_waiting_without_pending_report_returns() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&parse_reboot_log(None, None, false), DELAY);
    reporter.wait_for_pending().await;

    assert!(f.reports().is_empty());
    assert!(f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_marker_prevents_reporting_after_restart() {
    let f = Fixture::new(FakeIntake::default());

    {
        let mut reporter = f.reporter();
        reporter.report_on(&kernel_panic(), DELAY);
        tokio::time::sleep(DELAY * 2).await;
    }

    let mut restarted = f.reporter();
    restarted.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY * 2).await;

    assert_eq!(f.events().len(), 1);
    assert_eq!(f.reports().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_filing_still_marks_boot_reported() {
    let f = Fixture::new(FakeIntake {
        fail: true,
        ..FakeIntake::default()
    });
    let mut reporter = f.reporter();

    reporter.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY * 2).await;

    assert!(f.reports().is_empty());
    assert!(f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_missing_intake_still_marks_boot_reported() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = Reporter::new(Arc::clone(&f.logger), None, &f.marker);

    reporter.report_on(&kernel_panic(), DELAY);
    tokio::time::sleep(DELAY * 2).await;

    assert!(f.marker.exists());
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_log_omits_fatal_flag() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();

    reporter.report_on(&parse_reboot_log(Some("garbage"), None, false), DELAY);
    tokio::time::sleep(DELAY * 2).await;

    let reports = f.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].crash_signature, "fuchsia-reboot-log-not-parseable");
    assert_eq!(reports[0].is_fatal, None);
    assert_eq!(reports[0].uptime_ms, None);
}

#[tokio::test(start_paused = true)]
async fn test_root_job_termination_names_critical_process() {
    let f = Fixture::new(FakeIntake::default());
    let mut reporter = f.reporter();
    let log = parse_reboot_log(
        Some(
            "ZIRCON REBOOT REASON (USERSPACE ROOT JOB TERMINATION)\n\nUPTIME (ms)\n1000\n\
             ROOT JOB TERMINATED BY CRITICAL PROCESS DEATH: foo.cm (1234)\n",
        ),
        None,
        false,
    );

    reporter.report_on(&log, DELAY);
    tokio::time::sleep(DELAY * 2).await;

    let reports = f.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].crash_signature, "fuchsia-root-job-termination-foo.cm");
    assert_eq!(reports[0].program_name, "system");
    assert_eq!(reports[0].is_fatal, Some(true));
}
