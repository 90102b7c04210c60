//! Integration tests for MetricsLogger delivery against a scripted sink.
//!
//! Most tests run with a paused clock so reconnection backoff advances
//! deterministically. Ordering tests run on the multi-thread scheduler with
//! real time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use diagd_core::domain::Event;
use diagd_core::ports::{MetricsConnection, MetricsSink, SinkError, SubmitStatus};
use diagd_telemetry::{ConnectionState, MetricsLogger, MetricsLoggerConfig};

// ============================================================================
// Scripted sink
// ============================================================================

/// What the sink does on the next connect / submit
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Accepting,
    Refusing,
    ShuttingDown,
    Rejecting(i32),
}

#[derive(Default)]
struct SinkState {
    mode: Mutex<Option<Mode>>,
    connects: AtomicUsize,
    submits: AtomicUsize,
    received: Mutex<Vec<Event>>,
}

impl SinkState {
    fn mode(&self) -> Mode {
        self.mode.lock().unwrap().unwrap_or(Mode::Accepting)
    }
}

#[derive(Clone, Default)]
struct ScriptedSink {
    state: Arc<SinkState>,
}

impl ScriptedSink {
    fn new(mode: Mode) -> Self {
        let sink = Self::default();
        sink.set_mode(mode);
        sink
    }

    fn set_mode(&self, mode: Mode) {
        *self.state.mode.lock().unwrap() = Some(mode);
    }

    fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    fn submits(&self) -> usize {
        self.state.submits.load(Ordering::SeqCst)
    }

    fn received(&self) -> Vec<Event> {
        self.state.received.lock().unwrap().clone()
    }
}

struct ScriptedConnection {
    state: Arc<SinkState>,
}

#[async_trait]
impl MetricsConnection for ScriptedConnection {
    async fn submit(&self, event: &Event) -> Result<SubmitStatus, SinkError> {
        self.state.submits.fetch_add(1, Ordering::SeqCst);
        match self.state.mode() {
            Mode::Accepting => {
                self.state.received.lock().unwrap().push(event.clone());
                Ok(SubmitStatus::Ok)
            }
            Mode::Refusing => Err(SinkError::Disconnected("peer closed".to_string())),
            Mode::ShuttingDown => Ok(SubmitStatus::ShutDown),
            Mode::Rejecting(code) => Ok(SubmitStatus::ApplicationError(code)),
        }
    }
}

#[async_trait]
impl MetricsSink for ScriptedSink {
    async fn connect(&self) -> Result<Arc<dyn MetricsConnection>, SinkError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        match self.state.mode() {
            Mode::Refusing => Err(SinkError::Disconnected("connection refused".to_string())),
            Mode::ShuttingDown => Err(SinkError::ShuttingDown),
            _ => Ok(Arc::new(ScriptedConnection {
                state: Arc::clone(&self.state),
            })),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config(queue_capacity: usize) -> MetricsLoggerConfig {
    MetricsLoggerConfig {
        queue_capacity,
        backoff_initial: Duration::from_millis(100),
        backoff_factor: 2,
        backoff_max: Duration::from_secs(1),
    }
}

fn logger(sink: &ScriptedSink, queue_capacity: usize) -> MetricsLogger {
    MetricsLogger::new(Arc::new(sink.clone()), config(queue_capacity))
}

/// Lets every runnable task finish before the clock moves.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Polls until the sink has received `count` events.
async fn wait_for_received(sink: &ScriptedSink, count: usize) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while sink.received().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("events were not delivered in time");
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_events_are_delivered_when_connected() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);

    logger.log_occurrence(1, vec![2]);
    logger.log_integer(3, vec![], 42);
    settle().await;

    assert_eq!(
        sink.received(),
        vec![Event::occurrence(1, vec![2]), Event::integer(3, vec![], 42)]
    );
    let status = logger.status().await.unwrap();
    assert_eq!(status.connection, ConnectionState::Connected);
    assert_eq!(status.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn test_events_logged_while_disconnected_arrive_in_order_after_reconnect() {
    let sink = ScriptedSink::new(Mode::Refusing);
    let logger = logger(&sink, 500);

    for value in 0..3 {
        logger.log_integer(7, vec![], value);
    }
    settle().await;

    assert!(sink.received().is_empty());
    assert_eq!(logger.pending_count().await, 3);
    assert_ne!(logger.connection_state().await, ConnectionState::Connected);

    sink.set_mode(Mode::Accepting);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let expected: Vec<Event> = (0..3).map(|v| Event::integer(7, vec![], v)).collect();
    assert_eq!(sink.received(), expected);
    assert_eq!(sink.submits(), 3);
    assert_eq!(logger.pending_count().await, 0);
    assert_eq!(logger.connection_state().await, ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_events_are_not_resent() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);

    logger.log_occurrence(1, vec![]);
    logger.log_occurrence(2, vec![]);
    settle().await;
    assert_eq!(sink.submits(), 2);

    // The connection drops on the next submit.
    sink.set_mode(Mode::Refusing);
    logger.log_occurrence(3, vec![]);
    settle().await;
    assert_eq!(logger.status().await.unwrap().pending, 1);

    sink.set_mode(Mode::Accepting);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        sink.received(),
        vec![
            Event::occurrence(1, vec![]),
            Event::occurrence(2, vec![]),
            Event::occurrence(3, vec![]),
        ]
    );
    assert_eq!(logger.status().await.unwrap().pending, 0);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_drops_newest_events() {
    let sink = ScriptedSink::new(Mode::Refusing);
    let logger = logger(&sink, 5);

    for value in 0..10 {
        logger.log_integer(4, vec![], value);
    }
    settle().await;
    assert_eq!(logger.status().await.unwrap().pending, 5);

    sink.set_mode(Mode::Accepting);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let expected: Vec<Event> = (0..5).map(|v| Event::integer(4, vec![], v)).collect();
    assert_eq!(sink.received(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_events_are_not_retried() {
    let sink = ScriptedSink::new(Mode::Rejecting(3));
    let logger = logger(&sink, 500);

    logger.log_occurrence(9, vec![1]);
    settle().await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.submits(), 1);
    let status = logger.status().await.unwrap();
    assert_eq!(status.pending, 0);
    assert_eq!(status.connection, ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_on_connect_stops_reconnecting() {
    let sink = ScriptedSink::new(Mode::ShuttingDown);
    let logger = logger(&sink, 500);

    logger.log_occurrence(1, vec![]);
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(sink.connects(), 1);
    let status = logger.status().await.unwrap();
    assert!(status.shut_down);
    assert_eq!(status.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_on_submit_drops_later_events() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);
    settle().await;

    sink.set_mode(Mode::ShuttingDown);
    logger.log_occurrence(1, vec![]);
    settle().await;

    sink.set_mode(Mode::Accepting);
    logger.log_occurrence(2, vec![]);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(sink.received().is_empty());
    assert_eq!(sink.connects(), 1);
    assert!(logger.status().await.unwrap().shut_down);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_backoff_grows() {
    let sink = ScriptedSink::new(Mode::Refusing);
    let _logger = logger(&sink, 500);

    // Attempts at 0, 100, 300, 700 and 1500 ms; the next one is due at 2500 ms.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(sink.connects(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_logger_cancels_reconnection() {
    let sink = ScriptedSink::new(Mode::Refusing);
    let logger = logger(&sink, 500);
    settle().await;
    assert_eq!(sink.connects(), 1);

    drop(logger);
    sink.set_mode(Mode::Accepting);
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(sink.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_is_logged_in_microseconds() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);

    let timer = logger.start_timer();
    tokio::time::sleep(Duration::from_millis(250)).await;
    logger.log_elapsed(4, vec![1], timer);
    tokio::time::sleep(Duration::from_millis(250)).await;
    logger.log_elapsed(4, vec![1], timer);
    settle().await;

    assert_eq!(
        sink.received(),
        vec![
            Event::integer(4, vec![1], 250_000),
            Event::integer(4, vec![1], 500_000),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_timer_logs_nothing() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);

    logger.log_elapsed(4, vec![], 12345);
    settle().await;

    assert!(sink.received().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_live_events_reach_sink_in_submission_order() {
    let sink = ScriptedSink::new(Mode::Accepting);
    let logger = logger(&sink, 500);
    tokio::time::timeout(Duration::from_secs(10), async {
        while logger.connection_state().await != ConnectionState::Connected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    for value in 0..6 {
        logger.log_integer(7, vec![], value);
    }
    wait_for_received(&sink, 6).await;

    let expected: Vec<Event> = (0..6).map(|v| Event::integer(7, vec![], v)).collect();
    assert_eq!(sink.received(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redelivery_after_reconnect_keeps_submission_order() {
    let sink = ScriptedSink::new(Mode::Refusing);
    let logger = logger(&sink, 500);

    for value in 0..6 {
        logger.log_integer(7, vec![], value);
    }
    assert_eq!(logger.pending_count().await, 6);

    sink.set_mode(Mode::Accepting);
    wait_for_received(&sink, 6).await;

    let expected: Vec<Event> = (0..6).map(|v| Event::integer(7, vec![], v)).collect();
    assert_eq!(sink.received(), expected);
    assert_eq!(sink.submits(), 6);
}
