//! Reliable metrics event logger
//!
//! The [`MetricsLogger`] delivers [`Event`]s to a remote [`MetricsSink`] that
//! may disconnect at any time. Callers never wait and never see an error:
//! every `log_*` call enqueues and returns.
//!
//! ## Flow
//!
//! ```text
//! log_*() ──→ mpsc ──→ LoggerActor ──→ pending (id → Event) ──→ dispatcher ──→ sink
//!                          │                   ↑                    │
//!                          └── reconnect timer ┘←── ack / disconnect ┘
//! ```
//!
//! All mutable state lives inside a single actor task. Each connection gets
//! one dispatcher task that submits events one at a time, in id order.
//! Dropping the handle aborts the actor, which cancels the reconnect timer
//! and every connect or dispatcher task along with it.
//!
//! ## Delivery
//!
//! - An event is kept until the sink acknowledges it with *any* status.
//!   Rejected events are not retried.
//! - When the connection drops, the actor reconnects with exponential
//!   backoff and re-sends the events still pending, in submission order.
//! - When the sink reports that it is shutting down, the actor stops
//!   reconnecting for good and drops everything.
//! - At most `queue_capacity` events are pending; new events beyond that
//!   are dropped.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use diagd_core::config::MetricsConfig;
use diagd_core::domain::Event;
use diagd_core::ports::{MetricsConnection, MetricsSink, SinkError, SubmitStatus};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backoff::ExponentialBackoff;

// ============================================================================
// Configuration and observable state
// ============================================================================

/// Tuning knobs of the logger
#[derive(Debug, Clone)]
pub struct MetricsLoggerConfig {
    /// Maximum number of events waiting for acknowledgement
    pub queue_capacity: usize,
    pub backoff_initial: Duration,
    pub backoff_factor: u32,
    pub backoff_max: Duration,
}

impl Default for MetricsLoggerConfig {
    fn default() -> Self {
        Self::from(&MetricsConfig::default())
    }
}

impl From<&MetricsConfig> for MetricsLoggerConfig {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            backoff_initial: config.backoff_initial(),
            backoff_factor: config.backoff_factor,
            backoff_max: config.backoff_max(),
        }
    }
}

/// State of the connection to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Point-in-time view of the logger, for diagnostics and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerStatus {
    pub connection: ConnectionState,
    pub pending: usize,
    pub shut_down: bool,
}

// ============================================================================
// MetricsLogger handle
// ============================================================================

enum Command {
    Log(Event),
    StartTimer {
        timer_id: u64,
        at: Instant,
    },
    LogElapsed {
        metric_id: u32,
        dimensions: Vec<u32>,
        timer_id: u64,
        at: Instant,
    },
    Status(oneshot::Sender<LoggerStatus>),
}

/// Fire-and-forget handle to the metrics actor
///
/// Must be created from within a Tokio runtime.
pub struct MetricsLogger {
    commands: mpsc::UnboundedSender<Command>,
    next_timer_id: AtomicU64,
    task: JoinHandle<()>,
}

impl MetricsLogger {
    /// Creates the logger and immediately starts connecting to `sink`.
    pub fn new(sink: Arc<dyn MetricsSink>, config: MetricsLoggerConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();

        info!(
            queue_capacity = config.queue_capacity,
            backoff_initial_ms = config.backoff_initial.as_millis() as u64,
            backoff_max_ms = config.backoff_max.as_millis() as u64,
            "Creating metrics logger"
        );

        let (acks, ack_receiver) = mpsc::unbounded_channel();
        let actor = LoggerActor::new(sink, config, acks);
        let task = tokio::spawn(actor.run(receiver, ack_receiver));

        Self {
            commands,
            next_timer_id: AtomicU64::new(1),
            task,
        }
    }

    /// Logs that something happened once.
    pub fn log_occurrence(&self, metric_id: u32, dimensions: Vec<u32>) {
        self.send(Command::Log(Event::occurrence(metric_id, dimensions)));
    }

    /// Logs a measurement.
    pub fn log_integer(&self, metric_id: u32, dimensions: Vec<u32>, value: u64) {
        self.send(Command::Log(Event::integer(metric_id, dimensions, value)));
    }

    /// Starts a timer and returns its id.
    pub fn start_timer(&self) -> u64 {
        let timer_id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
        self.send(Command::StartTimer {
            timer_id,
            at: Instant::now(),
        });
        timer_id
    }

    /// Logs the microseconds elapsed since `timer_id` was started.
    ///
    /// The timer keeps running and may be sampled again.
    pub fn log_elapsed(&self, metric_id: u32, dimensions: Vec<u32>, timer_id: u64) {
        self.send(Command::LogElapsed {
            metric_id,
            dimensions,
            timer_id,
            at: Instant::now(),
        });
    }

    /// Returns the current logger state, `None` if the actor is gone.
    pub async fn status(&self) -> Option<LoggerStatus> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Status(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.status()
            .await
            .map_or(ConnectionState::Disconnected, |status| status.connection)
    }

    /// Events submitted but not yet acknowledged by the sink.
    pub async fn pending_count(&self) -> usize {
        self.status().await.map_or(0, |status| status.pending)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Metrics actor is gone, dropping command");
        }
    }
}

impl Drop for MetricsLogger {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// LoggerActor
// ============================================================================

/// Result of a task spawned by the actor
enum TaskOutcome {
    Connected(Result<Arc<dyn MetricsConnection>, SinkError>),
    DispatcherStopped { generation: u64 },
}

/// Sink answer for one submitted event
struct Ack {
    generation: u64,
    event_id: u64,
    result: Result<SubmitStatus, SinkError>,
}

/// Submits queued events over one connection, strictly one after another.
///
/// Stops at the first connection-level failure or shut-down answer; the
/// events left in the queue stay pending in the actor.
async fn run_dispatcher(
    generation: u64,
    connection: Arc<dyn MetricsConnection>,
    mut queue: mpsc::UnboundedReceiver<(u64, Event)>,
    acks: mpsc::UnboundedSender<Ack>,
) -> TaskOutcome {
    while let Some((event_id, event)) = queue.recv().await {
        let result = connection.submit(&event).await;
        let last = matches!(result, Err(_) | Ok(SubmitStatus::ShutDown));
        let ack = Ack {
            generation,
            event_id,
            result,
        };
        if acks.send(ack).is_err() || last {
            break;
        }
    }
    TaskOutcome::DispatcherStopped { generation }
}

struct LoggerActor {
    sink: Arc<dyn MetricsSink>,
    queue_capacity: usize,
    state: ConnectionState,
    /// Feeds the dispatcher of the current connection
    dispatcher: Option<mpsc::UnboundedSender<(u64, Event)>>,
    acks: mpsc::UnboundedSender<Ack>,
    /// Bumped on every new connection so stale acks can be told apart
    generation: u64,
    pending: BTreeMap<u64, Event>,
    next_event_id: u64,
    timers: HashMap<u64, Instant>,
    backoff: ExponentialBackoff,
    reconnect_at: Option<Instant>,
    shut_down: bool,
    tasks: JoinSet<TaskOutcome>,
}

impl LoggerActor {
    fn new(
        sink: Arc<dyn MetricsSink>,
        config: MetricsLoggerConfig,
        acks: mpsc::UnboundedSender<Ack>,
    ) -> Self {
        Self {
            sink,
            queue_capacity: config.queue_capacity,
            state: ConnectionState::Disconnected,
            dispatcher: None,
            acks,
            generation: 0,
            pending: BTreeMap::new(),
            next_event_id: 0,
            timers: HashMap::new(),
            backoff: ExponentialBackoff::new(
                config.backoff_initial,
                config.backoff_factor,
                config.backoff_max,
            ),
            reconnect_at: None,
            shut_down: false,
            tasks: JoinSet::new(),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut acks: mpsc::UnboundedReceiver<Ack>,
    ) {
        self.connect();

        loop {
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(ack) = acks.recv() => self.handle_ack(ack),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => match joined {
                    Ok(outcome) => self.handle_outcome(outcome),
                    Err(e) => warn!(error = %e, "Metrics task failed"),
                },
                _ = sleep_until(reconnect_at) => {
                    self.reconnect_at = None;
                    self.connect();
                }
            }
        }

        debug!(pending = self.pending.len(), "Metrics logger stopped");
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Log(event) => self.enqueue(event),
            Command::StartTimer { timer_id, at } => {
                self.timers.insert(timer_id, at);
            }
            Command::LogElapsed {
                metric_id,
                dimensions,
                timer_id,
                at,
            } => match self.timers.get(&timer_id) {
                Some(start) => {
                    let elapsed_us = at.saturating_duration_since(*start).as_micros() as u64;
                    self.enqueue(Event::integer(metric_id, dimensions, elapsed_us));
                }
                None => warn!(timer_id, metric_id, "Unknown timer, dropping elapsed event"),
            },
            Command::Status(reply) => {
                let _ = reply.send(LoggerStatus {
                    connection: self.state,
                    pending: self.pending.len(),
                    shut_down: self.shut_down,
                });
            }
        }
    }

    fn enqueue(&mut self, event: Event) {
        if self.shut_down {
            debug!(event = %event, "Metrics sink shut down, dropping event");
            return;
        }

        if self.pending.len() >= self.queue_capacity {
            warn!(
                event = %event,
                capacity = self.queue_capacity,
                "Pending metrics queue is full, dropping event"
            );
            return;
        }

        let event_id = self.next_event_id;
        self.next_event_id += 1;
        self.pending.insert(event_id, event.clone());

        if self.state == ConnectionState::Connected {
            self.dispatch(event_id, event);
        }
    }

    // ------------------------------------------------------------------------
    // Connection management
    // ------------------------------------------------------------------------

    fn connect(&mut self) {
        if self.shut_down || self.state != ConnectionState::Disconnected {
            return;
        }

        debug!("Connecting to metrics sink");
        self.state = ConnectionState::Connecting;
        let sink = Arc::clone(&self.sink);
        self.tasks
            .spawn(async move { TaskOutcome::Connected(sink.connect().await) });
    }

    fn dispatch(&mut self, event_id: u64, event: Event) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        // A stopped dispatcher reports its failure through an ack; the event
        // stays pending for the next connection.
        let _ = dispatcher.send((event_id, event));
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Connected(Ok(connection)) => {
                if self.shut_down {
                    return;
                }
                self.state = ConnectionState::Connected;
                self.generation += 1;
                self.backoff.reset();

                let (queue, receiver) = mpsc::unbounded_channel();
                self.dispatcher = Some(queue);
                self.tasks.spawn(run_dispatcher(
                    self.generation,
                    connection,
                    receiver,
                    self.acks.clone(),
                ));

                info!(pending = self.pending.len(), "Connected to metrics sink");

                let pending: Vec<(u64, Event)> = self
                    .pending
                    .iter()
                    .map(|(id, event)| (*id, event.clone()))
                    .collect();
                for (event_id, event) in pending {
                    self.dispatch(event_id, event);
                }
            }
            TaskOutcome::Connected(Err(SinkError::ShuttingDown)) => self.enter_shut_down(),
            TaskOutcome::Connected(Err(e)) => {
                warn!(error = %e, "Failed to connect to metrics sink");
                self.state = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
            TaskOutcome::DispatcherStopped { generation } => {
                debug!(generation, "Metrics dispatcher stopped");
            }
        }
    }

    fn handle_ack(&mut self, ack: Ack) {
        let Ack {
            generation,
            event_id,
            result,
        } = ack;

        match result {
            Ok(SubmitStatus::Ok) => {
                self.pending.remove(&event_id);
            }
            Ok(SubmitStatus::ApplicationError(code)) => {
                if let Some(event) = self.pending.remove(&event_id) {
                    warn!(event = %event, code, "Metrics sink rejected event");
                }
            }
            Ok(SubmitStatus::ShutDown) | Err(SinkError::ShuttingDown) => {
                self.pending.remove(&event_id);
                self.enter_shut_down();
            }
            Err(SinkError::Disconnected(reason)) => {
                // Only the first failure on the current connection counts.
                if generation == self.generation && self.state == ConnectionState::Connected {
                    warn!(reason = %reason, "Lost connection to metrics sink");
                    self.dispatcher = None;
                    self.state = ConnectionState::Disconnected;
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.shut_down || self.reconnect_at.is_some() {
            return;
        }
        let delay = self.backoff.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling metrics sink reconnection");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn enter_shut_down(&mut self) {
        if self.shut_down {
            return;
        }
        warn!(
            dropped = self.pending.len(),
            "Metrics sink is shutting down, no further events will be sent"
        );
        self.shut_down = true;
        self.state = ConnectionState::Disconnected;
        self.dispatcher = None;
        self.reconnect_at = None;
        self.pending.clear();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
