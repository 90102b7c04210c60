//! Remote metrics sink port
//!
//! The sink is reached through a connection that can drop at any time.
//! Connection-level failures surface as [`SinkError`]; per-event outcomes
//! the sink did deliver surface as [`SubmitStatus`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Event;

/// Acknowledgement of a single submitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The event was accepted
    Ok,
    /// The sink rejected the event; it must not be retried
    ApplicationError(i32),
    /// The sink will never accept data again
    ShutDown,
}

/// Connection-level failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The connection could not be established or was lost
    #[error("metrics sink disconnected: {0}")]
    Disconnected(String),

    /// The sink is deliberately shutting down
    #[error("metrics sink is shutting down")]
    ShuttingDown,
}

/// An established connection to the sink
#[async_trait]
pub trait MetricsConnection: Send + Sync {
    /// Submits one event and waits for its acknowledgement.
    async fn submit(&self, event: &Event) -> Result<SubmitStatus, SinkError>;
}

/// Factory for sink connections
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Opens a new connection to the sink.
    async fn connect(&self) -> Result<Arc<dyn MetricsConnection>, SinkError>;
}
