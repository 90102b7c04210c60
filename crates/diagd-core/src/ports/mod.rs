//! Port definitions (interfaces to external collaborators)
//!
//! Every remote service the pipeline talks to is a single async
//! request/response call behind a trait. The wire encoding is not our
//! concern; a call either succeeds or fails with an [`RpcError`].
//!
//! ## Ports Overview
//!
//! - [`MetricsSink`] / [`MetricsConnection`] - the remote metrics sink
//! - [`BoardInfoService`], [`ProductInfoService`], [`ChannelService`],
//!   [`DeviceIdService`], [`LastRebootInfoService`] - device facts
//! - [`LogSource`], [`TreeExporter`] - diagnostic blobs
//! - [`CrashIntake`] - where crash reports are filed
//! - [`Services`] - the directory of the above; a missing entry is treated
//!   exactly like an unreachable service

pub mod crash_intake;
pub mod device_info;
pub mod diagnostics;
pub mod metrics_sink;
pub mod services;

use thiserror::Error;

pub use crash_intake::{CrashIntake, CrashReport};
pub use device_info::{
    BoardInfo, BoardInfoService, ChannelService, DeviceIdService, LastRebootInfo,
    LastRebootInfoService, ProductInfo, ProductInfoService,
};
pub use diagnostics::{LogSource, TreeExporter};
pub use metrics_sink::{MetricsConnection, MetricsSink, SinkError, SubmitStatus};
pub use services::Services;

/// Failure of a remote request/response call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The service is not present in the service directory
    #[error("service not available: {0}")]
    Unavailable(String),

    /// The peer closed the channel before answering
    #[error("peer closed the connection")]
    PeerClosed,

    /// The call reached the service but failed
    #[error("call failed: {0}")]
    Failed(String),
}
