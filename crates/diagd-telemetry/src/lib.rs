//! diagd Telemetry - Metrics delivery and local report storage
//!
//! Provides:
//! - `MetricsLogger`: fire-and-forget event logging with reconnection and replay
//! - `MetricsRegistry` / `PrometheusSink`: local sink backed by Prometheus
//! - `MetricsServer`: HTTP server for Prometheus scraping
//! - `LocalCrashIntake`: file-based crash report intake

pub mod backoff;
pub mod crash_intake;
pub mod logger;
pub mod metrics;
pub mod server;

pub use backoff::ExponentialBackoff;
pub use crash_intake::{list_crash_reports, save_crash_report, LocalCrashIntake};
pub use logger::{ConnectionState, LoggerStatus, MetricsLogger, MetricsLoggerConfig};
pub use metrics::{MetricsRegistry, PrometheusSink};
pub use server::MetricsServer;
