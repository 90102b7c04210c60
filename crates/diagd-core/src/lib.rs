//! diagd Core - Domain types, configuration and ports
//!
//! This crate contains everything the diagnostics pipeline agrees on:
//! - **Domain types** - `ErrorKind`, annotation/attachment values, metric `Event`s,
//!   `RebootReason` and the pure `RebootLog` parser
//! - **Configuration** - typed YAML configuration with defaults
//! - **Port definitions** - traits for every external collaborator: the metrics
//!   sink, device/product/channel services, log sources, the tree exporter and
//!   the crash intake
//!
//! # Architecture
//!
//! The domain module is pure: no I/O, no clocks. Ports define the trait
//! interfaces that the collection, telemetry and reboot crates depend on and
//! that the daemon (or tests) implement.

pub mod config;
pub mod domain;
pub mod ports;
