//! diagd Reboot - Classifying and reporting the last reboot
//!
//! Provides:
//! - `read_reboot_log`: reads the reboot records and the factory-reset marker
//! - `Reporter`: reports the classified reboot once per boot
//! - `RebootLogInfoService`: answers last-reboot queries from the parsed log

pub mod files;
pub mod info_service;
pub mod reporter;

pub use files::read_reboot_log;
pub use info_service::RebootLogInfoService;
pub use reporter::Reporter;
