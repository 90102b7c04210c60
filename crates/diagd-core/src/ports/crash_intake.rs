//! Crash intake port
//!
//! Crash reports for unexpected reboots are filed with an external intake
//! service that owns snapshotting, storage and upload.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RpcError;

/// A structured crash report for an unexpected reboot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
    pub id: String,
    pub timestamp: String,
    pub program_name: String,
    pub crash_signature: String,
    /// Raw reboot records, attached verbatim
    pub reboot_log: Option<String>,
    pub uptime_ms: Option<u64>,
    /// Only set when the reboot reason says something about fatality
    pub is_fatal: Option<bool>,
}

impl CrashReport {
    /// Create a new crash report with a fresh id and the current time.
    pub fn new(program_name: &str, crash_signature: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            program_name: program_name.to_string(),
            crash_signature: crash_signature.to_string(),
            reboot_log: None,
            uptime_ms: None,
            is_fatal: None,
        }
    }

    pub fn with_reboot_log(mut self, text: Option<&str>) -> Self {
        self.reboot_log = text.map(str::to_string);
        self
    }

    pub fn with_uptime_ms(mut self, uptime_ms: Option<u64>) -> Self {
        self.uptime_ms = uptime_ms;
        self
    }

    pub fn with_is_fatal(mut self, is_fatal: Option<bool>) -> Self {
        self.is_fatal = is_fatal;
        self
    }
}

/// Destination for crash reports
#[async_trait]
pub trait CrashIntake: Send + Sync {
    async fn file(&self, report: CrashReport) -> Result<(), RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_report_creation() {
        let report = CrashReport::new("kernel", "fuchsia-kernel-panic")
            .with_reboot_log(Some("ZIRCON REBOOT REASON (KERNEL PANIC)"))
            .with_uptime_ms(Some(42))
            .with_is_fatal(Some(true));
        assert!(!report.id.is_empty());
        assert_eq!(report.program_name, "kernel");
        assert_eq!(report.crash_signature, "fuchsia-kernel-panic");
        assert_eq!(report.uptime_ms, Some(42));
        assert_eq!(report.is_fatal, Some(true));
    }

    #[test]
    fn test_crash_report_serialization() {
        let report = CrashReport::new("device", "fuchsia-brownout");
        let json = serde_json::to_string(&report).unwrap();
        let loaded: CrashReport = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, report);
    }
}
