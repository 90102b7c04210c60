//! Reboot records on disk
//!
//! The kernel leaves an unplanned-reboot record, the shutdown path leaves a
//! graceful-reason record. A factory reset wipes the data partition, so the
//! absence of the not-a-FDR marker there means the device was just reset.

use std::path::Path;

use diagd_core::config::RebootConfig;
use diagd_core::domain::{parse_reboot_log, RebootLog};
use tracing::{info, warn};

/// Reads the reboot records and classifies the last reboot.
///
/// Creates the not-a-FDR marker afterwards so the next boot is not mistaken
/// for a factory reset.
pub fn read_reboot_log(config: &RebootConfig) -> RebootLog {
    let unplanned = read_record(&config.unplanned_log);
    let graceful = read_record(&config.graceful_reason);

    let is_factory_reset = !config.not_a_fdr_marker.exists();
    if is_factory_reset {
        if let Err(e) = create_marker(&config.not_a_fdr_marker) {
            warn!(
                path = %config.not_a_fdr_marker.display(),
                error = %e,
                "Failed to create not-a-FDR marker"
            );
        }
    }

    let log = parse_reboot_log(unplanned.as_deref(), graceful.as_deref(), is_factory_reset);
    info!(
        reason = %log.reason(),
        uptime_ms = log.uptime().map(|u| u.as_millis() as u64),
        is_factory_reset,
        "Last reboot classified"
    );
    log
}

/// Creates an empty marker file and its parent directories.
pub fn create_marker(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"")?;
    Ok(())
}

fn read_record(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read reboot record");
            None
        }
    }
}
