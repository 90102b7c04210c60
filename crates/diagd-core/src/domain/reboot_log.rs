//! Reboot log parsing
//!
//! The previous boot leaves up to two records behind:
//!
//! - the **unplanned reboot record**, written by the kernel:
//!
//!   ```text
//!   ZIRCON REBOOT REASON (KERNEL PANIC)
//!
//!   UPTIME (ms)
//!   74715002
//!   ```
//!
//! - the **graceful reboot record**, a single line from a small vocabulary
//!   (`USER REQUEST`, `SYSTEM UPDATE`, ...) written on cooperative shutdown.
//!
//! [`parse_reboot_log`] turns both records plus the factory-reset flag into a
//! [`RebootLog`]. It performs no I/O.

use std::time::Duration;

use super::reboot_reason::RebootReason;

const REASON_PREFIX: &str = "ZIRCON REBOOT REASON (";
const UPTIME_HEADER: &str = "UPTIME (ms)";
const CRITICAL_PROCESS_PREFIX: &str = "ROOT JOB TERMINATED BY CRITICAL PROCESS DEATH: ";

/// The classified previous boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootLog {
    reason: RebootReason,
    raw_text: Option<String>,
    uptime: Option<Duration>,
    critical_process: Option<String>,
}

impl RebootLog {
    pub fn new(
        reason: RebootReason,
        raw_text: Option<String>,
        uptime: Option<Duration>,
        critical_process: Option<String>,
    ) -> Self {
        Self {
            reason,
            raw_text,
            uptime,
            critical_process,
        }
    }

    pub fn reason(&self) -> RebootReason {
        self.reason
    }

    /// Human-readable concatenation of the raw records.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    pub fn uptime(&self) -> Option<Duration> {
        self.uptime
    }

    pub fn critical_process(&self) -> Option<&str> {
        self.critical_process.as_deref()
    }
}

/// Classifies the previous boot.
///
/// Precedence: factory reset, then a recognized graceful cause, then any
/// graceful record (`GenericGraceful`), then the unplanned record.
pub fn parse_reboot_log(
    unplanned: Option<&str>,
    graceful: Option<&str>,
    is_factory_reset: bool,
) -> RebootLog {
    let unplanned = unplanned.filter(|text| !text.trim().is_empty());
    let graceful = graceful.filter(|text| !text.trim().is_empty());

    let reason = if is_factory_reset {
        RebootReason::FactoryDataReset
    } else if let Some(text) = graceful {
        parse_graceful_reason(text).unwrap_or(RebootReason::GenericGraceful)
    } else {
        parse_unplanned_reason(unplanned)
    };

    let raw_text = match (unplanned, graceful) {
        (Some(u), Some(g)) => Some(format!("{}\n{}", u.trim_end(), g.trim_end())),
        (Some(u), None) => Some(u.trim_end().to_string()),
        (None, Some(g)) => Some(g.trim_end().to_string()),
        (None, None) => None,
    };

    RebootLog {
        reason,
        raw_text,
        uptime: unplanned.and_then(parse_uptime),
        critical_process: unplanned.and_then(parse_critical_process),
    }
}

/// Maps the graceful record to a reason, `None` when not in the vocabulary.
fn parse_graceful_reason(text: &str) -> Option<RebootReason> {
    match text.trim() {
        "USER REQUEST" => Some(RebootReason::UserRequest),
        "SYSTEM UPDATE" => Some(RebootReason::SystemUpdate),
        "RETRY SYSTEM UPDATE" => Some(RebootReason::RetrySystemUpdate),
        "HIGH TEMPERATURE" => Some(RebootReason::HighTemperature),
        "SESSION FAILURE" => Some(RebootReason::SessionFailure),
        "SYSMGR FAILURE" => Some(RebootReason::SysmgrFailure),
        "CRITICAL COMPONENT FAILURE" => Some(RebootReason::CriticalComponentFailure),
        "FACTORY DATA RESET" => Some(RebootReason::FactoryDataReset),
        _ => None,
    }
}

fn parse_unplanned_reason(unplanned: Option<&str>) -> RebootReason {
    let Some(text) = unplanned else {
        return RebootReason::Cold;
    };

    let first_line = text.lines().next().unwrap_or_default().trim();
    let Some(inner) = first_line
        .strip_prefix(REASON_PREFIX)
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return RebootReason::NotParseable;
    };

    if inner.contains("KERNEL PANIC") {
        RebootReason::KernelPanic
    } else if inner.contains("OOM") {
        RebootReason::Oom
    } else if inner.contains("SW WATCHDOG") {
        RebootReason::SoftwareWatchdogTimeout
    } else if inner.contains("HW WATCHDOG") {
        RebootReason::HardwareWatchdogTimeout
    } else if inner.contains("BROWNOUT") {
        RebootReason::Brownout
    } else if inner.contains("USERSPACE ROOT JOB TERMINATION") {
        RebootReason::RootJobTermination
    } else if inner.contains("NO CRASH") {
        RebootReason::GenericGraceful
    } else {
        RebootReason::Spontaneous
    }
}

/// Uptime lives at a fixed position: line 3 is the header, line 4 the value.
fn parse_uptime(text: &str) -> Option<Duration> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.get(2).map(|l| l.trim()) != Some(UPTIME_HEADER) {
        return None;
    }
    lines
        .get(3)
        .and_then(|l| l.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// `ROOT JOB TERMINATED BY CRITICAL PROCESS DEATH: <name> (<koid>)`
fn parse_critical_process(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(CRITICAL_PROCESS_PREFIX)?;
        let name = match rest.rfind(" (") {
            Some(idx) => &rest[..idx],
            None => rest,
        };
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}
