//! Reboot reasons and their derived properties
//!
//! [`RebootReason`] is a closed set. Every property below is a pure function
//! of the variant, written as an exhaustive `match` so adding a variant forces
//! every table to be revisited.
//!
//! | Reason                   | crash | fatal | graceful    |
//! |--------------------------|-------|-------|-------------|
//! | NotParseable             | yes   | yes   | unknown     |
//! | GenericGraceful          | no    | no    | yes         |
//! | Cold                     | no    | no    | no          |
//! | Spontaneous              | yes   | no    | no          |
//! | KernelPanic              | yes   | yes   | no          |
//! | Oom                      | yes   | yes   | no          |
//! | HardwareWatchdogTimeout  | yes   | yes   | no          |
//! | SoftwareWatchdogTimeout  | yes   | yes   | no          |
//! | Brownout                 | yes   | yes   | no          |
//! | UserRequest              | no    | no    | yes         |
//! | SystemUpdate             | no    | no    | yes         |
//! | RetrySystemUpdate        | no    | no    | yes         |
//! | HighTemperature          | no    | no    | yes         |
//! | SessionFailure           | yes   | no    | yes         |
//! | SysmgrFailure            | yes   | yes   | yes         |
//! | CriticalComponentFailure | yes   | yes   | yes         |
//! | FactoryDataReset         | no    | no    | yes         |
//! | RootJobTermination       | yes   | yes   | no          |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the device last restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootReason {
    /// The unplanned reboot record exists but could not be parsed
    NotParseable,
    /// Graceful reboot whose cause is not in the known vocabulary
    GenericGraceful,
    /// First boot or a reboot after a full power cycle
    Cold,
    /// Unexplained reboot, typically a brief power loss
    Spontaneous,
    KernelPanic,
    Oom,
    HardwareWatchdogTimeout,
    SoftwareWatchdogTimeout,
    Brownout,
    UserRequest,
    SystemUpdate,
    RetrySystemUpdate,
    HighTemperature,
    SessionFailure,
    SysmgrFailure,
    CriticalComponentFailure,
    FactoryDataReset,
    /// A critical process died and took the root job down with it
    RootJobTermination,
}

/// Reboot reason as exposed to external clients of the last-reboot service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRebootReason {
    Cold,
    BriefPowerLoss,
    Brownout,
    KernelPanic,
    SystemOutOfMemory,
    HardwareWatchdogTimeout,
    SoftwareWatchdogTimeout,
    UserRequest,
    SystemUpdate,
    RetrySystemUpdate,
    HighTemperature,
    SessionFailure,
    SysmgrFailure,
    CriticalComponentFailure,
    FactoryDataReset,
    RootJobTermination,
}

impl RebootReason {
    /// Whether the reboot was unexpected and deserves a crash report.
    pub fn is_crash(&self) -> bool {
        match self {
            RebootReason::NotParseable
            | RebootReason::Spontaneous
            | RebootReason::KernelPanic
            | RebootReason::Oom
            | RebootReason::HardwareWatchdogTimeout
            | RebootReason::SoftwareWatchdogTimeout
            | RebootReason::Brownout
            | RebootReason::SessionFailure
            | RebootReason::SysmgrFailure
            | RebootReason::CriticalComponentFailure
            | RebootReason::RootJobTermination => true,
            RebootReason::GenericGraceful
            | RebootReason::Cold
            | RebootReason::UserRequest
            | RebootReason::SystemUpdate
            | RebootReason::RetrySystemUpdate
            | RebootReason::HighTemperature
            | RebootReason::FactoryDataReset => false,
        }
    }

    /// Whether the whole system went down (as opposed to a recoverable subsystem).
    pub fn is_fatal(&self) -> bool {
        match self {
            RebootReason::NotParseable
            | RebootReason::KernelPanic
            | RebootReason::Oom
            | RebootReason::HardwareWatchdogTimeout
            | RebootReason::SoftwareWatchdogTimeout
            | RebootReason::Brownout
            | RebootReason::SysmgrFailure
            | RebootReason::CriticalComponentFailure
            | RebootReason::RootJobTermination => true,
            RebootReason::GenericGraceful
            | RebootReason::Cold
            | RebootReason::Spontaneous
            | RebootReason::UserRequest
            | RebootReason::SystemUpdate
            | RebootReason::RetrySystemUpdate
            | RebootReason::HighTemperature
            | RebootReason::SessionFailure
            | RebootReason::FactoryDataReset => false,
        }
    }

    /// Whether the reboot was cooperative. `None` when it cannot be known.
    pub fn optionally_graceful(&self) -> Option<bool> {
        match self {
            RebootReason::GenericGraceful
            | RebootReason::UserRequest
            | RebootReason::SystemUpdate
            | RebootReason::RetrySystemUpdate
            | RebootReason::HighTemperature
            | RebootReason::SessionFailure
            | RebootReason::SysmgrFailure
            | RebootReason::CriticalComponentFailure
            | RebootReason::FactoryDataReset => Some(true),
            RebootReason::Cold
            | RebootReason::Spontaneous
            | RebootReason::KernelPanic
            | RebootReason::Oom
            | RebootReason::HardwareWatchdogTimeout
            | RebootReason::SoftwareWatchdogTimeout
            | RebootReason::Brownout
            | RebootReason::RootJobTermination => Some(false),
            RebootReason::NotParseable => None,
        }
    }

    /// Dimension code used for the last-reboot metric.
    pub fn metric_code(&self) -> u32 {
        match self {
            RebootReason::NotParseable => 0,
            RebootReason::Cold => 2,
            RebootReason::Spontaneous => 3,
            RebootReason::Brownout => 4,
            RebootReason::KernelPanic => 5,
            RebootReason::Oom => 6,
            RebootReason::HardwareWatchdogTimeout => 7,
            RebootReason::SoftwareWatchdogTimeout => 8,
            RebootReason::UserRequest => 9,
            RebootReason::SystemUpdate => 10,
            RebootReason::HighTemperature => 11,
            RebootReason::SessionFailure => 12,
            RebootReason::SysmgrFailure => 13,
            RebootReason::FactoryDataReset => 14,
            RebootReason::CriticalComponentFailure => 15,
            RebootReason::RetrySystemUpdate => 16,
            RebootReason::RootJobTermination => 17,
            RebootReason::GenericGraceful => 18,
        }
    }

    /// Crash signature for the crash report.
    ///
    /// # Panics
    ///
    /// Panics if the reason is not a crash. Only crash reasons are ever
    /// reported, so reaching this with another variant is a logic error.
    pub fn crash_signature(&self, critical_process: Option<&str>) -> String {
        let base = match self {
            RebootReason::NotParseable => "fuchsia-reboot-log-not-parseable",
            RebootReason::Spontaneous => "fuchsia-brief-power-loss",
            RebootReason::KernelPanic => "fuchsia-kernel-panic",
            RebootReason::Oom => "fuchsia-oom",
            RebootReason::HardwareWatchdogTimeout => "fuchsia-hw-watchdog-timeout",
            RebootReason::SoftwareWatchdogTimeout => "fuchsia-sw-watchdog-timeout",
            RebootReason::Brownout => "fuchsia-brownout",
            RebootReason::SessionFailure => "fuchsia-session-failure",
            RebootReason::SysmgrFailure => "fuchsia-sysmgr-failure",
            RebootReason::CriticalComponentFailure => "fuchsia-critical-component-failure",
            RebootReason::RootJobTermination => "fuchsia-root-job-termination",
            RebootReason::GenericGraceful
            | RebootReason::Cold
            | RebootReason::UserRequest
            | RebootReason::SystemUpdate
            | RebootReason::RetrySystemUpdate
            | RebootReason::HighTemperature
            | RebootReason::FactoryDataReset => {
                panic!("crash signature requested for non-crash reboot reason {self}")
            }
        };

        match (self, critical_process) {
            (
                RebootReason::CriticalComponentFailure | RebootReason::RootJobTermination,
                Some(process),
            ) => format!("{base}-{process}"),
            _ => base.to_string(),
        }
    }

    /// Program name attached to the crash report.
    ///
    /// # Panics
    ///
    /// Panics if the reason is not a crash, see [`RebootReason::crash_signature`].
    pub fn crash_program_name(&self) -> &'static str {
        match self {
            RebootReason::NotParseable => "reboot-log",
            RebootReason::KernelPanic => "kernel",
            RebootReason::Spontaneous
            | RebootReason::Brownout
            | RebootReason::HardwareWatchdogTimeout => "device",
            RebootReason::Oom
            | RebootReason::SoftwareWatchdogTimeout
            | RebootReason::SessionFailure
            | RebootReason::SysmgrFailure
            | RebootReason::CriticalComponentFailure
            | RebootReason::RootJobTermination => "system",
            RebootReason::GenericGraceful
            | RebootReason::Cold
            | RebootReason::UserRequest
            | RebootReason::SystemUpdate
            | RebootReason::RetrySystemUpdate
            | RebootReason::HighTemperature
            | RebootReason::FactoryDataReset => {
                panic!("crash program name requested for non-crash reboot reason {self}")
            }
        }
    }

    /// The reason as reported to external clients, when it has a wire form.
    pub fn to_wire(&self) -> Option<WireRebootReason> {
        match self {
            RebootReason::NotParseable | RebootReason::GenericGraceful => None,
            RebootReason::Cold => Some(WireRebootReason::Cold),
            RebootReason::Spontaneous => Some(WireRebootReason::BriefPowerLoss),
            RebootReason::KernelPanic => Some(WireRebootReason::KernelPanic),
            RebootReason::Oom => Some(WireRebootReason::SystemOutOfMemory),
            RebootReason::HardwareWatchdogTimeout => {
                Some(WireRebootReason::HardwareWatchdogTimeout)
            }
            RebootReason::SoftwareWatchdogTimeout => {
                Some(WireRebootReason::SoftwareWatchdogTimeout)
            }
            RebootReason::Brownout => Some(WireRebootReason::Brownout),
            RebootReason::UserRequest => Some(WireRebootReason::UserRequest),
            RebootReason::SystemUpdate => Some(WireRebootReason::SystemUpdate),
            RebootReason::RetrySystemUpdate => Some(WireRebootReason::RetrySystemUpdate),
            RebootReason::HighTemperature => Some(WireRebootReason::HighTemperature),
            RebootReason::SessionFailure => Some(WireRebootReason::SessionFailure),
            RebootReason::SysmgrFailure => Some(WireRebootReason::SysmgrFailure),
            RebootReason::CriticalComponentFailure => {
                Some(WireRebootReason::CriticalComponentFailure)
            }
            RebootReason::FactoryDataReset => Some(WireRebootReason::FactoryDataReset),
            RebootReason::RootJobTermination => Some(WireRebootReason::RootJobTermination),
        }
    }
}

impl fmt::Display for RebootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RebootReason::NotParseable => "NOT PARSEABLE",
            RebootReason::GenericGraceful => "GENERIC GRACEFUL",
            RebootReason::Cold => "COLD",
            RebootReason::Spontaneous => "SPONTANEOUS",
            RebootReason::KernelPanic => "KERNEL PANIC",
            RebootReason::Oom => "OOM",
            RebootReason::HardwareWatchdogTimeout => "HARDWARE WATCHDOG TIMEOUT",
            RebootReason::SoftwareWatchdogTimeout => "SOFTWARE WATCHDOG TIMEOUT",
            RebootReason::Brownout => "BROWNOUT",
            RebootReason::UserRequest => "USER REQUEST",
            RebootReason::SystemUpdate => "SYSTEM UPDATE",
            RebootReason::RetrySystemUpdate => "RETRY SYSTEM UPDATE",
            RebootReason::HighTemperature => "HIGH TEMPERATURE",
            RebootReason::SessionFailure => "SESSION FAILURE",
            RebootReason::SysmgrFailure => "SYSMGR FAILURE",
            RebootReason::CriticalComponentFailure => "CRITICAL COMPONENT FAILURE",
            RebootReason::FactoryDataReset => "FACTORY DATA RESET",
            RebootReason::RootJobTermination => "ROOT JOB TERMINATION",
        };
        write!(f, "{}", s)
    }
}

impl WireRebootReason {
    /// Lowercase human-readable form used in annotations.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireRebootReason::Cold => "cold",
            WireRebootReason::BriefPowerLoss => "brief loss of power",
            WireRebootReason::Brownout => "brownout",
            WireRebootReason::KernelPanic => "kernel panic",
            WireRebootReason::SystemOutOfMemory => "system out of memory",
            WireRebootReason::HardwareWatchdogTimeout => "hardware watchdog timeout",
            WireRebootReason::SoftwareWatchdogTimeout => "software watchdog timeout",
            WireRebootReason::UserRequest => "user request",
            WireRebootReason::SystemUpdate => "system update",
            WireRebootReason::RetrySystemUpdate => "retry system update",
            WireRebootReason::HighTemperature => "device too hot",
            WireRebootReason::SessionFailure => "fatal session failure",
            WireRebootReason::SysmgrFailure => "fatal sysmgr failure",
            WireRebootReason::CriticalComponentFailure => "fatal critical component failure",
            WireRebootReason::FactoryDataReset => "factory data reset",
            WireRebootReason::RootJobTermination => "root job termination",
        }
    }
}
