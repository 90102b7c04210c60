//! Metric registry
//!
//! Fixed metric ids and dimension codes understood by the remote metrics
//! sink. These are process-wide constants; nothing here is mutable.

use super::keys;

// ============================================================================
// Metric ids
// ============================================================================

/// Integer: uptime (ms) of the previous boot, dimension = reboot reason code.
pub const LAST_REBOOT_UPTIME_METRIC_ID: u32 = 1;

/// Occurrence: a data source timed out, dimension = [`TimedOutData`] code.
pub const TIMED_OUT_DATA_METRIC_ID: u32 = 2;

/// Integer: new inspect data budget in bytes.
pub const INSPECT_BUDGET_METRIC_ID: u32 = 3;

/// Integer: snapshot generation time in microseconds, dimension = [`SnapshotFlow`] code.
pub const SNAPSHOT_GENERATION_METRIC_ID: u32 = 4;

/// Occurrence: a non-platform annotation upsert was rejected.
pub const NON_PLATFORM_REJECTED_METRIC_ID: u32 = 5;

// ============================================================================
// TimedOutData
// ============================================================================

/// Kinds of data whose collection timeouts are reported to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimedOutData {
    SystemLog,
    KernelLog,
    Inspect,
    Channel,
    ProductInfo,
    BoardInfo,
    LastRebootInfo,
    DeviceId,
}

impl TimedOutData {
    /// Dimension code sent to the sink.
    pub fn code(&self) -> u32 {
        match self {
            TimedOutData::SystemLog => 1,
            TimedOutData::KernelLog => 2,
            TimedOutData::Inspect => 3,
            TimedOutData::Channel => 4,
            TimedOutData::ProductInfo => 5,
            TimedOutData::BoardInfo => 6,
            TimedOutData::LastRebootInfo => 7,
            TimedOutData::DeviceId => 8,
        }
    }

    /// The data kind an annotation or attachment key is collected as.
    ///
    /// Keys that are never collected remotely (static and dynamic values,
    /// non-platform annotations) have no kind.
    pub fn for_key(key: &str) -> Option<Self> {
        match key {
            keys::ATTACHMENT_SYSTEM_LOG => Some(TimedOutData::SystemLog),
            keys::ATTACHMENT_KERNEL_LOG => Some(TimedOutData::KernelLog),
            keys::ATTACHMENT_INSPECT => Some(TimedOutData::Inspect),
            keys::ANNOTATION_CHANNEL => Some(TimedOutData::Channel),
            keys::ANNOTATION_PRODUCT_SKU
            | keys::ANNOTATION_PRODUCT_LANGUAGE
            | keys::ANNOTATION_PRODUCT_REGULATORY_DOMAIN
            | keys::ANNOTATION_PRODUCT_LOCALE_LIST
            | keys::ANNOTATION_PRODUCT_NAME
            | keys::ANNOTATION_PRODUCT_MODEL
            | keys::ANNOTATION_PRODUCT_MANUFACTURER => Some(TimedOutData::ProductInfo),
            keys::ANNOTATION_BOARD_NAME | keys::ANNOTATION_BOARD_REVISION => {
                Some(TimedOutData::BoardInfo)
            }
            keys::ANNOTATION_LAST_REBOOT_REASON | keys::ANNOTATION_LAST_REBOOT_UPTIME => {
                Some(TimedOutData::LastRebootInfo)
            }
            keys::ANNOTATION_DEVICE_FEEDBACK_ID => Some(TimedOutData::DeviceId),
            _ => None,
        }
    }
}

// ============================================================================
// SnapshotFlow
// ============================================================================

/// Outcome dimension of the snapshot generation timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFlow {
    Success,
    Failure,
}

impl SnapshotFlow {
    pub fn code(&self) -> u32 {
        match self {
            SnapshotFlow::Success => 1,
            SnapshotFlow::Failure => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_of_one_source_share_a_kind() {
        assert_eq!(
            TimedOutData::for_key(keys::ANNOTATION_BOARD_NAME),
            TimedOutData::for_key(keys::ANNOTATION_BOARD_REVISION)
        );
        assert_eq!(
            TimedOutData::for_key(keys::ANNOTATION_PRODUCT_SKU),
            Some(TimedOutData::ProductInfo)
        );
    }

    #[test]
    fn test_static_keys_have_no_kind() {
        assert_eq!(TimedOutData::for_key(keys::ANNOTATION_BUILD_VERSION), None);
        assert_eq!(TimedOutData::for_key(keys::ATTACHMENT_BUILD_SNAPSHOT), None);
        assert_eq!(TimedOutData::for_key("my.namespace.key"), None);
    }

    #[test]
    fn test_codes_are_unique() {
        let all = [
            TimedOutData::SystemLog,
            TimedOutData::KernelLog,
            TimedOutData::Inspect,
            TimedOutData::Channel,
            TimedOutData::ProductInfo,
            TimedOutData::BoardInfo,
            TimedOutData::LastRebootInfo,
            TimedOutData::DeviceId,
        ];
        let codes: std::collections::BTreeSet<u32> = all.iter().map(|d| d.code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
