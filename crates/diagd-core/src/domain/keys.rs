//! Annotation and attachment keys
//!
//! Keys are plain strings so that user-registered (non-platform) annotations
//! can share the same maps as platform ones. The platform keys are fixed here.

// ============================================================================
// Annotation keys
// ============================================================================

pub const ANNOTATION_BOARD_NAME: &str = "hardware.board.name";
pub const ANNOTATION_BOARD_REVISION: &str = "hardware.board.revision";

pub const ANNOTATION_PRODUCT_SKU: &str = "hardware.product.sku";
pub const ANNOTATION_PRODUCT_LANGUAGE: &str = "hardware.product.language";
pub const ANNOTATION_PRODUCT_REGULATORY_DOMAIN: &str = "hardware.product.regulatory-domain";
pub const ANNOTATION_PRODUCT_LOCALE_LIST: &str = "hardware.product.locale-list";
pub const ANNOTATION_PRODUCT_NAME: &str = "hardware.product.name";
pub const ANNOTATION_PRODUCT_MODEL: &str = "hardware.product.model";
pub const ANNOTATION_PRODUCT_MANUFACTURER: &str = "hardware.product.manufacturer";

pub const ANNOTATION_CHANNEL: &str = "system.update-channel.current";
pub const ANNOTATION_DEVICE_FEEDBACK_ID: &str = "device.feedback-id";

pub const ANNOTATION_LAST_REBOOT_REASON: &str = "system.last-reboot.reason";
pub const ANNOTATION_LAST_REBOOT_UPTIME: &str = "system.last-reboot.uptime";

pub const ANNOTATION_BUILD_VERSION: &str = "build.version";
pub const ANNOTATION_BUILD_BOARD: &str = "build.board";
pub const ANNOTATION_BUILD_PRODUCT: &str = "build.product";
pub const ANNOTATION_BUILD_LATEST_COMMIT_DATE: &str = "build.latest-commit-date";
pub const ANNOTATION_DEVICE_BOARD_NAME: &str = "device.board-name";

pub const ANNOTATION_DEVICE_UPTIME: &str = "device.uptime";
pub const ANNOTATION_DEVICE_UTC_TIME: &str = "device.utc-time";

// ============================================================================
// Attachment keys
// ============================================================================

pub const ATTACHMENT_KERNEL_LOG: &str = "log.kernel.txt";
pub const ATTACHMENT_SYSTEM_LOG: &str = "log.system.txt";
pub const ATTACHMENT_INSPECT: &str = "inspect.json";
pub const ATTACHMENT_BUILD_SNAPSHOT: &str = "build.snapshot.xml";
pub const ATTACHMENT_PREVIOUS_SYSTEM_LOG: &str = "log.system.previous_boot.txt";

/// Every platform annotation key, the default annotation allowlist.
pub const PLATFORM_ANNOTATION_KEYS: &[&str] = &[
    ANNOTATION_BOARD_NAME,
    ANNOTATION_BOARD_REVISION,
    ANNOTATION_PRODUCT_SKU,
    ANNOTATION_PRODUCT_LANGUAGE,
    ANNOTATION_PRODUCT_REGULATORY_DOMAIN,
    ANNOTATION_PRODUCT_LOCALE_LIST,
    ANNOTATION_PRODUCT_NAME,
    ANNOTATION_PRODUCT_MODEL,
    ANNOTATION_PRODUCT_MANUFACTURER,
    ANNOTATION_CHANNEL,
    ANNOTATION_DEVICE_FEEDBACK_ID,
    ANNOTATION_LAST_REBOOT_REASON,
    ANNOTATION_LAST_REBOOT_UPTIME,
    ANNOTATION_BUILD_VERSION,
    ANNOTATION_BUILD_BOARD,
    ANNOTATION_BUILD_PRODUCT,
    ANNOTATION_BUILD_LATEST_COMMIT_DATE,
    ANNOTATION_DEVICE_BOARD_NAME,
    ANNOTATION_DEVICE_UPTIME,
    ANNOTATION_DEVICE_UTC_TIME,
];

/// Every platform attachment key, the default attachment allowlist.
pub const PLATFORM_ATTACHMENT_KEYS: &[&str] = &[
    ATTACHMENT_KERNEL_LOG,
    ATTACHMENT_SYSTEM_LOG,
    ATTACHMENT_INSPECT,
    ATTACHMENT_BUILD_SNAPSHOT,
    ATTACHMENT_PREVIOUS_SYSTEM_LOG,
];

/// Namespaces user-registered annotations may not use.
pub const RESERVED_NAMESPACES: &[&str] = &["build", "device", "hardware", "misc", "system"];
