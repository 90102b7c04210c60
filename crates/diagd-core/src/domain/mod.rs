//! Domain types and pure logic
//!
//! - Typed value errors shared by every provider
//! - Annotation and attachment keys and values
//! - Metric events and the fixed metric id registry
//! - Reboot reasons, their derived properties and reboot log parsing

pub mod errors;
pub mod event;
pub mod keys;
pub mod metrics;
pub mod reboot_log;
pub mod reboot_reason;
pub mod values;

// Re-export commonly used types
pub use errors::ErrorKind;
pub use event::{Event, EventKind};
pub use metrics::TimedOutData;
pub use reboot_log::{parse_reboot_log, RebootLog};
pub use reboot_reason::{RebootReason, WireRebootReason};
pub use values::{AnnotationValue, Annotations, AttachmentValue, Attachments};
