//! Annotation collection
//!
//! Annotations come from three places: files read once at startup (static),
//! values computed on every request (dynamic) and remote providers. Clients
//! may also register their own namespaced annotations (non-platform).

mod non_platform;
mod provider;
mod static_data;

use std::time::Duration;

pub use non_platform::{NonPlatformStore, StoreError, MAX_NON_PLATFORM_ANNOTATIONS};
pub use provider::{AnnotationProvider, DeviceIdProvider};
pub use static_data::{dynamic_annotations, static_annotations};

/// Formats a duration as `1d2h3m4s`, leaving out leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
    );

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{seconds}s"));
    out
}
