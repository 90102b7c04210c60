//! Static and dynamic annotations
//!
//! Static annotations are build facts read from files once at startup. A
//! missing or unreadable file yields `MissingValue` for its key. Dynamic
//! annotations are recomputed on every request.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use diagd_core::domain::keys;
use diagd_core::domain::{AnnotationValue, Annotations, ErrorKind};
use tracing::{debug, warn};

use super::format_duration;

/// Annotation key and the file under the build-info directory it is read from
const STATIC_FILES: &[(&str, &str)] = &[
    (keys::ANNOTATION_BUILD_VERSION, "version"),
    (keys::ANNOTATION_BUILD_BOARD, "board"),
    (keys::ANNOTATION_BUILD_PRODUCT, "product"),
    (keys::ANNOTATION_BUILD_LATEST_COMMIT_DATE, "latest-commit-date"),
    (keys::ANNOTATION_DEVICE_BOARD_NAME, "board-name"),
];

const PROC_UPTIME: &str = "/proc/uptime";

/// Reads the allowlisted static annotations from `build_info_dir`.
pub fn static_annotations(build_info_dir: &Path, allowlist: &BTreeSet<String>) -> Annotations {
    STATIC_FILES
        .iter()
        .filter(|(key, _)| allowlist.contains(*key))
        .map(|(key, file)| (key.to_string(), read_trimmed(&build_info_dir.join(file))))
        .collect()
}

/// Computes the allowlisted dynamic annotations.
pub fn dynamic_annotations(allowlist: &BTreeSet<String>) -> Annotations {
    let mut annotations = Annotations::new();

    if allowlist.contains(keys::ANNOTATION_DEVICE_UPTIME) {
        annotations.insert(
            keys::ANNOTATION_DEVICE_UPTIME.to_string(),
            device_uptime(Path::new(PROC_UPTIME)).map(format_duration),
        );
    }
    if allowlist.contains(keys::ANNOTATION_DEVICE_UTC_TIME) {
        annotations.insert(
            keys::ANNOTATION_DEVICE_UTC_TIME.to_string(),
            Ok(Utc::now().to_rfc3339()),
        );
    }

    annotations
}

fn read_trimmed(path: &Path) -> AnnotationValue {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Static annotation file not found");
            Err(ErrorKind::MissingValue)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read static annotation");
            Err(ErrorKind::MissingValue)
        }
    }
}

/// Parses the first field of a `/proc/uptime` style file (seconds, fractional).
fn device_uptime(path: &Path) -> Result<Duration, ErrorKind> {
    let content = std::fs::read_to_string(path).map_err(|_| ErrorKind::MissingValue)?;
    content
        .split_whitespace()
        .next()
        .and_then(|secs| secs.parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or(ErrorKind::MissingValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_static_annotations_read_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("version"), "2026.10.1\n").unwrap();
        std::fs::write(dir.path().join("board"), "").unwrap();

        let annotations = static_annotations(
            dir.path(),
            &allow(&[
                keys::ANNOTATION_BUILD_VERSION,
                keys::ANNOTATION_BUILD_BOARD,
                keys::ANNOTATION_BUILD_PRODUCT,
            ]),
        );

        assert_eq!(annotations.len(), 3);
        assert_eq!(
            annotations[keys::ANNOTATION_BUILD_VERSION],
            Ok("2026.10.1".to_string())
        );
        assert_eq!(annotations[keys::ANNOTATION_BUILD_BOARD], Ok(String::new()));
        assert_eq!(
            annotations[keys::ANNOTATION_BUILD_PRODUCT],
            Err(ErrorKind::MissingValue)
        );
    }

    #[test]
    fn test_static_annotations_respect_allowlist() {
        let dir = tempfile::tempdir().unwrap();
        let annotations = static_annotations(dir.path(), &allow(&[]));
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_device_uptime_parses_proc_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uptime");
        std::fs::write(&path, "3723.45 1000.00\n").unwrap();
        assert_eq!(
            device_uptime(&path).map(format_duration),
            Ok("1h2m3s".to_string())
        );
    }

    #[test]
    fn test_device_uptime_out_of_range_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uptime");
        for value in ["1e300 0.00", "-5.0 1.0", "inf 1.0", "NaN 1.0"] {
            std::fs::write(&path, value).unwrap();
            assert_eq!(device_uptime(&path), Err(ErrorKind::MissingValue), "{value}");
        }
    }

    #[test]
    fn test_device_uptime_garbage_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uptime");
        std::fs::write(&path, "not a number").unwrap();
        assert_eq!(device_uptime(&path), Err(ErrorKind::MissingValue));
    }

    #[test]
    fn test_dynamic_annotations_include_utc_time() {
        let annotations = dynamic_annotations(&allow(&[keys::ANNOTATION_DEVICE_UTC_TIME]));
        assert!(annotations[keys::ANNOTATION_DEVICE_UTC_TIME].is_ok());
        assert!(!annotations.contains_key(keys::ANNOTATION_DEVICE_UPTIME));
    }
}
