//! Static attachments
//!
//! Files that do not change during the lifetime of the process, read once at
//! startup and served from memory afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use diagd_core::domain::keys;
use diagd_core::domain::{AttachmentValue, Attachments, ErrorKind};
use tracing::{debug, info, warn};

/// Cached static attachments and the files backing them
#[derive(Debug, Default)]
pub struct StaticAttachments {
    values: Attachments,
    paths: BTreeMap<String, PathBuf>,
}

impl StaticAttachments {
    /// Reads the allowlisted static attachments.
    ///
    /// # Arguments
    /// * `build_info_dir` - Directory holding `snapshot.xml`
    /// * `previous_boot_log` - Log persisted by the previous boot
    /// * `allowlist` - Attachment keys that may be served
    pub fn load(
        build_info_dir: &Path,
        previous_boot_log: &Path,
        allowlist: &BTreeSet<String>,
    ) -> Self {
        let sources = [
            (
                keys::ATTACHMENT_BUILD_SNAPSHOT,
                build_info_dir.join("snapshot.xml"),
            ),
            (
                keys::ATTACHMENT_PREVIOUS_SYSTEM_LOG,
                previous_boot_log.to_path_buf(),
            ),
        ];

        let mut attachments = Self::default();
        for (key, path) in sources {
            if !allowlist.contains(key) {
                continue;
            }
            attachments.values.insert(key.to_string(), read(&path));
            attachments.paths.insert(key.to_string(), path);
        }
        attachments
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn values(&self) -> &Attachments {
        &self.values
    }

    /// Replaces the attachment with `error` and deletes its backing file.
    ///
    /// Returns `false` if `key` is not a static attachment.
    pub fn drop_attachment(&mut self, key: &str, error: ErrorKind) -> bool {
        let Some(value) = self.values.get_mut(key) else {
            warn!(key, "Not a static attachment, nothing to drop");
            return false;
        };
        *value = Err(error);

        if let Some(path) = self.paths.get(key) {
            match std::fs::remove_file(path) {
                Ok(()) => info!(key, path = %path.display(), "Dropped static attachment"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(key, path = %path.display(), error = %e, "Failed to delete static attachment"),
            }
        }
        true
    }
}

/// Reads a file as text; invalid UTF-8 sequences become U+FFFD.
fn read(path: &Path) -> AttachmentValue {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Static attachment unavailable");
            Err(ErrorKind::MissingValue)
        }
    }
}
