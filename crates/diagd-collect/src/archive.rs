//! Snapshot archive
//!
//! An archive bundles one collection into named, lz4-compressed entries:
//! `annotations.json` with every collected annotation, `metadata.json` with
//! the error kind of every missing value, and one entry per collected
//! attachment. The compressed entry sizes drive the inspect budget.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use diagd_core::domain::{Annotations, Attachments, ErrorKind};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const ANNOTATIONS_ENTRY: &str = "annotations.json";
pub const METADATA_ENTRY: &str = "metadata.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Version of the metadata layout
pub const SNAPSHOT_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    snapshot_version: String,
    annotation_errors: BTreeMap<String, ErrorKind>,
    attachment_errors: BTreeMap<String, ErrorKind>,
}

/// Entry listing written next to the entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: String,
    /// Entry name → compressed size in bytes
    pub entries: BTreeMap<String, usize>,
}

/// Compressed snapshot entries
#[derive(Debug, Clone)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    /// Serializes and compresses one collection.
    pub fn build(annotations: &Annotations, attachments: &Attachments) -> anyhow::Result<Self> {
        let present: BTreeMap<&str, &str> = annotations
            .iter()
            .filter_map(|(key, value)| value.as_ref().ok().map(|v| (key.as_str(), v.as_str())))
            .collect();

        let metadata = Metadata {
            snapshot_version: SNAPSHOT_VERSION.to_string(),
            annotation_errors: errors_of(annotations),
            attachment_errors: errors_of(attachments),
        };

        let mut entries = BTreeMap::new();
        entries.insert(
            ANNOTATIONS_ENTRY.to_string(),
            compress_prepend_size(&serde_json::to_vec_pretty(&present)?),
        );
        entries.insert(
            METADATA_ENTRY.to_string(),
            compress_prepend_size(&serde_json::to_vec_pretty(&metadata)?),
        );
        for (key, value) in attachments {
            if let Ok(content) = value {
                entries.insert(key.clone(), compress_prepend_size(content.as_bytes()));
            }
        }

        Ok(Self { entries })
    }

    /// Entry name → compressed size in bytes.
    pub fn compressed_sizes(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|(name, data)| (name.clone(), data.len()))
            .collect()
    }

    pub fn total_compressed_bytes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Decompresses one entry, `None` if the archive has no such entry.
    pub fn read_entry(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.entries
            .get(name)
            .map(|data| {
                decompress_size_prepended(data)
                    .with_context(|| format!("Corrupt archive entry {name}"))
            })
            .transpose()
    }

    /// Writes the archive into a fresh `snapshot-<timestamp>` directory under `dir`.
    ///
    /// Returns the directory created.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let now = Utc::now();
        let target = dir.join(format!("snapshot-{}", now.format("%Y%m%dT%H%M%S%.6fZ")));
        std::fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;

        for (name, data) in &self.entries {
            let path = target.join(format!("{name}.lz4"));
            std::fs::write(&path, data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let manifest = Manifest {
            created_at: now.to_rfc3339(),
            entries: self.compressed_sizes(),
        };
        std::fs::write(
            target.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        info!(
            path = %target.display(),
            entries = self.entries.len(),
            compressed_bytes = self.total_compressed_bytes(),
            "Snapshot archive written"
        );
        Ok(target)
    }
}

fn errors_of(values: &BTreeMap<String, Result<String, ErrorKind>>) -> BTreeMap<String, ErrorKind> {
    values
        .iter()
        .filter_map(|(key, value)| value.as_ref().err().map(|e| (key.clone(), *e)))
        .collect()
}
