//! Non-platform annotation store
//!
//! Clients register annotations under their own namespace. They are exposed
//! as `"{namespace}.{key}"` and persisted as one JSON document that is
//! rewritten on every accepted upsert and reloaded at startup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use diagd_core::domain::keys::RESERVED_NAMESPACES;
use diagd_core::domain::metrics::NON_PLATFORM_REJECTED_METRIC_ID;
use diagd_core::domain::Annotations;
use diagd_telemetry::MetricsLogger;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on annotations across all namespaces
pub const MAX_NON_PLATFORM_ANNOTATIONS: usize = 30;

/// Why an upsert was not applied or not persisted
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("namespace '{0}' is reserved for platform annotations")]
    ReservedNamespace(String),

    #[error("upsert would hold {requested} annotations, limit is {limit}")]
    TooManyAnnotations { requested: usize, limit: usize },

    #[error("failed to persist annotations: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode annotations: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

/// Namespaced annotations registered by clients
pub struct NonPlatformStore {
    path: PathBuf,
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
    logger: Arc<MetricsLogger>,
}

impl NonPlatformStore {
    /// Opens the store backed by `path`, restoring what was persisted.
    ///
    /// A missing document starts empty; an unreadable one starts empty with
    /// a warning.
    pub fn open(path: &Path, logger: Arc<MetricsLogger>) -> Self {
        let namespaces = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<StoreDocument>(&content) {
                Ok(document) => document.namespaces,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable annotation store");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read annotation store");
                BTreeMap::new()
            }
        };

        let store = Self {
            path: path.to_path_buf(),
            namespaces,
            logger,
        };
        debug!(count = store.len(), "Non-platform annotations restored");
        store
    }

    /// Replaces every annotation of `namespace` with `annotations`.
    ///
    /// Reserved namespaces and upserts exceeding
    /// [`MAX_NON_PLATFORM_ANNOTATIONS`] leave the store unchanged.
    pub fn upsert(
        &mut self,
        namespace: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if RESERVED_NAMESPACES.contains(&namespace) {
            warn!(namespace, "Rejecting annotations for reserved namespace");
            self.logger
                .log_occurrence(NON_PLATFORM_REJECTED_METRIC_ID, vec![]);
            return Err(StoreError::ReservedNamespace(namespace.to_string()));
        }

        let existing = self.namespaces.get(namespace).map_or(0, BTreeMap::len);
        let requested = self.len() - existing + annotations.len();
        if requested > MAX_NON_PLATFORM_ANNOTATIONS {
            warn!(namespace, requested, "Rejecting annotations over the limit");
            self.logger
                .log_occurrence(NON_PLATFORM_REJECTED_METRIC_ID, vec![]);
            return Err(StoreError::TooManyAnnotations {
                requested,
                limit: MAX_NON_PLATFORM_ANNOTATIONS,
            });
        }

        info!(namespace, count = annotations.len(), "Upserting non-platform annotations");
        let mut candidate = self.namespaces.clone();
        candidate.insert(namespace.to_string(), annotations);
        self.persist(&candidate)?;
        self.namespaces = candidate;
        Ok(())
    }

    /// All annotations as `"{namespace}.{key}"`.
    pub fn annotations(&self) -> Annotations {
        self.namespaces
            .iter()
            .flat_map(|(namespace, values)| {
                values
                    .iter()
                    .map(move |(key, value)| (format!("{namespace}.{key}"), Ok(value.clone())))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(
        &self,
        namespaces: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let document = StoreDocument {
            namespaces: namespaces.clone(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }
}
