//! Datastore
//!
//! Produces merged annotation and attachment maps under one shared
//! deadline. Every collector is started concurrently and the request
//! resolves once all of them have (join, not race): a stuck source costs
//! exactly the deadline and never delays the others.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use diagd_core::config::{BudgetConfig, DatastoreConfig};
use diagd_core::domain::metrics::TIMED_OUT_DATA_METRIC_ID;
use diagd_core::domain::{Annotations, Attachments, ErrorKind, TimedOutData};
use diagd_core::ports::Services;
use diagd_telemetry::MetricsLogger;
use futures_util::future::join_all;
use tracing::{debug, info};

use crate::annotations::{
    dynamic_annotations, static_annotations, AnnotationProvider, NonPlatformStore, StoreError,
};
use crate::attachments::{AttachmentProvider, StaticAttachments};
use crate::budget::InspectDataBudget;

/// Aggregates every diagnostic source
pub struct Datastore {
    services: Services,
    annotation_allowlist: BTreeSet<String>,
    attachment_allowlist: BTreeSet<String>,
    static_annotations: Annotations,
    static_attachments: StaticAttachments,
    providers: Vec<AnnotationProvider>,
    non_platform: NonPlatformStore,
    budget: InspectDataBudget,
    logger: Arc<MetricsLogger>,
}

impl Datastore {
    /// Creates the datastore, reading static data once.
    ///
    /// # Arguments
    /// * `config` - Allowlists and static file locations
    /// * `budget` - Inspect budget settings
    /// * `services` - Remote sources; missing entries read as connection errors
    /// * `logger` - Destination for timeout and budget metrics
    pub fn new(
        config: &DatastoreConfig,
        budget: &BudgetConfig,
        services: Services,
        logger: Arc<MetricsLogger>,
    ) -> Self {
        let annotation_allowlist: BTreeSet<String> =
            config.annotation_allowlist.iter().cloned().collect();
        let attachment_allowlist: BTreeSet<String> =
            config.attachment_allowlist.iter().cloned().collect();

        let static_annotations = static_annotations(&config.build_info_dir, &annotation_allowlist);
        let static_attachments = StaticAttachments::load(
            &config.build_info_dir,
            &config.previous_boot_log,
            &attachment_allowlist,
        );

        info!(
            annotations = annotation_allowlist.len(),
            attachments = attachment_allowlist.len(),
            services = ?services,
            "Datastore initialized"
        );

        Self {
            providers: AnnotationProvider::all(&services),
            non_platform: NonPlatformStore::open(&config.non_platform_store, Arc::clone(&logger)),
            budget: InspectDataBudget::new(budget, Arc::clone(&logger)),
            services,
            annotation_allowlist,
            attachment_allowlist,
            static_annotations,
            static_attachments,
            logger,
        }
    }

    /// Collects every allowlisted annotation plus the non-platform ones.
    pub async fn get_annotations(&self, timeout: Duration) -> Annotations {
        let mut annotations = self.static_annotations.clone();
        annotations.extend(dynamic_annotations(&self.annotation_allowlist));

        let collected = join_all(
            self.providers
                .iter()
                .map(|provider| provider.collect(timeout, &self.annotation_allowlist)),
        )
        .await;

        let mut remote = Annotations::new();
        for batch in collected {
            remote.extend(batch);
        }
        remote.retain(|key, _| self.annotation_allowlist.contains(key));
        self.log_timeouts(&remote);

        annotations.extend(remote);
        annotations.extend(self.non_platform.annotations());
        debug!(count = annotations.len(), "Annotations collected");
        annotations
    }

    /// Collects every allowlisted attachment.
    pub async fn get_attachments(&self, timeout: Duration) -> Attachments {
        let mut attachments = self.static_attachments.values().clone();

        let inspect_budget = self.budget.size_in_bytes();
        let providers: Vec<AttachmentProvider> = self
            .attachment_allowlist
            .iter()
            .filter(|key| !self.static_attachments.contains(key))
            .filter_map(|key| AttachmentProvider::for_key(key, &self.services, inspect_budget))
            .collect();

        let collected = join_all(
            providers
                .into_iter()
                .map(|provider| provider.collect(timeout, &self.attachment_allowlist)),
        )
        .await;

        let mut remote = Attachments::new();
        for batch in collected {
            remote.extend(batch);
        }
        self.log_timeouts(&remote);

        attachments.extend(remote);
        debug!(count = attachments.len(), "Attachments collected");
        attachments
    }

    /// Stops serving a static attachment and deletes its file.
    pub fn drop_static_attachment(&mut self, key: &str, error: ErrorKind) {
        self.static_attachments.drop_attachment(key, error);
    }

    /// Feeds the compressed entry sizes of the last archive to the budget.
    pub fn update_budget(&mut self, compressed_sizes: &BTreeMap<String, usize>) {
        self.budget.update(compressed_sizes);
    }

    pub fn inspect_budget(&self) -> &InspectDataBudget {
        &self.budget
    }

    /// Registers client annotations under `namespace`.
    pub fn upsert_non_platform(
        &mut self,
        namespace: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.non_platform.upsert(namespace, annotations)
    }

    /// Logs one timeout occurrence per distinct data kind.
    fn log_timeouts(&self, values: &BTreeMap<String, Result<String, ErrorKind>>) {
        let timed_out: BTreeSet<TimedOutData> = values
            .iter()
            .filter(|(_, value)| **value == Err(ErrorKind::Timeout))
            .filter_map(|(key, _)| TimedOutData::for_key(key))
            .collect();

        for data in timed_out {
            debug!(data = ?data, "Collection timed out");
            self.logger
                .log_occurrence(TIMED_OUT_DATA_METRIC_ID, vec![data.code()]);
        }
    }
}
