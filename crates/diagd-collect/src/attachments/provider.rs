//! Remote attachment providers
//!
//! Attachment providers are single-use: a fresh one is built for every
//! collection and consumed by [`AttachmentProvider::collect`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use diagd_core::domain::keys;
use diagd_core::domain::Attachments;
use diagd_core::ports::{LogSource, Services, TreeExporter};
use tracing::debug;

use crate::deadline::with_deadline;

/// A source of one attachment
pub enum AttachmentProvider {
    KernelLog(Option<Arc<dyn LogSource>>),
    SystemLog(Option<Arc<dyn LogSource>>),
    Inspect {
        exporter: Option<Arc<dyn TreeExporter>>,
        /// Uncompressed byte ceiling handed to the exporter
        size_hint: Option<usize>,
    },
}

impl AttachmentProvider {
    /// Builds the provider for `key`, `None` if no provider collects it.
    ///
    /// # Arguments
    /// * `key` - Attachment key
    /// * `services` - Service directory to take the source from
    /// * `inspect_budget` - Current ceiling for the inspect export
    pub fn for_key(key: &str, services: &Services, inspect_budget: Option<usize>) -> Option<Self> {
        match key {
            keys::ATTACHMENT_KERNEL_LOG => {
                Some(AttachmentProvider::KernelLog(services.kernel_log.clone()))
            }
            keys::ATTACHMENT_SYSTEM_LOG => {
                Some(AttachmentProvider::SystemLog(services.system_log.clone()))
            }
            keys::ATTACHMENT_INSPECT => Some(AttachmentProvider::Inspect {
                exporter: services.tree_exporter.clone(),
                size_hint: inspect_budget,
            }),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            AttachmentProvider::KernelLog(_) => keys::ATTACHMENT_KERNEL_LOG,
            AttachmentProvider::SystemLog(_) => keys::ATTACHMENT_SYSTEM_LOG,
            AttachmentProvider::Inspect { .. } => keys::ATTACHMENT_INSPECT,
        }
    }

    /// Collects the attachment within `timeout`.
    ///
    /// Every provider has a single key, so `_requested` is advisory.
    pub async fn collect(self, timeout: Duration, _requested: &BTreeSet<String>) -> Attachments {
        let key = self.key();
        let value = match self {
            AttachmentProvider::KernelLog(source) => {
                with_deadline(timeout, async {
                    Services::require(&source, "kernel_log")?.collect().await
                })
                .await
            }
            AttachmentProvider::SystemLog(source) => {
                with_deadline(timeout, async {
                    Services::require(&source, "system_log")?.collect().await
                })
                .await
            }
            AttachmentProvider::Inspect {
                exporter,
                size_hint,
            } => {
                debug!(size_hint = ?size_hint, "Requesting inspect export");
                with_deadline(timeout, async {
                    Services::require(&exporter, "tree_exporter")?
                        .export(size_hint)
                        .await
                })
                .await
            }
        };

        Attachments::from([(key.to_string(), value)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagd_core::domain::ErrorKind;

    #[test]
    fn test_unknown_key_has_no_provider() {
        assert!(AttachmentProvider::for_key("other.txt", &Services::default(), None).is_none());
        assert!(AttachmentProvider::for_key(
            keys::ATTACHMENT_BUILD_SNAPSHOT,
            &Services::default(),
            None
        )
        .is_none());
    }

    #[tokio::test]
    async fn test_missing_source_is_connection_error() {
        let provider =
            AttachmentProvider::for_key(keys::ATTACHMENT_SYSTEM_LOG, &Services::default(), None)
                .unwrap();
        let attachments = provider
            .collect(Duration::from_secs(1), &BTreeSet::new())
            .await;

        assert_eq!(
            attachments.get(keys::ATTACHMENT_SYSTEM_LOG),
            Some(&Err(ErrorKind::ConnectionError))
        );
    }
}
