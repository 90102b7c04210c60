//! Remote annotation providers
//!
//! The provider set is closed, so it is an enum dispatched through a single
//! [`AnnotationProvider::collect`]. Multi-key providers only fetch the keys
//! that were requested; single-key providers always fetch theirs.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use diagd_core::domain::keys;
use diagd_core::domain::values::all_errors;
use diagd_core::domain::{AnnotationValue, Annotations, ErrorKind};
use diagd_core::ports::{
    BoardInfoService, ChannelService, DeviceIdService, LastRebootInfoService, ProductInfoService,
    Services,
};
use tokio::sync::OnceCell;
use tracing::debug;

use super::format_duration;
use crate::deadline::with_deadline;

const BOARD_INFO_KEYS: &[&str] = &[keys::ANNOTATION_BOARD_NAME, keys::ANNOTATION_BOARD_REVISION];

const PRODUCT_INFO_KEYS: &[&str] = &[
    keys::ANNOTATION_PRODUCT_SKU,
    keys::ANNOTATION_PRODUCT_LANGUAGE,
    keys::ANNOTATION_PRODUCT_REGULATORY_DOMAIN,
    keys::ANNOTATION_PRODUCT_LOCALE_LIST,
    keys::ANNOTATION_PRODUCT_NAME,
    keys::ANNOTATION_PRODUCT_MODEL,
    keys::ANNOTATION_PRODUCT_MANUFACTURER,
];

const CHANNEL_KEYS: &[&str] = &[keys::ANNOTATION_CHANNEL];

const DEVICE_ID_KEYS: &[&str] = &[keys::ANNOTATION_DEVICE_FEEDBACK_ID];

const LAST_REBOOT_KEYS: &[&str] = &[
    keys::ANNOTATION_LAST_REBOOT_REASON,
    keys::ANNOTATION_LAST_REBOOT_UPTIME,
];

/// Device id source that remembers the first id it read
pub struct DeviceIdProvider {
    service: Option<Arc<dyn DeviceIdService>>,
    cached: OnceCell<String>,
}

impl DeviceIdProvider {
    pub fn new(service: Option<Arc<dyn DeviceIdService>>) -> Self {
        Self {
            service,
            cached: OnceCell::new(),
        }
    }

    async fn device_id(&self, timeout: Duration) -> AnnotationValue {
        if let Some(id) = self.cached.get() {
            return Ok(id.clone());
        }

        let id = with_deadline(timeout, async {
            Services::require(&self.service, "device_id")?
                .device_id()
                .await
        })
        .await?;

        // A concurrent caller may have won the race; both read the same id.
        let _ = self.cached.set(id.clone());
        Ok(id)
    }
}

/// A source of platform annotations
pub enum AnnotationProvider {
    BoardInfo(Option<Arc<dyn BoardInfoService>>),
    ProductInfo(Option<Arc<dyn ProductInfoService>>),
    Channel(Option<Arc<dyn ChannelService>>),
    DeviceId(DeviceIdProvider),
    LastReboot(Option<Arc<dyn LastRebootInfoService>>),
}

impl AnnotationProvider {
    /// Builds one provider of each kind from the service directory.
    pub fn all(services: &Services) -> Vec<Self> {
        vec![
            AnnotationProvider::BoardInfo(services.board_info.clone()),
            AnnotationProvider::ProductInfo(services.product_info.clone()),
            AnnotationProvider::Channel(services.channel.clone()),
            AnnotationProvider::DeviceId(DeviceIdProvider::new(services.device_id.clone())),
            AnnotationProvider::LastReboot(services.last_reboot_info.clone()),
        ]
    }

    /// Keys this provider can produce.
    pub fn supported_keys(&self) -> &'static [&'static str] {
        match self {
            AnnotationProvider::BoardInfo(_) => BOARD_INFO_KEYS,
            AnnotationProvider::ProductInfo(_) => PRODUCT_INFO_KEYS,
            AnnotationProvider::Channel(_) => CHANNEL_KEYS,
            AnnotationProvider::DeviceId(_) => DEVICE_ID_KEYS,
            AnnotationProvider::LastReboot(_) => LAST_REBOOT_KEYS,
        }
    }

    /// Collects the provider's annotations within `timeout`.
    ///
    /// Multi-key providers return only keys present in `requested` and skip
    /// the remote call when none are. Single-key providers ignore `requested`.
    pub async fn collect(&self, timeout: Duration, requested: &BTreeSet<String>) -> Annotations {
        let supported = self.supported_keys();
        if supported.len() > 1 && !supported.iter().any(|key| requested.contains(*key)) {
            return Annotations::new();
        }

        let wanted: Vec<&str> = if supported.len() == 1 {
            supported.to_vec()
        } else {
            supported
                .iter()
                .copied()
                .filter(|key| requested.contains(*key))
                .collect()
        };

        let mut annotations = match self {
            AnnotationProvider::BoardInfo(service) => board_info(service, timeout).await,
            AnnotationProvider::ProductInfo(service) => product_info(service, timeout).await,
            AnnotationProvider::Channel(service) => channel(service, timeout).await,
            AnnotationProvider::DeviceId(provider) => Annotations::from([(
                keys::ANNOTATION_DEVICE_FEEDBACK_ID.to_string(),
                provider.device_id(timeout).await,
            )]),
            AnnotationProvider::LastReboot(service) => last_reboot(service, timeout).await,
        };

        annotations.retain(|key, _| wanted.contains(&key.as_str()));
        debug!(count = annotations.len(), "Collected annotations from provider");
        annotations
    }
}

fn field(value: Option<String>) -> AnnotationValue {
    value.ok_or(ErrorKind::MissingValue)
}

async fn board_info(service: &Option<Arc<dyn BoardInfoService>>, timeout: Duration) -> Annotations {
    let info = with_deadline(timeout, async {
        Services::require(service, "board_info")?.board_info().await
    })
    .await;

    match info {
        Ok(info) => Annotations::from([
            (keys::ANNOTATION_BOARD_NAME.to_string(), field(info.name)),
            (keys::ANNOTATION_BOARD_REVISION.to_string(), field(info.revision)),
        ]),
        Err(error) => all_errors(BOARD_INFO_KEYS.iter().copied(), error),
    }
}

async fn product_info(
    service: &Option<Arc<dyn ProductInfoService>>,
    timeout: Duration,
) -> Annotations {
    let info = with_deadline(timeout, async {
        Services::require(service, "product_info")?.product_info().await
    })
    .await;

    match info {
        Ok(info) => Annotations::from([
            (keys::ANNOTATION_PRODUCT_SKU.to_string(), field(info.sku)),
            (keys::ANNOTATION_PRODUCT_LANGUAGE.to_string(), field(info.language)),
            (
                keys::ANNOTATION_PRODUCT_REGULATORY_DOMAIN.to_string(),
                field(info.regulatory_domain),
            ),
            (
                keys::ANNOTATION_PRODUCT_LOCALE_LIST.to_string(),
                field(info.locale_list.map(|locales| locales.join(", "))),
            ),
            (keys::ANNOTATION_PRODUCT_NAME.to_string(), field(info.name)),
            (keys::ANNOTATION_PRODUCT_MODEL.to_string(), field(info.model)),
            (
                keys::ANNOTATION_PRODUCT_MANUFACTURER.to_string(),
                field(info.manufacturer),
            ),
        ]),
        Err(error) => all_errors(PRODUCT_INFO_KEYS.iter().copied(), error),
    }
}

async fn channel(service: &Option<Arc<dyn ChannelService>>, timeout: Duration) -> Annotations {
    let value = with_deadline(timeout, async {
        Services::require(service, "channel")?.current_channel().await
    })
    .await;

    Annotations::from([(keys::ANNOTATION_CHANNEL.to_string(), value)])
}

async fn last_reboot(
    service: &Option<Arc<dyn LastRebootInfoService>>,
    timeout: Duration,
) -> Annotations {
    let info = with_deadline(timeout, async {
        Services::require(service, "last_reboot_info")?
            .last_reboot_info()
            .await
    })
    .await;

    match info {
        Ok(info) => Annotations::from([
            (
                keys::ANNOTATION_LAST_REBOOT_REASON.to_string(),
                field(info.reason.map(|reason| reason.as_str().to_string())),
            ),
            (
                keys::ANNOTATION_LAST_REBOOT_UPTIME.to_string(),
                field(info.uptime.map(format_duration)),
            ),
        ]),
        Err(error) => all_errors(LAST_REBOOT_KEYS.iter().copied(), error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_service_is_connection_error() {
        let provider = AnnotationProvider::BoardInfo(None);
        let annotations = provider
            .collect(Duration::from_secs(1), &requested(BOARD_INFO_KEYS))
            .await;

        assert_eq!(annotations.len(), 2);
        assert!(annotations
            .values()
            .all(|value| *value == Err(ErrorKind::ConnectionError)));
    }

    #[tokio::test]
    async fn test_multi_key_provider_returns_only_requested_keys() {
        let provider = AnnotationProvider::ProductInfo(None);
        let annotations = provider
            .collect(
                Duration::from_secs(1),
                &requested(&[keys::ANNOTATION_PRODUCT_SKU, "unrelated.key"]),
            )
            .await;

        assert_eq!(
            annotations.keys().collect::<Vec<_>>(),
            vec![keys::ANNOTATION_PRODUCT_SKU]
        );
    }

    #[tokio::test]
    async fn test_single_key_provider_ignores_request() {
        let provider = AnnotationProvider::Channel(None);
        let annotations = provider.collect(Duration::from_secs(1), &requested(&[])).await;

        assert_eq!(
            annotations.get(keys::ANNOTATION_CHANNEL),
            Some(&Err(ErrorKind::ConnectionError))
        );
    }

    #[tokio::test]
    async fn test_multi_key_provider_without_requested_keys_is_empty() {
        let provider = AnnotationProvider::LastReboot(None);
        let annotations = provider
            .collect(Duration::from_secs(1), &requested(&["other"]))
            .await;
        assert!(annotations.is_empty());
    }
}
