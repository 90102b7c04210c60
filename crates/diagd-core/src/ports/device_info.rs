//! Device fact services
//!
//! Small request/response services answering with device, product and boot
//! facts. Optional fields model a service that answered without the field:
//! providers turn such a hole into `ErrorKind::MissingValue`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RpcError;
use crate::domain::WireRebootReason;

/// Board identification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    pub name: Option<String>,
    pub revision: Option<String>,
}

/// Product identification and regional settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub sku: Option<String>,
    pub language: Option<String>,
    pub regulatory_domain: Option<String>,
    pub locale_list: Option<Vec<String>>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
}

/// What the last-reboot service knows about the previous boot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastRebootInfo {
    pub graceful: Option<bool>,
    pub reason: Option<WireRebootReason>,
    pub uptime: Option<Duration>,
}

#[async_trait]
pub trait BoardInfoService: Send + Sync {
    async fn board_info(&self) -> Result<BoardInfo, RpcError>;
}

#[async_trait]
pub trait ProductInfoService: Send + Sync {
    async fn product_info(&self) -> Result<ProductInfo, RpcError>;
}

#[async_trait]
pub trait ChannelService: Send + Sync {
    /// Returns the current update channel.
    async fn current_channel(&self) -> Result<String, RpcError>;
}

#[async_trait]
pub trait DeviceIdService: Send + Sync {
    /// Returns the stable feedback id of this device.
    async fn device_id(&self) -> Result<String, RpcError>;
}

#[async_trait]
pub trait LastRebootInfoService: Send + Sync {
    async fn last_reboot_info(&self) -> Result<LastRebootInfo, RpcError>;
}
