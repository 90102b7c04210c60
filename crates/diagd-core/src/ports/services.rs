//! Service directory
//!
//! The host hands the pipeline a directory of the services it could find.
//! Any entry may be missing; callers treat a missing service the same way as
//! one that refused the connection.

use std::sync::Arc;

use super::{
    BoardInfoService, ChannelService, CrashIntake, DeviceIdService, LastRebootInfoService,
    LogSource, ProductInfoService, RpcError, TreeExporter,
};

/// Directory of external collaborators
#[derive(Clone, Default)]
pub struct Services {
    pub board_info: Option<Arc<dyn BoardInfoService>>,
    pub product_info: Option<Arc<dyn ProductInfoService>>,
    pub channel: Option<Arc<dyn ChannelService>>,
    pub device_id: Option<Arc<dyn DeviceIdService>>,
    pub last_reboot_info: Option<Arc<dyn LastRebootInfoService>>,
    pub kernel_log: Option<Arc<dyn LogSource>>,
    pub system_log: Option<Arc<dyn LogSource>>,
    pub tree_exporter: Option<Arc<dyn TreeExporter>>,
    pub crash_intake: Option<Arc<dyn CrashIntake>>,
}

impl Services {
    /// Returns the service or the error a missing service stands for.
    pub fn require<T: ?Sized>(service: &Option<Arc<T>>, name: &str) -> Result<Arc<T>, RpcError> {
        service
            .clone()
            .ok_or_else(|| RpcError::Unavailable(name.to_string()))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("board_info", &self.board_info.is_some())
            .field("product_info", &self.product_info.is_some())
            .field("channel", &self.channel.is_some())
            .field("device_id", &self.device_id.is_some())
            .field("last_reboot_info", &self.last_reboot_info.is_some())
            .field("kernel_log", &self.kernel_log.is_some())
            .field("system_log", &self.system_log.is_some())
            .field("tree_exporter", &self.tree_exporter.is_some())
            .field("crash_intake", &self.crash_intake.is_some())
            .finish()
    }
}
