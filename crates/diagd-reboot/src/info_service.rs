//! Last-reboot info service backed by the parsed reboot log

use async_trait::async_trait;
use diagd_core::domain::RebootLog;
use diagd_core::ports::{LastRebootInfo, LastRebootInfoService, RpcError};

/// Answers last-reboot queries from the log parsed at startup
#[derive(Debug, Clone)]
pub struct RebootLogInfoService {
    info: LastRebootInfo,
}

impl RebootLogInfoService {
    pub fn new(reboot_log: &RebootLog) -> Self {
        let reason = reboot_log.reason();
        Self {
            info: LastRebootInfo {
                graceful: reason.optionally_graceful(),
                reason: reason.to_wire(),
                uptime: reboot_log.uptime(),
            },
        }
    }
}

#[async_trait]
impl LastRebootInfoService for RebootLogInfoService {
    async fn last_reboot_info(&self) -> Result<LastRebootInfo, RpcError> {
        Ok(self.info.clone())
    }
}
