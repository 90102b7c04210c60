//! Diagnostic blob sources

use async_trait::async_trait;

use super::RpcError;

/// A log that can be dumped as text (kernel log, system log)
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn collect(&self) -> Result<String, RpcError>;
}

/// Exporter of the structured diagnostic tree.
///
/// `size_hint` is the number of uncompressed bytes the export should stay
/// under; `None` means unbounded.
#[async_trait]
pub trait TreeExporter: Send + Sync {
    async fn export(&self, size_hint: Option<usize>) -> Result<String, RpcError>;
}
