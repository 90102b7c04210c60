//! Local stand-ins for the remote diagnostic sources
//!
//! When diagd runs standalone, logs and the inspect tree come from files and
//! device facts come from the configuration. A source that is not configured
//! stays out of the service directory, which providers report as a
//! connection error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use diagd_core::config::SourcesConfig;
use diagd_core::domain::RebootLog;
use diagd_core::ports::{
    BoardInfo, BoardInfoService, ChannelService, CrashIntake, DeviceIdService, LogSource,
    ProductInfo, ProductInfoService, RpcError, Services, TreeExporter,
};
use diagd_reboot::RebootLogInfoService;
use tracing::{debug, info};

// ============================================================================
// File-backed sources
// ============================================================================

/// Reads a source file as text; invalid UTF-8 sequences become U+FFFD.
async fn read_source(path: &Path) -> Result<String, RpcError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RpcError::Unavailable(path.display().to_string())
        } else {
            RpcError::Failed(format!("{}: {e}", path.display()))
        }
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Log read from a text file
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn collect(&self) -> Result<String, RpcError> {
        read_source(&self.path).await
    }
}

/// Inspect tree read from an exported JSON file
pub struct FileTreeExporter {
    path: PathBuf,
}

impl FileTreeExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TreeExporter for FileTreeExporter {
    async fn export(&self, size_hint: Option<usize>) -> Result<String, RpcError> {
        let mut tree = read_source(&self.path).await?;
        if let Some(limit) = size_hint {
            if tree.len() > limit {
                let mut end = limit;
                while !tree.is_char_boundary(end) {
                    end -= 1;
                }
                debug!(size = tree.len(), limit, "Truncating inspect export to budget");
                tree.truncate(end);
            }
        }
        Ok(tree)
    }
}

/// Device id kept in a file, generated on first use
pub struct FileDeviceId {
    path: PathBuf,
}

impl FileDeviceId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeviceIdService for FileDeviceId {
    async fn device_id(&self) -> Result<String, RpcError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(id) if !id.trim().is_empty() => return Ok(id.trim().to_string()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RpcError::Failed(e.to_string())),
        }

        let id = uuid::Uuid::new_v4().to_string();
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RpcError::Failed(e.to_string()))?;
        }
        tokio::fs::write(&self.path, &id)
            .await
            .map_err(|e| RpcError::Failed(e.to_string()))?;
        info!(path = %self.path.display(), "Generated device id");
        Ok(id)
    }
}

// ============================================================================
// Configured facts
// ============================================================================

/// Board and product facts taken from the configuration
pub struct ConfiguredFacts {
    board: BoardInfo,
    product: ProductInfo,
}

#[async_trait]
impl BoardInfoService for ConfiguredFacts {
    async fn board_info(&self) -> Result<BoardInfo, RpcError> {
        Ok(self.board.clone())
    }
}

#[async_trait]
impl ProductInfoService for ConfiguredFacts {
    async fn product_info(&self) -> Result<ProductInfo, RpcError> {
        Ok(self.product.clone())
    }
}

/// Update channel taken from the configuration
pub struct ConfiguredChannel(String);

#[async_trait]
impl ChannelService for ConfiguredChannel {
    async fn current_channel(&self) -> Result<String, RpcError> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Service directory
// ============================================================================

/// Builds the service directory from the configured local sources.
///
/// # Arguments
/// * `sources` - Which files and facts are available locally
/// * `reboot_log` - Parsed last reboot, served as last-reboot info
/// * `crash_intake` - Destination for crash reports
pub fn build_services(
    sources: &SourcesConfig,
    reboot_log: &RebootLog,
    crash_intake: Arc<dyn CrashIntake>,
) -> Services {
    let facts = Arc::new(ConfiguredFacts {
        board: BoardInfo {
            name: sources.board_name.clone(),
            revision: sources.board_revision.clone(),
        },
        product: ProductInfo {
            name: sources.product_name.clone(),
            model: sources.product_model.clone(),
            manufacturer: sources.product_manufacturer.clone(),
            ..ProductInfo::default()
        },
    });

    let services = Services {
        board_info: Some(facts.clone()),
        product_info: Some(facts),
        channel: sources
            .channel
            .clone()
            .map(|channel| Arc::new(ConfiguredChannel(channel)) as Arc<dyn ChannelService>),
        device_id: sources
            .device_id_file
            .as_ref()
            .map(|path| Arc::new(FileDeviceId::new(path)) as Arc<dyn DeviceIdService>),
        last_reboot_info: Some(Arc::new(RebootLogInfoService::new(reboot_log))),
        kernel_log: sources
            .kernel_log
            .as_ref()
            .map(|path| Arc::new(FileLogSource::new(path)) as Arc<dyn LogSource>),
        system_log: sources
            .system_log
            .as_ref()
            .map(|path| Arc::new(FileLogSource::new(path)) as Arc<dyn LogSource>),
        tree_exporter: sources
            .inspect_export
            .as_ref()
            .map(|path| Arc::new(FileTreeExporter::new(path)) as Arc<dyn TreeExporter>),
        crash_intake: Some(crash_intake),
    };

    info!(services = ?services, "Local services configured");
    services
}
