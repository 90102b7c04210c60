//! Configuration module for diagd.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::keys;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for diagd.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub datastore: DatastoreConfig,
    pub budget: BudgetConfig,
    pub reboot: RebootConfig,
    pub snapshot: SnapshotConfig,
    pub sources: SourcesConfig,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Metrics logger and exposition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Maximum number of events waiting for acknowledgement.
    pub queue_capacity: usize,
    /// First reconnection delay, in milliseconds.
    pub backoff_initial_ms: u64,
    /// Multiplier applied to the delay after every failed attempt.
    pub backoff_factor: u32,
    /// Upper bound for the reconnection delay, in seconds.
    pub backoff_max_secs: u64,
    /// Whether to serve `/metrics` for Prometheus scraping.
    pub server_enabled: bool,
    /// Address for the `/metrics` endpoint.
    pub server_endpoint: String,
}

/// Diagnostic collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    /// Annotation keys that may appear in a snapshot.
    pub annotation_allowlist: Vec<String>,
    /// Attachment keys that may appear in a snapshot.
    pub attachment_allowlist: Vec<String>,
    /// Shared deadline for one collection, in seconds.
    pub collection_timeout_secs: u64,
    /// Directory holding the static build files (`version`, `board`, `product`, ...).
    pub build_info_dir: PathBuf,
    /// Log persisted by the previous boot.
    pub previous_boot_log: PathBuf,
    /// JSON document holding user-registered annotations.
    pub non_platform_store: PathBuf,
}

/// Adaptive inspect budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub enabled: bool,
    pub min_bytes: usize,
    pub max_bytes: usize,
    /// Desired compressed size of a whole snapshot archive.
    pub target_archive_bytes: usize,
}

/// Reboot classification and reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    /// Record left by the kernel on an unplanned reboot.
    pub unplanned_log: PathBuf,
    /// Record left on a cooperative shutdown.
    pub graceful_reason: PathBuf,
    /// Marker whose absence means the data partition was wiped.
    pub not_a_fdr_marker: PathBuf,
    /// Marker whose presence means this boot was already reported.
    pub has_reported_marker: PathBuf,
    /// Delay before filing a crash report, in seconds.
    pub crash_report_delay_secs: u64,
    /// Directory where the local crash intake stores reports.
    pub reports_dir: PathBuf,
}

/// Snapshot production settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory snapshots are written to.
    pub output_dir: PathBuf,
    /// Seconds between two snapshots.
    pub interval_secs: u64,
}

/// Local stand-ins for the remote data sources, used by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub kernel_log: Option<PathBuf>,
    pub system_log: Option<PathBuf>,
    pub inspect_export: Option<PathBuf>,
    pub board_name: Option<String>,
    pub board_revision: Option<String>,
    pub product_name: Option<String>,
    pub product_model: Option<String>,
    pub product_manufacturer: Option<String>,
    pub channel: Option<String>,
    pub device_id_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/diagd/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("diagd")
            .join("config.yaml")
    }
}

impl MetricsConfig {
    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

impl DatastoreConfig {
    pub fn collection_timeout(&self) -> Duration {
        Duration::from_secs(self.collection_timeout_secs)
    }
}

impl RebootConfig {
    pub fn crash_report_delay(&self) -> Duration {
        Duration::from_secs(self.crash_report_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("diagd")
}

fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("~/.cache"))
        .join("diagd")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 500,
            backoff_initial_ms: 100,
            backoff_factor: 2,
            backoff_max_secs: 600,
            server_enabled: true,
            server_endpoint: "127.0.0.1:9464".to_string(),
        }
    }
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            annotation_allowlist: keys::PLATFORM_ANNOTATION_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            attachment_allowlist: keys::PLATFORM_ATTACHMENT_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            collection_timeout_secs: 30,
            build_info_dir: PathBuf::from("/config/build-info"),
            previous_boot_log: cache_dir().join("previous_boot_log.txt"),
            non_platform_store: data_dir().join("non_platform_annotations.json"),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_bytes: 4 * 1024 * 1024,
            max_bytes: 20 * 1024 * 1024,
            target_archive_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            unplanned_log: PathBuf::from("/boot/log/last-panic.txt"),
            graceful_reason: cache_dir().join("graceful_reboot_reason.txt"),
            not_a_fdr_marker: data_dir().join("not_a_fdr.txt"),
            has_reported_marker: std::env::temp_dir().join("diagd").join("has_reported.txt"),
            crash_report_delay_secs: 90,
            reports_dir: data_dir().join("reports"),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            output_dir: data_dir().join("snapshots"),
            interval_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"budget.min_bytes"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- metrics ---
        if self.metrics.queue_capacity == 0 {
            errors.push(ValidationError {
                field: "metrics.queue_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.metrics.backoff_initial_ms == 0 {
            errors.push(ValidationError {
                field: "metrics.backoff_initial_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.metrics.backoff_factor < 1 {
            errors.push(ValidationError {
                field: "metrics.backoff_factor".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.metrics.backoff_initial() > self.metrics.backoff_max() {
            errors.push(ValidationError {
                field: "metrics.backoff_max_secs".into(),
                message: "must not be shorter than backoff_initial_ms".into(),
            });
        }

        // --- datastore ---
        if self.datastore.collection_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "datastore.collection_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- budget ---
        if self.budget.enabled {
            if self.budget.min_bytes > self.budget.max_bytes {
                errors.push(ValidationError {
                    field: "budget.min_bytes".into(),
                    message: format!(
                        "min_bytes ({}) must not exceed max_bytes ({})",
                        self.budget.min_bytes, self.budget.max_bytes
                    ),
                });
            }
            if self.budget.target_archive_bytes == 0 {
                errors.push(ValidationError {
                    field: "budget.target_archive_bytes".into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        // --- snapshot ---
        if self.snapshot.interval_secs == 0 {
            errors.push(ValidationError {
                field: "snapshot.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use diagd_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .collection_timeout_secs(10)
///     .budget_enabled(false)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.metrics.queue_capacity = capacity;
        self
    }

    pub fn collection_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.datastore.collection_timeout_secs = seconds;
        self
    }

    pub fn budget_enabled(mut self, enabled: bool) -> Self {
        self.config.budget.enabled = enabled;
        self
    }

    pub fn budget_bounds(mut self, min_bytes: usize, max_bytes: usize) -> Self {
        self.config.budget.min_bytes = min_bytes;
        self.config.budget.max_bytes = max_bytes;
        self
    }

    pub fn budget_target(mut self, target_archive_bytes: usize) -> Self {
        self.config.budget.target_archive_bytes = target_archive_bytes;
        self
    }

    /// Points every on-disk path of the reboot and datastore sections into `dir`.
    pub fn state_dir(mut self, dir: &Path) -> Self {
        self.config.datastore.build_info_dir = dir.join("build-info");
        self.config.datastore.previous_boot_log = dir.join("previous_boot_log.txt");
        self.config.datastore.non_platform_store = dir.join("non_platform_annotations.json");
        self.config.reboot.unplanned_log = dir.join("last-panic.txt");
        self.config.reboot.graceful_reason = dir.join("graceful_reboot_reason.txt");
        self.config.reboot.not_a_fdr_marker = dir.join("not_a_fdr.txt");
        self.config.reboot.has_reported_marker = dir.join("has_reported.txt");
        self.config.reboot.reports_dir = dir.join("reports");
        self.config.snapshot.output_dir = dir.join("snapshots");
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.metrics.queue_capacity, 500);
        assert_eq!(cfg.metrics.backoff_initial(), Duration::from_millis(100));
        assert_eq!(cfg.metrics.backoff_factor, 2);
        assert_eq!(cfg.datastore.collection_timeout(), Duration::from_secs(30));
        assert!(cfg.budget.enabled);
        assert!(cfg.budget.min_bytes <= cfg.budget.max_bytes);
        assert_eq!(cfg.reboot.crash_report_delay(), Duration::from_secs(90));
        assert_eq!(
            cfg.datastore.annotation_allowlist.len(),
            keys::PLATFORM_ANNOTATION_KEYS.len()
        );
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn load_from_yaml_file_with_partial_sections() {
        let yaml = r#"
logging:
  level: debug
metrics:
  queue_capacity: 10
budget:
  enabled: false
datastore:
  attachment_allowlist:
    - inspect.json
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.metrics.queue_capacity, 10);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.metrics.backoff_factor, 2);
        assert!(!cfg.budget.enabled);
        assert_eq!(cfg.datastore.attachment_allowlist, vec!["inspect.json"]);
        assert_eq!(cfg.snapshot.interval_secs, 3600);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/diagd.yaml"));
        assert_eq!(cfg.metrics.queue_capacity, 500);
    }

    #[test]
    fn validation_reports_every_problem() {
        let result = ConfigBuilder::new()
            .logging_level("loud")
            .queue_capacity(0)
            .budget_bounds(10, 5)
            .build_validated();
        let errors = result.unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"logging.level"));
        assert!(fields.contains(&"metrics.queue_capacity"));
        assert!(fields.contains(&"budget.min_bytes"));
    }

    #[test]
    fn disabled_budget_skips_bound_checks() {
        let result = ConfigBuilder::new()
            .budget_enabled(false)
            .budget_bounds(10, 5)
            .build_validated();
        assert!(result.is_ok());
    }

    #[test]
    fn state_dir_relocates_paths() {
        let cfg = ConfigBuilder::new().state_dir(Path::new("/tmp/x")).build();
        assert_eq!(cfg.reboot.has_reported_marker, PathBuf::from("/tmp/x/has_reported.txt"));
        assert_eq!(cfg.snapshot.output_dir, PathBuf::from("/tmp/x/snapshots"));
    }
}
