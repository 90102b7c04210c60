//! Local crash intake
//!
//! Stores crash reports as pretty-printed JSON files in a reports directory.
//! Stands in for the remote intake service when diagd runs standalone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use diagd_core::ports::{CrashIntake, CrashReport, RpcError};
use tracing::info;

/// Save a crash report to the reports directory.
///
/// Creates the directory if needed. File name: `crash-{date}-{id8}.json`
pub fn save_crash_report(reports_dir: &Path, report: &CrashReport) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)?;

    let date = Utc::now().format("%Y%m%d");
    let short_id: String = report.id.chars().take(8).collect();
    let path = reports_dir.join(format!("crash-{date}-{short_id}.json"));

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    Ok(path)
}

/// Lists stored reports, newest file name last.
pub fn list_crash_reports(reports_dir: &Path) -> anyhow::Result<Vec<CrashReport>> {
    if !reports_dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(reports_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        reports.push(serde_json::from_str(&content)?);
    }
    Ok(reports)
}

/// [`CrashIntake`] writing to the local filesystem
#[derive(Debug, Clone)]
pub struct LocalCrashIntake {
    reports_dir: PathBuf,
}

impl LocalCrashIntake {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}

#[async_trait]
impl CrashIntake for LocalCrashIntake {
    async fn file(&self, report: CrashReport) -> Result<(), RpcError> {
        let reports_dir = self.reports_dir.clone();
        let signature = report.crash_signature.clone();

        let path = tokio::task::spawn_blocking(move || save_crash_report(&reports_dir, &report))
            .await
            .map_err(|e| RpcError::Failed(e.to_string()))?
            .map_err(|e| RpcError::Failed(e.to_string()))?;

        info!(path = %path.display(), signature = %signature, "Crash report stored");
        Ok(())
    }
}
