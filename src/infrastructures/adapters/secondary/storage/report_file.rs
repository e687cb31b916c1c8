use crate::domain::models::growth::ReportRow;
use anyhow::{Context, Error};
use std::path::PathBuf;

pub const DEFAULT_REPORT_PATH: &str = "data/out.json";

pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[tracing::instrument(
        name = "JsonReportWriter::write",
        skip(self, rows),
        fields(path = %self.path.display(), rows = rows.len())
    )]
    pub async fn write(&self, rows: &[ReportRow]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec(rows).context("Failed to serialize report")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("Report written");
        Ok(())
    }
}
