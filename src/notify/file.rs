// src/notify/file.rs
use anyhow::{Context, Result};
use std::path::PathBuf;

use super::Notifier;
use crate::report::Report;

/// Writes the HTML report to disk instead of mailing it (dry runs).
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Notifier for FileNotifier {
    async fn deliver(&self, report: &Report) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        tokio::fs::write(&self.path, &report.html)
            .await
            .with_context(|| format!("writing report to {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), "report written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
