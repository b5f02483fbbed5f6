// src/snapshot.rs
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::record::AnimalRecord;
use crate::scrape::is_cached_photo_name;

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent saved snapshot; empty when none exists yet.
    async fn load(&self) -> Result<Vec<AnimalRecord>>;
    /// Replace the saved snapshot with `records`.
    async fn save(&self, records: &[AnimalRecord]) -> Result<()>;
}

/// Snapshot kept as one pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<AnimalRecord>> {
        let body = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no previous snapshot, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading snapshot {}", self.path.display()))
            }
        };

        // A present-but-broken file is not "first run": refuse rather than overwrite it.
        let records: Vec<AnimalRecord> = serde_json::from_str(&body)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "snapshot loaded");
        Ok(records)
    }

    async fn save(&self, records: &[AnimalRecord]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating snapshot dir {}", dir.display()))?;
        }

        let body = serde_json::to_vec_pretty(records).context("serializing snapshot")?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing snapshot {}", self.path.display()))?;

        tracing::info!(path = %self.path.display(), count = records.len(), "snapshot saved");
        Ok(())
    }
}

/// Delete cached photos in `image_dir` that no record in `keep` points to.
/// Only names shaped like cached photos are candidates; anything else in the
/// directory is left alone. Returns how many files were removed. Errors are
/// logged, never returned.
pub async fn prune_photos(image_dir: &Path, keep: &[AnimalRecord]) -> usize {
    let referenced: HashSet<PathBuf> = keep
        .iter()
        .filter_map(|r| r.local_photo_path.as_deref())
        .filter_map(|p| p.file_name().map(PathBuf::from))
        .collect();

    let mut entries = match fs::read_dir(image_dir).await {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(dir = %image_dir.display(), error = %e, "photo dir not readable, nothing to prune");
            return 0;
        }
    };

    let mut removed = 0usize;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %image_dir.display(), error = %e, "photo dir listing failed");
                break;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        let is_photo = name.to_str().is_some_and(is_cached_photo_name);
        if !is_photo || !path.is_file() || referenced.contains(&PathBuf::from(&name)) {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove stale photo"),
        }
    }

    if removed > 0 {
        tracing::info!(dir = %image_dir.display(), removed, "pruned stale photos");
    }
    removed
}
