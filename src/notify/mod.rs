// src/notify/mod.rs
pub mod email;
pub mod file;

use anyhow::Result;
use std::path::Path;

use crate::report::Report;

pub use email::EmailNotifier;
pub use file::FileNotifier;

/// Delivers a rendered report. Missing images are skipped by implementations;
/// only a failure to deliver the report itself is an error.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, report: &Report) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// An inline image read from disk, ready to attach.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub content_id: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read every image the report references. Absent or unreadable files are
/// logged and left out.
pub async fn load_inline_images(report: &Report) -> Vec<LoadedImage> {
    let mut out = Vec::with_capacity(report.inline_images.len());
    for img in &report.inline_images {
        let Some(path) = &img.path else {
            tracing::debug!(cid = %img.content_id, "no cached photo, skipping attachment");
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => out.push(LoadedImage {
                content_id: img.content_id.clone(),
                content_type: content_type_for(path),
                bytes,
            }),
            Err(e) => {
                tracing::warn!(cid = %img.content_id, path = %path.display(), error = %e, "failed to read photo, skipping attachment");
            }
        }
    }
    out
}
