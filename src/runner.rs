// src/runner.rs
//! One daily run: scrape, diff against the saved snapshot, report, persist.
//!
//! The snapshot is only replaced after the report went out, so a failed run
//! leaves yesterday's snapshot in place and the next run diffs against it.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::reconcile::reconcile_at;
use crate::report::{render_report, ReportOptions};
use crate::scrape::RecordSource;
use crate::snapshot::{prune_photos, SnapshotStore};

/// Run settings independent of which collaborators are plugged in.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub report: ReportOptions,
    /// Deliver the report but keep the old snapshot.
    pub dry_run: bool,
    pub allow_empty_listing: bool,
    /// Where cached photos live; stale ones are pruned after a save.
    pub image_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            report: ReportOptions {
                title: cfg.email.report_title.clone(),
                subject: cfg.email.subject.clone(),
            },
            dry_run: cfg.dry_run,
            allow_empty_listing: cfg.shelter.allow_empty_listing,
            image_dir: Some(cfg.shelter.image_dir.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub today: usize,
    pub new_arrivals: usize,
    pub adopted: usize,
    pub photo_updates: usize,
    pub saved: bool,
}

pub async fn run_once(
    opts: &RunOptions,
    source: &dyn RecordSource,
    store: &dyn SnapshotStore,
    notifier: &dyn Notifier,
) -> Result<RunSummary> {
    run_once_at(opts, source, store, notifier, Local::now().date_naive()).await
}

pub async fn run_once_at(
    opts: &RunOptions,
    source: &dyn RecordSource,
    store: &dyn SnapshotStore,
    notifier: &dyn Notifier,
    date: NaiveDate,
) -> Result<RunSummary> {
    let yesterday = store.load().await.context("loading previous snapshot")?;
    tracing::info!(source = source.name(), "starting daily scrape");
    let today = source
        .fetch_records(&yesterday)
        .await
        .with_context(|| format!("fetching records from {}", source.name()))?;

    if today.is_empty() && !yesterday.is_empty() && !opts.allow_empty_listing {
        bail!(
            "listing returned no dogs while the previous snapshot has {}; refusing to report them all as adopted",
            yesterday.len()
        );
    }

    let diff = reconcile_at(&today, &yesterday, date);
    let report = render_report(&diff, &opts.report, date);

    tracing::info!(notifier = notifier.name(), "delivering report");
    notifier
        .deliver(&report)
        .await
        .with_context(|| format!("delivering report via {}", notifier.name()))?;

    let saved = if opts.dry_run {
        tracing::info!("dry run, snapshot left unchanged");
        false
    } else {
        store.save(&today).await.context("saving today's snapshot")?;
        if let Some(dir) = &opts.image_dir {
            prune_photos(dir, &today).await;
        }
        true
    };

    let summary = RunSummary {
        today: today.len(),
        new_arrivals: diff.new_arrivals.len(),
        adopted: diff.adopted.len(),
        photo_updates: diff.photo_updates.len(),
        saved,
    };
    tracing::info!(?summary, "run finished");
    Ok(summary)
}
