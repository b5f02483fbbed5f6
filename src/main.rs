//! shelter-watch: daily entrypoint.
//! Scrapes the dog listing, mails the change report, then saves the snapshot.
//! Meant to be started once a day by cron or a systemd timer.

use anyhow::{Context, Result};
use shelter_watch::config::AppConfig;
use shelter_watch::notify::{EmailNotifier, FileNotifier, Notifier};
use shelter_watch::runner::{run_once, RunOptions};
use shelter_watch::scrape::ShelterScraper;
use shelter_watch::snapshot::JsonFileStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shelter_watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; secrets such as SMTP_PASS may live there.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading configuration")?;
    cfg.validate()?;

    let scraper = ShelterScraper::new(&cfg.shelter)?;
    let store = JsonFileStore::new(&cfg.storage.snapshot_path);
    let notifier: Box<dyn Notifier> = if cfg.dry_run {
        Box::new(FileNotifier::new(&cfg.dry_run_report_path))
    } else {
        Box::new(EmailNotifier::from_config(&cfg.email)?)
    };

    let opts = RunOptions::from_config(&cfg);
    match run_once(&opts, &scraper, &store, notifier.as_ref()).await {
        Ok(summary) => {
            tracing::info!(
                new = summary.new_arrivals,
                adopted = summary.adopted,
                photo_updates = summary.photo_updates,
                "done"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("daily run failed: {e:#}");
            Err(e)
        }
    }
}
