// src/config/app.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "SHELTER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/shelter.toml";

const ENV_SMTP_HOST: &str = "SMTP_HOST";
const ENV_SMTP_USER: &str = "SMTP_USER";
const ENV_SMTP_PASS: &str = "SMTP_PASS";
const ENV_EMAIL_FROM: &str = "NOTIFY_EMAIL_FROM";
const ENV_EMAIL_TO: &str = "NOTIFY_EMAIL_TO";
const ENV_DRY_RUN: &str = "SHELTER_DRY_RUN";

fn default_listing_url() -> String {
    "https://pasadenahumane.org/adopt/view-pets/dogs/".to_string()
}
fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_user_agent() -> String {
    concat!("shelter-watch/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("yesterday_dogs.json")
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    465
}
fn default_subject() -> String {
    "Pasadena Humane Daily Dog Report".to_string()
}
fn default_report_title() -> String {
    "Pasadena Humane Dog Report".to_string()
}
fn default_dry_run_report_path() -> PathBuf {
    PathBuf::from("report.html")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelterConfig {
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Accept an empty listing even when yesterday had dogs.
    #[serde(default)]
    pub allow_empty_listing: bool,
}

impl Default for ShelterConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            image_dir: default_image_dir(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout_secs(),
            allow_empty_listing: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// SMTP password; only ever read from the environment.
#[derive(Clone, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(len={})", self.0.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Login name; falls back to `from` when empty.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_report_title")]
    pub report_title: String,
    #[serde(skip)]
    pub password: Option<Secret>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            from: String::new(),
            to: Vec::new(),
            subject: default_subject(),
            report_title: default_report_title(),
            password: None,
        }
    }
}

impl EmailConfig {
    pub fn login(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.from
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub shelter: ShelterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub email: EmailConfig,
    /// Write the report to `dry_run_report_path` instead of mailing it, and
    /// leave the snapshot untouched.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_dry_run_report_path")]
    pub dry_run_report_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shelter: ShelterConfig::default(),
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
            dry_run: false,
            dry_run_report_path: default_dry_run_report_path(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing shelter config TOML")
    }

    /// Load from an explicit path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $SHELTER_CONFIG_PATH
    /// 2) config/shelter.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        tracing::info!("no config file found, using defaults");
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Environment wins over file values. `SMTP_PASS` is the only password source.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = non_empty(ENV_SMTP_HOST) {
            self.email.smtp_host = v;
        }
        if let Some(v) = non_empty(ENV_SMTP_USER) {
            self.email.username = v;
        }
        if let Some(v) = non_empty(ENV_EMAIL_FROM) {
            self.email.from = v;
        }
        if let Some(v) = non_empty(ENV_EMAIL_TO) {
            self.email.to = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get(ENV_SMTP_PASS).filter(|v| !v.is_empty()) {
            self.email.password = Some(Secret::new(v));
        }
        if let Some(v) = non_empty(ENV_DRY_RUN) {
            self.dry_run = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Fail early when the run would need mail settings that are missing,
    /// or when the photo cache would share a directory with the snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.shelter.listing_url.trim().is_empty() {
            bail!("shelter.listing_url is empty");
        }
        let snapshot_dir = self
            .storage
            .snapshot_path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if same_dir(snapshot_dir, &self.shelter.image_dir) {
            bail!(
                "shelter.image_dir {} also holds storage.snapshot_path {}; give photos their own directory",
                self.shelter.image_dir.display(),
                self.storage.snapshot_path.display()
            );
        }
        if self.dry_run {
            return Ok(());
        }
        if self.email.from.trim().is_empty() {
            bail!("email sender missing (set email.from or {ENV_EMAIL_FROM})");
        }
        if self.email.to.is_empty() {
            bail!("email recipient missing (set email.to or {ENV_EMAIL_TO})");
        }
        if self.email.password.is_none() {
            bail!("SMTP password missing (set {ENV_SMTP_PASS})");
        }
        Ok(())
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (fs::canonicalize(a), fs::canonicalize(b)) {
        return a == b;
    }
    let lexical = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    lexical(a) == lexical(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.shelter.listing_url, default_listing_url());
        assert_eq!(cfg.storage.snapshot_path, PathBuf::from("yesterday_dogs.json"));
        assert_eq!(cfg.email.smtp_port, 465);
        assert!(!cfg.dry_run);
        assert_eq!(cfg.dry_run_report_path, PathBuf::from("report.html"));
    }

    #[test]
    fn env_overrides_file_and_supplies_password() {
        let mut cfg = AppConfig::from_toml_str(
            r#"
[email]
from = "file@example.org"
to = ["a@example.org"]
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("NOTIFY_EMAIL_TO", "x@example.org, y@example.org"),
            ("SMTP_PASS", "app password"),
        ]);
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.email.from, "file@example.org");
        assert_eq!(cfg.email.to, vec!["x@example.org", "y@example.org"]);
        assert_eq!(
            cfg.email.password.as_ref().map(Secret::expose),
            Some("app password")
        );
        assert_eq!(cfg.email.login(), "file@example.org");
        cfg.validate().unwrap();
    }

    #[test]
    fn password_is_not_debug_printed() {
        let s = Secret::new("hunter2");
        assert!(!format!("{s:?}").contains("hunter2"));
    }

    #[test]
    fn validate_requires_mail_settings_unless_dry_run() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_err());
        cfg.dry_run = true;
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_image_dir_holding_the_snapshot() {
        let mut cfg = AppConfig {
            dry_run: true,
            ..AppConfig::default()
        };
        cfg.shelter.image_dir = PathBuf::from(".");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("image_dir"), "{err}");

        cfg.shelter.image_dir = PathBuf::from("./state/");
        cfg.storage.snapshot_path = PathBuf::from("state/dogs.json");
        assert!(cfg.validate().is_err());

        cfg.shelter.image_dir = PathBuf::from("state/images");
        cfg.validate().unwrap();
    }
}
