// tests/config_load.rs
use shelter_watch::config::AppConfig;
use std::path::PathBuf;
use std::{env, fs};

const ENV_KEYS: &[&str] = &[
    "SHELTER_CONFIG_PATH",
    "SMTP_HOST",
    "SMTP_USER",
    "SMTP_PASS",
    "NOTIFY_EMAIL_FROM",
    "NOTIFY_EMAIL_TO",
    "SHELTER_DRY_RUN",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[test]
fn load_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("shelter.toml");
    fs::write(
        &p,
        r#"
dry_run = true

[shelter]
listing_url = "https://shelter.example.org/dogs/"
image_dir = "cache/images"
allow_empty_listing = true

[storage]
snapshot_path = "state/dogs.json"

[email]
smtp_port = 587
from = "watch@example.org"
to = ["a@example.org"]
subject = "Dogs today"
"#,
    )
    .unwrap();

    let cfg = AppConfig::load_from(&p).unwrap();
    assert_eq!(cfg.shelter.listing_url, "https://shelter.example.org/dogs/");
    assert_eq!(cfg.shelter.image_dir, PathBuf::from("cache/images"));
    assert!(cfg.shelter.allow_empty_listing);
    assert_eq!(cfg.storage.snapshot_path, PathBuf::from("state/dogs.json"));
    assert_eq!(cfg.email.smtp_port, 587);
    assert_eq!(cfg.email.subject, "Dogs today");
    assert_eq!(cfg.shelter.request_timeout_secs, 30);
}

#[test]
fn malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("shelter.toml");
    fs::write(&p, "[email\nfrom = ").unwrap();
    assert!(AppConfig::load_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) nothing at all -> defaults
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.storage.snapshot_path, PathBuf::from("yesterday_dogs.json"));
    assert!(cfg.email.password.is_none());

    // 2) fallback config/shelter.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/shelter.toml"),
        "[storage]\nsnapshot_path = \"from_default.json\"\n",
    )
    .unwrap();
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.storage.snapshot_path, PathBuf::from("from_default.json"));

    // 3) env path wins, env vars override and supply the secret
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[storage]\nsnapshot_path = \"from_env.json\"\n").unwrap();
    env::set_var("SHELTER_CONFIG_PATH", p_env.display().to_string());
    env::set_var("NOTIFY_EMAIL_FROM", "watch@example.org");
    env::set_var("NOTIFY_EMAIL_TO", "a@example.org");
    env::set_var("SMTP_PASS", "app-password");
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.storage.snapshot_path, PathBuf::from("from_env.json"));
    assert_eq!(cfg.email.from, "watch@example.org");
    cfg.validate().unwrap();

    // 4) env path pointing nowhere is an error
    env::set_var("SHELTER_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(AppConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}
