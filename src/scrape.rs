// src/scrape.rs
//! Record extraction from the shelter website: one listing page plus one
//! detail page per dog, with the current photo cached locally.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ShelterConfig;
use crate::record::{AnimalRecord, KENNEL_UNKNOWN};

const BREED_UNKNOWN: &str = "Unknown";
const DEFAULT_PHOTO_EXT: &str = "jpg";

#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Every dog currently listed, in page order. `previous` is the last saved
    /// snapshot; a dog whose detail page cannot be read keeps its fields from there.
    async fn fetch_records(&self, previous: &[AnimalRecord]) -> Result<Vec<AnimalRecord>>;
    fn name(&self) -> &'static str;
}

/// One dog as summarized on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub age: String,
    pub sex: String,
    pub detail_url: String,
}

/// Fields only available on a dog's detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailInfo {
    pub kennel: String,
    pub photo_url: Option<String>,
    pub intake_date: Option<String>,
}

impl DetailInfo {
    pub fn unknown() -> Self {
        Self {
            kennel: KENNEL_UNKNOWN.to_string(),
            photo_url: None,
            intake_date: None,
        }
    }

    fn from_record(rec: &AnimalRecord) -> Self {
        Self {
            kennel: rec.kennel_location.clone(),
            photo_url: rec.photo_reference.clone(),
            intake_date: rec.intake_date.clone(),
        }
    }
}

fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(s, " ").trim().to_string()
}

fn selector(cell: &'static OnceCell<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector"))
}

fn resolve(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.trim().to_string())
}

/// Split a listing anchor text of the form
/// `"<Name> <Breed...> | <age> | <sex> | <ID> <fee...>"`.
pub fn parse_listing_text(text: &str) -> Option<(String, String, String, String, String)> {
    let text = collapse_ws(text);
    if !text.contains('|') {
        return None;
    }
    let parts: Vec<&str> = text.split('|').map(str::trim).collect();
    let [name_breed, age, sex, id_and_fee] = parts.as_slice() else {
        return None;
    };

    let id = id_and_fee.split_whitespace().next()?.to_string();
    let mut tokens = name_breed.split_whitespace();
    let name = tokens.next()?.to_string();
    let breed = tokens.collect::<Vec<_>>().join(" ");
    let breed = if breed.is_empty() {
        BREED_UNKNOWN.to_string()
    } else {
        breed
    };

    Some((id, name, breed, age.to_string(), sex.to_string()))
}

/// Every dog link on the listing page. Links whose text is not the
/// four-part summary are ignored.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    static SEL_A: OnceCell<Selector> = OnceCell::new();
    let doc = Html::parse_document(html);

    let mut out = Vec::new();
    for a in doc.select(selector(&SEL_A, "a[href]")) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let text = a.text().collect::<Vec<_>>().join(" ");
        let Some((id, name, breed, age, sex)) = parse_listing_text(&text) else {
            continue;
        };
        out.push(ListingEntry {
            id,
            name,
            breed,
            age,
            sex,
            detail_url: resolve(base, href),
        });
    }
    out
}

/// Value after the `:` that follows `label`, in the first text node containing it.
fn labelled_value(doc: &Html, label: &str) -> Option<String> {
    let text = doc.root_element().text().find(|t| t.contains(label))?;
    let (_, rest) = text.split_once(label)?;
    let value = rest.split_once(':').map(|(_, v)| v).unwrap_or(rest);
    Some(collapse_ws(value))
}

pub fn parse_detail(html: &str, name: &str, base: &Url) -> DetailInfo {
    static SEL_IMG: OnceCell<Selector> = OnceCell::new();
    let doc = Html::parse_document(html);

    let kennel = labelled_value(&doc, "Kennel")
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| KENNEL_UNKNOWN.to_string());

    let photo_url = doc
        .select(selector(&SEL_IMG, "img[alt]"))
        .find(|img| img.value().attr("alt").map(str::trim) == Some(name))
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .map(|src| resolve(base, src));

    let intake_date = labelled_value(&doc, "Intake Date").filter(|d| !d.is_empty());

    DetailInfo {
        kennel,
        photo_url,
        intake_date,
    }
}

/// Cache file name for a photo: `<id>-<YYYYMMDD>-<HHMMSS>.<ext>`.
/// A new name per run keeps every copy a saved snapshot points to intact,
/// even across two runs on the same day.
pub fn photo_file_name(id: &str, photo_url: &str, taken: NaiveDateTime) -> String {
    let safe_id: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();

    let ext = Url::parse(photo_url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_PHOTO_EXT.to_string());

    format!("{safe_id}-{}.{ext}", taken.format("%Y%m%d-%H%M%S"))
}

/// Whether `name` looks like a file [`photo_file_name`] produced.
/// Day-only names from older caches are accepted too.
pub fn is_cached_photo_name(name: &str) -> bool {
    static RE_PHOTO: OnceCell<Regex> = OnceCell::new();
    RE_PHOTO
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9_-]+-\d{8}(?:-\d{6})?\.[a-z0-9]{1,5}$").expect("static regex")
        })
        .is_match(name)
}

pub struct ShelterScraper {
    client: Client,
    listing_url: Url,
    image_dir: PathBuf,
}

impl ShelterScraper {
    pub fn new(cfg: &ShelterConfig) -> Result<Self> {
        let listing_url = Url::parse(&cfg.listing_url)
            .with_context(|| format!("invalid listing url {}", cfg.listing_url))?;
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            listing_url,
            image_dir: cfg.image_dir.clone(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }

    /// `None` when the page could not be fetched.
    async fn fetch_detail(&self, entry: &ListingEntry) -> Option<DetailInfo> {
        let base = match Url::parse(&entry.detail_url) {
            Ok(u) => u,
            Err(_) => self.listing_url.clone(),
        };
        match self.get_text(&entry.detail_url).await {
            Ok(body) => {
                tracing::debug!(name = %entry.name, id = %entry.id, "fetched detail page");
                Some(parse_detail(&body, &entry.name, &base))
            }
            Err(e) => {
                tracing::warn!(name = %entry.name, id = %entry.id, error = %format!("{e:#}"), "detail page failed");
                None
            }
        }
    }

    async fn download_photo(&self, id: &str, url: &str, taken: NaiveDateTime) -> Result<PathBuf> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?
            .bytes()
            .await
            .context("reading photo bytes")?;

        let path = self.image_dir.join(photo_file_name(id, url, taken));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    async fn cache_photo(&self, entry: &ListingEntry, url: &str, taken: NaiveDateTime) -> Option<PathBuf> {
        match self.download_photo(&entry.id, url, taken).await {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(name = %entry.name, id = %entry.id, error = %format!("{e:#}"), "photo download failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for ShelterScraper {
    async fn fetch_records(&self, previous: &[AnimalRecord]) -> Result<Vec<AnimalRecord>> {
        tracing::info!(url = %self.listing_url, "scraping dog listing");
        let body = self
            .get_text(self.listing_url.as_str())
            .await
            .context("fetching listing page")?;
        let entries = parse_listing(&body, &self.listing_url);
        tracing::info!(count = entries.len(), "listing parsed");

        if let Err(e) = tokio::fs::create_dir_all(&self.image_dir).await {
            tracing::warn!(dir = %self.image_dir.display(), error = %e, "image dir not available");
        }

        let previous: HashMap<&str, &AnimalRecord> =
            previous.iter().map(|r| (r.id.as_str(), r)).collect();
        let taken = Local::now().naive_local();
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let (detail, local_photo_path) = match self.fetch_detail(&entry).await {
                Some(detail) => {
                    let path = match &detail.photo_url {
                        Some(url) => self.cache_photo(&entry, url, taken).await,
                        None => None,
                    };
                    (detail, path)
                }
                // Seen before: keep yesterday's detail fields.
                None => match previous.get(entry.id.as_str()) {
                    Some(prev) => {
                        tracing::info!(name = %entry.name, id = %entry.id, "keeping previous detail fields");
                        (DetailInfo::from_record(prev), prev.local_photo_path.clone())
                    }
                    None => (DetailInfo::unknown(), None),
                },
            };

            tracing::info!(name = %entry.name, id = %entry.id, "processed dog");
            records.push(AnimalRecord {
                id: entry.id,
                name: entry.name,
                breed: entry.breed,
                age: entry.age,
                sex: entry.sex,
                detail_url: entry.detail_url,
                kennel_location: detail.kennel,
                photo_reference: detail.photo_url,
                local_photo_path,
                intake_date: detail.intake_date,
            });
        }
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "shelter-web"
    }
}
