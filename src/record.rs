// src/record.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder kennel when the detail page has no parsable "Kennel" line.
pub const KENNEL_UNKNOWN: &str = "Unknown";

/// One dog observed on the shelter listing at scrape time.
///
/// `id` is the join key across snapshots. Everything else is display text
/// taken as-is from the site. All fields default so that a snapshot written by
/// an older run (or with missing keys) still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimalRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub detail_url: String,
    #[serde(default, alias = "kennel")]
    pub kennel_location: String,
    /// Locator of the current photo; only ever compared for equality.
    #[serde(default, alias = "photo_url")]
    pub photo_reference: Option<String>,
    /// Cached copy of the photo, present only when the download worked.
    #[serde(default, alias = "photo_path")]
    pub local_photo_path: Option<PathBuf>,
    /// Raw intake date text; parsed only when an adoption is reported.
    #[serde(default)]
    pub intake_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keys_are_accepted() {
        let json = r#"{
            "id": "A123",
            "name": "Biscuit",
            "breed": "Labrador Retriever",
            "age": "2 years",
            "sex": "Male",
            "detail_url": "https://example.org/pet/a123",
            "kennel": "B12",
            "photo_url": "https://example.org/img/a123.jpg",
            "photo_path": "images/A123.jpg",
            "intake_date": "03/14/2025"
        }"#;
        let r: AnimalRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.kennel_location, "B12");
        assert_eq!(
            r.photo_reference.as_deref(),
            Some("https://example.org/img/a123.jpg")
        );
        assert_eq!(r.local_photo_path, Some(PathBuf::from("images/A123.jpg")));
    }

    #[test]
    fn missing_fields_load_as_no_value() {
        let r: AnimalRecord = serde_json::from_str(r#"{"id":"X1"}"#).unwrap();
        assert_eq!(r.id, "X1");
        assert!(r.name.is_empty());
        assert_eq!(r.photo_reference, None);
        assert_eq!(r.intake_date, None);
    }

    #[test]
    fn null_optionals_stay_absent() {
        let r: AnimalRecord =
            serde_json::from_str(r#"{"id":"X2","photo_url":null,"intake_date":null}"#).unwrap();
        assert_eq!(r.photo_reference, None);
        assert_eq!(r.intake_date, None);
    }
}
