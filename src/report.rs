// src/report.rs
//! Daily report rendering: one HTML body for mail clients plus a plain-text
//! alternative, and the list of inline images the HTML refers to by `cid:`.

use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::reconcile::Reconciliation;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    pub subject: String,
}

/// Image the HTML references as `cid:<content_id>`.
/// `path` is `None` when no cached copy exists; the HTML then shows a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_id: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub inline_images: Vec<InlineImage>,
}

pub fn old_photo_cid(id: &str) -> String {
    format!("{id}_old")
}

pub fn new_photo_cid(id: &str) -> String {
    format!("{id}_new")
}

fn summary_line(diff: &Reconciliation) -> (usize, usize, usize) {
    (
        diff.new_arrivals.len(),
        diff.adopted.len(),
        diff.photo_updates.len(),
    )
}

fn photo_cell(html: &mut String, caption: &str, cid: &str, available: bool) {
    let _ = write!(
        html,
        "<div><p style=\"margin:0;font-size:small;\">{caption}</p>"
    );
    if available {
        let _ = write!(
            html,
            "<img src=\"cid:{}\" style=\"width:100px;\">",
            attr(cid)
        );
    } else {
        html.push_str("<p style=\"width:100px;color:#888;\">(no photo)</p>");
    }
    html.push_str("</div>");
}

fn render_html(diff: &Reconciliation, opts: &ReportOptions, date: NaiveDate) -> String {
    let (new, adopted, photos) = summary_line(diff);
    let mut html = String::with_capacity(4096);

    let _ = write!(
        html,
        "<html><body><h2>{} – {}</h2>",
        text(&opts.title),
        date.format("%B %d, %Y")
    );
    let _ = write!(
        html,
        "<p><strong>{new} new</strong> dogs, <strong>{adopted} adopted</strong>, \
         <strong>{photos} updated photos</strong>.</p>"
    );

    if !diff.new_arrivals.is_empty() {
        html.push_str("<h3>New Arrivals</h3>");
        for dog in &diff.new_arrivals {
            let _ = write!(
                html,
                "<div style=\"margin-bottom:15px;\">\
                 <a href=\"{}\"><strong>{}</strong></a><br>\
                 Breed: {}<br>Age: {}<br>Sex: {}<br>ID: {}<br>Kennel: {}</div>",
                attr(&dog.detail_url),
                text(&dog.name),
                text(&dog.breed),
                text(&dog.age),
                text(&dog.sex),
                text(&dog.id),
                text(&dog.kennel_location),
            );
        }
    }

    if !diff.adopted.is_empty() {
        html.push_str("<h3>Adopted Dogs</h3><ul>");
        for a in &diff.adopted {
            let _ = write!(
                html,
                "<li><strong>{}</strong> (ID: {}) – Adopted after {}</li>",
                text(&a.record.name),
                text(&a.record.id),
                a.duration
            );
        }
        html.push_str("</ul>");
    }

    if !diff.photo_updates.is_empty() {
        html.push_str("<h3>Updated Photos</h3>");
        for u in &diff.photo_updates {
            let _ = write!(
                html,
                "<div style=\"margin-bottom:20px;\"><strong>{}</strong> (ID: {}) – New photo detected<br>\
                 <div style=\"display:flex;gap:10px;\">",
                text(&u.record.name),
                text(&u.record.id)
            );
            photo_cell(
                &mut html,
                "Before:",
                &old_photo_cid(&u.record.id),
                u.old_local_photo_path.is_some(),
            );
            photo_cell(
                &mut html,
                "After:",
                &new_photo_cid(&u.record.id),
                u.record.local_photo_path.is_some(),
            );
            html.push_str("</div></div>");
        }
    }

    html.push_str("</body></html>");
    html
}

fn render_text(diff: &Reconciliation, opts: &ReportOptions, date: NaiveDate) -> String {
    let (new, adopted, photos) = summary_line(diff);
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", opts.title, date.format("%B %d, %Y"));
    let _ = writeln!(out, "{new} new dogs, {adopted} adopted, {photos} updated photos.");

    if !diff.new_arrivals.is_empty() {
        let _ = writeln!(out, "\nNew Arrivals");
        for d in &diff.new_arrivals {
            let _ = writeln!(
                out,
                "- {} ({}, {}, {}) ID: {} Kennel: {} {}",
                d.name, d.breed, d.age, d.sex, d.id, d.kennel_location, d.detail_url
            );
        }
    }
    if !diff.adopted.is_empty() {
        let _ = writeln!(out, "\nAdopted Dogs");
        for a in &diff.adopted {
            let _ = writeln!(
                out,
                "- {} (ID: {}) adopted after {}",
                a.record.name, a.record.id, a.duration
            );
        }
    }
    if !diff.photo_updates.is_empty() {
        let _ = writeln!(out, "\nUpdated Photos");
        for u in &diff.photo_updates {
            let _ = writeln!(out, "- {} (ID: {})", u.record.name, u.record.id);
        }
    }
    out
}

/// Inline images referenced by the photo-update section, old before new.
fn inline_images(diff: &Reconciliation) -> Vec<InlineImage> {
    diff.photo_updates
        .iter()
        .flat_map(|u| {
            [
                InlineImage {
                    content_id: old_photo_cid(&u.record.id),
                    path: u.old_local_photo_path.clone(),
                },
                InlineImage {
                    content_id: new_photo_cid(&u.record.id),
                    path: u.record.local_photo_path.clone(),
                },
            ]
        })
        .collect()
}

/// Render the daily report. Output depends only on `diff`, `opts` and `date`.
pub fn render_report(diff: &Reconciliation, opts: &ReportOptions, date: NaiveDate) -> Report {
    Report {
        subject: opts.subject.clone(),
        html: render_html(diff, opts, date),
        text: render_text(diff, opts, date),
        inline_images: inline_images(diff),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Adoption, PhotoUpdate, StayDuration};
    use crate::record::AnimalRecord;

    fn opts() -> ReportOptions {
        ReportOptions {
            title: "Shelter Dog Report".into(),
            subject: "Daily Dog Report".into(),
        }
    }

    fn dog(id: &str, name: &str) -> AnimalRecord {
        AnimalRecord {
            id: id.into(),
            name: name.into(),
            breed: "Beagle".into(),
            age: "2 years".into(),
            sex: "Female".into(),
            detail_url: format!("https://example.org/pet/{id}"),
            kennel_location: "B12".into(),
            ..Default::default()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn summary_counts_and_dateline() {
        let diff = Reconciliation {
            new_arrivals: vec![dog("A1", "Biscuit"), dog("A2", "Rex")],
            adopted: vec![Adoption {
                record: dog("A0", "Old Timer"),
                duration: StayDuration::Known { months: 2, days: 5 },
            }],
            photo_updates: vec![],
        };
        let r = render_report(&diff, &opts(), day());
        assert!(r.html.contains("March 14, 2025"));
        assert!(r.html.contains("<strong>2 new</strong>"));
        assert!(r.html.contains("<strong>1 adopted</strong>"));
        assert!(r.html.contains("Adopted after 2 months, 5 days"));
        assert!(r.html.contains("Kennel: B12"));
        assert!(r.html.contains("href=\"https://example.org/pet/A1\""));
        assert!(r.text.contains("2 new dogs, 1 adopted"));
        assert!(r.inline_images.is_empty());
    }

    #[test]
    fn record_text_is_escaped() {
        let diff = Reconciliation {
            new_arrivals: vec![dog("A1", "<b>Bad</b> & Co")],
            ..Default::default()
        };
        let r = render_report(&diff, &opts(), day());
        assert!(r.html.contains("&lt;b&gt;Bad&lt;/b&gt; &amp; Co"));
        assert!(!r.html.contains("<b>Bad</b>"));
    }

    #[test]
    fn photo_updates_reference_cids_and_placeholders() {
        let mut today = dog("A7", "Biscuit");
        today.local_photo_path = Some(PathBuf::from("images/A7-20250314.jpg"));
        let diff = Reconciliation {
            photo_updates: vec![PhotoUpdate {
                record: today,
                old_photo_reference: Some("https://example.org/a7-old.jpg".into()),
                old_local_photo_path: None,
            }],
            ..Default::default()
        };
        let r = render_report(&diff, &opts(), day());
        assert!(r.html.contains("cid:A7_new"));
        assert!(!r.html.contains("cid:A7_old"));
        assert!(r.html.contains("(no photo)"));
        assert_eq!(
            r.inline_images,
            vec![
                InlineImage {
                    content_id: "A7_old".into(),
                    path: None
                },
                InlineImage {
                    content_id: "A7_new".into(),
                    path: Some(PathBuf::from("images/A7-20250314.jpg"))
                },
            ]
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let diff = Reconciliation {
            new_arrivals: vec![dog("A1", "Biscuit")],
            ..Default::default()
        };
        let a = render_report(&diff, &opts(), day());
        let b = render_report(&diff, &opts(), day());
        assert_eq!(a.html, b.html);
        assert_eq!(a.text, b.text);
    }
}
