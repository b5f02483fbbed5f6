//! # Reconciler
//! Pure diff of today's listing against the previous snapshot.
//! No I/O; the only outside input is the date used for adoption durations.
//!
//! Policy: records are joined by `id`. A duplicated id inside one snapshot is
//! resolved last-one-wins, while output order follows the first time each id
//! was seen, so identical inputs always give identical output.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::record::AnimalRecord;

/// Days per "month" in adoption durations. Not calendar months.
pub const DAYS_PER_MONTH: i64 = 30;

/// Time a dog spent at the shelter before it disappeared from the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayDuration {
    Known { months: i64, days: i64 },
    Unknown,
}

impl StayDuration {
    pub fn from_elapsed_days(elapsed: i64) -> Self {
        let elapsed = elapsed.max(0);
        StayDuration::Known {
            months: elapsed / DAYS_PER_MONTH,
            days: elapsed % DAYS_PER_MONTH,
        }
    }

    /// Duration from a raw intake text to `now`; anything unparsable is `Unknown`.
    pub fn since(intake: Option<&str>, now: NaiveDate) -> Self {
        match intake.and_then(parse_intake_date) {
            Some(date) => Self::from_elapsed_days(now.signed_duration_since(date).num_days()),
            None => StayDuration::Unknown,
        }
    }
}

impl fmt::Display for StayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayDuration::Known { months, days } => write!(f, "{months} months, {days} days"),
            StayDuration::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adoption {
    pub record: AnimalRecord,
    pub duration: StayDuration,
}

/// A dog listed on both days whose photo reference changed.
/// `record` is today's version; the old fields come from yesterday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpdate {
    pub record: AnimalRecord,
    pub old_photo_reference: Option<String>,
    pub old_local_photo_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub new_arrivals: Vec<AnimalRecord>,
    pub adopted: Vec<Adoption>,
    pub photo_updates: Vec<PhotoUpdate>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.new_arrivals.is_empty() && self.adopted.is_empty() && self.photo_updates.is_empty()
    }
}

// Formats seen on shelter detail pages. Year-first and numeric forms first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parse a raw intake date as shown on a detail page.
pub fn parse_intake_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Some(d) = parse_date_only(s) {
        return Some(d);
    }

    // "03/14/2025 10:32 AM CST" and similar: retry on the leading token.
    let head = s.split_whitespace().next()?;
    if head != s {
        return parse_date_only(head);
    }
    None
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        // `%Y` happily reads "25" as year 25; leave those to `%y`.
        .find(|d| d.year() >= 1900)
}

/// Index records by id: first-seen order plus last-one-wins lookup.
fn index_by_id(records: &[AnimalRecord]) -> (Vec<&str>, HashMap<&str, &AnimalRecord>) {
    let mut order = Vec::with_capacity(records.len());
    let mut by_id = HashMap::with_capacity(records.len());
    for r in records {
        if by_id.insert(r.id.as_str(), r).is_none() {
            order.push(r.id.as_str());
        } else {
            tracing::debug!(id = %r.id, "duplicate id in snapshot, keeping last occurrence");
        }
    }
    (order, by_id)
}

/// Diff `today` against `yesterday` using `now` for adoption durations.
pub fn reconcile_at(
    today: &[AnimalRecord],
    yesterday: &[AnimalRecord],
    now: NaiveDate,
) -> Reconciliation {
    let (today_order, today_by_id) = index_by_id(today);
    let (yest_order, yest_by_id) = index_by_id(yesterday);

    let new_arrivals = today_order
        .iter()
        .filter(|id| !yest_by_id.contains_key(*id))
        .map(|id| today_by_id[id].clone())
        .collect::<Vec<_>>();

    let adopted = yest_order
        .iter()
        .filter(|id| !today_by_id.contains_key(*id))
        .map(|id| {
            let record = yest_by_id[id].clone();
            let duration = StayDuration::since(record.intake_date.as_deref(), now);
            Adoption { record, duration }
        })
        .collect::<Vec<_>>();

    let photo_updates = today_order
        .iter()
        .filter_map(|id| {
            let old = yest_by_id.get(id)?;
            let new = today_by_id[id];
            (new.photo_reference != old.photo_reference).then(|| PhotoUpdate {
                record: new.clone(),
                old_photo_reference: old.photo_reference.clone(),
                old_local_photo_path: old.local_photo_path.clone(),
            })
        })
        .collect::<Vec<_>>();

    tracing::info!(
        new = new_arrivals.len(),
        adopted = adopted.len(),
        photo_updates = photo_updates.len(),
        "reconciled snapshots"
    );

    Reconciliation {
        new_arrivals,
        adopted,
        photo_updates,
    }
}

/// Same as [`reconcile_at`] with today's local date.
pub fn reconcile(today: &[AnimalRecord], yesterday: &[AnimalRecord]) -> Reconciliation {
    reconcile_at(today, yesterday, Local::now().date_naive())
}
