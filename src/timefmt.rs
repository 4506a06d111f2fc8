use chrono::{DateTime, NaiveDate, Utc};

use crate::triage::types::Recency;

pub fn recency(iso: &str) -> Option<Recency> {
    recency_at(iso, Utc::now())
}

pub fn recency_at(iso: &str, now: DateTime<Utc>) -> Option<Recency> {
    let iso = iso.trim();
    let day = parse_day(iso)?;
    Some(Recency {
        date: day.format("%Y-%m-%d").to_string(),
        ago: format_age(day, now),
    })
}

fn parse_day(iso: &str) -> Option<NaiveDate> {
    if let Ok(t) = DateTime::parse_from_rfc3339(iso) {
        return Some(t.with_timezone(&Utc).date_naive());
    }
    iso.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

// Months are 30 days and years are 12 months; the output only needs to be
// roughly right and stable.
fn age_bucket(day: NaiveDate, now: DateTime<Utc>) -> (i64, i64, i64) {
    let days = now.date_naive().signed_duration_since(day).num_days().max(0);
    let months = days / 30;
    (months / 12, months % 12, days % 30)
}

pub fn format_age(day: NaiveDate, now: DateTime<Utc>) -> String {
    match age_bucket(day, now) {
        (y, 0, _) if y > 0 => format!("{y}y ago"),
        (y, mo, _) if y > 0 => format!("{y}y {mo}mo ago"),
        (_, mo, 0) if mo > 0 => format!("{mo}mo ago"),
        (_, mo, d) if mo > 0 => format!("{mo}mo {d}d ago"),
        (_, _, d) if d > 0 => format!("{d}d ago"),
        _ => "today".to_string(),
    }
}
