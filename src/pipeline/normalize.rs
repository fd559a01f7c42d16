// src/pipeline/normalize.rs

//! Row normalization and in-batch deduplication.
//!
//! Scraper rows arrive loosely typed: strings may be null or a "nan"
//! sentinel, numbers may be strings, half the fields may be missing
//! entirely. Normalization is a pure transform that never raises; bad
//! values coerce to empty strings or None.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{JobRecord, UNKNOWN};
use crate::services::RawJobRow;
use crate::utils::canonical_url;

/// Descriptions longer than this get truncated...
const DESCRIPTION_LIMIT: usize = 300;
/// ...to this many graphemes plus an ellipsis.
const DESCRIPTION_KEEP: usize = 280;

/// Safe string extraction: missing, null, and NaN-like sentinels become
/// an empty string; numbers and bools are rendered.
fn clean_str(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => {
            if s.trim().eq_ignore_ascii_case("nan") {
                String::new()
            } else {
                s.clone()
            }
        }
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        // Containers carry no usable scalar
        Some(_) => String::new(),
    }
}

/// Best-effort integer coercion. Invalid or missing values become None,
/// never zero and never an error.
fn to_int_safe(value: Option<&Value>) -> Option<i64> {
    let f = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if f.is_finite() { Some(f as i64) } else { None }
}

/// Remote tri-state: only an explicit boolean counts.
fn to_remote(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

/// Render the salary descriptor: a range when both bounds are present, a
/// single value when one is, the unknown placeholder when neither is.
/// Currency and interval are appended when available.
fn salary_str(min: Option<i64>, max: Option<i64>, currency: &str, interval: &str) -> String {
    let mut unit = String::new();
    if !currency.is_empty() {
        unit.push(' ');
        unit.push_str(currency);
    }
    if !interval.is_empty() {
        unit.push('/');
        unit.push_str(interval);
    }

    match (min, max) {
        (Some(min), Some(max)) => format!("{min}–{max}{unit}"),
        (Some(v), None) | (None, Some(v)) => format!("{v}{unit}"),
        (None, None) => UNKNOWN.to_string(),
    }
}

/// `YYYY-MM-DD` becomes the display form `DD.MM.YYYY`; anything else
/// passes through raw, or as the unknown placeholder when empty.
fn display_date(raw: &str) -> String {
    if raw.is_empty() {
        return UNKNOWN.to_string();
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%d.%m.%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn truncate_description(descr: &str) -> String {
    if descr.graphemes(true).count() > DESCRIPTION_LIMIT {
        let cut: String = descr.graphemes(true).take(DESCRIPTION_KEEP).collect();
        format!("{cut}…")
    } else {
        descr.to_string()
    }
}

fn or_unknown(s: String) -> String {
    if s.is_empty() { UNKNOWN.to_string() } else { s }
}

/// Map one raw row into a canonical record.
pub fn normalize_row(row: &RawJobRow) -> JobRecord {
    // The direct URL links straight to the employer; prefer it for both
    // linking and canonicalization.
    let direct = clean_str(row.job_url_direct.as_ref());
    let url_raw = if direct.is_empty() {
        clean_str(row.job_url.as_ref())
    } else {
        direct
    };
    let url = canonical_url(&url_raw);

    let min_amount = to_int_safe(row.min_amount.as_ref());
    let max_amount = to_int_safe(row.max_amount.as_ref());
    let currency = clean_str(row.currency.as_ref());
    let interval = clean_str(row.interval.as_ref());
    let salary = salary_str(min_amount, max_amount, &currency, &interval);

    JobRecord {
        title: or_unknown(clean_str(row.title.as_ref())),
        company: or_unknown(clean_str(row.company.as_ref())),
        location: or_unknown(clean_str(row.location.as_ref())),
        site: or_unknown(clean_str(row.site.as_ref())),
        date_posted: display_date(&clean_str(row.date_posted.as_ref())),
        job_type: or_unknown(clean_str(row.job_type.as_ref())),
        remote: to_remote(row.is_remote.as_ref()),
        salary,
        min_amount,
        max_amount,
        currency,
        interval,
        url,
        url_raw,
        description: truncate_description(&clean_str(row.description.as_ref())),
    }
}

/// Remove duplicates within one batch, keeping arrival order.
///
/// A record with a non-empty canonical URL is dropped when that URL was
/// already kept. A record without one is dropped when any kept record
/// shares its (title, company, location) triple. First occurrence wins.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut kept: Vec<JobRecord> = Vec::new();

    for record in records {
        if record.url.is_empty() {
            if kept.iter().any(|k| k.identity_key() == record.identity_key()) {
                continue;
            }
            kept.push(record);
        } else if seen_urls.insert(record.url.clone()) {
            kept.push(record);
        }
    }
    kept
}

/// Normalize a raw batch and remove duplicates.
pub fn normalize(rows: Vec<RawJobRow>) -> Vec<JobRecord> {
    dedupe(rows.iter().map(normalize_row).collect())
}
