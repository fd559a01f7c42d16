// src/pipeline/filter.rs

//! User-side post-filters and sort orders.
//!
//! These run over rows already fetched, not in the scraper query: muting a
//! company or raising the salary floor narrows the working set without
//! another network round trip.

use chrono::{Datelike, NaiveDate};
use std::cmp::Reverse;

use crate::models::JobRecord;

/// Filters applied after the scraper call. Absent fields are no-ops;
/// present ones compose with AND semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilters {
    /// Minimum computed annual salary
    pub min_salary_annual: Option<i64>,

    /// Required salary currency, compared case-insensitively
    pub currency: Option<String>,

    /// When non-empty, only these companies are shown
    pub include_companies: Vec<String>,
}

impl PostFilters {
    pub fn is_empty(&self) -> bool {
        self.min_salary_annual.is_none()
            && self.currency.is_none()
            && self.include_companies.is_empty()
    }
}

/// Annualized salary for floor comparison. Only yearly intervals are
/// comparable; both bounds average, a single bound stands alone, anything
/// else is unknown.
pub fn annual_amount(job: &JobRecord) -> Option<i64> {
    if job.interval != "yearly" {
        return None;
    }
    match (job.min_amount, job.max_amount) {
        (Some(min), Some(max)) => Some((min + max) / 2),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

fn keeps(job: &JobRecord, muted: &[String], post: &PostFilters) -> bool {
    if !job.company.is_empty() && muted.iter().any(|m| m == &job.company) {
        return false;
    }
    if !post.include_companies.is_empty()
        && !post.include_companies.iter().any(|c| c == &job.company)
    {
        return false;
    }
    if let Some(currency) = &post.currency {
        // A currency floor only makes sense over rows that declare one.
        if job.currency.is_empty() || !job.currency.eq_ignore_ascii_case(currency) {
            return false;
        }
    }
    if let Some(floor) = post.min_salary_annual {
        match annual_amount(job) {
            Some(amount) if amount >= floor => {}
            _ => return false,
        }
    }
    true
}

/// Apply muted companies and post-filters, preserving row order.
pub fn apply_filters<'a>(
    rows: &'a [JobRecord],
    muted: &[String],
    post: &PostFilters,
) -> Vec<&'a JobRecord> {
    rows.iter().filter(|job| keeps(job, muted, post)).collect()
}

/// Supported orderings of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Salary descending; rows without amounts sort last
    Salary,
    /// Posting date descending; unparseable dates sort as oldest
    Date,
}

fn date_sort_key(display: &str) -> i64 {
    NaiveDate::parse_from_str(display, "%d.%m.%Y")
        .map(|d| i64::from(d.num_days_from_ce()))
        .unwrap_or(0)
}

/// Reorder rows in place. Stable: rows comparing equal keep their prior
/// relative order.
pub fn sort_rows(rows: &mut [JobRecord], order: SortOrder) {
    match order {
        SortOrder::Salary => rows.sort_by_key(|job| {
            Reverse((job.min_amount.unwrap_or(0), job.max_amount.unwrap_or(0)))
        }),
        SortOrder::Date => rows.sort_by_key(|job| Reverse(date_sort_key(&job.date_posted))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(company: &str, currency: &str, min: Option<i64>, max: Option<i64>) -> JobRecord {
        JobRecord {
            title: "Dev".to_string(),
            company: company.to_string(),
            location: "Berlin".to_string(),
            site: "indeed".to_string(),
            date_posted: "—".to_string(),
            job_type: "—".to_string(),
            remote: None,
            salary: "—".to_string(),
            min_amount: min,
            max_amount: max,
            currency: currency.to_string(),
            interval: "yearly".to_string(),
            url: format!("https://{}.example.com/job", company.to_lowercase()),
            url_raw: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_annual_amount() {
        assert_eq!(
            annual_amount(&job("X", "USD", Some(50_000), Some(70_000))),
            Some(60_000)
        );
        assert_eq!(annual_amount(&job("X", "USD", Some(50_000), None)), Some(50_000));
        assert_eq!(annual_amount(&job("X", "USD", None, Some(70_000))), Some(70_000));
        assert_eq!(annual_amount(&job("X", "USD", None, None)), None);

        let mut hourly = job("X", "USD", Some(50), Some(70));
        hourly.interval = "hourly".to_string();
        assert_eq!(annual_amount(&hourly), None);
    }

    #[test]
    fn test_salary_floor_composition() {
        let rows = vec![
            job("X", "USD", Some(50_000), Some(70_000)),
            job("Y", "USD", Some(20_000), Some(30_000)),
        ];
        let post = PostFilters {
            min_salary_annual: Some(50_000),
            ..PostFilters::default()
        };
        let kept = apply_filters(&rows, &[], &post);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].company, "X");
    }

    #[test]
    fn test_muted_companies_drop() {
        let rows = vec![job("Acme", "USD", None, None), job("Initech", "USD", None, None)];
        let muted = vec!["Acme".to_string()];
        let kept = apply_filters(&rows, &muted, &PostFilters::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].company, "Initech");
    }

    #[test]
    fn test_include_companies_restrict() {
        let rows = vec![job("Acme", "USD", None, None), job("Initech", "USD", None, None)];
        let post = PostFilters {
            include_companies: vec!["Initech".to_string()],
            ..PostFilters::default()
        };
        let kept = apply_filters(&rows, &[], &post);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].company, "Initech");
    }

    #[test]
    fn test_currency_filter_drops_unknown_currency() {
        let rows = vec![
            job("X", "usd", Some(60_000), None),
            job("Y", "", Some(60_000), None),
            job("Z", "EUR", Some(60_000), None),
        ];
        let post = PostFilters {
            currency: Some("USD".to_string()),
            ..PostFilters::default()
        };
        let kept = apply_filters(&rows, &[], &post);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].company, "X");
    }

    #[test]
    fn test_filters_and_semantics() {
        let rows = vec![
            job("X", "USD", Some(80_000), None),
            job("X", "EUR", Some(80_000), None),
            job("Muted", "USD", Some(80_000), None),
        ];
        let muted = vec!["Muted".to_string()];
        let post = PostFilters {
            min_salary_annual: Some(50_000),
            currency: Some("USD".to_string()),
            include_companies: vec!["X".to_string(), "Muted".to_string()],
        };
        let kept = apply_filters(&rows, &muted, &post);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].currency, "USD");
    }

    #[test]
    fn test_sort_by_salary_missing_last() {
        let mut rows = vec![
            job("A", "USD", None, None),
            job("B", "USD", Some(90_000), Some(100_000)),
            job("C", "USD", Some(40_000), None),
        ];
        sort_rows(&mut rows, SortOrder::Salary);
        let order: Vec<&str> = rows.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_sort_by_salary_is_stable_on_ties() {
        let mut rows = vec![
            job("First", "USD", Some(50_000), None),
            job("Second", "USD", Some(50_000), None),
        ];
        sort_rows(&mut rows, SortOrder::Salary);
        let order: Vec<&str> = rows.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(order, vec!["First", "Second"]);
    }

    #[test]
    fn test_sort_by_date_unparseable_oldest() {
        let mut older = job("Old", "USD", None, None);
        older.date_posted = "01.01.2026".to_string();
        let mut newer = job("New", "USD", None, None);
        newer.date_posted = "01.02.2026".to_string();
        let unknown = job("Unknown", "USD", None, None);

        let mut rows = vec![unknown, older, newer];
        sort_rows(&mut rows, SortOrder::Date);
        let order: Vec<&str> = rows.iter().map(|r| r.company.as_str()).collect();
        assert_eq!(order, vec!["New", "Old", "Unknown"]);
    }
}
