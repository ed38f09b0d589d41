//! Stale VOD skip rule
//!
//! Old VOD links on the special-cased host are not worth fetching or
//! displaying: the platform expires them and leaves a placeholder page behind.
//! A (row, URL) pair is stale when the URL is on that host, the row's media
//! type is the stale-eligible tag, and the row's date is older than the cutoff.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::models::Row;

/// Staleness rule settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    /// Column holding the media type tag
    pub media_type_field: String,
    /// Media type value that makes a row eligible for skipping
    pub stale_media_type: String,
    /// Date columns, checked in order; the first non-empty one is used
    pub date_fields: Vec<String>,
    /// Rows dated before `today - cutoff_months` are stale
    pub cutoff_months: u32,
    /// Host substring identifying the VOD platform
    pub host_marker: String,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            media_type_field: "Media type".to_string(),
            stale_media_type: "VOD⏳".to_string(),
            date_fields: vec![
                "Date".to_string(),
                "Added date".to_string(),
                "date".to_string(),
            ],
            cutoff_months: 2,
            host_marker: "twitch.tv".to_string(),
        }
    }
}

/// Applies [`StalenessConfig`] to rows
#[derive(Debug, Clone, Default)]
pub struct StalenessRule {
    config: StalenessConfig,
}

impl StalenessRule {
    pub fn new(config: StalenessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StalenessConfig {
        &self.config
    }

    /// Cutoff date for a run on `today`.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        subtract_months(today, self.config.cutoff_months)
    }

    /// Whether `canonical_url`, as referenced by `row`, is stale.
    pub fn is_stale(&self, row: &Row, canonical_url: &str, today: NaiveDate) -> bool {
        if !self.is_vod_host(canonical_url) {
            return false;
        }

        let media_type = row.text(&self.config.media_type_field);
        if media_type.trim() != self.config.stale_media_type {
            return false;
        }

        match self.row_date(row) {
            Some(date) => date < self.cutoff(today),
            None => false,
        }
    }

    /// A URL shared by several rows is stale only if every one of them is.
    /// A URL with no referencing rows is never stale.
    pub fn is_url_stale<'a, I>(&self, rows: I, canonical_url: &str, today: NaiveDate) -> bool
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let mut referenced = false;
        for row in rows {
            referenced = true;
            if !self.is_stale(row, canonical_url, today) {
                return false;
            }
        }
        referenced
    }

    /// Date of the first non-empty date column, if it parses.
    pub fn row_date(&self, row: &Row) -> Option<NaiveDate> {
        let value = self
            .config
            .date_fields
            .iter()
            .map(|field| row.text(field))
            .find(|value| !value.trim().is_empty())?;
        parse_row_date(&value)
    }

    fn is_vod_host(&self, canonical_url: &str) -> bool {
        Url::parse(canonical_url)
            .ok()
            .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
            .map_or(false, |host| host.contains(&self.config.host_marker))
    }
}

/// Parse an ISO-8601 date or date-time. A trailing `Z` is read as `+00:00`.
/// Date-times with an offset keep the calendar date of that offset.
pub fn parse_row_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    let value = match value.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => value.to_string(),
    };

    const WITH_OFFSET: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
    ];
    for format in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(&value, format) {
            return Some(dt.date_naive());
        }
    }

    const NAIVE: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&value, format) {
            return Some(dt.date());
        }
    }

    None
}

/// `date` minus `months` calendar months, clamping the day to the length of
/// the target month (Mar 31 - 1 month = Feb 28/29).
pub fn subtract_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOD_URL: &str = "https://www.twitch.tv/videos/123456";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vod_row(date: &str) -> Row {
        Row::from_pairs([("Media type", "VOD⏳"), ("Date", date)])
    }

    #[test]
    fn test_old_vod_is_stale() {
        let rule = StalenessRule::default();
        let today = day(2024, 6, 15);

        assert!(rule.is_stale(&vod_row("2024-02-15"), VOD_URL, today));
        assert!(!rule.is_stale(&vod_row("2024-05-15"), VOD_URL, today));
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        let rule = StalenessRule::default();
        let today = day(2024, 6, 15);

        assert!(!rule.is_stale(&vod_row("2024-04-15"), VOD_URL, today));
        assert!(rule.is_stale(&vod_row("2024-04-14"), VOD_URL, today));
    }

    #[test]
    fn test_other_media_type_never_stale() {
        let rule = StalenessRule::default();
        let row = Row::from_pairs([("Media type", "Clip"), ("Date", "2019-01-01")]);
        assert!(!rule.is_stale(&row, VOD_URL, day(2024, 6, 15)));

        let row = Row::from_pairs([("Media type", "VOD"), ("Date", "2019-01-01")]);
        assert!(!rule.is_stale(&row, VOD_URL, day(2024, 6, 15)));
    }

    #[test]
    fn test_other_host_never_stale() {
        let rule = StalenessRule::default();
        let row = vod_row("2019-01-01");
        assert!(!rule.is_stale(
            &row,
            "https://www.youtube.com/watch?v=abc123",
            day(2024, 6, 15)
        ));
        assert!(!rule.is_stale(&row, "not a url", day(2024, 6, 15)));
    }

    #[test]
    fn test_missing_or_bad_date_not_stale() {
        let rule = StalenessRule::default();
        let today = day(2024, 6, 15);

        let no_date = Row::from_pairs([("Media type", "VOD⏳")]);
        assert!(!rule.is_stale(&no_date, VOD_URL, today));
        assert!(!rule.is_stale(&vod_row("last spring"), VOD_URL, today));
    }

    #[test]
    fn test_first_non_empty_date_column_wins() {
        let rule = StalenessRule::default();
        let today = day(2024, 6, 15);

        let row = Row::from_pairs([
            ("Media type", "VOD⏳"),
            ("Date", ""),
            ("Added date", "2023-01-01"),
        ]);
        assert!(rule.is_stale(&row, VOD_URL, today));

        // An unparseable first candidate is not skipped over.
        let row = Row::from_pairs([
            ("Media type", "VOD⏳"),
            ("Date", "n/a"),
            ("Added date", "2023-01-01"),
        ]);
        assert!(!rule.is_stale(&row, VOD_URL, today));
    }

    #[test]
    fn test_all_rows_must_be_stale() {
        let rule = StalenessRule::default();
        let today = day(2024, 6, 15);
        let old = vod_row("2024-01-01");
        let fresh = vod_row("2024-06-01");

        assert!(rule.is_url_stale([&old, &old], VOD_URL, today));
        assert!(!rule.is_url_stale([&old, &fresh], VOD_URL, today));
        assert!(!rule.is_url_stale(std::iter::empty::<&Row>(), VOD_URL, today));
    }

    #[test]
    fn test_configurable_cutoff() {
        let rule = StalenessRule::new(StalenessConfig {
            cutoff_months: 6,
            ..StalenessConfig::default()
        });
        let today = day(2024, 6, 15);
        assert!(!rule.is_stale(&vod_row("2024-02-15"), VOD_URL, today));
        assert!(rule.is_stale(&vod_row("2023-12-01"), VOD_URL, today));
    }

    #[test]
    fn test_parse_row_date_formats() {
        assert_eq!(parse_row_date("2024-03-09"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date("2024-03-09T10:30:00"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date("2024-03-09 10:30:00"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date("2024-03-09T10:30:00.250"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date("2024-03-09T23:30:00Z"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date("2024-03-09T23:30:00-05:00"), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date(" 2024-03-09 "), Some(day(2024, 3, 9)));
        assert_eq!(parse_row_date(""), None);
        assert_eq!(parse_row_date("09/03/2024"), None);
        assert_eq!(parse_row_date("2024-02-30"), None);
    }

    #[test]
    fn test_subtract_months_clamps_day() {
        assert_eq!(subtract_months(day(2024, 3, 31), 1), day(2024, 2, 29));
        assert_eq!(subtract_months(day(2023, 3, 31), 1), day(2023, 2, 28));
        assert_eq!(subtract_months(day(2024, 1, 31), 1), day(2023, 12, 31));
        assert_eq!(subtract_months(day(2024, 2, 15), 2), day(2023, 12, 15));
        assert_eq!(subtract_months(day(2024, 7, 31), 14), day(2023, 5, 31));
        assert_eq!(subtract_months(day(2024, 5, 10), 0), day(2024, 5, 10));
    }
}
