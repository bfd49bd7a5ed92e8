//! Date normalization
//!
//! Parses configured columns into dates and date-times. The rules depend on
//! the vendor:
//!
//! - `vendor_b`: `MM/DD/YYYY`; anything else becomes null.
//! - `vendor_a`: nulls are first replaced by [`SENTINEL`]. Issue-date columns
//!   are compact `YYYYMMDD` dates and fall back to null. Every other column is
//!   cut to its first 19 characters and parsed as a date-time; a value that
//!   does not parse stops the run.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::config::VendorTag;
use crate::derive::truncate;
use crate::error::{Error, Result};
use crate::table::{render_text, require};

/// Placeholder written into null vendor_a date cells before parsing
pub const SENTINEL: &str = "19009999";

/// vendor_a date-time values are cut to this many characters
const DATETIME_PREFIX: usize = 19;

/// vendor_a columns containing this marker are compact issue dates
const ISSUE_MARKER: &str = "Issue";

const US_DATE: &str = "%m/%d/%Y";

// `%.f` also accepts a value with no fractional part
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m-%d-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M",
    "%b %d, %Y %H:%M:%S",
];

// chrono reads full and abbreviated month names for both `%b` and `%B`
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%d-%b-%Y",
];

/// Normalize every date column for the vendor.
pub fn normalize_dates<S: AsRef<str>>(
    mut df: DataFrame,
    columns: &[S],
    vendor: VendorTag,
) -> Result<DataFrame> {
    for name in columns {
        let name = name.as_ref();
        let column = require(&df, name, "date normalization")?;
        if column.dtype().is_temporal() {
            tracing::debug!("Column '{}' already holds {} values", name, column.dtype());
            continue;
        }

        let before = column.null_count();
        let text = render_text(column)?;
        let parsed = match vendor {
            VendorTag::VendorB => {
                let dates = text.into_iter().map(|v| v.and_then(parse_us_date));
                DateChunked::from_naive_date_options(name.into(), dates).into_series()
            }
            VendorTag::VendorA if name.contains(ISSUE_MARKER) => {
                let dates = text
                    .into_iter()
                    .map(|v| parse_compact_date(v.unwrap_or(SENTINEL)));
                DateChunked::from_naive_date_options(name.into(), dates).into_series()
            }
            VendorTag::VendorA => {
                let stamps = text
                    .into_iter()
                    .enumerate()
                    .map(|(row, v)| parse_strict_datetime(v, name, row).map(Some))
                    .collect::<Result<Vec<_>>>()?;
                DatetimeChunked::from_naive_datetime_options(
                    name.into(),
                    stamps,
                    TimeUnit::Microseconds,
                )
                .into_series()
            }
        };

        let lost = parsed.null_count().saturating_sub(before);
        if lost > 0 {
            tracing::warn!(
                "Column '{}': {} value(s) could not be parsed as dates and were set to null",
                name,
                lost
            );
        }
        df.with_column(parsed)?;
    }
    tracing::info!("Normalized {} date column(s) for {}", columns.len(), vendor);
    Ok(df)
}

fn parse_us_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), US_DATE).ok()
}

fn parse_strict_datetime(value: Option<&str>, column: &str, row: usize) -> Result<NaiveDateTime> {
    let text = value.unwrap_or(SENTINEL);
    parse_datetime(&truncate(text, DATETIME_PREFIX)).ok_or_else(|| Error::DateParse {
        column: column.to_string(),
        row,
        value: text.to_string(),
    })
}

/// Parse `YYYYMMDD`; month and day must form a real calendar date.
pub fn parse_compact_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text[0..4].parse().ok()?;
    let month: u32 = text[4..6].parse().ok()?;
    let day: u32 = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a date-time in any of the accepted layouts; date-only values are
/// taken at midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .or_else(|| parse_compact_date(text))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
