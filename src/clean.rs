//! Row filtering and type coercion for the consolidated table.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{PipelineError, Result};
use crate::model::{CleanedRow, TaggedRow};

/// Readings stamped before this year come from sensors with a bad clock.
pub const DEFAULT_MIN_YEAR: i32 = 2024;

/// Markers of header or unit rows that were read as data.
const HEADER_MARKERS: [&str; 2] = ["Unit", "Timestamp"];

const DATETIME_FORMATS: [&str; 14] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%d %I:%M:%S %p",
    "%Y/%m/%d %I:%M %p",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// What to do with a timestamp that cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Fail the whole run on the first unparseable timestamp.
    #[default]
    Strict,
    /// Drop the row and count it in the report.
    DropRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningOptions {
    pub timestamp_policy: TimestampPolicy,
    pub min_year: i32,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            timestamp_policy: TimestampPolicy::Strict,
            min_year: DEFAULT_MIN_YEAR,
        }
    }
}

/// Rows removed by each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub missing_required: usize,
    pub header_or_unit: usize,
    pub null_timestamp: usize,
    pub bad_timestamp: usize,
    pub unparseable_temperature: usize,
    pub non_positive_temperature: usize,
    pub before_min_year: usize,
    pub output_rows: usize,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.input_rows - self.output_rows
    }
}

enum Verdict {
    Keep(CleanedRow),
    MissingRequired,
    HeaderOrUnit,
    NullTimestamp,
    BadTimestamp,
    UnparseableTemperature,
    NonPositiveTemperature,
    BeforeMinYear,
}

/// Cleans the consolidated table and returns a new table with a report of
/// what was dropped.
///
/// Steps, applied in order to each row:
/// 1. drop rows with a null `Timestamp` or `Temp01`;
/// 2. drop rows whose `Timestamp` contains `Unit` or `Timestamp`;
/// 3. drop rows whose `Timestamp` is null;
/// 4. parse `Timestamp` (see [`TimestampPolicy`]);
/// 5. parse `Temp01`, failures become null;
/// 6. keep rows with `Temp01 > 0`, nulls excluded;
/// 7. drop rows stamped before `min_year`.
#[instrument(
    level = "info",
    skip_all,
    fields(rows = rows.len(), policy = ?options.timestamp_policy, min_year = options.min_year)
)]
pub fn clean(
    rows: &[TaggedRow],
    options: &CleaningOptions,
) -> Result<(Vec<CleanedRow>, CleaningReport)> {
    let mut report = CleaningReport {
        input_rows: rows.len(),
        ..CleaningReport::default()
    };
    let mut cleaned = Vec::new();

    for row in rows {
        match clean_row(row, options)? {
            Verdict::Keep(row) => cleaned.push(row),
            Verdict::MissingRequired => report.missing_required += 1,
            Verdict::HeaderOrUnit => report.header_or_unit += 1,
            Verdict::NullTimestamp => report.null_timestamp += 1,
            Verdict::BadTimestamp => report.bad_timestamp += 1,
            Verdict::UnparseableTemperature => report.unparseable_temperature += 1,
            Verdict::NonPositiveTemperature => report.non_positive_temperature += 1,
            Verdict::BeforeMinYear => report.before_min_year += 1,
        }
    }

    report.output_rows = cleaned.len();
    info!(
        output_rows = report.output_rows,
        dropped = report.dropped(),
        "cleaned dataset"
    );
    Ok((cleaned, report))
}

fn clean_row(row: &TaggedRow, options: &CleaningOptions) -> Result<Verdict> {
    let (Some(raw_timestamp), Some(raw_temp)) = (row.fields.timestamp(), row.fields.temp01())
    else {
        return Ok(Verdict::MissingRequired);
    };

    if HEADER_MARKERS
        .iter()
        .any(|marker| raw_timestamp.contains(marker))
    {
        return Ok(Verdict::HeaderOrUnit);
    }

    if raw_timestamp.trim().is_empty() {
        return Ok(Verdict::NullTimestamp);
    }

    let Some(timestamp) = parse_timestamp(raw_timestamp) else {
        return match options.timestamp_policy {
            TimestampPolicy::Strict => Err(PipelineError::UnparseableTimestamp {
                value: raw_timestamp.to_string(),
                location: row.location.clone(),
            }),
            TimestampPolicy::DropRow => {
                debug!(value = raw_timestamp, location = %row.location, "dropping unparseable timestamp");
                Ok(Verdict::BadTimestamp)
            }
        };
    };

    let Some(temp01) = parse_temperature(raw_temp) else {
        return Ok(Verdict::UnparseableTemperature);
    };
    if temp01.is_nan() || temp01 <= 0.0 {
        return Ok(Verdict::NonPositiveTemperature);
    }

    if timestamp.year() < options.min_year {
        return Ok(Verdict::BeforeMinYear);
    }

    Ok(Verdict::Keep(CleanedRow {
        location: row.location.clone(),
        timestamp,
        temp01,
        fields: row.fields.clone(),
    }))
}

/// Parses the timestamp layouts found in the sensor sheets. Values carrying
/// an offset keep their wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses a temperature reading; anything that is not a number is `None`.
pub fn parse_temperature(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}
