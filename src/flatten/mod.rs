use std::collections::HashSet;

use crate::io::excel_read::DATETIME_FORMAT;
use crate::model::{CANONICAL_COLUMNS, CleanedRow, LOCATION_COLUMN, TEMP01_INDEX, TIMESTAMP_INDEX};
use crate::pipeline::LocationForecast;

/// Sheet holding the cleaned dataset.
pub const DATASET_SHEET: &str = "Cleaned";
/// Date format of the forecast sheets.
pub const FORECAST_DATE_FORMAT: &str = "%Y-%m-%d";

const MAX_SHEET_NAME: usize = 31;

/// A single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Flattens the cleaned dataset into one sheet: `Location` followed by the
/// canonical columns, with `Timestamp` and `Temp01` taken from the parsed
/// values.
pub fn build_dataset_workbook(rows: &[CleanedRow]) -> WorkbookData {
    let mut columns = Vec::with_capacity(CANONICAL_COLUMNS.len() + 1);
    columns.push(LOCATION_COLUMN.to_string());
    columns.extend(CANONICAL_COLUMNS.iter().map(|column| column.to_string()));

    let rows = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(columns.len());
            cells.push(Cell::Text(row.location.clone()));
            for (index, value) in row.fields.values().iter().enumerate() {
                let cell = match index {
                    TIMESTAMP_INDEX => {
                        Cell::Text(row.timestamp.format(DATETIME_FORMAT).to_string())
                    }
                    TEMP01_INDEX => Cell::Number(row.temp01),
                    _ => value.clone().map(Cell::Text).unwrap_or(Cell::Empty),
                };
                cells.push(cell);
            }
            cells
        })
        .collect();

    WorkbookData {
        tables: vec![SheetTable {
            sheet_name: DATASET_SHEET.to_string(),
            columns,
            rows,
        }],
    }
}

/// Flattens forecasts into one `Date` / `Forecasted Temp` sheet per location.
pub fn build_forecast_workbook(forecasts: &[LocationForecast]) -> WorkbookData {
    let mut sheet_names = SheetNameRegistry::default();
    let tables = forecasts
        .iter()
        .map(|forecast| SheetTable {
            sheet_name: sheet_names.assign(&forecast.location),
            columns: vec!["Date".to_string(), "Forecasted Temp".to_string()],
            rows: forecast
                .points
                .iter()
                .map(|point| {
                    vec![
                        Cell::Text(point.date.format(FORECAST_DATE_FORMAT).to_string()),
                        Cell::Number(point.value),
                    ]
                })
                .collect(),
        })
        .collect();
    WorkbookData { tables }
}

#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix = truncate_chars(&base, MAX_SHEET_NAME - suffix.len());
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replaces characters Excel rejects in sheet names and enforces the length
/// limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "Sheet".to_string();
    }
    truncate_chars(sanitized, MAX_SHEET_NAME)
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
