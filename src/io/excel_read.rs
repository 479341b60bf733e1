use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, Result};
use crate::model::RawTable;

/// Format used when a date cell is rendered back to text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads every worksheet of an `.xlsx` workbook as raw string tables.
///
/// Cell positions are absolute: blank rows and columns in front of the used
/// range are kept as empty cells, so row `n` of the table is row `n + 1` of
/// the sheet.
pub fn read_worksheets(path: &Path) -> Result<Vec<RawTable>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().iter().cloned().collect();

    let mut tables = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = read_required_sheet(&mut workbook, name)?;
        tables.push(range_to_table(&range));
    }
    Ok(tables)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook.worksheet_range(name).ok_or_else(|| {
        PipelineError::SpreadsheetNotFound(format!("worksheet '{name}' vanished while reading"))
    })?;
    let range = range_result.map_err(PipelineError::from)?;
    Ok(range)
}

fn range_to_table(range: &Range<DataType>) -> RawTable {
    let (row_offset, col_offset) = match range.start() {
        Some((row, col)) => (row as usize, col as usize),
        None => return Vec::new(),
    };

    let mut table: RawTable = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_to_string));
        table.push(cells);
    }
    table
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => value.clone(),
        DataType::Float(value) => value.to_string(),
        DataType::Int(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::DateTime(serial) => excel_serial_to_datetime(*serial)
            .map(|datetime| datetime.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| serial.to_string()),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Converts a spreadsheet serial date (1900 date system) into a calendar
/// date-time, rounded to the nearest second.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}
