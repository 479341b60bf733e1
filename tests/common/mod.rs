//! Fixtures shared by the integration tests.

use std::path::Path;

use compost_forecast::model::{CanonicalRow, RawTable, TaggedRow};
use rust_xlsxwriter::Workbook;

/// Builds a raw worksheet from string literals.
#[allow(dead_code)]
pub fn table(rows: &[&[&str]]) -> RawTable {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// A worksheet with a header row followed by `(Timestamp, Temp01)` rows.
#[allow(dead_code)]
pub fn sensor_sheet(readings: &[(&str, &str)]) -> RawTable {
    let mut rows = vec![vec![
        "Timestamp".to_string(),
        "Temp01".to_string(),
        "Hum01".to_string(),
    ]];
    rows.extend(
        readings
            .iter()
            .map(|(timestamp, temp)| vec![timestamp.to_string(), temp.to_string(), "40".to_string()]),
    );
    rows
}

/// A tagged row carrying only `Timestamp` and `Temp01`.
#[allow(dead_code)]
pub fn reading(location: &str, timestamp: &str, temp: &str) -> TaggedRow {
    TaggedRow::new(
        location,
        CanonicalRow::from_pairs([("Timestamp", timestamp), ("Temp01", temp)]),
    )
}

/// Writes an `.xlsx` workbook; blank cells are left unwritten.
#[allow(dead_code)]
pub fn write_xlsx(path: &Path, sheets: &[(&str, RawTable)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("sheet named");
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row_idx as u32, col_idx as u16, cell)
                    .expect("cell written");
            }
        }
    }
    workbook.save(path).expect("workbook saved");
}

/// Deterministic noise in `[-0.5, 0.5)`.
#[allow(dead_code)]
pub fn pseudo_noise(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5
        })
        .collect()
}
