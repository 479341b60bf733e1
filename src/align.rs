//! Maps raw worksheets onto the canonical column set.
//!
//! Source sheets are inconsistent: some carry a title row above the real
//! header, some do not. The aligner guesses which layout a sheet uses from a
//! single probe row. The guess is not validated and can pick the wrong row
//! when a title row is only partly filled; pin `header_row` per sheet when
//! that matters.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::model::{CANONICAL_COLUMNS, COLUMN_COUNT, CanonicalRow, RawTable};

/// Header row used when nothing else is configured (1-based).
pub const DEFAULT_HEADER_ROW: usize = 1;

/// Which row the aligner picked as the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderChoice {
    /// The probe row had a blank cell, so the configured row is the header.
    ConfiguredRow,
    /// The probe row was fully populated and is used as the header.
    RowAbove,
}

/// A worksheet projected onto the canonical schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSheet {
    pub header: HeaderChoice,
    /// 0-based index of the header row in the source table.
    pub header_index: usize,
    /// Rows below the header, in source order.
    pub rows: Vec<CanonicalRow>,
}

/// Aligns one worksheet using a 1-based `header_row`.
///
/// The probe row is the 0-based row `header_row - 1`. When any of its cells
/// is blank or missing the header is the 0-based row `header_row`, otherwise
/// the probe row itself. Rows after the header are data; columns are
/// matched by exact name, the first of duplicated names wins, missing
/// canonical columns are null and extra columns are dropped.
pub fn align_worksheet(table: &RawTable, header_row: usize) -> Result<AlignedSheet> {
    if header_row == 0 {
        return Err(PipelineError::InvalidConfig(
            "header row is 1-based and must be at least 1".to_string(),
        ));
    }

    let probe = header_row - 1;
    let (header, header_index) = if has_blank_cell(table, probe) {
        (HeaderChoice::ConfiguredRow, header_row)
    } else {
        (HeaderChoice::RowAbove, probe)
    };

    let Some(header_cells) = table.get(header_index) else {
        debug!(header_index, "worksheet has no header row");
        return Ok(AlignedSheet {
            header,
            header_index,
            rows: Vec::new(),
        });
    };

    let positions = canonical_positions(header_cells);
    let rows = table
        .iter()
        .skip(header_index + 1)
        .map(|row| project_row(row, &positions))
        .collect();

    Ok(AlignedSheet {
        header,
        header_index,
        rows,
    })
}

fn has_blank_cell(table: &RawTable, index: usize) -> bool {
    let width = table.iter().map(Vec::len).max().unwrap_or(0);
    match table.get(index) {
        Some(row) => row.len() < width || row.iter().any(|cell| is_blank(cell)),
        None => true,
    }
}

/// Source column position of every canonical column, keeping the first
/// occurrence of duplicated header names.
fn canonical_positions(header: &[String]) -> [Option<usize>; COLUMN_COUNT] {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (position, name) in header.iter().enumerate() {
        first_seen.entry(name.as_str()).or_insert(position);
    }

    let mut positions = [None; COLUMN_COUNT];
    for (slot, column) in positions.iter_mut().zip(CANONICAL_COLUMNS) {
        *slot = first_seen.get(column).copied();
    }
    positions
}

fn project_row(row: &[String], positions: &[Option<usize>; COLUMN_COUNT]) -> CanonicalRow {
    let mut canonical = CanonicalRow::new();
    for (index, position) in positions.iter().enumerate() {
        let value = position
            .and_then(|position| row.get(position))
            .filter(|cell| !is_blank(cell))
            .cloned();
        canonical.set(index, value);
    }
    canonical
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}
