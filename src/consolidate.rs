//! Walks the root → location folder → spreadsheet hierarchy and builds one
//! location-tagged table.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::align::{self, HeaderChoice};
use crate::error::{PipelineError, Result};
use crate::io::SheetStore;
use crate::model::{CanonicalRow, TaggedRow};

/// Rows contributed by one spreadsheet, for progress output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileShape {
    pub location: String,
    pub file: String,
    pub worksheets: usize,
    pub rows: usize,
}

/// Output of [`consolidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Consolidated {
    pub rows: Vec<TaggedRow>,
    pub files: Vec<FileShape>,
}

/// Derives the location label from a folder name such as `Center_NorthFarm`:
/// the second `_`-separated segment, which must be non-empty.
pub fn location_label(folder_name: &str) -> Result<String> {
    match folder_name.split('_').nth(1) {
        Some(label) if !label.is_empty() => Ok(label.to_string()),
        _ => Err(PipelineError::MalformedLocationFolder {
            name: folder_name.to_string(),
        }),
    }
}

/// Reads every worksheet of one spreadsheet, aligns each one and
/// concatenates them in workbook order.
pub fn read_spreadsheet<S: SheetStore + ?Sized>(
    store: &S,
    file_id: &str,
    header_row: usize,
) -> Result<(usize, Vec<CanonicalRow>)> {
    let worksheets = store.read_worksheets(file_id)?;
    let mut rows = Vec::new();
    for (index, worksheet) in worksheets.iter().enumerate() {
        let aligned = align::align_worksheet(worksheet, header_row)?;
        debug!(
            file = file_id,
            worksheet = index,
            rows = aligned.rows.len(),
            shifted = aligned.header == HeaderChoice::ConfiguredRow,
            "aligned worksheet"
        );
        rows.extend(aligned.rows);
    }
    Ok((worksheets.len(), rows))
}

/// Consolidates every spreadsheet below `root_id` into one table, in folder
/// listing order then file listing order.
///
/// Only one level of location folders is visited. A folder holding
/// spreadsheets must be named `<prefix>_<location>`; folders without
/// spreadsheets are skipped without inspecting their name.
#[instrument(level = "info", skip(store), fields(root = %root_id))]
pub fn consolidate<S: SheetStore + ?Sized>(
    store: &S,
    root_id: &str,
    header_row: usize,
) -> Result<Consolidated> {
    let folders = store.list_folders(root_id)?;
    info!(folder_count = folders.len(), "listed location folders");

    let mut rows = Vec::new();
    let mut files = Vec::new();

    for folder in &folders {
        let spreadsheets = store.list_spreadsheets(&folder.id)?;
        if spreadsheets.is_empty() {
            debug!(folder = %folder.name, "folder holds no spreadsheets");
            continue;
        }
        let location = location_label(&folder.name)?;

        for spreadsheet in &spreadsheets {
            let (worksheets, sheet_rows) = read_spreadsheet(store, &spreadsheet.id, header_row)?;
            info!(
                location = %location,
                file = %spreadsheet.name,
                worksheets,
                rows = sheet_rows.len(),
                "read spreadsheet"
            );
            files.push(FileShape {
                location: location.clone(),
                file: spreadsheet.name.clone(),
                worksheets,
                rows: sheet_rows.len(),
            });
            rows.extend(
                sheet_rows
                    .into_iter()
                    .map(|fields| TaggedRow::new(location.clone(), fields)),
            );
        }
    }

    info!(row_count = rows.len(), file_count = files.len(), "consolidated");
    Ok(Consolidated { rows, files })
}
