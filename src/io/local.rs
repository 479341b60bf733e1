use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::io::SheetStore;
use crate::io::excel_read;
use crate::model::{Entry, RawTable};

const SPREADSHEET_EXTENSION: &str = "xlsx";
/// Prefix of the lock files office suites leave next to open workbooks.
const LOCK_FILE_PREFIX: &str = "~$";

/// A [`SheetStore`] over a directory tree, typically a synced copy of the
/// shared drive. Identifiers are filesystem paths; entries are listed sorted
/// by name.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Identifier of the root folder, suitable for the consolidator.
    pub fn root_id(&self) -> String {
        path_id(&self.root)
    }

    fn folder(&self, parent_id: &str) -> Result<PathBuf> {
        let path = PathBuf::from(parent_id);
        if !path.is_dir() {
            return Err(PipelineError::FolderNotFound(parent_id.to_string()));
        }
        Ok(path)
    }

    fn entries(&self, parent_id: &str, keep: impl Fn(&Path) -> bool) -> Result<Vec<Entry>> {
        let folder = self.folder(parent_id)?;
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&folder)? {
            let path = dir_entry?.path();
            if !keep(&path) {
                continue;
            }
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(Entry::new(path_id(&path), name));
        }
        entries.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        debug!(folder = %folder.display(), count = entries.len(), "listed entries");
        Ok(entries)
    }
}

impl SheetStore for LocalStore {
    fn list_folders(&self, parent_id: &str) -> Result<Vec<Entry>> {
        self.entries(parent_id, |path| path.is_dir())
    }

    fn list_spreadsheets(&self, parent_id: &str) -> Result<Vec<Entry>> {
        self.entries(parent_id, is_spreadsheet)
    }

    fn read_worksheets(&self, file_id: &str) -> Result<Vec<RawTable>> {
        let path = Path::new(file_id);
        if !path.is_file() {
            return Err(PipelineError::SpreadsheetNotFound(file_id.to_string()));
        }
        excel_read::read_worksheets(path)
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let is_lock_file = path
        .file_name()
        .map(|name| name.to_string_lossy().starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false);
    let has_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(SPREADSHEET_EXTENSION))
        .unwrap_or(false);
    has_extension && !is_lock_file
}

fn path_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
