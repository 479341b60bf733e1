use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::io::SheetStore;
use crate::model::{Entry, RawTable};

/// A [`SheetStore`] held entirely in memory. Entries are listed in the order
/// they were added.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    folders: HashMap<String, Vec<Entry>>,
    spreadsheets: HashMap<String, Vec<Entry>>,
    worksheets: HashMap<String, Vec<RawTable>>,
}

impl MemoryStore {
    /// Creates a store containing only the root folder `root_id`.
    pub fn new(root_id: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.register_folder(root_id.into());
        store
    }

    /// Adds a folder below `parent_id`. Unknown parents are created.
    pub fn add_folder(&mut self, parent_id: &str, id: &str, name: &str) -> &mut Self {
        self.register_folder(parent_id.to_string());
        self.register_folder(id.to_string());
        if let Some(children) = self.folders.get_mut(parent_id) {
            children.push(Entry::new(id, name));
        }
        self
    }

    /// Adds a spreadsheet with its worksheets below `parent_id`.
    pub fn add_spreadsheet(
        &mut self,
        parent_id: &str,
        id: &str,
        name: &str,
        worksheets: Vec<RawTable>,
    ) -> &mut Self {
        self.register_folder(parent_id.to_string());
        if let Some(files) = self.spreadsheets.get_mut(parent_id) {
            files.push(Entry::new(id, name));
        }
        self.worksheets.insert(id.to_string(), worksheets);
        self
    }

    fn register_folder(&mut self, id: String) {
        self.folders.entry(id.clone()).or_default();
        self.spreadsheets.entry(id).or_default();
    }
}

impl SheetStore for MemoryStore {
    fn list_folders(&self, parent_id: &str) -> Result<Vec<Entry>> {
        self.folders
            .get(parent_id)
            .cloned()
            .ok_or_else(|| PipelineError::FolderNotFound(parent_id.to_string()))
    }

    fn list_spreadsheets(&self, parent_id: &str) -> Result<Vec<Entry>> {
        self.spreadsheets
            .get(parent_id)
            .cloned()
            .ok_or_else(|| PipelineError::FolderNotFound(parent_id.to_string()))
    }

    fn read_worksheets(&self, file_id: &str) -> Result<Vec<RawTable>> {
        self.worksheets
            .get(file_id)
            .cloned()
            .ok_or_else(|| PipelineError::SpreadsheetNotFound(file_id.to_string()))
    }
}
