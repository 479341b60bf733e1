//! Storage adapters. The pipeline only talks to a [`SheetStore`]; the
//! concrete stores decide where folders and spreadsheets come from.

pub mod excel_read;
pub mod excel_write;
pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::model::{Entry, RawTable};

/// Read-only view of a folder hierarchy holding spreadsheets.
///
/// Every call blocks until the backend answers. Implementations return
/// entries in a stable listing order; the consolidator preserves it.
pub trait SheetStore {
    /// Lists the folders directly inside `parent_id`.
    fn list_folders(&self, parent_id: &str) -> Result<Vec<Entry>>;

    /// Lists the spreadsheet files directly inside `parent_id`.
    fn list_spreadsheets(&self, parent_id: &str) -> Result<Vec<Entry>>;

    /// Reads every worksheet of a spreadsheet, in workbook order.
    fn read_worksheets(&self, file_id: &str) -> Result<Vec<RawTable>>;
}

impl<S: SheetStore + ?Sized> SheetStore for &S {
    fn list_folders(&self, parent_id: &str) -> Result<Vec<Entry>> {
        (**self).list_folders(parent_id)
    }

    fn list_spreadsheets(&self, parent_id: &str) -> Result<Vec<Entry>> {
        (**self).list_spreadsheets(parent_id)
    }

    fn read_worksheets(&self, file_id: &str) -> Result<Vec<RawTable>> {
        (**self).read_worksheets(file_id)
    }
}
