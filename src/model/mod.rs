use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of columns in the canonical sensor schema.
pub const COLUMN_COUNT: usize = 17;

/// The fixed, ordered schema every worksheet is normalised to. Downstream
/// consumers rely on both the names and the order.
pub const CANONICAL_COLUMNS: [&str; COLUMN_COUNT] = [
    "Timestamp",
    "Number of Worms (non-counted)",
    "Phosphorous01",
    "Phosphorous02",
    "Nitrogen01",
    "Nitrogen02",
    "Potassium01",
    "Potassium02",
    "Light Intensity",
    "Temp01",
    "Hum01",
    "Heat01",
    "SoilM01",
    "SoilM02",
    "Buzzer",
    "pH Rod 1",
    "pH Rod 2",
];

/// Position of `Timestamp` within [`CANONICAL_COLUMNS`].
pub const TIMESTAMP_INDEX: usize = 0;
/// Position of `Temp01` within [`CANONICAL_COLUMNS`].
pub const TEMP01_INDEX: usize = 9;
/// Name of the column appended by the consolidator.
pub const LOCATION_COLUMN: &str = "Location";

/// A worksheet as returned by the sheet reader: rows of string cells. Rows
/// may be ragged.
pub type RawTable = Vec<Vec<String>>;

/// A folder or spreadsheet as reported by a storage listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub name: String,
}

impl Entry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One row in the canonical schema. `None` is the null marker used for
/// blank cells and for columns the source worksheet does not carry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalRow {
    values: [Option<String>; COLUMN_COUNT],
}

impl CanonicalRow {
    /// Creates a row where every field holds the null marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(column, value)` pairs; unknown column names are
    /// ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut row = Self::new();
        for (column, value) in pairs {
            if let Some(index) = column_index(column) {
                row.values[index] = Some(value.to_string());
            }
        }
        row
    }

    pub fn values(&self) -> &[Option<String>; COLUMN_COUNT] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|value| value.as_deref())
    }

    /// Looks a field up by its canonical column name.
    pub fn get(&self, column: &str) -> Option<&str> {
        column_index(column).and_then(|index| self.value(index))
    }

    pub fn set(&mut self, index: usize, value: Option<String>) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.value(TIMESTAMP_INDEX)
    }

    pub fn temp01(&self) -> Option<&str> {
        self.value(TEMP01_INDEX)
    }
}

/// Returns the position of `name` in the canonical schema.
pub fn column_index(name: &str) -> Option<usize> {
    CANONICAL_COLUMNS.iter().position(|column| *column == name)
}

/// A canonical row tagged with the location label of its source folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRow {
    pub location: String,
    pub fields: CanonicalRow,
}

impl TaggedRow {
    pub fn new(location: impl Into<String>, fields: CanonicalRow) -> Self {
        Self {
            location: location.into(),
            fields,
        }
    }
}

/// A row that survived every cleaning filter. The raw canonical fields are
/// kept next to the parsed values so the row can be cleaned again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    pub location: String,
    pub timestamp: NaiveDateTime,
    pub temp01: f64,
    pub fields: CanonicalRow,
}

impl CleanedRow {
    /// Returns the row in its pre-cleaning form.
    pub fn to_tagged(&self) -> TaggedRow {
        TaggedRow::new(self.location.clone(), self.fields.clone())
    }
}

/// Dimensions of a table as `(rows, columns)`.
pub fn tagged_shape(rows: &[TaggedRow]) -> (usize, usize) {
    (rows.len(), COLUMN_COUNT + 1)
}

/// Dimensions of a cleaned table as `(rows, columns)`.
pub fn cleaned_shape(rows: &[CleanedRow]) -> (usize, usize) {
    (rows.len(), COLUMN_COUNT + 1)
}
