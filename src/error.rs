use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type covering the different failure cases that can occur while the
/// pipeline lists, reads, consolidates, cleans, or forecasts sensor data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Wrapper for IO failures such as listing folders or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// The environment variable expected to hold credentials is unset or empty.
    #[error("{var} environment variable is not set")]
    MissingCredentials { var: String },

    /// The credentials payload is not a JSON object.
    #[error("{var} is not a valid JSON object: {reason}")]
    InvalidCredentials { var: String, reason: String },

    /// The credentials payload lacks one of the required fields.
    #[error("{var} is missing required field: {field}")]
    MissingCredentialField { var: String, field: String },

    /// Raised when a pipeline or CLI parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested folder does not exist in the store.
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// The requested spreadsheet does not exist in the store.
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    /// A location folder whose name has no `_`-delimited second segment.
    #[error("malformed location folder name '{name}': expected '<prefix>_<location>'")]
    MalformedLocationFolder { name: String },

    /// A timestamp that could not be parsed under the strict policy.
    #[error("unparseable timestamp '{value}' for location {location}")]
    UnparseableTimestamp { value: String, location: String },

    /// A location that does not appear in the cleaned dataset.
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    /// Too few observations to fit a model or run a diagnostic.
    #[error("insufficient data for {what}: need at least {needed} observations, got {actual}")]
    InsufficientData {
        what: String,
        needed: usize,
        actual: usize,
    },

    /// A least-squares system without a unique solution.
    #[error("singular system while {0}")]
    SingularSystem(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
