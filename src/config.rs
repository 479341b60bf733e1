use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::align::DEFAULT_HEADER_ROW;
use crate::clean::CleaningOptions;
use crate::error::{PipelineError, Result};

/// Environment variable the service-account JSON is read from by default.
pub const DEFAULT_CREDENTIALS_ENV: &str = "GOOGLE_CREDENTIALS";

/// Fields a service-account payload must carry.
pub const REQUIRED_CREDENTIAL_FIELDS: [&str; 3] = ["client_email", "token_uri", "private_key"];

/// Service-account credentials for the storage backend. Only validated here;
/// exchanging them for an access token is the backend's business.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub client_email: String,
    pub token_uri: String,
    private_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl Credentials {
    /// Reads and validates the JSON payload held in the environment variable
    /// `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        let raw = std::env::var(var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| PipelineError::MissingCredentials {
                var: var.to_string(),
            })?;
        Self::from_json(var, &raw)
    }

    /// Validates a JSON payload; `source` names where it came from in error
    /// messages.
    pub fn from_json(source: &str, raw: &str) -> Result<Self> {
        let invalid = |reason: String| PipelineError::InvalidCredentials {
            var: source.to_string(),
            reason,
        };

        let value: Value = serde_json::from_str(raw).map_err(|error| invalid(error.to_string()))?;
        let Value::Object(fields) = &value else {
            return Err(invalid("expected a JSON object".to_string()));
        };

        for field in REQUIRED_CREDENTIAL_FIELDS {
            if !fields.contains_key(field) {
                return Err(PipelineError::MissingCredentialField {
                    var: source.to_string(),
                    field: field.to_string(),
                });
            }
        }

        serde_json::from_value(value).map_err(|error| invalid(error.to_string()))
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Everything the pipeline entry point needs, passed in explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Identifier of the folder holding the location folders.
    pub root_folder: String,
    /// 1-based header row handed to the schema aligner.
    pub header_row: usize,
    pub cleaning: CleaningOptions,
}

impl PipelineConfig {
    pub fn new(root_folder: impl Into<String>) -> Self {
        Self {
            root_folder: root_folder.into(),
            header_row: DEFAULT_HEADER_ROW,
            cleaning: CleaningOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_folder.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "root folder identifier is empty".to_string(),
            ));
        }
        if self.header_row == 0 {
            return Err(PipelineError::InvalidConfig(
                "header row is 1-based and must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
