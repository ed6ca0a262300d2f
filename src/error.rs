use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Schema mismatch: missing required columns: {}", .missing.iter().join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Duplicate column in upload: {0}")]
    DuplicateColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown note field: {0}")]
    UnknownNoteField(String),

    #[error("No data uploaded")]
    NoData,

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Unknown schema version: {0}")]
    UnknownSchemaVersion(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for errors that reject an upload as a whole
    pub fn is_upload_rejection(&self) -> bool {
        matches!(
            self,
            RegistryError::SchemaMismatch { .. }
                | RegistryError::DuplicateColumn(_)
                | RegistryError::Csv(_)
                | RegistryError::Io(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
