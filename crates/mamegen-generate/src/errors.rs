use thiserror::Error;

/// Errors emitted by the generation engine and the writers.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A column that disallows nulls could not be resolved.
    #[error("column '{column}': {message}")]
    Column { column: String, message: String },
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("output contains characters not representable in {encoding}")]
    Unencodable { encoding: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub fn column(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Column {
            column: column.into(),
            message: message.into(),
        }
    }
}
