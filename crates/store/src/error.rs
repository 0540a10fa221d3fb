use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Write failed: {0}")]
    WriteError(String),

    #[error("Record error: {0}")]
    RecordError(#[from] domain_records::RecordError),

    #[error("{0}")]
    Other(String),
}
