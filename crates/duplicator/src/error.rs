use crate::cancel::CancelReason;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DuplicatorError>;

#[derive(Error, Debug)]
pub enum DuplicatorError {
    #[error("Store error: {0}")]
    StoreError(#[from] domain_store::StoreError),

    #[error("Record error: {0}")]
    RecordError(#[from] domain_records::RecordError),

    #[error("Invalid count for {key}: {count} (record vanished mid-scan)")]
    Anomaly { key: String, count: u64 },

    #[error("Repair of {key} left {count} record(s), expected exactly 1")]
    RepairInvariant { key: String, count: u64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DuplicatorError {
    /// How a worker failing with this error cancels the run.
    pub fn cancel_reason(&self) -> CancelReason {
        match self {
            Self::RecordError(_) => CancelReason::MalformedRecord,
            _ => CancelReason::Fatal,
        }
    }
}
