use thiserror::Error;

/// Result type for record operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors produced while turning stored documents or raw strings into records
#[derive(Error, Debug)]
pub enum RecordError {
    /// The raw document could not be decoded into a record
    #[error("Decode error: {0}")]
    Decode(String),

    /// The document decoded but its decomposition is structurally empty
    #[error("Schema violation for {record}: {reason}")]
    Schema { record: String, reason: String },

    /// The parsing library rejected a domain string
    #[error("Invalid domain {input:?}: {reason}")]
    InvalidDomain { input: String, reason: String },
}

impl RecordError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn schema(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_domain(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
