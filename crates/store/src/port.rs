use crate::error::Result;
use async_trait::async_trait;
use domain_records::DomainKey;

/// A stored document exactly as the backend hands it out. Decoding is the caller's job.
pub type RawRecord = serde_json::Value;

/// Forward-only cursor over the whole collection.
///
/// Dropping a cursor abandons the stream.
#[async_trait]
pub trait RecordCursor: Send {
    /// Next raw document, `None` on exhaustion. An `Err` is terminal for the cursor.
    async fn next(&mut self) -> Option<Result<RawRecord>>;
}

/// Read/write capability over the domain collection.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a cursor over every stored document, unfiltered.
    async fn stream_all(&self) -> Result<Box<dyn RecordCursor>>;

    /// Total number of stored documents.
    async fn count_all(&self) -> Result<u64>;

    /// Number of documents whose `(domain, tld, sub)` equals `key`.
    async fn count_matching(&self, key: &DomainKey) -> Result<u64>;

    /// Delete every document matching `key`; returns how many were removed.
    async fn delete_matching(&self, key: &DomainKey) -> Result<u64>;

    /// Insert `full_domain` through the normal insertion path.
    ///
    /// The domain is parsed and normalized first; inserting a key that is already present
    /// is a no-op.
    async fn insert_canonical(&self, full_domain: &str) -> Result<()>;
}
