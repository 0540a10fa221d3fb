use crate::error::Result;
use async_trait::async_trait;
use domain_records::Record;

/// Per-record work run by the scan worker pool.
///
/// An `Err` is fatal for the whole run: the worker that saw it triggers cancellation with
/// [`crate::DuplicatorError::cancel_reason`] and exits.
#[async_trait]
pub trait ScanJob: Send + Sync + 'static {
    /// Short name used in worker log lines.
    fn name(&self) -> &'static str;

    async fn process(&self, record: Record) -> Result<()>;
}
