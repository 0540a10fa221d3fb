use crate::error::Result;
use crate::job::ScanJob;
use async_trait::async_trait;
use domain_records::Record;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Writes the full domain of every record, one per line, in whatever order workers finish.
pub struct DomainExporter {
    out: Mutex<Box<dyn Write + Send>>,
    written: AtomicU64,
}

impl DomainExporter {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            written: AtomicU64::new(0),
        }
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> Result<()> {
        self.lock().flush()?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ScanJob for DomainExporter {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn process(&self, record: Record) -> Result<()> {
        writeln!(self.lock(), "{}", record.full_domain())?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
