use crate::error::Result;
use crate::memory::{MemoryStore, StoredDocument};
use crate::port::{RawRecord, RecordCursor, RecordStore};
use async_trait::async_trait;
use domain_records::DomainKey;
use std::path::{Path, PathBuf};

/// JSON-lines file loaded into a [`MemoryStore`] and written back on [`JsonlStore::persist`].
///
/// Lines that are not valid JSON are kept as string values so the scan reports them as
/// decode failures instead of the load silently dropping them. Every loaded line keeps its
/// original text (blank lines before it included), and `persist` writes that text back for
/// any document no write removed. Only documents inserted since the load are serialized.
pub struct JsonlStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Blank lines after the last document
    trailer: String,
}

impl JsonlStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = tokio::fs::read_to_string(&path).await?;

        let mut docs = Vec::new();
        let mut pending = String::new();
        let mut unparsed = 0usize;
        for segment in content.split_inclusive('\n') {
            let line = segment.trim();
            if line.is_empty() {
                pending.push_str(segment);
                continue;
            }
            let doc = match serde_json::from_str::<RawRecord>(line) {
                Ok(doc) => doc,
                Err(_) => {
                    unparsed += 1;
                    RawRecord::String(line.to_string())
                }
            };
            let mut source = std::mem::take(&mut pending);
            source.push_str(segment);
            docs.push(StoredDocument {
                doc,
                source: Some(source),
            });
        }

        if unparsed > 0 {
            log::warn!(
                "{} line(s) in {} are not valid JSON",
                unparsed,
                path.display()
            );
        }
        log::info!("Loaded {} documents from {}", docs.len(), path.display());

        Ok(Self {
            path,
            inner: MemoryStore::from_stored(docs),
            trailer: pending,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    pub fn documents(&self) -> Vec<RawRecord> {
        self.inner.documents()
    }

    /// Atomically rewrite the backing file with the current documents.
    pub async fn persist(&self) -> Result<()> {
        let docs = self.inner.stored_documents();
        let mut out = String::new();
        for stored in &docs {
            match (&stored.source, &stored.doc) {
                (Some(source), _) => push_line(&mut out, source),
                (None, RawRecord::String(raw)) => push_line(&mut out, raw),
                (None, doc) => push_line(&mut out, &serde_json::to_string(doc)?),
            }
        }
        if !self.trailer.is_empty() {
            push_line(&mut out, &self.trailer);
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, out).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        self.inner.mark_clean();
        log::info!("Wrote {} documents to {}", docs.len(), self.path.display());
        Ok(())
    }
}

/// Loaded source text already ends in a newline, except a final line that had none.
fn push_line(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn stream_all(&self) -> Result<Box<dyn RecordCursor>> {
        self.inner.stream_all().await
    }

    async fn count_all(&self) -> Result<u64> {
        self.inner.count_all().await
    }

    async fn count_matching(&self, key: &DomainKey) -> Result<u64> {
        self.inner.count_matching(key).await
    }

    async fn delete_matching(&self, key: &DomainKey) -> Result<u64> {
        self.inner.delete_matching(key).await
    }

    async fn insert_canonical(&self, full_domain: &str) -> Result<()> {
        self.inner.insert_canonical(full_domain).await
    }
}
