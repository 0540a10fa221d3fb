use crate::error::Result;
use crate::port::{RawRecord, RecordCursor, RecordStore};
use async_trait::async_trait;
use domain_records::{parse_domain, DomainKey, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Documents held in process memory.
///
/// Cursors snapshot the collection when opened, so writes made while a scan is running are
/// not observed by that scan.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<StoredDocument>>,
    dirty: AtomicBool,
}

/// A document plus the exact text it was loaded from, if any.
///
/// Documents created by a write have no source text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredDocument {
    pub doc: RawRecord,
    pub source: Option<String>,
}

impl StoredDocument {
    fn new(doc: RawRecord) -> Self {
        Self { doc, source: None }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: Vec<RawRecord>) -> Self {
        Self::from_stored(docs.into_iter().map(StoredDocument::new).collect())
    }

    pub(crate) fn from_stored(docs: Vec<StoredDocument>) -> Self {
        Self {
            docs: Mutex::new(docs),
            dirty: AtomicBool::new(false),
        }
    }

    /// Build a store from records, keeping every copy (duplicates included).
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        Self::from_documents(records.into_iter().map(|r| r.to_document()).collect())
    }

    /// Append a document verbatim, bypassing normalization and uniqueness.
    pub fn insert_raw(&self, doc: RawRecord) {
        self.lock().push(StoredDocument::new(doc));
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Copy of every stored document in storage order.
    pub fn documents(&self) -> Vec<RawRecord> {
        self.lock().iter().map(|stored| stored.doc.clone()).collect()
    }

    /// Copy of every stored document along with its source text.
    pub(crate) fn stored_documents(&self) -> Vec<StoredDocument> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any write happened since construction (or the last [`Self::mark_clean`]).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredDocument>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Equality on the key fields, read straight off the document. A missing `sub` counts as
/// the apex entry, matching how [`Record::decode`] treats it.
pub(crate) fn document_matches(doc: &RawRecord, key: &DomainKey) -> bool {
    let field = |name: &str| doc.get(name).and_then(|v| v.as_str());
    field("domain") == Some(key.domain.as_str())
        && field("tld") == Some(key.tld.as_str())
        && field("sub").unwrap_or("") == key.sub
}

struct SnapshotCursor {
    docs: std::vec::IntoIter<RawRecord>,
}

#[async_trait]
impl RecordCursor for SnapshotCursor {
    async fn next(&mut self) -> Option<Result<RawRecord>> {
        self.docs.next().map(Ok)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn stream_all(&self) -> Result<Box<dyn RecordCursor>> {
        let snapshot = self.documents();
        log::debug!("Opened snapshot cursor over {} documents", snapshot.len());
        Ok(Box::new(SnapshotCursor {
            docs: snapshot.into_iter(),
        }))
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.lock().len() as u64)
    }

    async fn count_matching(&self, key: &DomainKey) -> Result<u64> {
        let docs = self.lock();
        Ok(docs
            .iter()
            .filter(|stored| document_matches(&stored.doc, key))
            .count() as u64)
    }

    async fn delete_matching(&self, key: &DomainKey) -> Result<u64> {
        let mut docs = self.lock();
        let before = docs.len();
        docs.retain(|stored| !document_matches(&stored.doc, key));
        let removed = (before - docs.len()) as u64;
        if removed > 0 {
            self.dirty.store(true, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn insert_canonical(&self, full_domain: &str) -> Result<()> {
        let key = parse_domain(full_domain)?;
        let mut docs = self.lock();
        if docs.iter().any(|stored| document_matches(&stored.doc, &key)) {
            log::debug!("{key} already stored, insert is a no-op");
            return Ok(());
        }
        docs.push(StoredDocument::new(Record::new(key).to_document()));
        self.dirty.store(true, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn seeded() -> MemoryStore {
        MemoryStore::from_documents(vec![
            json!({"domain": "example", "tld": "com", "sub": "www"}),
            json!({"domain": "example", "tld": "com", "sub": "www", "seen": 2}),
            json!({"domain": "example", "tld": "com"}),
            json!({"domain": "other", "tld": "net", "sub": "api"}),
        ])
    }

    #[tokio::test]
    async fn counts_and_deletes_by_full_key() {
        let store = seeded();
        let www = DomainKey::new("example", "com", "www");
        let apex = DomainKey::new("example", "com", "");

        assert_eq!(store.count_all().await.unwrap(), 4);
        assert_eq!(store.count_matching(&www).await.unwrap(), 2);
        assert_eq!(store.count_matching(&apex).await.unwrap(), 1);
        assert!(!store.is_dirty());

        assert_eq!(store.delete_matching(&www).await.unwrap(), 2);
        assert_eq!(store.count_matching(&www).await.unwrap(), 0);
        assert_eq!(store.count_matching(&apex).await.unwrap(), 1);
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn insert_canonical_normalizes_and_upserts() {
        let store = MemoryStore::new();
        store.insert_canonical("WWW.Example.com.").await.unwrap();
        store.insert_canonical("www.example.com").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.documents()[0],
            json!({"domain": "example", "tld": "com", "sub": "www"})
        );
    }

    #[tokio::test]
    async fn insert_canonical_rejects_invalid_domains() {
        let store = MemoryStore::new();
        let err = store.insert_canonical("not a domain").await.unwrap_err();
        assert!(matches!(err, StoreError::RecordError(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn cursor_reads_a_snapshot() {
        let store = seeded();
        let mut cursor = store.stream_all().await.unwrap();
        store.insert_raw(json!({"domain": "late", "tld": "org"}));

        let mut seen = 0;
        while let Some(item) = cursor.next().await {
            item.unwrap();
            seen += 1;
        }
        assert_eq!(seen, 4);
        assert_eq!(store.len(), 5);
    }
}
