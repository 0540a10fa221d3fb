use crate::error::{DuplicatorError, Result};
use crate::job::ScanJob;
use async_trait::async_trait;
use domain_records::{DomainKey, Record};
use domain_store::RecordStore;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Classification of one record against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Unique,
    Duplicate { copies: u64 },
    /// The record was just read, yet the store holds no copy of its key.
    Anomaly { count: u64 },
}

impl Verdict {
    pub fn classify(count: u64) -> Self {
        match count {
            0 => Self::Anomaly { count },
            1 => Self::Unique,
            copies => Self::Duplicate { copies },
        }
    }
}

/// Keys found duplicated, each with the first record that triggered the detection.
///
/// Iteration is ordered by key, which fixes the repair order for a given set.
#[derive(Debug, Clone, Default)]
pub struct DuplicateSet {
    entries: BTreeMap<DomainKey, Record>,
}

impl DuplicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this is the first detection for the record's key.
    pub fn insert(&mut self, record: Record) -> bool {
        match self.entries.entry(record.key().clone()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn contains(&self, key: &DomainKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &DomainKey) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DomainKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DomainKey, &Record)> {
        self.entries.iter()
    }
}

impl IntoIterator for DuplicateSet {
    type Item = (DomainKey, Record);
    type IntoIter = btree_map::IntoIter<DomainKey, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Worker-side duplicate check: one count query per record, no writes.
pub struct DuplicateChecker<S: ?Sized> {
    store: Arc<S>,
    duplicates: Mutex<DuplicateSet>,
    detections: AtomicU64,
    anomalies: AtomicU64,
}

impl<S> DuplicateChecker<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            duplicates: Mutex::new(DuplicateSet::new()),
            detections: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
        }
    }

    /// Count the stored copies of `record`'s key and classify.
    pub async fn check(&self, record: &Record) -> Result<Verdict> {
        let count = self.store.count_matching(record.key()).await?;
        Ok(Verdict::classify(count))
    }

    /// Number of duplicate verdicts, including repeated detections of the same key.
    pub fn detections(&self) -> u64 {
        self.detections.load(Ordering::Relaxed)
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    pub fn duplicates_found(&self) -> usize {
        self.lock().len()
    }

    /// Move the collected set out, leaving an empty one behind.
    pub fn take_duplicates(&self) -> DuplicateSet {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, DuplicateSet> {
        self.duplicates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<S> ScanJob for DuplicateChecker<S>
where
    S: RecordStore + ?Sized + 'static,
{
    fn name(&self) -> &'static str {
        "duplicate"
    }

    async fn process(&self, record: Record) -> Result<()> {
        let verdict = match self.check(&record).await {
            Ok(verdict) => verdict,
            Err(err) => {
                log::error!("Failed to count {record}: {err}");
                return Err(err);
            }
        };

        match verdict {
            Verdict::Unique => Ok(()),
            Verdict::Duplicate { copies } => {
                self.detections.fetch_add(1, Ordering::Relaxed);
                let key = record.full_domain();
                if self.lock().insert(record) {
                    log::info!("Duplicate found: {key} ({copies} copies)");
                }
                Ok(())
            }
            Verdict::Anomaly { count } => {
                self.anomalies.fetch_add(1, Ordering::Relaxed);
                Err(DuplicatorError::Anomaly {
                    key: record.full_domain(),
                    count,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn record(domain: &str, sub: &str) -> Record {
        Record::new(DomainKey::new(domain, "com", sub))
    }

    #[test]
    fn classify_by_count() {
        assert_eq!(Verdict::classify(0), Verdict::Anomaly { count: 0 });
        assert_eq!(Verdict::classify(1), Verdict::Unique);
        assert_eq!(Verdict::classify(4), Verdict::Duplicate { copies: 4 });
    }

    #[test]
    fn duplicate_set_keeps_first_exemplar() {
        let mut set = DuplicateSet::new();
        assert!(set.insert(record("a", "www")));
        assert!(!set.insert(record("a", "www")));
        assert!(set.insert(record("a", "")));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&DomainKey::new("a", "com", "www")));
    }

    #[tokio::test]
    async fn checking_a_unique_key_twice_stays_unique() {
        let store = Arc::new(MemoryStore::from_records([record("a", "www"), record("b", "")]));
        let checker = DuplicateChecker::new(store);
        let r = record("a", "www");
        assert_eq!(checker.check(&r).await.unwrap(), Verdict::Unique);
        assert_eq!(checker.check(&r).await.unwrap(), Verdict::Unique);
    }

    #[tokio::test]
    async fn repeated_detections_collapse_to_one_entry() {
        let store = Arc::new(MemoryStore::from_records([
            record("a", "www"),
            record("a", "www"),
            record("a", "www"),
        ]));
        let checker = DuplicateChecker::new(store);
        for _ in 0..3 {
            checker.process(record("a", "www")).await.unwrap();
        }
        assert_eq!(checker.detections(), 3);
        assert_eq!(checker.duplicates_found(), 1);
        assert_eq!(checker.take_duplicates().len(), 1);
        assert_eq!(checker.duplicates_found(), 0);
    }

    #[tokio::test]
    async fn zero_count_is_an_anomaly_error() {
        let store = Arc::new(MemoryStore::new());
        let checker = DuplicateChecker::new(store);
        let err = checker.process(record("gone", "x")).await.unwrap_err();
        assert!(matches!(err, DuplicatorError::Anomaly { count: 0, .. }));
        assert_eq!(checker.anomalies(), 1);
    }
}
