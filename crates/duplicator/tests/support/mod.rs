#![allow(dead_code)]

use async_trait::async_trait;
use domain_duplicator::InterruptHandle;
use domain_records::{DomainKey, Record};
use domain_store::{MemoryStore, RawRecord, RecordCursor, RecordStore, Result, StoreError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory store with injectable faults and call counters.
pub struct ScriptedStore {
    pub inner: MemoryStore,
    count_delay: Option<Duration>,
    slow_count_for: Option<(DomainKey, Duration)>,
    fail_count_for: Option<DomainKey>,
    zero_count_for: Option<DomainKey>,
    stream_error_after: Option<u64>,
    drop_insert_for: Option<String>,
    interrupt_after_counts: Option<(u64, InterruptHandle)>,
    pub count_calls: Arc<AtomicU64>,
    pub write_calls: Arc<AtomicU64>,
    pub pulled: Arc<AtomicU64>,
}

impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            count_delay: None,
            slow_count_for: None,
            fail_count_for: None,
            zero_count_for: None,
            stream_error_after: None,
            drop_insert_for: None,
            interrupt_after_counts: None,
            count_calls: Arc::new(AtomicU64::new(0)),
            write_calls: Arc::new(AtomicU64::new(0)),
            pulled: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self::new(MemoryStore::from_records(records))
    }

    pub fn count_delay(mut self, delay: Duration) -> Self {
        self.count_delay = Some(delay);
        self
    }

    /// Delay only the count queries for `key`.
    pub fn slow_count_for(mut self, key: DomainKey, delay: Duration) -> Self {
        self.slow_count_for = Some((key, delay));
        self
    }

    pub fn fail_count_for(mut self, key: DomainKey) -> Self {
        self.fail_count_for = Some(key);
        self
    }

    pub fn zero_count_for(mut self, key: DomainKey) -> Self {
        self.zero_count_for = Some(key);
        self
    }

    pub fn stream_error_after(mut self, records: u64) -> Self {
        self.stream_error_after = Some(records);
        self
    }

    /// Accept inserts of `full_domain` without storing them.
    pub fn drop_insert_for(mut self, full_domain: &str) -> Self {
        self.drop_insert_for = Some(full_domain.to_string());
        self
    }

    pub fn interrupt_after_counts(mut self, calls: u64, handle: InterruptHandle) -> Self {
        self.interrupt_after_counts = Some((calls, handle));
        self
    }

    pub fn count_calls(&self) -> u64 {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn pulled(&self) -> u64 {
        self.pulled.load(Ordering::SeqCst)
    }

    pub async fn count(&self, key: &DomainKey) -> u64 {
        self.inner.count_matching(key).await.unwrap()
    }
}

struct ScriptedCursor {
    inner: Box<dyn RecordCursor>,
    pulled: Arc<AtomicU64>,
    fail_after: Option<u64>,
}

#[async_trait]
impl RecordCursor for ScriptedCursor {
    async fn next(&mut self) -> Option<Result<RawRecord>> {
        let pulled = self.pulled.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| pulled >= limit) {
            return Some(Err(StoreError::QueryError("connection reset".to_string())));
        }
        let item = self.inner.next().await;
        if item.is_some() {
            self.pulled.fetch_add(1, Ordering::SeqCst);
        }
        item
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn stream_all(&self) -> Result<Box<dyn RecordCursor>> {
        let inner = self.inner.stream_all().await?;
        Ok(Box::new(ScriptedCursor {
            inner,
            pulled: self.pulled.clone(),
            fail_after: self.stream_error_after,
        }))
    }

    async fn count_all(&self) -> Result<u64> {
        self.inner.count_all().await
    }

    async fn count_matching(&self, key: &DomainKey) -> Result<u64> {
        let calls = self.count_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, handle)) = &self.interrupt_after_counts {
            if calls == *after {
                handle.interrupt();
            }
        }
        if let Some(delay) = self.count_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((slow, delay)) = &self.slow_count_for {
            if slow == key {
                tokio::time::sleep(*delay).await;
            }
        }
        if self.fail_count_for.as_ref() == Some(key) {
            return Err(StoreError::QueryError(format!("count failed for {key}")));
        }
        if self.zero_count_for.as_ref() == Some(key) {
            return Ok(0);
        }
        self.inner.count_matching(key).await
    }

    async fn delete_matching(&self, key: &DomainKey) -> Result<u64> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_matching(key).await
    }

    async fn insert_canonical(&self, full_domain: &str) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.drop_insert_for.as_deref() == Some(full_domain) {
            return Ok(());
        }
        self.inner.insert_canonical(full_domain).await
    }
}

pub fn key(domain: &str, tld: &str, sub: &str) -> DomainKey {
    DomainKey::new(domain, tld, sub)
}

pub fn record(domain: &str, tld: &str, sub: &str) -> Record {
    Record::new(key(domain, tld, sub))
}

/// `count` distinct apex records `site{i}.com`.
pub fn distinct_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| record(&format!("site{i}"), "com", ""))
        .collect()
}
