use crate::error::Result;
use crate::job::ScanJob;
use async_trait::async_trait;
use domain_records::Record;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Distinct values seen across the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UniqueSets {
    pub tlds: BTreeSet<String>,
    /// Registrable domains (`domain.tld`)
    pub domains: BTreeSet<String>,
    pub full_domains: BTreeSet<String>,
    /// Non-empty subdomains only
    pub subs: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UniqueCounts {
    pub tlds: usize,
    pub domains: usize,
    pub full_domains: usize,
    pub subs: usize,
}

impl UniqueSets {
    pub fn add(&mut self, record: &Record) {
        self.tlds.insert(record.tld().to_string());
        self.domains.insert(record.registrable());
        self.full_domains.insert(record.full_domain());
        if !record.sub().is_empty() {
            self.subs.insert(record.sub().to_string());
        }
    }

    pub fn counts(&self) -> UniqueCounts {
        UniqueCounts {
            tlds: self.tlds.len(),
            domains: self.domains.len(),
            full_domains: self.full_domains.len(),
            subs: self.subs.len(),
        }
    }
}

#[derive(Debug, Default)]
pub struct UniqueCollector {
    sets: Mutex<UniqueSets>,
}

impl UniqueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> UniqueCounts {
        self.lock().counts()
    }

    pub fn take_sets(&self) -> UniqueSets {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, UniqueSets> {
        self.sets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ScanJob for UniqueCollector {
    fn name(&self) -> &'static str {
        "unique"
    }

    async fn process(&self, record: Record) -> Result<()> {
        self.lock().add(&record);
        Ok(())
    }
}
