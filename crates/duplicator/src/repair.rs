use crate::cancel::CancelSignal;
use crate::checker::DuplicateSet;
use crate::error::{DuplicatorError, Result};
use domain_records::{DomainKey, Record};
use domain_store::RecordStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    pub attempted: u64,
    pub repaired: u64,

    /// Keys never attempted because the phase stopped early
    pub skipped: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RepairFailure>,

    /// The stop signal fired between two keys
    pub interrupted: bool,
}

/// Sequential delete / reinsert / verify over a [`DuplicateSet`].
///
/// Must only run once no scan worker is alive; it is the sole writer. The first failing key
/// stops the phase, with no rollback.
pub struct RepairPhase<'a, S: ?Sized> {
    store: &'a S,
    stop: Option<&'a CancelSignal>,
}

impl<'a, S> RepairPhase<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store, stop: None }
    }

    /// Check `signal` before each key and stop once it has fired.
    pub fn with_stop_signal(mut self, signal: &'a CancelSignal) -> Self {
        self.stop = Some(signal);
        self
    }

    pub async fn run(&self, duplicates: DuplicateSet) -> RepairOutcome {
        let total = duplicates.len() as u64;
        let mut outcome = RepairOutcome::default();
        log::info!("Repairing {total} duplicated key(s)");

        for (key, exemplar) in duplicates {
            if self.stop.is_some_and(CancelSignal::is_cancelled) {
                log::warn!("Repair stopped by interrupt before {key}");
                outcome.interrupted = true;
                break;
            }

            outcome.attempted += 1;
            match self.repair_one(&key, &exemplar).await {
                Ok(deleted) => {
                    log::debug!("Repaired {key}: removed {deleted}, kept 1");
                    outcome.repaired += 1;
                }
                Err(err) => {
                    log::error!("Failed to repair {key}: {err}; stopping repair phase");
                    outcome.failure = Some(RepairFailure {
                        key: key.full_domain(),
                        reason: err.to_string(),
                    });
                    break;
                }
            }
        }

        outcome.skipped = total - outcome.attempted;
        if outcome.skipped > 0 {
            log::warn!("{} duplicated key(s) left unrepaired", outcome.skipped);
        }
        outcome
    }

    /// Delete every copy of `key`, reinsert the exemplar through the normal insertion path,
    /// and verify exactly one copy remains. Returns how many copies were deleted.
    pub async fn repair_one(&self, key: &DomainKey, exemplar: &Record) -> Result<u64> {
        log::info!("Removing {key}...");
        let deleted = self.store.delete_matching(key).await?;
        self.store.insert_canonical(&exemplar.full_domain()).await?;

        let count = self.store.count_matching(key).await?;
        if count != 1 {
            return Err(DuplicatorError::RepairInvariant {
                key: key.full_domain(),
                count,
            });
        }
        Ok(deleted)
    }
}
