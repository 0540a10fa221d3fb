use crate::cancel::{CancelSignal, InterruptHandle};
use crate::checker::DuplicateChecker;
use crate::config::DuplicatorConfig;
use crate::error::Result;
use crate::repair::RepairPhase;
use crate::report::{RunReport, RunStatus};
use crate::scan::{ScanCoordinator, ScanOptions};
use crate::state::{RunState, StateTracker};
use domain_records::DomainKey;
use domain_store::RecordStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Scan for duplicated keys, then repair them one key at a time.
pub struct DuplicatePipeline<S: ?Sized> {
    store: Arc<S>,
    config: DuplicatorConfig,
    signal: CancelSignal,
    state: StateTracker,
}

impl<S> DuplicatePipeline<S>
where
    S: RecordStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, config: DuplicatorConfig) -> Self {
        Self {
            store,
            config,
            signal: CancelSignal::new(),
            state: StateTracker::new(),
        }
    }

    /// Use an externally created signal (e.g. one a test store also holds).
    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.signal.interrupt_handle()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &DuplicatorConfig {
        &self.config
    }

    pub async fn run(self) -> RunReport {
        let started = Instant::now();
        log::info!(
            "Checking for duplicates with {} worker(s), queue capacity {}",
            self.config.workers,
            self.config.queue_capacity
        );

        let checker = Arc::new(DuplicateChecker::new(self.store.clone()));
        let coordinator = ScanCoordinator::new(
            self.store.clone(),
            ScanOptions::from(&self.config),
            self.signal.clone(),
            self.state.clone(),
        );
        let scan = coordinator.scan(checker.clone()).await;

        let duplicates = checker.take_duplicates();
        let duplicates_found = duplicates.len() as u64;
        let duplicate_keys: Vec<String> = duplicates.keys().map(DomainKey::full_domain).collect();
        log::info!("Checked {} records", scan.scanned);
        log::info!("Found {duplicates_found} duplicates");

        let mut status = scan.status();
        let mut failure = scan.cancellation.as_ref().map(|c| c.detail.clone());
        let mut duplicates_repaired = 0u64;

        let repair_allowed = match status {
            RunStatus::Completed => true,
            RunStatus::Interrupted => self.config.repair_after_interrupt,
            _ => false,
        };

        if self.config.dry_run {
            if duplicates_found > 0 {
                log::info!("Dry run: leaving {duplicates_found} duplicate(s) in place");
            }
        } else if !repair_allowed {
            if duplicates_found > 0 {
                log::warn!(
                    "Skipping repair of {duplicates_found} duplicate(s): scan ended with {}",
                    status.as_str()
                );
            }
        } else if !duplicates.is_empty() {
            self.state.advance(RunState::Repairing);
            let phase = RepairPhase::new(&*self.store);
            // An interrupt that already stopped the scan cannot be observed twice.
            let phase = if status == RunStatus::Completed {
                phase.with_stop_signal(&self.signal)
            } else {
                phase
            };
            let outcome = phase.run(duplicates).await;
            duplicates_repaired = outcome.repaired;

            if let Some(repair_failure) = outcome.failure {
                status = RunStatus::RepairFailed;
                failure = Some(format!(
                    "{}: {}",
                    repair_failure.key, repair_failure.reason
                ));
            } else if outcome.interrupted {
                status = RunStatus::Interrupted;
                failure = self.signal.cause().map(|c| c.detail);
            }
        }

        self.state.advance(RunState::Done);

        let report = RunReport {
            status,
            final_state: self.state.current(),
            scanned: scan.scanned,
            unchecked: scan.unchecked,
            duplicates_found,
            duplicates_repaired,
            anomalies: checker.anomalies(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            failure,
            duplicate_keys,
        };
        log::info!(
            "Run finished: {} ({} repaired of {} found)",
            report.status.as_str(),
            report.duplicates_repaired,
            report.duplicates_found
        );
        report
    }

    /// Run on a dedicated multi-threaded runtime, for callers outside tokio.
    pub fn run_blocking(self) -> Result<RunReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run()))
    }
}
