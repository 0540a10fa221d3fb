use crate::cancel::{CancelReason, CancelSignal, Cancellation};
use crate::config::DuplicatorConfig;
use crate::job::ScanJob;
use crate::report::RunStatus;
use crate::state::{RunState, StateTracker};
use domain_records::Record;
use domain_store::{RecordCursor, RecordStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub progress_every: u64,
}

impl From<&DuplicatorConfig> for ScanOptions {
    fn from(config: &DuplicatorConfig) -> Self {
        Self {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            progress_every: config.progress_every,
        }
    }
}

/// What a finished (or cancelled) scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Records pulled from the stream, decoded, and enqueued
    pub scanned: u64,

    /// Records a worker finished without error
    pub processed: u64,

    /// Records left in the queue when cancellation stopped the workers
    pub unchecked: u64,

    /// Cancellation recorded by the time the workers joined, if any
    pub cancellation: Option<Cancellation>,
}

impl ScanOutcome {
    pub fn is_clean(&self) -> bool {
        self.cancellation.is_none()
    }

    pub fn status(&self) -> RunStatus {
        self.cancellation
            .as_ref()
            .map_or(RunStatus::Completed, |c| RunStatus::from_cancel_reason(c.reason))
    }
}

/// Single producer over the store's record stream feeding a fixed worker pool through a
/// bounded queue.
pub struct ScanCoordinator<S: ?Sized> {
    store: Arc<S>,
    options: ScanOptions,
    signal: CancelSignal,
    state: StateTracker,
}

impl<S> ScanCoordinator<S>
where
    S: RecordStore + ?Sized + 'static,
{
    pub fn new(
        store: Arc<S>,
        options: ScanOptions,
        signal: CancelSignal,
        state: StateTracker,
    ) -> Self {
        Self {
            store,
            options,
            signal,
            state,
        }
    }

    /// Run `job` over every record in the store.
    ///
    /// Returns once the stream is exhausted or cancelled, the queue is closed, and every
    /// worker has joined.
    pub async fn scan<J: ScanJob>(&self, job: Arc<J>) -> ScanOutcome {
        let workers = self.options.workers.max(1);
        let (tx, rx) = mpsc::channel::<Record>(self.options.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        // Workers exist before the first read so nothing produced waits on a spawn.
        let mut pool = JoinSet::new();
        for index in 0..workers {
            pool.spawn(worker_loop(
                index,
                queue.clone(),
                job.clone(),
                self.signal.clone(),
            ));
        }
        log::info!("Started {workers} {} worker(s)", job.name());

        // Publishes the cancellation when it fires, even after the stream is exhausted.
        let cancel_watch = tokio::spawn({
            let signal = self.signal.clone();
            let state = self.state.clone();
            async move {
                signal.cancelled().await;
                state.advance(RunState::Cancelling);
            }
        });

        let scanned = self.produce(&tx).await;
        drop(tx);

        let mut processed = 0u64;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(count) => processed += count,
                Err(err) => {
                    log::error!("{} worker task failed: {err}", job.name());
                    self.signal
                        .trigger(CancelReason::Fatal, format!("worker task failed: {err}"));
                }
            }
        }

        cancel_watch.abort();
        if self.signal.is_cancelled() {
            self.state.advance(RunState::Cancelling);
        }
        self.state.advance(RunState::Draining);

        let mut unchecked = 0u64;
        {
            let mut rx = queue.lock().await;
            while rx.try_recv().is_ok() {
                unchecked += 1;
            }
        }
        if unchecked > 0 {
            log::warn!("{unchecked} queued record(s) were left unchecked after cancellation");
        }

        let cancellation = self.signal.cause();
        match &cancellation {
            None => log::info!("Scan finished: {scanned} scanned, {processed} processed"),
            Some(c) => log::warn!(
                "Scan stopped ({}): {scanned} scanned, {processed} processed",
                c.reason
            ),
        }

        ScanOutcome {
            scanned,
            processed,
            unchecked,
            cancellation,
        }
    }

    async fn produce(&self, tx: &mpsc::Sender<Record>) -> u64 {
        let mut cursor: Box<dyn RecordCursor> = match self.store.stream_all().await {
            Ok(cursor) => cursor,
            Err(err) => {
                log::error!("Failed to open record stream: {err}");
                self.signal.trigger(
                    CancelReason::StreamError,
                    format!("failed to open record stream: {err}"),
                );
                return 0;
            }
        };

        log::info!("Reading records...");
        let mut scanned = 0u64;
        loop {
            if self.signal.is_cancelled() {
                break;
            }

            let item = tokio::select! {
                biased;
                () = self.signal.cancelled() => break,
                item = cursor.next() => item,
            };
            let Some(item) = item else {
                log::info!("Record stream exhausted after {scanned} records");
                break;
            };

            let raw = match item {
                Ok(raw) => raw,
                Err(err) => {
                    log::error!("Cursor failed after {scanned} records: {err}");
                    self.signal
                        .trigger(CancelReason::StreamError, format!("cursor failed: {err}"));
                    break;
                }
            };

            let record = match Record::decode(raw) {
                Ok(record) => record,
                Err(err) => {
                    log::error!("Failed to decode record #{scanned}: {err}");
                    self.signal.trigger(
                        CancelReason::MalformedRecord,
                        format!("record #{scanned}: {err}"),
                    );
                    break;
                }
            };
            if let Err(err) = record.check_schema() {
                log::error!("Malformed record #{scanned}: {err}");
                self.signal.trigger(
                    CancelReason::MalformedRecord,
                    format!("record #{scanned}: {err}"),
                );
                break;
            }

            if self.options.progress_every > 0 && scanned % self.options.progress_every == 0 {
                log::info!("Reading record #{scanned}...");
            }

            // Blocks while the queue is full.
            tokio::select! {
                biased;
                () = self.signal.cancelled() => break,
                sent = tx.send(record) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
            scanned += 1;
        }
        scanned
    }
}

async fn worker_loop<J: ScanJob>(
    index: usize,
    queue: Arc<Mutex<mpsc::Receiver<Record>>>,
    job: Arc<J>,
    signal: CancelSignal,
) -> u64 {
    log::debug!("{} worker #{index:02} started", job.name());
    let _guard = PanicGuard {
        signal: &signal,
        name: job.name(),
        index,
    };
    let mut processed = 0u64;

    loop {
        if signal.is_cancelled() {
            break;
        }

        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                () = signal.cancelled() => None,
                record = rx.recv() => record,
            }
        };
        let Some(record) = next else {
            break;
        };

        if let Err(err) = job.process(record).await {
            log::error!("{} worker #{index:02}: {err}", job.name());
            signal.trigger(err.cancel_reason(), err.to_string());
            break;
        }
        processed += 1;
    }

    log::debug!(
        "{} worker #{index:02} stopped after {processed} record(s)",
        job.name()
    );
    processed
}

/// Cancels the run if a worker unwinds, so the producer never blocks on a queue nobody drains.
struct PanicGuard<'a> {
    signal: &'a CancelSignal,
    name: &'static str,
    index: usize,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.signal.trigger(
                CancelReason::Fatal,
                format!("{} worker #{:02} panicked", self.name, self.index),
            );
        }
    }
}

/// Convenience wrapper: scan `store` with `job` using the pool settings from `config`.
pub async fn scan_store<S, J>(
    store: Arc<S>,
    config: &DuplicatorConfig,
    signal: CancelSignal,
    job: Arc<J>,
) -> ScanOutcome
where
    S: RecordStore + ?Sized + 'static,
    J: ScanJob,
{
    let state = StateTracker::new();
    let coordinator = ScanCoordinator::new(store, ScanOptions::from(config), signal, state.clone());
    let outcome = coordinator.scan(job).await;
    state.advance(RunState::Done);
    outcome
}
