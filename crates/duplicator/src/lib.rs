//! # Domain Duplicator
//!
//! Finds and repairs records that share a `(domain, tld, sub)` key.
//!
//! ## Pipeline
//!
//! ```text
//! RecordStore::stream_all()
//!     │
//!     ├──> Scan coordinator (single producer, decode + schema check)
//!     │      └─> bounded queue (backpressure)
//!     │
//!     ├──> N duplicate checkers (one count query per record)
//!     │      └─> DuplicateSet (first exemplar per key)
//!     │
//!     └──> Repair phase (sequential: delete all, reinsert one, verify count == 1)
//!            └─> RunReport
//! ```
//!
//! Any fatal condition (store error, anomaly, decode/schema failure, stream error) triggers
//! the shared [`CancelSignal`]; the producer stops pulling, workers stop dequeuing, and the
//! repair phase is skipped.
//!
//! ## Example
//!
//! ```no_run
//! use domain_duplicator::{DuplicatePipeline, DuplicatorConfig};
//! use domain_store::JsonlStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(JsonlStore::open("domains.jsonl").await?);
//!     let pipeline = DuplicatePipeline::new(store.clone(), DuplicatorConfig::default());
//!     let report = pipeline.run().await;
//!
//!     println!("{}", report.render_text());
//!     store.persist().await?;
//!     std::process::exit(report.exit_code());
//! }
//! ```

mod cancel;
mod checker;
mod config;
mod error;
mod export;
mod inspect;
mod job;
mod pipeline;
mod repair;
mod report;
mod scan;
mod state;
mod unique;

pub use cancel::{CancelReason, CancelSignal, Cancellation, InterruptHandle};
pub use checker::{DuplicateChecker, DuplicateSet, Verdict};
pub use config::{
    default_workers, DuplicatorConfig, DEFAULT_PROGRESS_EVERY, DEFAULT_QUEUE_CAPACITY,
    WORKERS_ENV,
};
pub use error::{DuplicatorError, Result};
pub use export::DomainExporter;
pub use inspect::{FindingKind, InspectFinding, Inspector};
pub use job::ScanJob;
pub use pipeline::DuplicatePipeline;
pub use repair::{RepairFailure, RepairOutcome, RepairPhase};
pub use report::{RunReport, RunStatus};
pub use scan::{scan_store, ScanCoordinator, ScanOptions, ScanOutcome};
pub use state::{RunState, StateTracker};
pub use unique::{UniqueCollector, UniqueCounts, UniqueSets};
