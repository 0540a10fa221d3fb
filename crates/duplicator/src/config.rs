use serde::{Deserialize, Serialize};

pub const WORKERS_ENV: &str = "DOMAIN_TOOLS_WORKERS";
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_PROGRESS_EVERY: u64 = 1_000_000;

const MAX_WORKERS: usize = 256;

/// Tuning knobs for a duplicate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicatorConfig {
    /// Number of concurrent checker workers
    pub workers: usize,

    /// Capacity of the bounded work queue between the stream reader and the workers
    pub queue_capacity: usize,

    /// Emit a progress line every this many records (0 disables)
    pub progress_every: u64,

    /// Repair the duplicates found so far when the scan was interrupted
    pub repair_after_interrupt: bool,

    /// Scan and report only; never repair
    pub dry_run: bool,
}

impl Default for DuplicatorConfig {
    fn default() -> Self {
        Self {
            workers: workers_from_env(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress_every: DEFAULT_PROGRESS_EVERY,
            repair_after_interrupt: false,
            dry_run: false,
        }
    }
}

impl DuplicatorConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_progress_every(mut self, every: u64) -> Self {
        self.progress_every = every;
        self
    }

    pub fn with_repair_after_interrupt(mut self, enabled: bool) -> Self {
        self.repair_after_interrupt = enabled;
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Two workers per available core; the work is dominated by store round-trips.
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, MAX_WORKERS)
}

fn parse_workers(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_WORKERS)
}

fn workers_from_env() -> usize {
    let raw = std::env::var(WORKERS_ENV).ok();
    parse_workers(raw.as_deref(), default_workers())
}
