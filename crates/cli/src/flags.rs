use clap::Args;
use domain_duplicator::DuplicatorConfig;

/// Worker pool knobs shared by every scanning subcommand.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct PoolArgs {
    /// Concurrent workers (default: 2 x CPU cores, or DOMAIN_TOOLS_WORKERS)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Bounded queue size between the reader and the workers
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Log a progress line every N records (0 disables)
    #[arg(long)]
    pub progress_every: Option<u64>,
}

impl PoolArgs {
    pub(crate) fn to_config(&self) -> DuplicatorConfig {
        let mut config = DuplicatorConfig::default();
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(capacity) = self.queue_capacity {
            config = config.with_queue_capacity(capacity);
        }
        if let Some(every) = self.progress_every {
            config = config.with_progress_every(every);
        }
        config
    }
}
