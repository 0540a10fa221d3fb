use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Stream open, workers checking records
    Running,
    /// Cancellation fired; no more records are pulled or dequeued
    Cancelling,
    /// Worker pool joined; leftover queued records are accounted as unchecked
    Draining,
    Repairing,
    Done,
}

#[derive(Debug, Clone)]
pub struct StateTracker {
    tx: Arc<watch::Sender<RunState>>,
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> RunState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.tx.subscribe()
    }

    /// Move to `next` if it is later than the current state.
    pub fn advance(&self, next: RunState) -> bool {
        let moved = self.tx.send_if_modified(|state| {
            if next > *state {
                *state = next;
                true
            } else {
                false
            }
        });
        if moved {
            log::debug!("Run state -> {next:?}");
        }
        moved
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
