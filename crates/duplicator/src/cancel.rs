use serde::Serialize;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// External interrupt (SIGINT/SIGTERM or an [`InterruptHandle`])
    Interrupted,
    /// The record stream failed to open or failed mid-way
    StreamError,
    /// A record failed to decode or violated the schema
    MalformedRecord,
    /// Store error, anomaly, or a crashed worker
    Fatal,
}

impl CancelReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interrupted => "interrupted",
            Self::StreamError => "stream_error",
            Self::MalformedRecord => "malformed_record",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first cancellation recorded for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cancellation {
    pub reason: CancelReason,
    pub detail: String,
}

/// One-shot, run-wide cancellation signal.
///
/// Triggering is idempotent: the first trigger records its cause, later ones only return
/// `false`. Once set the signal is never cleared.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<Cancellation>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the run. Returns `true` if this call recorded the cause.
    pub fn trigger(&self, reason: CancelReason, detail: impl Into<String>) -> bool {
        // Cause first, so anyone observing the token also sees a cause.
        let first = self
            .cause
            .set(Cancellation {
                reason,
                detail: detail.into(),
            })
            .is_ok();
        self.token.cancel();
        if first {
            log::debug!("Cancellation requested ({reason})");
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn cause(&self) -> Option<Cancellation> {
        self.cause.get().cloned()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.cause.get().map(|c| c.reason)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            signal: self.clone(),
        }
    }
}

/// Handle the process shell wires to OS signals.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    signal: CancelSignal,
}

impl InterruptHandle {
    pub fn interrupt(&self) -> bool {
        self.signal
            .trigger(CancelReason::Interrupted, "interrupt signal received")
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}
