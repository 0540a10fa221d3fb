use crate::cancel::CancelReason;
use crate::state::RunState;
use serde::Serialize;

/// Terminal status of a run. Each variant maps to a distinct process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Interrupted,
    StreamError,
    MalformedRecord,
    Fatal,
    RepairFailed,
}

impl RunStatus {
    pub fn from_cancel_reason(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Interrupted => Self::Interrupted,
            CancelReason::StreamError => Self::StreamError,
            CancelReason::MalformedRecord => Self::MalformedRecord,
            CancelReason::Fatal => Self::Fatal,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::StreamError => 2,
            Self::MalformedRecord => 3,
            Self::Fatal => 4,
            Self::RepairFailed => 5,
            Self::Interrupted => 130,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::StreamError => "stream_error",
            Self::MalformedRecord => "malformed_record",
            Self::Fatal => "fatal",
            Self::RepairFailed => "repair_failed",
        }
    }
}

/// Counters and terminal status of a duplicate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub final_state: RunState,

    /// Records read from the store and handed to the worker pool
    pub scanned: u64,

    /// Queued records dropped because the run was cancelled
    pub unchecked: u64,

    /// Distinct keys classified as duplicates
    pub duplicates_found: u64,

    /// Keys whose repair restored exactly one stored copy
    pub duplicates_repaired: u64,

    /// Checks that counted zero copies of a record just read
    pub anomalies: u64,

    pub elapsed_ms: u64,

    /// First fatal cause or the repair failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// Full domains of every key found duplicated, in repair order
    pub duplicate_keys: Vec<String>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Human-readable summary for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Status:              {} (exit {})\n",
            self.status.as_str(),
            self.exit_code()
        ));
        out.push_str(&format!("Records scanned:     {}\n", self.scanned));
        if self.unchecked > 0 {
            out.push_str(&format!("Left unchecked:      {}\n", self.unchecked));
        }
        out.push_str(&format!("Duplicates found:    {}\n", self.duplicates_found));
        out.push_str(&format!(
            "Duplicates repaired: {}\n",
            self.duplicates_repaired
        ));
        out.push_str(&format!("Anomalies:           {}\n", self.anomalies));
        out.push_str(&format!("Elapsed:             {} ms\n", self.elapsed_ms));
        if let Some(failure) = &self.failure {
            out.push_str(&format!("Failure:             {failure}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exit_codes_are_distinct_and_zero_only_on_success() {
        let all = [
            RunStatus::Completed,
            RunStatus::Interrupted,
            RunStatus::StreamError,
            RunStatus::MalformedRecord,
            RunStatus::Fatal,
            RunStatus::RepairFailed,
        ];
        let codes: HashSet<i32> = all.iter().map(|s| s.exit_code()).collect();
        assert_eq!(codes.len(), all.len());
        for status in all {
            assert_eq!(status.exit_code() == 0, status == RunStatus::Completed);
        }
    }

    #[test]
    fn text_report_always_lists_counters() {
        let report = RunReport {
            status: RunStatus::RepairFailed,
            final_state: RunState::Done,
            scanned: 42,
            unchecked: 0,
            duplicates_found: 3,
            duplicates_repaired: 1,
            anomalies: 0,
            elapsed_ms: 7,
            failure: Some("b.example.com: post-repair count is 0".to_string()),
            duplicate_keys: vec![],
        };
        let text = report.render_text();
        assert!(text.contains("repair_failed (exit 5)"));
        assert!(text.contains("Records scanned:     42"));
        assert!(text.contains("Duplicates found:    3"));
        assert!(text.contains("Duplicates repaired: 1"));
        assert!(text.contains("Failure:"));
        assert!(!text.contains("Left unchecked"));
    }

    #[test]
    fn serializes_status_in_snake_case() {
        let value = serde_json::to_value(RunStatus::MalformedRecord).unwrap();
        assert_eq!(value, serde_json::json!("malformed_record"));
    }
}
