//! Attempt records for the per-tool audit trail.
//!
//! One `AttemptRecord` covers a single pass through the pipeline; a new
//! record begins exactly when self-healing routes back to authoring.
//! Records are append-only once ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::JobState;

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// Attempt still in flight
    Running,
    /// Attempt reached validation and passed
    Passed,
    /// Attempt failed at some stage
    Failed,
}

/// Audit record of one pipeline attempt for one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Tool this attempt belongs to
    pub tool_id: String,

    /// 1-indexed attempt number within the run
    pub attempt_number: u32,

    /// Furthest state reached during the attempt
    pub stage_reached: JobState,

    /// How the attempt ended
    pub outcome: AttemptOutcome,

    /// Truncated diagnostic text if the attempt failed
    pub diagnostic_summary: Option<String>,

    /// When this attempt started
    pub started_at: DateTime<Utc>,

    /// When this attempt ended; None while in flight
    pub ended_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// Start a new attempt.
    pub fn begin(tool_id: &str, attempt_number: u32) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            attempt_number,
            stage_reached: JobState::Queued,
            outcome: AttemptOutcome::Running,
            diagnostic_summary: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Record that the attempt advanced to a new state.
    pub fn advance(&mut self, state: JobState) {
        self.stage_reached = state;
    }

    /// Mark the attempt passed.
    pub fn mark_passed(&mut self) {
        self.stage_reached = JobState::Passed;
        self.outcome = AttemptOutcome::Passed;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the attempt failed with a diagnostic.
    pub fn mark_failed(&mut self, diagnostic: &str) {
        self.outcome = AttemptOutcome::Failed;
        self.diagnostic_summary = Some(truncate(diagnostic, 500));
        self.ended_at = Some(Utc::now());
    }

    /// Whether this attempt has ended.
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Truncate a string to a maximum length, adding ellipsis if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = max_len.saturating_sub(3);
        let mut end = cut;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_record_begin() {
        let record = AttemptRecord::begin("ripgrep", 1);
        assert_eq!(record.tool_id, "ripgrep");
        assert_eq!(record.attempt_number, 1);
        assert_eq!(record.stage_reached, JobState::Queued);
        assert_eq!(record.outcome, AttemptOutcome::Running);
        assert!(record.diagnostic_summary.is_none());
        assert!(!record.is_ended());
    }

    #[test]
    fn test_attempt_record_advance() {
        let mut record = AttemptRecord::begin("ripgrep", 1);
        record.advance(JobState::Analyzing);
        assert_eq!(record.stage_reached, JobState::Analyzing);
        record.advance(JobState::Executing);
        assert_eq!(record.stage_reached, JobState::Executing);
    }

    #[test]
    fn test_attempt_record_mark_passed() {
        let mut record = AttemptRecord::begin("ripgrep", 1);
        record.advance(JobState::Validating);
        record.mark_passed();

        assert_eq!(record.outcome, AttemptOutcome::Passed);
        assert_eq!(record.stage_reached, JobState::Passed);
        assert!(record.is_ended());
        assert!(record.diagnostic_summary.is_none());
    }

    #[test]
    fn test_attempt_record_mark_failed() {
        let mut record = AttemptRecord::begin("ripgrep", 2);
        record.advance(JobState::Executing);
        record.mark_failed("exit code 127: rg: command not found");

        assert_eq!(record.outcome, AttemptOutcome::Failed);
        assert_eq!(record.stage_reached, JobState::Executing);
        assert!(record.is_ended());
        assert!(record.diagnostic_summary.as_ref().unwrap().contains("exit code 127"));
    }

    #[test]
    fn test_attempt_record_long_diagnostic_truncated() {
        let mut record = AttemptRecord::begin("ripgrep", 1);
        record.mark_failed(&"x".repeat(2000));

        let diag = record.diagnostic_summary.unwrap();
        assert!(diag.len() <= 500);
        assert!(diag.ends_with("..."));
    }

    #[test]
    fn test_attempt_record_serialization() {
        let mut record = AttemptRecord::begin("bat", 1);
        record.advance(JobState::Executing);
        record.mark_failed("boom");

        let json = serde_json::to_string(&record).expect("serialize");
        let back: AttemptRecord = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.tool_id, record.tool_id);
        assert_eq!(back.outcome, record.outcome);
        assert_eq!(back.stage_reached, record.stage_reached);
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        let result = truncate("hello world this is long", 10);
        assert_eq!(result.len(), 10);
        assert!(result.ends_with("..."));
    }
}
