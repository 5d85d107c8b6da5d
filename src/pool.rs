//! Facade of the judge worker pool.
//!
//! The pool owns the judges and their queue. The bridge only asks it four
//! things, and may ask from many connections at once, so implementations
//! must be internally synchronized.

use crate::protocol::{Priority, SubmissionId, SubmissionPayload};

/// One submission handed to the pool for judging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeJob {
    pub id: SubmissionId,
    /// Problem code.
    pub problem: String,
    /// Language key.
    pub language: String,
    pub source: String,
    /// Judge the front-end asked for, if any.
    pub judge_id: Option<String>,
    pub priority: Priority,
}

impl JudgeJob {
    /// Build a job from a wire submission and the batch-wide settings.
    pub fn from_payload(
        payload: SubmissionPayload,
        judge_id: Option<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: payload.submission_id,
            problem: payload.problem_id,
            language: payload.language,
            source: payload.source,
            judge_id,
            priority,
        }
    }
}

/// Operations the bridge needs from the worker pool.
pub trait WorkerPool: Send + Sync + 'static {
    /// Whether the pool currently accepts work at this priority.
    fn check_priority(&self, priority: Priority) -> bool;

    /// Queue a whole batch. The batch is handed over in one call.
    fn judge(&self, jobs: Vec<JudgeJob>);

    /// Try to stop judging a submission. Returns the pool's answer as-is.
    fn abort(&self, submission_id: SubmissionId) -> bool;

    /// Drop a judge from the pool, killing its current work if `force`.
    fn disconnect(&self, judge_id: &str, force: bool);
}
