//! The fixed handler table served to the front-end.
//!
//! Each handler turns one request packet into one call on the [`WorkerPool`]
//! and one reply packet.

use std::sync::Arc;

use super::{HandlerRegistry, HandlerResult};
use crate::pool::{JudgeJob, WorkerPool};
use crate::protocol::{
    BadRequest, DisconnectJudge, Packet, SubmissionReceived, SubmissionRequest,
    TerminateSubmission,
};

/// Build the registry answering `submission-request`, `terminate-submission`
/// and `disconnect-judge` on behalf of `pool`.
pub fn pool_handlers(pool: Arc<dyn WorkerPool>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    let judges = pool.clone();
    registry.register(move |request: SubmissionRequest| {
        let judges = judges.clone();
        async move { on_submission(judges.as_ref(), request) }
    });

    let judges = pool.clone();
    registry.register(move |request: TerminateSubmission| {
        let judges = judges.clone();
        async move { on_termination(judges.as_ref(), request) }
    });

    let judges = pool;
    registry.register(move |request: DisconnectJudge| {
        let judges = judges.clone();
        async move { on_disconnect(judges.as_ref(), request) }
    });

    registry
}

fn on_submission(pool: &dyn WorkerPool, request: SubmissionRequest) -> HandlerResult {
    if !pool.check_priority(request.priority) {
        tracing::info!(priority = %request.priority, "priority not accepted by pool");
        return Ok(Some(BadRequest::packet()));
    }

    let SubmissionRequest {
        judge_id,
        priority,
        submissions,
    } = request;
    let jobs: Vec<JudgeJob> = submissions
        .into_iter()
        .map(|payload| JudgeJob::from_payload(payload, judge_id.clone(), priority))
        .collect();

    // The count acknowledged is the size of the batch actually handed over.
    let count = jobs.len();
    pool.judge(jobs);
    tracing::debug!(count, %priority, "batch forwarded to pool");

    Packet::from_message(&SubmissionReceived::count(count)).map(Some)
}

fn on_termination(pool: &dyn WorkerPool, request: TerminateSubmission) -> HandlerResult {
    let aborted = pool.abort(request.submission_id);
    tracing::debug!(submission = request.submission_id, aborted, "termination requested");
    Packet::from_message(&SubmissionReceived::aborted(aborted)).map(Some)
}

fn on_disconnect(pool: &dyn WorkerPool, request: DisconnectJudge) -> HandlerResult {
    tracing::info!(judge = %request.judge_id, force = request.force, "disconnecting judge");
    pool.disconnect(&request.judge_id, request.force);
    Ok(None)
}
