//! Notifications for live submission views.
//!
//! The bridge only produces events; delivering them to browsers belongs to
//! whatever implements [`EventPoster`].

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::store::WorkItem;

/// Channel carrying status changes of public submissions.
pub const SUBMISSIONS_CHANNEL: &str = "submissions";

/// Publish side of the event bus.
pub trait EventPoster: Send + Sync {
    /// Publish one event on a channel. Delivery failures are the poster's concern.
    fn post(&self, channel: &str, event: Value);
}

/// Private channel of a single submission.
pub fn submission_channel(item: &WorkItem) -> String {
    format!("sub_{}", item.id_secret)
}

/// Announce a status change of a submission.
///
/// Submissions to hidden problems are never announced.
pub fn post_update_submission(poster: &dyn EventPoster, item: &WorkItem, done: bool) {
    if !item.problem_is_public {
        return;
    }
    poster.post(
        SUBMISSIONS_CHANNEL,
        json!({
            "type": if done { "done-submission" } else { "update-submission" },
            "id": item.id,
            "contest": item.contest_key(),
            "user": item.user_id,
            "problem": item.problem_code,
            "status": item.status.code(),
            "language": item.language_key,
        }),
    );
}

/// Tell viewers of a submission that it was aborted.
pub fn post_aborted(poster: &dyn EventPoster, item: &WorkItem) {
    poster.post(&submission_channel(item), json!({"type": "aborted-submission"}));
}

/// [`EventPoster`] that keeps every event in memory.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<(String, Value)>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all posted events, oldest first.
    pub fn events(&self) -> Vec<(String, Value)> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events posted on one channel.
    pub fn on_channel(&self, channel: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, event)| event)
            .collect()
    }
}

impl EventPoster for EventLog {
    fn post(&self, channel: &str, event: Value) {
        tracing::trace!(channel, %event, "event posted");
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push((channel.to_string(), event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContestEntry, SubmissionStatus};

    #[test]
    fn test_update_event_shape() {
        let log = EventLog::new();
        let mut item = WorkItem::new(9, "aplusb", "RUST", "fn main() {}");
        item.user_id = 4;
        item.contest = Some(ContestEntry {
            key: "weekly".into(),
            run_pretests_only: false,
            problem_is_pretested: false,
        });

        post_update_submission(&log, &item, false);

        assert_eq!(
            log.on_channel(SUBMISSIONS_CHANNEL),
            vec![json!({
                "type": "update-submission",
                "id": 9,
                "contest": "weekly",
                "user": 4,
                "problem": "aplusb",
                "status": "QU",
                "language": "RUST",
            })]
        );
    }

    #[test]
    fn test_done_event_type() {
        let log = EventLog::new();
        let mut item = WorkItem::new(1, "p", "C", "");
        item.status = SubmissionStatus::Aborted;

        post_update_submission(&log, &item, true);

        let events = log.on_channel(SUBMISSIONS_CHANNEL);
        assert_eq!(events[0]["type"], "done-submission");
        assert_eq!(events[0]["status"], "AB");
        assert_eq!(events[0]["contest"], Value::Null);
    }

    #[test]
    fn test_hidden_problem_not_announced() {
        let log = EventLog::new();
        let mut item = WorkItem::new(1, "secret", "C", "");
        item.problem_is_public = false;

        post_update_submission(&log, &item, false);

        assert!(log.events().is_empty());
    }

    #[test]
    fn test_aborted_event_on_private_channel() {
        let log = EventLog::new();
        let item = WorkItem::new(255, "p", "C", "");

        post_aborted(&log, &item);

        assert_eq!(
            log.on_channel("sub_00000000000000ff"),
            vec![json!({"type": "aborted-submission"})]
        );
    }
}
