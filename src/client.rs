//! Front-end side of the bridge.
//!
//! [`BridgeClient`] composes requests, sends each one over its own
//! connection, and reconciles the reply with the submission store:
//!
//! 1. Select the submissions that may be judged and reset them to queued
//! 2. Send one `submission-request` for the whole selection
//! 3. Mark everything as internal error if the bridge did not accept the
//!    exact batch
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use judge_bridge::{BridgeClient, ClientConfig};
//!
//! let client = BridgeClient::new(ClientConfig::new("127.0.0.1:9999"), store, events);
//! let scheduled = client.judge_submission(&[41, 42], true, None).await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{post_aborted, post_update_submission, EventPoster};
use crate::protocol::{
    DisconnectJudge, Message, Packet, Priority, SubmissionId, SubmissionPayload,
    SubmissionReceived, SubmissionRequest, TerminateSubmission,
};
use crate::store::{SubmissionStatus, SubmissionStore, SubmissionUpdate, WorkItem};
use crate::transport::{connect, Channel};

/// Sends requests to a bridge server on behalf of the front-end.
pub struct BridgeClient {
    config: ClientConfig,
    store: Arc<dyn SubmissionStore>,
    events: Arc<dyn EventPoster>,
}

impl BridgeClient {
    /// Create a client for the bridge at `config.address`.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SubmissionStore>,
        events: Arc<dyn EventPoster>,
    ) -> Self {
        Self {
            config,
            store,
            events,
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a connection to the bridge.
    async fn open(&self) -> Result<Channel<TcpStream>> {
        let channel = connect(self.config.address.as_str(), self.config.connect_timeout()).await?;
        Ok(channel.with_io_timeout(self.config.io_timeout()))
    }

    /// Send one packet over a fresh connection.
    ///
    /// With `reply` the call blocks until the bridge answers and returns the
    /// reply (`None` for an empty one). Without it, exactly one frame is
    /// written and nothing is read.
    pub async fn request(&self, packet: &Packet, reply: bool) -> Result<Option<Packet>> {
        let mut channel = self.open().await?;
        exchange(&mut channel, packet, reply).await
    }

    /// Queue submissions for (re)judging.
    ///
    /// Only submissions that are queued or done are touched; anything being
    /// graded right now is left alone. Returns `Ok(false)` when nothing was
    /// selected or when the bridge did not accept the batch, in which case
    /// every selected submission is marked as an internal error.
    ///
    /// # Errors
    ///
    /// Only store failures are returned. Bridge failures are recorded on the
    /// submissions instead.
    pub async fn judge_submission(
        &self,
        ids: &[SubmissionId],
        rejudge: bool,
        judge_id: Option<&str>,
    ) -> Result<bool> {
        let items = self
            .store
            .select(ids, Some(&SubmissionStatus::JUDGEABLE))
            .await?;
        let count = items.len();
        if count == 0 {
            tracing::debug!(?ids, "nothing to judge");
            return Ok(false);
        }

        let selected: Vec<SubmissionId> = items.iter().map(|item| item.id).collect();
        let batch = count > 1;
        let priority = Priority::assign(count, rejudge, items[0].contest.is_some());

        self.store
            .bulk_update(&selected, &SubmissionUpdate::rescheduled(rejudge || batch))
            .await?;

        // Set ahead of judging; the pool clears it if the problem has no pretests.
        let pretested: Vec<SubmissionId> = items
            .iter()
            .filter(|item| item.contest.as_ref().is_some_and(|c| c.wants_pretests()))
            .map(|item| item.id)
            .collect();
        if !pretested.is_empty() {
            self.store
                .bulk_update(&pretested, &SubmissionUpdate::pretested())
                .await?;
        }

        // Old case results go now, before the bridge confirms, so viewers
        // see the submission as being rescheduled.
        self.store.delete_case_results(&selected).await?;

        let request = SubmissionRequest {
            judge_id: judge_id.map(str::to_string),
            priority,
            submissions: items.iter().map(submission_payload).collect(),
        };

        let reply = match self.send(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, count, "failed to send request to judge");
                self.store
                    .bulk_update(&selected, &SubmissionUpdate::internal_error())
                    .await?;
                return Ok(false);
            }
        };

        let accepted = reply
            .as_ref()
            .filter(|packet| packet.is::<SubmissionReceived>())
            .and_then(|packet| packet.parse::<SubmissionReceived>().ok())
            .is_some_and(|received| received.submission_count == Some(count));

        if !accepted {
            tracing::error!(?reply, expected = count, "judge did not accept the batch");
            self.store
                .bulk_update(&selected, &SubmissionUpdate::internal_error())
                .await?;
        } else {
            tracing::info!(count, %priority, "submissions queued for judging");
        }

        for item in self.store.select(&selected, None).await? {
            post_update_submission(self.events.as_ref(), &item, false);
        }

        Ok(accepted)
    }

    /// Ask the pool to stop judging a submission.
    ///
    /// The submission is only marked as aborted when the reply carries
    /// `judge-aborted` as `false` or `null`. A missing field, an empty reply
    /// or a `bad-request` all leave it untouched, since the pool may still
    /// judge it.
    /// Returns whether the submission was marked as aborted.
    ///
    /// # Errors
    ///
    /// Returns transport errors and store failures.
    pub async fn abort_submission(&self, item: &WorkItem) -> Result<bool> {
        let reply = self
            .send(&TerminateSubmission {
                submission_id: item.id,
            })
            .await?;

        let judge_aborted = match reply.as_ref().and_then(|packet| packet.get("judge-aborted")) {
            None => true,
            Some(Value::Null) => false,
            Some(value) => value.as_bool().unwrap_or(true),
        };
        if judge_aborted {
            return Ok(false);
        }

        self.store
            .bulk_update(&[item.id], &SubmissionUpdate::aborted())
            .await?;
        post_aborted(self.events.as_ref(), item);

        let mut updated = item.clone();
        SubmissionUpdate::aborted().apply(&mut updated);
        post_update_submission(self.events.as_ref(), &updated, true);

        tracing::info!(submission = item.id, "submission aborted");
        Ok(true)
    }

    /// Tell the pool to drop a judge. Fire-and-forget.
    pub async fn disconnect_judge(&self, judge_id: &str, force: bool) -> Result<()> {
        let packet = Packet::from_message(&DisconnectJudge {
            judge_id: judge_id.to_string(),
            force,
        })?;
        self.request(&packet, false).await?;
        Ok(())
    }

    async fn send<M: Message>(&self, message: &M) -> Result<Option<Packet>> {
        let packet = Packet::from_message(message)?;
        self.request(&packet, true).await
    }
}

/// Write one request and, if asked, read one reply.
///
/// The stream is shut down afterwards either way.
pub async fn exchange<T>(
    channel: &mut Channel<T>,
    packet: &Packet,
    reply: bool,
) -> Result<Option<Packet>>
where
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    channel.send(packet).await?;
    let response = if reply {
        channel.recv::<Option<Packet>>().await?
    } else {
        None
    };
    channel.close().await?;
    Ok(response)
}

fn submission_payload(item: &WorkItem) -> SubmissionPayload {
    SubmissionPayload {
        submission_id: item.id,
        problem_id: item.problem_code.clone(),
        language: item.language_key.clone(),
        source: item.source.clone(),
    }
}
