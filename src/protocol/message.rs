//! Packets and the typed messages carried inside them.
//!
//! On the wire every message is a JSON object with a string `name` and
//! operation-specific kebab-case fields:
//!
//! | name                   | direction     |
//! |------------------------|---------------|
//! | `submission-request`   | client→server |
//! | `terminate-submission` | client→server |
//! | `disconnect-judge`     | client→server |
//! | `submission-received`  | server→client |
//! | `bad-request`          | server→client |
//!
//! [`Packet`] is the untyped form the dispatcher routes on. Each typed message
//! implements [`Message`] so it can be lifted into a packet and parsed back.
//!
//! # Example
//!
//! ```
//! use judge_bridge::protocol::{Packet, TerminateSubmission};
//!
//! let packet = Packet::from_message(&TerminateSubmission { submission_id: 7 }).unwrap();
//! assert_eq!(packet.name, "terminate-submission");
//!
//! let parsed: TerminateSubmission = packet.parse().unwrap();
//! assert_eq!(parsed.submission_id, 7);
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Priority;
use crate::error::{BridgeError, Result};

/// Identifier of a submission (work item).
pub type SubmissionId = u64;

/// A decoded message: its name plus whatever fields came with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Routing tag. Missing on the wire decodes as an empty name.
    #[serde(default)]
    pub name: String,
    /// Every other field of the message object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Packet {
    /// Create a packet with no fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Lift a typed message into a packet.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the message does not serialize to an object.
    pub fn from_message<M: Message>(message: &M) -> Result<Self> {
        match serde_json::to_value(message)? {
            Value::Object(mut fields) => {
                fields.remove("name");
                Ok(Self {
                    name: M::NAME.to_string(),
                    fields,
                })
            }
            other => Err(BridgeError::Protocol(format!(
                "{} must serialize to an object, got {}",
                M::NAME,
                other
            ))),
        }
    }

    /// Parse the packet as a typed message.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the name does not match or a field is
    /// missing or of the wrong type.
    pub fn parse<M: Message>(&self) -> Result<M> {
        if self.name != M::NAME {
            return Err(BridgeError::Protocol(format!(
                "expected {} packet, got {:?}",
                M::NAME,
                self.name
            )));
        }
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Check whether the packet carries the given message type.
    #[inline]
    pub fn is<M: Message>(&self) -> bool {
        self.name == M::NAME
    }

    /// Look up a raw field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A typed message with a fixed wire name.
pub trait Message: Serialize + DeserializeOwned {
    /// Value of the `name` field.
    const NAME: &'static str;
}

/// One submission inside a [`SubmissionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmissionPayload {
    pub submission_id: SubmissionId,
    /// Problem code.
    pub problem_id: String,
    /// Language key.
    pub language: String,
    pub source: String,
}

/// Ask the pool to judge a batch of submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmissionRequest {
    /// Preferred judge, if any. Sent as `null` when absent.
    pub judge_id: Option<String>,
    pub priority: Priority,
    pub submissions: Vec<SubmissionPayload>,
}

impl Message for SubmissionRequest {
    const NAME: &'static str = "submission-request";
}

/// Ask the pool to stop judging one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TerminateSubmission {
    pub submission_id: SubmissionId,
}

impl Message for TerminateSubmission {
    const NAME: &'static str = "terminate-submission";
}

/// Ask the pool to drop a judge connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisconnectJudge {
    pub judge_id: String,
    pub force: bool,
}

impl Message for DisconnectJudge {
    const NAME: &'static str = "disconnect-judge";
}

/// Positive acknowledgement.
///
/// Carries `submission-count` in reply to a submission request and
/// `judge-aborted` in reply to a termination request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmissionReceived {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_aborted: Option<bool>,
}

impl SubmissionReceived {
    /// Acknowledge a batch of `count` submissions.
    pub fn count(count: usize) -> Self {
        Self {
            submission_count: Some(count),
            judge_aborted: None,
        }
    }

    /// Report the outcome of a termination request.
    pub fn aborted(aborted: bool) -> Self {
        Self {
            submission_count: None,
            judge_aborted: Some(aborted),
        }
    }
}

impl Message for SubmissionReceived {
    const NAME: &'static str = "submission-received";
}

/// Definitive rejection of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadRequest {}

impl Message for BadRequest {
    const NAME: &'static str = "bad-request";
}

impl BadRequest {
    /// The ready-made `bad-request` packet.
    pub fn packet() -> Packet {
        Packet::new(Self::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> SubmissionRequest {
        SubmissionRequest {
            judge_id: None,
            priority: Priority::Default,
            submissions: vec![SubmissionPayload {
                submission_id: 12,
                problem_id: "aplusb".into(),
                language: "CPP17".into(),
                source: "int main() {}".into(),
            }],
        }
    }

    #[test]
    fn test_submission_request_wire_shape() {
        let packet = Packet::from_message(&sample_request()).unwrap();
        let value = serde_json::to_value(&packet).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "submission-request",
                "judge-id": null,
                "priority": 1,
                "submissions": [{
                    "submission-id": 12,
                    "problem-id": "aplusb",
                    "language": "CPP17",
                    "source": "int main() {}",
                }],
            })
        );
    }

    #[test]
    fn test_parse_typed() {
        let packet = Packet::from_message(&sample_request()).unwrap();
        let parsed: SubmissionRequest = packet.parse().unwrap();
        assert_eq!(parsed, sample_request());
    }

    #[test]
    fn test_parse_wrong_name() {
        let packet = Packet::new("bad-request");
        let result: Result<SubmissionReceived> = packet.parse();
        assert!(result.unwrap_err().is_protocol());
    }

    #[test]
    fn test_parse_missing_field() {
        let packet: Packet =
            serde_json::from_value(json!({"name": "disconnect-judge", "judge-id": "j1"})).unwrap();
        assert!(packet.parse::<DisconnectJudge>().is_err());
    }

    #[test]
    fn test_missing_name_decodes_empty() {
        let packet: Packet = serde_json::from_value(json!({"submission-id": 3})).unwrap();
        assert_eq!(packet.name, "");
        assert_eq!(packet.get("submission-id"), Some(&json!(3)));
    }

    #[test]
    fn test_submission_received_omits_absent_fields() {
        let packet = Packet::from_message(&SubmissionReceived::count(3)).unwrap();
        assert_eq!(
            serde_json::to_value(&packet).unwrap(),
            json!({"name": "submission-received", "submission-count": 3})
        );

        let packet = Packet::from_message(&SubmissionReceived::aborted(false)).unwrap();
        assert_eq!(
            serde_json::to_value(&packet).unwrap(),
            json!({"name": "submission-received", "judge-aborted": false})
        );
    }

    #[test]
    fn test_bad_request_has_only_name() {
        assert_eq!(
            serde_json::to_value(BadRequest::packet()).unwrap(),
            json!({"name": "bad-request"})
        );
        assert!(BadRequest::packet().is::<BadRequest>());
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let original = json!({"name": "future-op", "a": [1, 2], "b": {"c": null}});
        let packet: Packet = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&packet).unwrap(), original);
    }
}
