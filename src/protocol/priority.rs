//! Scheduling priority carried by every submission batch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Priority of a submission batch in the worker pool's queue.
///
/// Lower values are scheduled first. Serialized on the wire as its integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    /// A single first-time submission made inside a contest.
    ContestSubmission = 0,
    /// A single first-time submission outside any contest.
    Default = 1,
    /// A single submission being rejudged.
    Rejudge = 2,
    /// Any request covering more than one submission.
    BatchRejudge = 3,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Priority; 4] = [
        Priority::ContestSubmission,
        Priority::Default,
        Priority::Rejudge,
        Priority::BatchRejudge,
    ];

    /// Pick the priority for a judge request.
    ///
    /// A batch always gets [`Priority::BatchRejudge`], whatever `rejudge` and
    /// contest membership say. `in_contest` describes the single item and is
    /// only consulted for a non-rejudge request of one submission.
    pub fn assign(count: usize, rejudge: bool, in_contest: bool) -> Self {
        if count > 1 {
            Priority::BatchRejudge
        } else if rejudge {
            Priority::Rejudge
        } else if in_contest {
            Priority::ContestSubmission
        } else {
            Priority::Default
        }
    }

    /// Numeric value as sent on the wire.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.as_u8()
    }
}

impl TryFrom<u8> for Priority {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_u8() == value)
            .ok_or_else(|| BridgeError::Protocol(format!("Unknown priority: {}", value)))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::ContestSubmission => "contest",
            Priority::Default => "default",
            Priority::Rejudge => "rejudge",
            Priority::BatchRejudge => "batch-rejudge",
        };
        write!(f, "{}({})", name, self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_dominates_everything() {
        for rejudge in [false, true] {
            for in_contest in [false, true] {
                assert_eq!(Priority::assign(2, rejudge, in_contest), Priority::BatchRejudge);
                assert_eq!(Priority::assign(50, rejudge, in_contest), Priority::BatchRejudge);
            }
        }
    }

    #[test]
    fn test_single_item_priorities() {
        assert_eq!(Priority::assign(1, true, true), Priority::Rejudge);
        assert_eq!(Priority::assign(1, true, false), Priority::Rejudge);
        assert_eq!(Priority::assign(1, false, true), Priority::ContestSubmission);
        assert_eq!(Priority::assign(1, false, false), Priority::Default);
    }

    #[test]
    fn test_ordering() {
        assert!(Priority::ContestSubmission < Priority::Default);
        assert!(Priority::Default < Priority::Rejudge);
        assert!(Priority::Rejudge < Priority::BatchRejudge);
    }

    #[test]
    fn test_wire_integer() {
        assert_eq!(serde_json::to_string(&Priority::Rejudge).unwrap(), "2");
        let parsed: Priority = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, Priority::ContestSubmission);
    }

    #[test]
    fn test_unknown_integer_rejected() {
        assert!(serde_json::from_str::<Priority>("4").is_err());
        assert!(Priority::try_from(9).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Priority::BatchRejudge.to_string(), "batch-rejudge(3)");
    }
}
