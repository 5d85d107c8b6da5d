//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForLength`: Need the 4-byte length prefix
//! - `WaitingForPayload`: Prefix parsed, need N more payload bytes
//!
//! A socket read may return any number of bytes, so the transport keeps
//! pushing until a frame comes out or the peer closes the stream.
//!
//! # Example
//!
//! ```
//! use judge_bridge::protocol::{build_frame, FrameBuffer};
//!
//! let bytes = build_frame(b"payload").unwrap();
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&bytes[..6]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[6..]).unwrap();
//! assert_eq!(frames[0].payload(), b"payload");
//! ```

use bytes::BytesMut;

use super::wire_format::{
    decode_length, validate_length, DEFAULT_MAX_PAYLOAD_SIZE, LENGTH_PREFIX_SIZE,
};
use super::Frame;
use crate::error::{BridgeError, Result};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the complete length prefix.
    WaitingForLength,
    /// Prefix parsed, waiting for payload bytes.
    WaitingForPayload { remaining: u32 },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 8KB, max payload: 64MB.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForLength,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns a vector of complete frames (may be empty if still waiting
    /// for data). Partial data is kept for the next push.
    ///
    /// # Errors
    ///
    /// Returns error if a declared length exceeds `max_payload_size`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForLength => {
                let length = match decode_length(&self.buffer) {
                    Some(length) => length,
                    None => return Ok(None),
                };

                validate_length(length, self.max_payload_size)?;

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);
                self.state = State::WaitingForPayload { remaining: length };

                self.try_extract_one()
            }

            State::WaitingForPayload { remaining } => {
                let remaining = remaining as usize;

                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForLength;

                Ok(Some(Frame::new(payload)))
            }
        }
    }

    /// Describe what is missing when the stream ends now.
    ///
    /// Returns `None` when the buffer sits cleanly between frames. Otherwise
    /// returns the error for a stream that closed mid-frame: [`BridgeError::NoData`]
    /// when nothing at all was received, [`BridgeError::Truncated`] when a
    /// prefix or payload was cut short.
    pub fn eof_error(&self, received_any: bool) -> Option<BridgeError> {
        match self.state {
            State::WaitingForLength if self.buffer.is_empty() => {
                if received_any {
                    None
                } else {
                    Some(BridgeError::NoData)
                }
            }
            State::WaitingForLength => Some(BridgeError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                received: self.buffer.len(),
            }),
            State::WaitingForPayload { remaining } => Some(BridgeError::Truncated {
                expected: remaining as usize,
                received: self.buffer.len(),
            }),
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&build_frame(b"hello").unwrap()).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = build_frame(b"first").unwrap();
        combined.extend(build_frame(b"second").unwrap());
        combined.extend(build_frame(b"third").unwrap());

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload(), b"first");
        assert_eq!(frames[1].payload(), b"second");
        assert_eq!(frames[2].payload(), b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_length() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(b"test").unwrap();

        let frames = buffer.push(&frame_bytes[..2]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForLength");

        let frames = buffer.push(&frame_bytes[2..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"test");
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let frame_bytes = build_frame(payload).unwrap();

        let partial_len = LENGTH_PREFIX_SIZE + 10;
        let frames = buffer.push(&frame_bytes[..partial_len]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        let frames = buffer.push(&frame_bytes[partial_len..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(b"hi").unwrap();

        let mut all_frames = Vec::new();
        for byte in &frame_bytes {
            all_frames.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi");
    }

    #[test]
    fn test_max_payload_validation() {
        let mut buffer = FrameBuffer::with_max_payload(100);

        let result = buffer.push(&1000u32.to_be_bytes());

        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_eof_with_nothing_received() {
        let buffer = FrameBuffer::new();
        assert!(matches!(buffer.eof_error(false), Some(BridgeError::NoData)));
    }

    #[test]
    fn test_eof_between_frames() {
        let mut buffer = FrameBuffer::new();
        buffer.push(&build_frame(b"done").unwrap()).unwrap();
        assert!(buffer.eof_error(true).is_none());
    }

    #[test]
    fn test_eof_inside_prefix() {
        let mut buffer = FrameBuffer::new();
        buffer.push(&[0, 0]).unwrap();
        assert!(matches!(
            buffer.eof_error(true),
            Some(BridgeError::Truncated {
                expected: 4,
                received: 2
            })
        ));
    }

    #[test]
    fn test_eof_inside_payload() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(b"0123456789").unwrap();
        buffer.push(&frame_bytes[..LENGTH_PREFIX_SIZE + 3]).unwrap();

        assert!(matches!(
            buffer.eof_error(true),
            Some(BridgeError::Truncated {
                expected: 10,
                received: 3
            })
        ));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(b"test").unwrap();
        buffer.push(&frame_bytes[..LENGTH_PREFIX_SIZE + 1]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForPayload");

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForLength");
        assert!(buffer.is_empty());
    }
}
