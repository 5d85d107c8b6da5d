//! Protocol module - wire format, framing, and message types.
//!
//! This module implements the framed protocol shared by both ends:
//! - 4-byte big-endian length prefix encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Packets and typed messages routed by `name`
//! - Scheduling priority

mod frame;
mod frame_buffer;
mod message;
mod priority;
mod wire_format;

pub use frame::{build_frame, encode_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use message::{
    BadRequest, DisconnectJudge, Message, Packet, SubmissionId, SubmissionPayload,
    SubmissionReceived, SubmissionRequest, TerminateSubmission,
};
pub use priority::Priority;
pub use wire_format::{
    decode_length, encode_length, payload_length, validate_length, DEFAULT_MAX_PAYLOAD_SIZE,
    LENGTH_PREFIX_SIZE,
};
