//! Frame struct and frame builders.
//!
//! A [`Frame`] is one complete payload cut out of the byte stream, still
//! compressed. Uses `bytes::Bytes` so handing it between tasks never copies.
//!
//! # Example
//!
//! ```
//! use judge_bridge::protocol::{encode_frame, FrameBuffer};
//! use serde_json::{json, Value};
//!
//! let bytes = encode_frame(&json!({"name": "bad-request"})).unwrap();
//!
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer.push(&bytes).unwrap();
//! let decoded: Value = frames[0].decode().unwrap();
//! assert_eq!(decoded["name"], "bad-request");
//! ```

use bytes::Bytes;

use super::wire_format::{encode_length, payload_length, LENGTH_PREFIX_SIZE};
use crate::codec::PacketCodec;
use crate::error::Result;

/// A complete protocol frame (compressed payload, prefix stripped).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Compressed payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from payload bytes.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Decompress and deserialize the payload.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        PacketCodec::decode(&self.payload)
    }
}

/// Build a complete frame from an already compressed payload.
///
/// # Example
///
/// ```
/// use judge_bridge::protocol::build_frame;
///
/// let bytes = build_frame(b"hello").unwrap();
/// assert_eq!(bytes, [0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);
/// ```
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let length = payload_length(payload)?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&encode_length(length));
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Serialize, compress and frame a value in one step.
pub fn encode_frame<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = PacketCodec::encode(value)?;
    build_frame(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ZlibCodec;
    use serde_json::{json, Value};

    #[test]
    fn test_build_frame_prefix() {
        let bytes = build_frame(b"abc").unwrap();
        assert_eq!(&bytes[..LENGTH_PREFIX_SIZE], &[0, 0, 0, 3]);
        assert_eq!(&bytes[LENGTH_PREFIX_SIZE..], b"abc");
    }

    #[test]
    fn test_encode_frame_length_matches_compressed_payload() {
        let value = json!({"name": "disconnect-judge", "judge-id": "j1", "force": true});
        let bytes = encode_frame(&value).unwrap();

        let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(declared, bytes.len() - LENGTH_PREFIX_SIZE);

        let json = ZlibCodec::decompress(&bytes[LENGTH_PREFIX_SIZE..]).unwrap();
        let decoded: Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_frame_decode() {
        let payload = PacketCodec::encode(&json!({"name": "bad-request"})).unwrap();
        let frame = Frame::new(Bytes::from(payload));
        let value: Value = frame.decode().unwrap();
        assert_eq!(value, json!({"name": "bad-request"}));
    }

    #[test]
    fn test_frame_decode_garbage() {
        let frame = Frame::new(Bytes::from_static(b"garbage"));
        let result: Result<Value> = frame.decode();
        assert!(result.unwrap_err().is_protocol());
    }
}
