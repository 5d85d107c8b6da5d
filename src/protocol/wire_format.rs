//! Wire format encoding and decoding.
//!
//! Every frame is a length prefix followed by the compressed payload:
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ Length       │ Payload                      │
//! │ 4 bytes      │ `length` bytes               │
//! │ uint32 BE    │ zlib(compact JSON)           │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! The length counts compressed bytes only, never the prefix itself.

use crate::error::{BridgeError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (64 MB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Encode a payload length as a big-endian prefix.
///
/// # Example
///
/// ```
/// use judge_bridge::protocol::encode_length;
///
/// assert_eq!(encode_length(0x0102_0304), [1, 2, 3, 4]);
/// ```
#[inline]
pub fn encode_length(length: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    length.to_be_bytes()
}

/// Decode a big-endian length prefix.
///
/// Returns `None` if the buffer is too short.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Check a declared payload length against the configured maximum.
pub fn validate_length(length: u32, max_payload_size: u32) -> Result<()> {
    if length > max_payload_size {
        return Err(BridgeError::Protocol(format!(
            "Payload size {} exceeds maximum {}",
            length, max_payload_size
        )));
    }
    Ok(())
}

/// Convert a payload length to its wire representation.
pub fn payload_length(payload: &[u8]) -> Result<u32> {
    u32::try_from(payload.len()).map_err(|_| {
        BridgeError::Protocol(format!(
            "Payload size {} does not fit the length prefix",
            payload.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_big_endian_byte_order() {
        assert_eq!(encode_length(1), [0, 0, 0, 1]);
        assert_eq!(encode_length(0xDEAD_BEEF), [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_decode_length() {
        assert_eq!(decode_length(&[0, 0, 1, 0]), Some(256));
        assert_eq!(decode_length(&[0, 0, 1, 0, 99]), Some(256));
    }

    #[test]
    fn test_decode_length_too_short() {
        assert_eq!(decode_length(&[0, 0, 1]), None);
        assert_eq!(decode_length(&[]), None);
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length(100, 100).is_ok());
        let err = validate_length(101, 100).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
        assert!(err.is_protocol());
    }
}
