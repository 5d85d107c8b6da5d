//! Packet codec - JSON then zlib, the payload format inside every frame.

use super::{JsonCodec, ZlibCodec};
use crate::error::{BridgeError, Result};

/// Codec for complete packet payloads (compressed compact JSON).
pub struct PacketCodec;

impl PacketCodec {
    /// Serialize a value to JSON and compress it.
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let json = JsonCodec::encode(value)?;
        ZlibCodec::compress(&json)
    }

    /// Decompress a payload and deserialize the JSON inside it.
    ///
    /// # Errors
    ///
    /// Both bad compression and bad JSON are reported as protocol errors,
    /// since either means the peer sent a malformed frame.
    pub fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T> {
        let json = ZlibCodec::decompress(payload)?;
        JsonCodec::decode(&json).map_err(|e| match e {
            BridgeError::Json(e) => BridgeError::Protocol(format!("invalid packet JSON: {}", e)),
            other => other,
        })
    }
}
