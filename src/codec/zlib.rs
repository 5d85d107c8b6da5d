//! Zlib codec - stream compression for packet payloads.
//!
//! Uses the zlib container (RFC 1950), not raw deflate or gzip, so the
//! compressed bytes interoperate with any standard zlib implementation.
//!
//! # Example
//!
//! ```
//! use judge_bridge::codec::ZlibCodec;
//!
//! let compressed = ZlibCodec::compress(b"hello hello hello").unwrap();
//! assert_eq!(ZlibCodec::decompress(&compressed).unwrap(), b"hello hello hello");
//! ```

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{BridgeError, Result};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Zlib compression codec.
pub struct ZlibCodec;

impl ZlibCodec {
    /// Compress bytes with the default compression level.
    pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    /// Decompress a complete zlib stream of at most
    /// [`DEFAULT_MAX_PAYLOAD_SIZE`] bytes once inflated.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the bytes are not a valid zlib stream or
    /// inflate past the limit.
    pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
        Self::decompress_with_limit(data, DEFAULT_MAX_PAYLOAD_SIZE as usize)
    }

    /// Decompress a complete zlib stream, refusing output larger than `limit`.
    pub fn decompress_with_limit(data: &[u8], limit: usize) -> Result<Vec<u8>> {
        // One byte past the limit is enough to tell an oversize stream apart.
        let mut decoder = ZlibDecoder::new(data).take(limit as u64 + 1);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| BridgeError::Protocol(format!("zlib decompression failed: {}", e)))?;
        if out.len() > limit {
            return Err(BridgeError::Protocol(format!(
                "decompressed payload exceeds {} bytes",
                limit
            )));
        }
        Ok(out)
    }
}
