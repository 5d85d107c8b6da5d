//! Codec module - serialization and compression for packet payloads.
//!
//! A packet payload on the wire is compact JSON compressed with zlib:
//!
//! - [`JsonCodec`] - compact JSON via `serde_json` (no insignificant whitespace)
//! - [`ZlibCodec`] - zlib stream compression via `flate2`
//! - [`PacketCodec`] - both layers combined, the form used by the framing layer
//!
//! # Design
//!
//! Codecs are marker structs with static methods rather than trait objects.
//! Both ends of a connection use the same codec, so a request and its reply
//! go through identical code.
//!
//! # Example
//!
//! ```
//! use judge_bridge::codec::PacketCodec;
//! use serde_json::json;
//!
//! let encoded = PacketCodec::encode(&json!({"name": "bad-request"})).unwrap();
//! let decoded: serde_json::Value = PacketCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded["name"], "bad-request");
//! ```

mod json;
mod packet;
mod zlib;

pub use json::JsonCodec;
pub use packet::PacketCodec;
pub use zlib::ZlibCodec;
