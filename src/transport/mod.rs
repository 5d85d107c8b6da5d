//! Transport module - byte-stream connections carrying framed packets.
//!
//! Provides:
//! - [`Channel`] - send/receive exactly one frame at a time over any stream
//! - [`Listener`] and [`connect`] - TCP endpoints producing channels

mod channel;
mod tcp;

pub use channel::Channel;
pub use tcp::{connect, Listener};
