//! # judge-bridge
//!
//! Request/response bridge between a judging front-end and its worker pool.
//!
//! The front-end opens one TCP connection per request, sends one framed
//! packet, and (usually) reads one framed reply. The bridge routes each
//! packet by its `name` to a handler backed by the worker pool.
//!
//! ## Wire format
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┐
//! │ length (u32 BE, 4 B) │ zlib(compact JSON), length B │
//! └──────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Layout
//!
//! - [`protocol`] / [`codec`] - framing, compression, message types
//! - [`transport`] - one-frame-at-a-time channels over TCP
//! - [`handler`] / [`server`] - dispatch by packet name, the listening side
//! - [`client`] - request composition and submission state reconciliation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use judge_bridge::{handler::pool_handlers, BridgeConfig, Server};
//!
//! #[tokio::main]
//! async fn main() -> judge_bridge::Result<()> {
//!     let config = BridgeConfig::load()?;
//!     let server = Server::builder(pool_handlers(Arc::new(MyPool::default())))
//!         .config(&config.listen)
//!         .bind(&config.listen.address)
//!         .await?;
//!     server.run().await
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod pool;
pub mod protocol;
pub mod server;
pub mod store;
pub mod transport;

pub use client::BridgeClient;
pub use config::{BridgeConfig, ClientConfig, ListenConfig};
pub use error::{BridgeError, Result};
pub use events::EventPoster;
pub use pool::{JudgeJob, WorkerPool};
pub use protocol::{Packet, Priority};
pub use server::{ConnectionState, PacketDispatcher, Server, ServerBuilder};
pub use store::{SubmissionStore, WorkItem};
