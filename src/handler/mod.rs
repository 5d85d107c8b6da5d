//! Handler module - request handling and dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps packet names to handlers
//! - [`pool_handlers`] - the table of operations backed by a worker pool
//!
//! # Example
//!
//! ```
//! use judge_bridge::handler::HandlerRegistry;
//! use judge_bridge::protocol::{DisconnectJudge, Packet};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(|req: DisconnectJudge| async move {
//!     println!("disconnect {} (force={})", req.judge_id, req.force);
//!     Ok(None::<Packet>)
//! });
//! ```

mod pool;
mod registry;

pub use pool::pool_handlers;
pub use registry::{BoxFuture, Handler, HandlerRegistry, HandlerResult, TypedHandler};
