//! Handler registry for dispatching packets by name.
//!
//! The registry maps a packet's `name` to the handler that answers it. New
//! operations are added by registering another handler; dispatch itself never
//! changes.
//!
//! # Example
//!
//! ```
//! use judge_bridge::handler::HandlerRegistry;
//! use judge_bridge::protocol::{Packet, SubmissionReceived, TerminateSubmission};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(|req: TerminateSubmission| async move {
//!     let reply = SubmissionReceived::aborted(req.submission_id % 2 == 0);
//!     Packet::from_message(&reply).map(Some)
//! });
//!
//! assert!(registry.get_handler("terminate-submission").is_some());
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::error::{BridgeError, Result};
use crate::protocol::{Message, Packet};

/// Result type for handler functions: the reply packet, if any.
pub type HandlerResult = Result<Option<Packet>>;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for packet handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle a request packet and produce the reply.
    fn call(&self, packet: Packet) -> BoxFuture<'static, HandlerResult>;
}

/// Wrapper that parses the packet into a typed message before calling the handler.
pub struct TypedHandler<F, M, Fut>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    M: Message + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(M) -> Fut>,
}

impl<F, M, Fut> TypedHandler<F, M, Fut>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    M: Message + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, M, Fut> Handler for TypedHandler<F, M, Fut>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    M: Message + Send + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, packet: Packet) -> BoxFuture<'static, HandlerResult> {
        let parsed: M = match packet.parse() {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        Box::pin((self.handler)(parsed))
    }
}

/// Registry mapping packet names to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed handler under its message's name.
    ///
    /// Registering the same name twice replaces the earlier handler.
    pub fn register<F, M, Fut>(&mut self, handler: F)
    where
        F: Fn(M) -> Fut + Send + Sync + 'static,
        M: Message + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(M::NAME, TypedHandler::new(handler));
    }

    /// Register an arbitrary handler under a name.
    pub fn register_handler<H: Handler>(&mut self, name: &str, handler: H) {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    /// Get a handler by packet name.
    pub fn get_handler(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    /// Registered packet names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch a packet to the handler registered for its name.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownPacket`] if no handler matches, or
    /// whatever error the handler produced.
    pub async fn dispatch(&self, packet: Packet) -> HandlerResult {
        let handler = self
            .get_handler(&packet.name)
            .ok_or_else(|| BridgeError::UnknownPacket(packet.name.clone()))?;

        handler.call(packet).await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BadRequest, DisconnectJudge, SubmissionReceived, TerminateSubmission};

    #[test]
    fn test_register_by_message_name() {
        let mut registry = HandlerRegistry::new();

        registry.register(|_: TerminateSubmission| async { Ok(None) });
        registry.register(|_: DisconnectJudge| async { Ok(None) });

        assert!(registry.get_handler("terminate-submission").is_some());
        assert!(registry.get_handler("disconnect-judge").is_some());
        assert_eq!(
            registry.names(),
            vec!["disconnect-judge", "terminate-submission"]
        );
    }

    #[test]
    fn test_handler_not_found() {
        let registry = HandlerRegistry::new();
        assert!(registry.get_handler("nonexistent").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_typed() {
        let mut registry = HandlerRegistry::new();
        registry.register(|req: TerminateSubmission| async move {
            Packet::from_message(&SubmissionReceived::aborted(req.submission_id == 1)).map(Some)
        });

        let packet = Packet::from_message(&TerminateSubmission { submission_id: 1 }).unwrap();
        let reply = registry.dispatch(packet).await.unwrap().unwrap();

        let received: SubmissionReceived = reply.parse().unwrap();
        assert_eq!(received.judge_aborted, Some(true));
    }

    #[tokio::test]
    async fn test_dispatch_unknown() {
        let registry = HandlerRegistry::new();
        let err = registry.dispatch(Packet::new("mystery")).await.unwrap_err();
        assert!(matches!(err, BridgeError::UnknownPacket(name) if name == "mystery"));
    }

    #[tokio::test]
    async fn test_dispatch_parse_failure_is_error() {
        let mut registry = HandlerRegistry::new();
        registry.register(|_: DisconnectJudge| async { Ok(Some(BadRequest::packet())) });

        // Missing judge-id and force.
        let result = registry.dispatch(Packet::new("disconnect-judge")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mut registry = HandlerRegistry::new();
        registry.register(|_: TerminateSubmission| async { Ok(None) });
        registry.register(|_: TerminateSubmission| async { Ok(Some(BadRequest::packet())) });

        let packet = Packet::from_message(&TerminateSubmission { submission_id: 1 }).unwrap();
        let reply = registry.dispatch(packet).await.unwrap();
        assert_eq!(reply, Some(BadRequest::packet()));
    }
}
