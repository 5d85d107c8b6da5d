//! Packet dispatcher and the listening server.
//!
//! The protocol is one-shot: a connection carries exactly one request and
//! exactly one reply, then the server closes it. [`Session`] models that as
//! an explicit two-state machine:
//!
//! ```text
//! AwaitingMessage ──(one packet in, one reply out, or a protocol error)──► Closed
//! ```
//!
//! Handler faults never reach the connection layer. Whatever a handler does,
//! including panicking, the peer gets a reply and the connection is closed.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use judge_bridge::{handler::pool_handlers, Server};
//!
//! let server = Server::builder(pool_handlers(Arc::new(my_pool)))
//!     .max_concurrent_connections(64)
//!     .bind("127.0.0.1:9999")
//!     .await?;
//! server.run().await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tokio::sync::Semaphore;

use crate::config::ListenConfig;
use crate::error::{BridgeError, Result};
use crate::handler::HandlerRegistry;
use crate::protocol::{BadRequest, Packet, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::transport::{Channel, Listener};

/// Default maximum concurrent connections.
pub const DEFAULT_MAX_CONCURRENT_CONNECTIONS: usize = 256;

/// Lifecycle of a single accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the one request this connection will carry.
    AwaitingMessage,
    /// Reply sent (or the request was unreadable); the stream is shut down.
    Closed,
}

/// Routes a request packet to its handler and produces the reply.
pub struct PacketDispatcher {
    registry: Arc<HandlerRegistry>,
}

impl PacketDispatcher {
    /// Create a dispatcher over a handler table.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Compute the reply for one request packet.
    ///
    /// - unknown name: logged as malformed, empty reply
    /// - handler error or panic: logged, `bad-request` reply
    ///
    /// Never fails.
    pub async fn reply_for(&self, packet: Packet) -> Option<Packet> {
        let name = packet.name.clone();
        let registry = self.registry.clone();
        // Spawned so a panicking handler is contained to its own task.
        match tokio::spawn(async move { registry.dispatch(packet).await }).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(BridgeError::UnknownPacket(name))) => {
                tracing::error!(packet = %name, "malformed packet");
                None
            }
            Ok(Err(e)) => {
                tracing::error!(packet = %name, error = %e, "error in packet handling");
                Some(BadRequest::packet())
            }
            Err(e) => {
                tracing::error!(packet = %name, error = %e, "packet handler panicked");
                Some(BadRequest::packet())
            }
        }
    }

    /// Compute the reply for a request that decoded to arbitrary JSON.
    ///
    /// An object without a string `name` is malformed and gets an empty
    /// reply. Anything other than an object gets `bad-request`.
    pub async fn reply_for_value(&self, value: Value) -> Option<Packet> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                tracing::error!(packet = %other, "error in packet handling: not an object");
                return Some(BadRequest::packet());
            }
        };
        match fields.remove("name") {
            Some(Value::String(name)) => self.reply_for(Packet { name, fields }).await,
            name => {
                tracing::error!(?name, ?fields, "malformed packet");
                None
            }
        }
    }

    /// Serve one connection from accept to close.
    ///
    /// Returns the final state, which is always [`ConnectionState::Closed`].
    pub async fn serve<S>(&self, channel: Channel<S>) -> ConnectionState
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = Session::new(channel);
        if let Err(e) = session.handle_one(self).await {
            tracing::warn!(error = %e, "connection ended without a reply");
        }
        session.state()
    }
}

/// One accepted connection and where it is in its lifecycle.
pub struct Session<S> {
    channel: Channel<S>,
    state: ConnectionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session on a freshly accepted connection.
    pub fn new(channel: Channel<S>) -> Self {
        Self {
            channel,
            state: ConnectionState::AwaitingMessage,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Read the request, dispatch it, write the reply and close.
    ///
    /// The session is [`ConnectionState::Closed`] afterwards whatever the
    /// outcome, so a second call fails at once.
    ///
    /// # Errors
    ///
    /// Fails if the session is already closed, if the request frame is
    /// malformed (no reply is sent then), or if writing the reply fails.
    pub async fn handle_one(&mut self, dispatcher: &PacketDispatcher) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(BridgeError::Protocol(
                "connection already answered one request".to_string(),
            ));
        }

        let result = self.answer(dispatcher).await;
        self.close().await;
        result
    }

    async fn answer(&mut self, dispatcher: &PacketDispatcher) -> Result<()> {
        let request: Value = self.channel.recv().await?;
        tracing::debug!(packet = ?request.get("name"), "request received");

        let reply = dispatcher.reply_for_value(request).await;
        self.channel.send(&reply).await
    }

    /// Shut the connection down. Idempotent.
    pub async fn close(&mut self) -> ConnectionState {
        if self.state == ConnectionState::AwaitingMessage {
            if let Err(e) = self.channel.close().await {
                tracing::debug!(error = %e, "error shutting down connection");
            }
            self.state = ConnectionState::Closed;
        }
        self.state
    }
}

/// Builder for configuring and binding a [`Server`].
pub struct ServerBuilder {
    registry: HandlerRegistry,
    max_concurrent_connections: usize,
    io_timeout: Option<Duration>,
    max_payload_size: u32,
}

impl ServerBuilder {
    /// Create a builder serving the given handler table.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            max_concurrent_connections: DEFAULT_MAX_CONCURRENT_CONNECTIONS,
            io_timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Take limits from a loaded configuration.
    pub fn config(self, config: &ListenConfig) -> Self {
        self.max_concurrent_connections(config.max_connections)
            .io_timeout(config.io_timeout())
    }

    /// Set the maximum number of connections served at once.
    ///
    /// Connections beyond the limit are accepted and wait for a free slot
    /// before their request is read.
    /// Default: 256
    pub fn max_concurrent_connections(mut self, limit: usize) -> Self {
        self.max_concurrent_connections = limit;
        self
    }

    /// Bound each read and write on a connection.
    ///
    /// Default: no deadline
    pub fn io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Set the largest request payload accepted.
    ///
    /// Default: 64 MB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.max_payload_size = size;
        self
    }

    /// Bind the listening socket.
    pub async fn bind<A: ToSocketAddrs>(self, addr: A) -> Result<Server> {
        let listener = Listener::bind(addr).await?;
        Ok(Server {
            listener,
            dispatcher: Arc::new(PacketDispatcher::new(self.registry)),
            semaphore: Arc::new(Semaphore::new(self.max_concurrent_connections)),
            io_timeout: self.io_timeout,
            max_payload_size: self.max_payload_size,
        })
    }
}

/// A bound bridge server.
pub struct Server {
    listener: Listener,
    dispatcher: Arc<PacketDispatcher>,
    semaphore: Arc<Semaphore>,
    io_timeout: Option<Duration>,
    max_payload_size: u32,
}

impl Server {
    /// Create a new server builder.
    pub fn builder(registry: HandlerRegistry) -> ServerBuilder {
        ServerBuilder::new(registry)
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already accepted run to completion on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(addr = ?self.listener.local_addr().ok(), "bridge listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("bridge shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((channel, peer)) => self.spawn_connection(channel, peer),
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
    }

    fn spawn_connection<S>(&self, channel: Channel<S>, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.semaphore.available_permits() == 0 {
            tracing::debug!(%peer, "connection capacity reached, waiting for a slot");
        }

        let channel = channel
            .with_io_timeout(self.io_timeout)
            .with_max_payload(self.max_payload_size);
        let dispatcher = self.dispatcher.clone();
        let semaphore = self.semaphore.clone();

        tokio::spawn(async move {
            // Permit is held until this connection is closed
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let state = dispatcher.serve(channel).await;
            tracing::debug!(%peer, ?state, "connection finished");
        });
    }
}
