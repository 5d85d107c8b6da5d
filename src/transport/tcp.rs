//! TCP endpoints.
//!
//! The bridge listens on a plain TCP socket; the front-end opens one
//! connection per request.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use super::Channel;
use crate::error::Result;

/// Connect to a bridge, optionally bounding the connect time.
pub async fn connect<A: ToSocketAddrs>(
    addr: A,
    timeout: Option<Duration>,
) -> Result<Channel<TcpStream>> {
    let stream = match timeout {
        Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr)).await??,
        None => TcpStream::connect(addr).await?,
    };
    stream.set_nodelay(true)?;
    Ok(Channel::new(stream))
}

/// TCP listener handing out one [`Channel`] per accepted connection.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    /// Bind to an address. Use port 0 for an ephemeral port.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept a single connection.
    pub async fn accept(&self) -> Result<(Channel<TcpStream>, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((Channel::new(stream), peer))
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
