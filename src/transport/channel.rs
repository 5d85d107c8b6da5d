//! Framed channel over a single byte stream.
//!
//! A [`Channel`] owns one connection and moves whole packets across it. It is
//! generic over the stream so the same code runs on TCP sockets and on
//! in-memory `tokio::io::duplex` pipes in tests.
//!
//! # Example
//!
//! ```ignore
//! use judge_bridge::transport::connect;
//! use judge_bridge::protocol::{Packet, TerminateSubmission};
//!
//! let mut channel = connect("127.0.0.1:9999", None).await?;
//! channel.send(&Packet::from_message(&TerminateSubmission { submission_id: 1 })?).await?;
//! let reply: Option<Packet> = channel.recv().await?;
//! channel.close().await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BridgeError, Result};
use crate::protocol::{encode_frame, Frame, FrameBuffer, DEFAULT_MAX_PAYLOAD_SIZE};

/// Read buffer size per socket read.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// A connection that sends and receives length-prefixed packets.
pub struct Channel<S> {
    stream: S,
    io_timeout: Option<Duration>,
    max_payload_size: u32,
}

impl<S> Channel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            io_timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Apply a deadline to every send and receive.
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Limit the payload size accepted from the peer.
    pub fn with_max_payload(mut self, max_payload_size: u32) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Encode one value as a frame, write it and flush.
    pub async fn send<T: serde::Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = encode_frame(value)?;
        let stream = &mut self.stream;
        with_deadline(self.io_timeout, async move {
            stream.write_all(&bytes).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    /// Read exactly one frame and decode it.
    ///
    /// Short reads are retried until the frame is complete.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NoData`] if the peer closed before sending anything
    /// - [`BridgeError::Truncated`] if the peer closed mid-frame
    /// - [`BridgeError::Protocol`] for oversize, badly compressed or non-JSON frames
    pub async fn recv<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let frame = with_deadline(
            self.io_timeout,
            read_frame(&mut self.stream, self.max_payload_size),
        )
        .await?;
        frame.decode()
    }

    /// Shut down the write half, signalling end of stream to the peer.
    pub async fn close(&mut self) -> Result<()> {
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, max_payload_size: u32) -> Result<Frame> {
    let mut buffer = FrameBuffer::with_max_payload(max_payload_size);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut received_any = false;

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(buffer
                .eof_error(received_any)
                .unwrap_or(BridgeError::NoData));
        }
        received_any = true;

        // Anything after the first frame is ignored: one packet per direction.
        if let Some(frame) = buffer.push(&chunk[..n])?.into_iter().next() {
            return Ok(frame);
        }
    }
}

async fn with_deadline<T, F>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, Packet, TerminateSubmission};
    use serde_json::{json, Value};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_send_recv_packet() {
        let (a, b) = duplex(4096);
        let mut client = Channel::new(a);
        let mut server = Channel::new(b);

        let packet = Packet::from_message(&TerminateSubmission { submission_id: 5 }).unwrap();
        client.send(&packet).await.unwrap();

        let received: Packet = server.recv().await.unwrap();
        assert_eq!(received, packet);
    }

    #[tokio::test]
    async fn test_recv_across_small_writes() {
        let (mut a, b) = duplex(4096);
        let mut server = Channel::new(b);

        let bytes = encode_frame(&json!({"name": "bad-request"})).unwrap();
        let writer = tokio::spawn(async move {
            for byte in bytes {
                a.write_all(&[byte]).await.unwrap();
                a.flush().await.unwrap();
            }
            a
        });

        let received: Value = server.recv().await.unwrap();
        assert_eq!(received, json!({"name": "bad-request"}));
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_recv_no_data() {
        let (a, b) = duplex(64);
        drop(a);
        let mut server = Channel::new(b);

        let err = server.recv::<Value>().await.unwrap_err();
        assert!(matches!(err, BridgeError::NoData));
    }

    #[tokio::test]
    async fn test_recv_truncated_payload() {
        let (mut a, b) = duplex(4096);
        let bytes = encode_frame(&json!({"name": "submission-request"})).unwrap();
        a.write_all(&bytes[..bytes.len() - 2]).await.unwrap();
        drop(a);

        let mut server = Channel::new(b);
        let err = server.recv::<Value>().await.unwrap_err();
        assert!(matches!(err, BridgeError::Truncated { .. }));
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn test_recv_truncated_prefix() {
        let (mut a, b) = duplex(64);
        a.write_all(&[0, 0]).await.unwrap();
        drop(a);

        let mut server = Channel::new(b);
        let err = server.recv::<Value>().await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Truncated {
                expected: 4,
                received: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_recv_bad_compression() {
        let (mut a, b) = duplex(64);
        a.write_all(&build_frame(b"not zlib").unwrap()).await.unwrap();
        drop(a);

        let mut server = Channel::new(b);
        assert!(server.recv::<Value>().await.unwrap_err().is_protocol());
    }

    #[tokio::test]
    async fn test_recv_oversize_rejected() {
        let (mut a, b) = duplex(64);
        a.write_all(&1_000_000u32.to_be_bytes()).await.unwrap();

        let mut server = Channel::new(b).with_max_payload(1024);
        let err = server.recv::<Value>().await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout() {
        let (_a, b) = duplex(64);
        let mut server = Channel::new(b).with_io_timeout(Some(Duration::from_secs(5)));

        let err = server.recv::<Value>().await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout));
    }

    #[tokio::test]
    async fn test_close_signals_eof() {
        let (a, b) = duplex(64);
        let mut client = Channel::new(a);
        let mut server = Channel::new(b);

        client.close().await.unwrap();

        assert!(matches!(
            server.recv::<Value>().await.unwrap_err(),
            BridgeError::NoData
        ));
    }
}
