//! Echo session over a resolved connection.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::resolver::{ConnectionBuffer, Resolved};

/// Session ended on an I/O error after echoing `echoed` bytes.
#[derive(Debug, thiserror::Error)]
#[error("echo failed after {echoed} bytes: {source}")]
pub struct EchoError {
    pub echoed: u64,
    #[source]
    pub source: io::Error,
}

/// Writes back everything the client sends, starting with the payload bytes
/// that arrived together with the extra header.
pub struct EchoSession<S> {
    stream: S,
    buffer: ConnectionBuffer,
    leftover: usize,
}

impl<S> EchoSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(resolved: Resolved<S>) -> Self {
        Self {
            stream: resolved.transport,
            buffer: resolved.buffer,
            leftover: resolved.leftover,
        }
    }

    /// Run until the client closes its side. Returns the number of bytes echoed.
    pub async fn run(mut self) -> Result<u64, EchoError> {
        let mut echoed = 0u64;
        let result = self.echo_until_eof(&mut echoed).await;
        metrics::record_echoed(echoed);
        result.map_err(|source| EchoError { echoed, source })?;

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "Shutdown after echo failed");
        }
        Ok(echoed)
    }

    async fn echo_until_eof(&mut self, echoed: &mut u64) -> io::Result<()> {
        let mut pending = self.leftover;
        loop {
            if pending > 0 {
                self.stream
                    .write_all(&self.buffer.as_mut_slice()[..pending])
                    .await?;
                *echoed += pending as u64;
            }
            pending = self.stream.read(self.buffer.as_mut_slice()).await?;
            if pending == 0 {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::HeaderDisposition;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[tokio::test]
    async fn echoes_leftover_then_stream() {
        let (mut client, server) = tokio::io::duplex(256);

        let mut buffer = ConnectionBuffer::with_capacity(64);
        buffer.unfilled_mut()[..5].copy_from_slice(b"early");
        buffer.advance(5);

        let session = EchoSession::new(Resolved {
            transport: server,
            buffer,
            leftover: 5,
            disposition: HeaderDisposition::Stripped { header_len: 27 },
        });
        let task = tokio::spawn(session.run());

        client.write_all(b" and late").await.unwrap();
        let mut echoed = vec![0u8; 14];
        client.read_exact(&mut echoed).await.unwrap();
        assert_eq!(echoed, b"early and late");

        client.shutdown().await.unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 14);
    }

    #[tokio::test]
    async fn nothing_leftover_waits_for_client() {
        let (mut client, server) = tokio::io::duplex(64);
        let session = EchoSession::new(Resolved {
            transport: server,
            buffer: ConnectionBuffer::with_capacity(16),
            leftover: 0,
            disposition: HeaderDisposition::Stripped { header_len: 27 },
        });
        let task = tokio::spawn(session.run());

        client.write_all(b"ping").await.unwrap();
        let mut reply = [0u8; 4];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"ping");

        drop(client);
        assert_eq!(task.await.unwrap().unwrap(), 4);
    }

    /// Reads a fixed input once, then accepts at most `write_limit` bytes.
    struct BrokenPeer {
        input: &'static [u8],
        written: usize,
        write_limit: usize,
    }

    impl AsyncRead for BrokenPeer {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let n = self.input.len().min(buf.remaining());
            buf.put_slice(&self.input[..n]);
            self.input = &self.input[n..];
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for BrokenPeer {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let room = self.write_limit - self.written;
            if room == 0 {
                return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
            }
            let n = buf.len().min(room);
            self.written += n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_failure_reports_bytes_already_echoed() {
        let mut buffer = ConnectionBuffer::with_capacity(16);
        buffer.unfilled_mut()[..2].copy_from_slice(b"hi");
        buffer.advance(2);

        let peer = BrokenPeer {
            input: b"abcd",
            written: 0,
            write_limit: 4,
        };
        let session = EchoSession::new(Resolved {
            transport: peer,
            buffer,
            leftover: 2,
            disposition: HeaderDisposition::Legacy,
        });

        let err = session.run().await.unwrap_err();
        assert_eq!(err.echoed, 2);
        assert_eq!(err.source.kind(), io::ErrorKind::BrokenPipe);
    }
}
