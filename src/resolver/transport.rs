//! The byte stream a resolver reads from.
//!
//! Only a "read some bytes" operation is needed. Cancelling a pending read is
//! not a transport method: the resolver races the read against its
//! [`StopHandle`](crate::resolver::StopHandle), which drops the read future.

use std::future::Future;
use std::io;

use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::net::TcpStream;

/// Duplex byte stream the extra header arrives on.
pub trait Transport: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed the stream.
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a;

    /// Who is on the other end, for logging only.
    fn remote_identity(&self) -> String;
}

impl Transport for TcpStream {
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        AsyncReadExt::read(self, buf)
    }

    fn remote_identity(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

impl Transport for DuplexStream {
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        AsyncReadExt::read(self, buf)
    }

    fn remote_identity(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn duplex_reads_what_was_written() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"GET ").await.unwrap();

        let mut buf = [0u8; 16];
        let n = server.read_some(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"GET ");
        assert_eq!(server.remote_identity(), "in-memory");

        drop(client);
        assert_eq!(server.read_some(&mut buf).await.unwrap(), 0);
    }
}
