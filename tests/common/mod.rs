//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;

use tgw_resolver::config::{HeaderModeSettings, ResolverConfig, ResolverSettings, ServerConfig};
use tgw_resolver::echo::EchoServer;
use tgw_resolver::lifecycle::Shutdown;
use tgw_resolver::net::listener::Listener;
use tgw_resolver::resolver::Transport;

pub const HEADER: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";

/// What a [`ScriptedTransport`] does once its chunks run out.
#[derive(Debug, Clone, Copy)]
pub enum AfterScript {
    /// Never complete another read.
    Hang,
    /// Report end of stream.
    Eof,
}

/// In-memory transport that delivers one scripted chunk per read.
#[derive(Debug)]
pub struct ScriptedTransport {
    chunks: VecDeque<Vec<u8>>,
    after: AfterScript,
    pub reads: usize,
}

impl ScriptedTransport {
    pub fn new(chunks: Vec<Vec<u8>>, after: AfterScript) -> Self {
        Self {
            chunks: chunks.into(),
            after,
            reads: 0,
        }
    }

    pub fn hanging(chunks: Vec<Vec<u8>>) -> Self {
        Self::new(chunks, AfterScript::Hang)
    }

    pub fn silent() -> Self {
        Self::hanging(Vec::new())
    }
}

impl Transport for ScriptedTransport {
    fn read_some<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        async move {
            self.reads += 1;
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(chunk[n..].to_vec());
                    }
                    Ok(n)
                }
                None => match self.after {
                    AfterScript::Eof => Ok(0),
                    AfterScript::Hang => std::future::pending().await,
                },
            }
        }
    }

    fn remote_identity(&self) -> String {
        "scripted".to_string()
    }
}

/// Split `bytes` into chunks of the given sizes; the last chunk takes the rest.
pub fn chunked(bytes: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut rest = bytes;
    for &size in sizes {
        let (head, tail) = rest.split_at(size.min(rest.len()));
        chunks.push(head.to_vec());
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest.to_vec());
    }
    chunks
}

pub fn resolver_config(f: impl FnOnce(&mut ResolverSettings)) -> Arc<ResolverConfig> {
    let mut settings = ResolverSettings::default();
    f(&mut settings);
    ResolverConfig::try_from(&settings)
        .expect("test resolver settings must be valid")
        .into_shared()
}

pub fn search_mode(min_header_length: usize, max_search_length: usize) -> HeaderModeSettings {
    HeaderModeSettings::Search {
        min_header_length,
        max_search_length,
    }
}

/// Running echo server on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<io::Result<()>>,
}

impl TestServer {
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.unwrap()
    }
}

/// Start an echo server with `config`, listening on 127.0.0.1:0.
pub async fn start_echo_server(mut config: ServerConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.drain_secs = 1;

    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = EchoServer::new(&config).unwrap();

    let shutdown = Shutdown::new();
    let rx: broadcast::Receiver<()> = shutdown.subscribe();
    let task = tokio::spawn(server.run(listener, rx));

    // Give the accept loop a moment to start
    tokio::time::sleep(Duration::from_millis(20)).await;

    TestServer {
        addr,
        shutdown,
        task,
    }
}
