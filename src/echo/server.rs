//! Accept loop that strips the gateway header before echoing.
//!
//! # Responsibilities
//! - Accept connections through the bounded [`Listener`]
//! - Start header resolution for every connection, with the configured deadline
//! - Hand resolved connections to an [`EchoSession`]
//! - Stop accepting on shutdown and drain open connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::{ConfigError, ResolverConfig, ServerConfig};
use crate::echo::session::EchoSession;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::resolver::{begin_resolution, Abandoned, ConnectionBuffer, Resolved};

/// Echo server fronted by a gateway that injects an extra header.
pub struct EchoServer {
    resolver: Arc<ResolverConfig>,
    tracker: ConnectionTracker,
    drain: Duration,
}

impl EchoServer {
    /// Build the server. Fails if the resolver settings are invalid, before
    /// any connection is accepted.
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigError> {
        let resolver = ResolverConfig::try_from(&config.resolver)?.into_shared();
        Ok(Self {
            resolver,
            tracker: ConnectionTracker::new(),
            drain: Duration::from_secs(config.listener.drain_secs),
        })
    }

    /// Accept connections until `shutdown` fires, then wait for open ones.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            capacity = self.resolver.capacity(),
            deadline = ?self.resolver.deadline(),
            "Echo server starting"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.handle_connection(stream, peer, permit),
                    Err(ListenerError::Closed) => break,
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        if !self.tracker.wait_until_idle(self.drain).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }

        tracing::info!("Echo server stopped");
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let guard = self.tracker.track();
        let span = tracing::info_span!("connection", connection_id = %guard.id(), peer = %peer);
        let _entered = span.enter();

        // The connection slot lives as long as whichever continuation is kept.
        let on_success = move |resolved: Resolved<TcpStream>| {
            tracing::info!(
                leftover = resolved.leftover,
                disposition = ?resolved.disposition,
                "Header resolved, starting echo session"
            );
            tokio::spawn(
                async move {
                    let _slot = (permit, guard);
                    match EchoSession::new(resolved).run().await {
                        Ok(echoed) => tracing::debug!(echoed, "Echo session finished"),
                        Err(e) => tracing::debug!(
                            echoed = e.echoed,
                            error = %e.source,
                            "Echo session ended with error"
                        ),
                    }
                }
                .in_current_span(),
            );
        };

        let on_failure = |abandoned: Abandoned<TcpStream>| {
            tracing::info!(
                error = %abandoned.error,
                "Closing connection without an acceptable header"
            );
            drop(abandoned.transport);
        };

        let buffer = ConnectionBuffer::with_capacity(self.resolver.capacity());
        if let Err(e) = begin_resolution(
            stream,
            buffer,
            Arc::clone(&self.resolver),
            on_success,
            on_failure,
        ) {
            tracing::error!(error = %e, "Could not start header resolution");
        }
    }
}
