//! Resolver state machine.
//!
//! # States
//! ```text
//! AwaitingRead → Classifying → AwaitingRead   (incomplete, read again)
//!                            → Resolved       (header stripped, or legacy)
//!                            → Failed         (malformed)
//! AwaitingRead → Failed                       (transport error / cancelled)
//! ```
//!
//! A resolver owns its transport and buffer for the whole resolution and has
//! at most one read outstanding. [`Resolver::resolve`] consumes the resolver
//! and produces exactly one [`Outcome`], so success and failure are mutually
//! exclusive and cannot fire twice.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigError, ResolverConfig, ValidationError};
use crate::observability::metrics;
use crate::resolver::buffer::ConnectionBuffer;
use crate::resolver::error::{MalformedHeader, ResolveError, TransportError};
use crate::resolver::scanner::{scan, Scan};
use crate::resolver::stop::{stop_pair, StopHandle, StopSignal};
use crate::resolver::transport::Transport;

/// Where a resolver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    AwaitingRead,
    Classifying,
    Resolved,
    Failed,
}

/// What was found at the front of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDisposition {
    /// An extra header of `header_len` bytes was removed.
    Stripped { header_len: usize },
    /// Old-protocol client; nothing was removed.
    Legacy,
}

/// Result of one classification step.
#[derive(Debug)]
pub enum Transition {
    ReadMore,
    Resolved {
        disposition: HeaderDisposition,
        leftover: usize,
    },
    Failed(ResolveError),
}

/// Successful resolution. The first `leftover` bytes of `buffer` are
/// application payload.
#[derive(Debug)]
pub struct Resolved<T> {
    pub transport: T,
    pub buffer: ConnectionBuffer,
    pub leftover: usize,
    pub disposition: HeaderDisposition,
}

/// Failed resolution. Closing the transport is up to the caller.
#[derive(Debug)]
pub struct Abandoned<T> {
    pub transport: T,
    pub error: ResolveError,
}

pub type Outcome<T> = Result<Resolved<T>, Abandoned<T>>;

/// Per-connection header resolver.
pub struct Resolver<T> {
    transport: T,
    buffer: ConnectionBuffer,
    config: Arc<ResolverConfig>,
    state: ResolverState,
    stop_handle: StopHandle,
    stop: StopSignal,
    peer: String,
}

impl<T: Transport> Resolver<T> {
    /// Resolver with a freshly allocated buffer of the configured capacity.
    pub fn new(transport: T, config: Arc<ResolverConfig>) -> Self {
        let buffer = ConnectionBuffer::with_capacity(config.capacity());
        Self::assemble(transport, buffer, config)
    }

    /// Resolver reading into a caller-supplied buffer. Bytes already in the
    /// buffer are classified before the first read.
    pub fn with_buffer(
        transport: T,
        buffer: ConnectionBuffer,
        config: Arc<ResolverConfig>,
    ) -> Result<Self, ConfigError> {
        if buffer.capacity() < config.capacity() {
            return Err(ConfigError::Validation(vec![
                ValidationError::BufferTooSmall {
                    actual: buffer.capacity(),
                    required: config.capacity(),
                },
            ]));
        }
        Ok(Self::assemble(transport, buffer, config))
    }

    fn assemble(transport: T, buffer: ConnectionBuffer, config: Arc<ResolverConfig>) -> Self {
        let (stop_handle, stop) = stop_pair();
        let peer = transport.remote_identity();
        Self {
            transport,
            buffer,
            config,
            state: ResolverState::AwaitingRead,
            stop_handle,
            stop,
            peer,
        }
    }

    /// Handle that cancels the pending read.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn config(&self) -> &Arc<ResolverConfig> {
        &self.config
    }

    /// Drive reads until the header is resolved or resolution fails.
    pub async fn resolve(mut self) -> Outcome<T> {
        let started = Instant::now();
        let mut transition = if self.buffer.is_empty() {
            Transition::ReadMore
        } else {
            self.classify()
        };

        loop {
            transition = match transition {
                Transition::ReadMore => match self.read_some().await {
                    Ok(n) => {
                        self.buffer.advance(n);
                        self.classify()
                    }
                    Err(err) => {
                        self.state = ResolverState::Failed;
                        Transition::Failed(err.into())
                    }
                },
                Transition::Resolved {
                    disposition,
                    leftover,
                } => return Ok(self.succeed(disposition, leftover, started)),
                Transition::Failed(error) => return Err(self.fail(error, started)),
            };
        }
    }

    /// One CLASSIFYING step over the bytes buffered so far.
    ///
    /// On a found header the buffer is compacted so that the leftover
    /// payload starts at offset 0.
    pub fn classify(&mut self) -> Transition {
        self.state = ResolverState::Classifying;
        let buffered = self.buffer.len();

        if let Some(legacy) = self.config.legacy() {
            if legacy.is_legacy(self.buffer.filled()) == Some(true) {
                tracing::debug!(
                    peer = %self.peer,
                    bytes_buffered = buffered,
                    preference = ?legacy.preference(),
                    "No protocol marker, treating connection as legacy"
                );
                self.state = ResolverState::Resolved;
                return Transition::Resolved {
                    disposition: HeaderDisposition::Legacy,
                    leftover: buffered,
                };
            }
        }

        match scan(self.buffer.filled(), &self.config) {
            Scan::Pending if self.buffer.is_full() => {
                self.state = ResolverState::Failed;
                Transition::Failed(
                    MalformedHeader::CapacityExhausted {
                        capacity: self.buffer.capacity(),
                    }
                    .into(),
                )
            }
            Scan::Pending => {
                tracing::debug!(
                    peer = %self.peer,
                    bytes_buffered = buffered,
                    "Received incomplete header, continuing to read"
                );
                self.state = ResolverState::AwaitingRead;
                Transition::ReadMore
            }
            Scan::Malformed(reason) => {
                self.state = ResolverState::Failed;
                Transition::Failed(reason.into())
            }
            Scan::Found(header_len) => {
                let leftover = self.buffer.compact(header_len);
                self.state = ResolverState::Resolved;
                Transition::Resolved {
                    disposition: HeaderDisposition::Stripped { header_len },
                    leftover,
                }
            }
        }
    }

    /// The single suspension point. A raised stop flag wins over a read that
    /// is ready at the same time.
    async fn read_some(&mut self) -> Result<usize, TransportError> {
        self.state = ResolverState::AwaitingRead;
        let region = self.buffer.unfilled_mut();
        let n = tokio::select! {
            biased;
            _ = self.stop.stopped() => return Err(TransportError::Cancelled),
            read = self.transport.read_some(region) => read?,
        };
        if n == 0 {
            return Err(TransportError::Closed);
        }
        Ok(n)
    }

    fn succeed(
        self,
        disposition: HeaderDisposition,
        leftover: usize,
        started: Instant,
    ) -> Resolved<T> {
        let outcome = match disposition {
            HeaderDisposition::Stripped { header_len } => {
                tracing::debug!(
                    peer = %self.peer,
                    header_len,
                    leftover,
                    "Extra header resolved"
                );
                "stripped"
            }
            HeaderDisposition::Legacy => "legacy",
        };
        metrics::record_resolution(outcome, started);
        metrics::record_leftover(leftover);

        Resolved {
            transport: self.transport,
            buffer: self.buffer,
            leftover,
            disposition,
        }
    }

    fn fail(self, error: ResolveError, started: Instant) -> Abandoned<T> {
        tracing::warn!(
            peer = %self.peer,
            bytes_buffered = self.buffer.len(),
            error = %error,
            "Extra header resolution failed"
        );
        metrics::record_resolution(error.kind(), started);

        Abandoned {
            transport: self.transport,
            error,
        }
    }
}
