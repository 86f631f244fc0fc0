//! Failure taxonomy surfaced to the failure continuation.

use thiserror::Error;

use crate::config::ValidationLevel;

/// Why header resolution was abandoned.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The transport failed, closed, or the pending read was cancelled.
    /// Not retried here; the caller decides.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The header could not be located or did not match. Always fatal.
    #[error("malformed extra header: {0}")]
    Malformed(#[from] MalformedHeader),
}

impl ResolveError {
    /// True when the failure came from `stop()` rather than the peer.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Transport(TransportError::Cancelled))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Transport(TransportError::Io(_)) => "io",
            ResolveError::Transport(TransportError::Closed) => "closed",
            ResolveError::Transport(TransportError::Cancelled) => "cancelled",
            ResolveError::Malformed(_) => "malformed",
        }
    }
}

/// Failure of the underlying read.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the connection before the header was resolved")]
    Closed,

    #[error("pending read was cancelled")]
    Cancelled,
}

/// Ways the buffered bytes can fail to form a valid extra header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedHeader {
    #[error("no tail marker found before offset {window_end}")]
    TerminatorNotFound { window_end: usize },

    #[error("received header does not match the configured literal ({validation:?} check)")]
    LiteralMismatch { validation: ValidationLevel },

    #[error("buffer capacity of {capacity} bytes exhausted without a header")]
    CapacityExhausted { capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_a_transport_error() {
        let err = ResolveError::from(TransportError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), "cancelled");
        assert!(matches!(err, ResolveError::Transport(_)));
    }

    #[test]
    fn malformed_messages_name_the_window() {
        let err = ResolveError::from(MalformedHeader::TerminatorNotFound { window_end: 80 });
        assert!(!err.is_cancelled());
        assert_eq!(
            err.to_string(),
            "malformed extra header: no tail marker found before offset 80"
        );
    }
}
