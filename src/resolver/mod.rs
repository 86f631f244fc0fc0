//! Extra-header resolution subsystem.
//!
//! # Data Flow
//! ```text
//! accepted transport
//!     → machine.rs (read into buffer.rs, one read at a time)
//!     → scanner.rs (Pending | Found | Malformed)
//!     → machine.rs (read again | compact + Resolved | Failed)
//!     → exactly one continuation: on_success(Resolved) / on_failure(Abandoned)
//!
//! Deadline (optional):
//!     timer → stop.rs (raise flag) → pending read completes as Cancelled
//!     → ordinary failure path
//! ```
//!
//! # Design Decisions
//! - The spawned task owns the resolver until the outcome is dispatched;
//!   callers never need to keep it alive
//! - `stop()` never dispatches; only the read-completion path does
//! - Classification and compaction are synchronous; the only suspension
//!   point is the transport read

pub mod buffer;
pub mod error;
pub mod machine;
pub mod scanner;
pub mod stop;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::config::{ConfigError, ResolverConfig};

pub use buffer::ConnectionBuffer;
pub use error::{MalformedHeader, ResolveError, TransportError};
pub use machine::{
    Abandoned, HeaderDisposition, Outcome, Resolved, Resolver, ResolverState, Transition,
};
pub use scanner::{scan, Scan};
pub use stop::StopHandle;
pub use transport::Transport;

/// Start resolving the extra header of `transport` in the background.
///
/// Exactly one of `on_success` / `on_failure` runs, on the spawned task. If
/// the config carries a deadline, a timer stops the pending read when it
/// elapses. Must be called from within a tokio runtime.
pub fn begin_resolution<T, S, F>(
    transport: T,
    buffer: ConnectionBuffer,
    config: Arc<ResolverConfig>,
    on_success: S,
    on_failure: F,
) -> Result<ResolutionHandle, ConfigError>
where
    T: Transport + 'static,
    S: FnOnce(Resolved<T>) + Send + 'static,
    F: FnOnce(Abandoned<T>) + Send + 'static,
{
    let resolver = Resolver::with_buffer(transport, buffer, config)?;
    Ok(spawn_resolver(resolver, on_success, on_failure))
}

/// Spawn an already constructed resolver. See [`begin_resolution`].
pub fn spawn_resolver<T, S, F>(resolver: Resolver<T>, on_success: S, on_failure: F) -> ResolutionHandle
where
    T: Transport + 'static,
    S: FnOnce(Resolved<T>) + Send + 'static,
    F: FnOnce(Abandoned<T>) + Send + 'static,
{
    let stop = resolver.stop_handle();
    let deadline = resolver
        .config()
        .deadline()
        .map(|after| arm_deadline(stop.clone(), after));

    let task = tokio::spawn(
        async move {
            let outcome = resolver.resolve().await;
            if let Some(timer) = deadline {
                timer.abort();
            }
            match outcome {
                Ok(resolved) => on_success(resolved),
                Err(abandoned) => on_failure(abandoned),
            }
        }
        .in_current_span(),
    );

    ResolutionHandle { stop, task }
}

fn arm_deadline(stop: StopHandle, after: Duration) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            tokio::time::sleep(after).await;
            if stop.stop() {
                tracing::debug!(
                    deadline_ms = after.as_millis() as u64,
                    "Header deadline elapsed, cancelling pending read"
                );
            }
        }
        .in_current_span(),
    )
}

/// Handle to a resolution running in the background.
#[derive(Debug)]
pub struct ResolutionHandle {
    stop: StopHandle,
    task: JoinHandle<()>,
}

impl ResolutionHandle {
    /// Cancel the pending read. The failure continuation reports it.
    pub fn stop(&self) -> bool {
        self.stop.stop()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the dispatched continuation to return.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}
