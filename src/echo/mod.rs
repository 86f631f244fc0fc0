//! Echo application hosted behind the gateway.
//!
//! # Data Flow
//! ```text
//! Listener::accept
//!     → server.rs (track connection, begin_resolution)
//!         on_success → session.rs (echo leftover, then read/write loop)
//!         on_failure → drop the socket
//! ```

pub mod server;
pub mod session;

pub use server::EchoServer;
pub use session::{EchoError, EchoSession};
