//! Gateway extra-header resolver.
//!
//! A front-end gateway prepends a pseudo-HTTP header
//! (`GET / HTTP/1.1\r\nHost: ...\r\n\r\n`) to the first bytes of every
//! connection. This crate reads and strips that header so the application
//! sees only its own payload, with any payload bytes that arrived alongside
//! the header left at the front of the connection buffer.
//!
//! ```no_run
//! use tgw_resolver::config::{ResolverConfig, ResolverSettings};
//! use tgw_resolver::resolver::Resolver;
//!
//! # async fn example(stream: tokio::net::TcpStream) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResolverConfig::try_from(&ResolverSettings::default())?.into_shared();
//! match Resolver::new(stream, config).resolve().await {
//!     Ok(resolved) => println!("{} payload bytes buffered", resolved.leftover),
//!     Err(abandoned) => eprintln!("dropping connection: {}", abandoned.error),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod echo;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resolver;

pub use config::{ResolverConfig, ServerConfig};
pub use echo::EchoServer;
pub use lifecycle::Shutdown;
pub use resolver::{begin_resolution, Resolver};
