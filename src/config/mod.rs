//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)  +  CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → ServerConfig
//!     → resolver.rs (ResolverConfig: validated, immutable)
//!     → shared via Arc with every connection's resolver
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - A configuration that violates the window/capacity bounds never reaches
//!   the accept loop

pub mod loader;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use resolver::{FixedLiteral, HeaderMode, LegacyDetection, ResolverConfig, SearchWindow};
pub use schema::{
    HeaderModeSettings, LegacyCompat, ListenerConfig, LogFormat, ObservabilityConfig,
    ResolverSettings, ServerConfig, ValidationLevel,
};
pub use validation::{validate_config, ValidationError};
