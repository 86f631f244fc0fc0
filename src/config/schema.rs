//! Configuration schema definitions.
//!
//! Everything the echo gateway reads from its TOML file. All types derive
//! Serde traits; every field has a default so an empty file is a valid
//! (search-mode, legacy-compatible) configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Extra-header resolution settings.
    pub resolver: ResolverSettings,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long to wait for open sessions after shutdown, in seconds.
    pub drain_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_connections: 10_000,
            drain_secs: 5,
        }
    }
}

/// Raw resolver settings as written in the config file.
///
/// Converted into a validated [`crate::config::ResolverConfig`] before any
/// connection is accepted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Connection buffer size in bytes.
    pub capacity: usize,

    /// Bytes terminating the extra header.
    pub tail_marker: String,

    /// Whether connections without an extra header are accepted.
    pub legacy_compat: LegacyCompat,

    /// Prefix identifying the new protocol version (header present).
    pub legacy_marker: String,

    /// Give up on a connection whose header is not resolved in time.
    pub deadline_ms: Option<u64>,

    /// How the header boundary is located.
    pub mode: HeaderModeSettings,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            capacity: 1024,
            tail_marker: "\r\n\r\n".to_string(),
            legacy_compat: LegacyCompat::default(),
            legacy_marker: "GET ".to_string(),
            deadline_ms: None,
            mode: HeaderModeSettings::default(),
        }
    }
}

/// Header location strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HeaderModeSettings {
    /// Search for the tail marker inside a bounded window.
    Search {
        #[serde(default = "default_min_header_length")]
        min_header_length: usize,
        #[serde(default = "default_max_search_length")]
        max_search_length: usize,
    },

    /// Expect one exact header. Either `literal` is given verbatim, or it is
    /// built from `host` and `port`.
    FixedLiteral {
        #[serde(default)]
        literal: Option<String>,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        validation: ValidationLevel,
    },
}

impl Default for HeaderModeSettings {
    fn default() -> Self {
        HeaderModeSettings::Search {
            min_header_length: default_min_header_length(),
            max_search_length: default_max_search_length(),
        }
    }
}

/// `"GET / HTTP/1.1\r\n"` is the shortest request line that can precede the
/// tail marker.
fn default_min_header_length() -> usize {
    16
}

fn default_max_search_length() -> usize {
    512
}

/// Compatibility with clients that send no extra header at all.
///
/// `PreferNew` and `PreferOld` behave identically; they only state which kind
/// of client is expected to dominate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyCompat {
    /// Every connection must carry the header.
    Off,
    #[default]
    PreferNew,
    PreferOld,
}

/// How strictly a fixed literal is checked against the received bytes.
///
/// The default, `Skip`, trusts the literal's length and compares nothing.
/// Pick `TailOnly` or `Full` when the header content matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationLevel {
    #[default]
    Skip,
    /// Compare only the trailing tail-marker bytes.
    TailOnly,
    /// Compare every byte.
    Full,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
