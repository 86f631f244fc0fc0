//! Validated runtime form of the resolver settings.
//!
//! [`ResolverConfig`] is immutable and shared via `Arc` by every resolver the
//! process starts. It can only be obtained through [`TryFrom`], so the
//! window/capacity bounds the scanner relies on always hold.

use std::sync::Arc;
use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::schema::{HeaderModeSettings, LegacyCompat, ResolverSettings, ValidationLevel};
use crate::config::validation::{validate_resolver, ValidationError};

pub(crate) const DEFAULT_HOST_PORT: u16 = 80;

/// Build the extra header a gateway sends for `host:port`.
pub fn host_literal(host: &str, port: u16) -> String {
    format!("GET / HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n")
}

/// Validated resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    capacity: usize,
    tail_marker: Box<[u8]>,
    mode: HeaderMode,
    legacy: Option<LegacyDetection>,
    deadline: Option<Duration>,
}

/// How the end of the extra header is located. Chosen once, at configuration
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMode {
    Search(SearchWindow),
    FixedLiteral(FixedLiteral),
}

/// Bounds of the tail-marker search. The marker must start inside
/// `[min_header_length, max_search_length)`; validation keeps
/// `max_search_length + tail_marker.len()` within capacity so a marker
/// starting at the last window position can still be buffered whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub min_header_length: usize,
    pub max_search_length: usize,
}

/// An exact expected header and how strictly it is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLiteral {
    bytes: Box<[u8]>,
    validation: ValidationLevel,
}

impl FixedLiteral {
    pub fn new(literal: impl Into<Vec<u8>>, validation: ValidationLevel) -> Self {
        Self {
            bytes: literal.into().into_boxed_slice(),
            validation,
        }
    }

    /// Literal for the advertised gateway domain and port.
    pub fn for_host(host: &str, port: u16, validation: ValidationLevel) -> Self {
        Self::new(host_literal(host, port), validation)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn validation(&self) -> ValidationLevel {
        self.validation
    }
}

/// Detection of clients that speak the old protocol and send no header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDetection {
    marker: Box<[u8]>,
    preference: LegacyCompat,
}

impl LegacyDetection {
    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    pub fn preference(&self) -> LegacyCompat {
        self.preference
    }

    /// `None` until enough bytes arrived to decide; `Some(true)` when the
    /// prefix is not the new-version marker.
    pub fn is_legacy(&self, filled: &[u8]) -> Option<bool> {
        let prefix = filled.get(..self.marker.len())?;
        Some(prefix != &*self.marker)
    }
}

impl ResolverConfig {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn tail_marker(&self) -> &[u8] {
        &self.tail_marker
    }

    pub fn mode(&self) -> &HeaderMode {
        &self.mode
    }

    pub fn legacy(&self) -> Option<&LegacyDetection> {
        self.legacy.as_ref()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Fewest buffered bytes that could possibly hold a complete header.
    pub fn min_header_length(&self) -> usize {
        match &self.mode {
            HeaderMode::Search(window) => window.min_header_length,
            HeaderMode::FixedLiteral(literal) => literal.len(),
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl TryFrom<&ResolverSettings> for ResolverConfig {
    type Error = ConfigError;

    fn try_from(settings: &ResolverSettings) -> Result<Self, Self::Error> {
        validate_resolver(settings).map_err(ConfigError::Validation)?;

        let mode = match &settings.mode {
            HeaderModeSettings::Search {
                min_header_length,
                max_search_length,
            } => HeaderMode::Search(SearchWindow {
                min_header_length: *min_header_length,
                max_search_length: *max_search_length,
            }),
            HeaderModeSettings::FixedLiteral {
                literal: Some(literal),
                validation,
                ..
            } => HeaderMode::FixedLiteral(FixedLiteral::new(literal.as_bytes(), *validation)),
            HeaderModeSettings::FixedLiteral {
                host: Some(host),
                port,
                validation,
                ..
            } => HeaderMode::FixedLiteral(FixedLiteral::for_host(
                host,
                port.unwrap_or(DEFAULT_HOST_PORT),
                *validation,
            )),
            HeaderModeSettings::FixedLiteral { .. } => {
                return Err(ConfigError::Validation(vec![ValidationError::MissingLiteral]));
            }
        };

        let legacy = match settings.legacy_compat {
            LegacyCompat::Off => None,
            preference => Some(LegacyDetection {
                marker: settings.legacy_marker.as_bytes().into(),
                preference,
            }),
        };

        Ok(Self {
            capacity: settings.capacity,
            tail_marker: settings.tail_marker.as_bytes().into(),
            mode,
            legacy,
            deadline: settings.deadline_ms.map(Duration::from_millis),
        })
    }
}

impl TryFrom<ResolverSettings> for ResolverConfig {
    type Error = ConfigError;

    fn try_from(settings: ResolverSettings) -> Result<Self, Self::Error> {
        Self::try_from(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_select_search_mode() {
        let config = ResolverConfig::try_from(&ResolverSettings::default()).unwrap();
        assert_eq!(config.capacity(), 1024);
        assert_eq!(config.tail_marker(), b"\r\n\r\n");
        assert_eq!(
            config.mode(),
            &HeaderMode::Search(SearchWindow {
                min_header_length: 16,
                max_search_length: 512,
            })
        );
        assert_eq!(config.legacy().unwrap().marker(), b"GET ");
        assert_eq!(config.deadline(), None);
    }

    #[test]
    fn host_and_port_build_the_literal() {
        let mut settings = ResolverSettings::default();
        settings.deadline_ms = Some(800);
        settings.mode = HeaderModeSettings::FixedLiteral {
            literal: None,
            host: Some("s1.app.example.com".into()),
            port: Some(8000),
            validation: ValidationLevel::Full,
        };

        let config = ResolverConfig::try_from(settings).unwrap();
        match config.mode() {
            HeaderMode::FixedLiteral(literal) => {
                assert_eq!(
                    literal.as_bytes(),
                    b"GET / HTTP/1.1\r\nHost: s1.app.example.com:8000\r\n\r\n"
                );
                assert_eq!(literal.validation(), ValidationLevel::Full);
                assert_eq!(config.min_header_length(), literal.len());
            }
            other => panic!("expected fixed literal, got {other:?}"),
        }
        assert_eq!(config.deadline(), Some(Duration::from_millis(800)));
    }

    #[test]
    fn invalid_settings_are_rejected_before_use() {
        let mut settings = ResolverSettings::default();
        settings.capacity = 100;
        let err = ResolverConfig::try_from(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn legacy_detection_waits_for_full_marker() {
        let config = ResolverConfig::try_from(&ResolverSettings::default()).unwrap();
        let legacy = config.legacy().unwrap();
        assert_eq!(legacy.is_legacy(b"GE"), None);
        assert_eq!(legacy.is_legacy(b"GET /"), Some(false));
        assert_eq!(legacy.is_legacy(b"PING"), Some(true));
    }

    #[test]
    fn compat_off_disables_detection() {
        let mut settings = ResolverSettings::default();
        settings.legacy_compat = LegacyCompat::Off;
        let config = ResolverConfig::try_from(settings).unwrap();
        assert!(config.legacy().is_none());
    }
}
