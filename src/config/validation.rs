//! Configuration validation.
//!
//! Serde handles syntax; this module checks the semantic bounds the resolver
//! relies on (search window inside the buffer, non-empty markers, literal
//! that fits). Every violation is reported, not just the first, and all of
//! it runs before the listener binds.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::resolver::{host_literal, DEFAULT_HOST_PORT};
use crate::config::schema::{
    HeaderModeSettings, LegacyCompat, ListenerConfig, ObservabilityConfig, ResolverSettings,
    ServerConfig, ValidationLevel,
};

/// A single semantic configuration violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("resolver.capacity must be greater than zero")]
    ZeroCapacity,

    #[error("resolver.tail_marker must not be empty")]
    EmptyTailMarker,

    #[error("min_header_length ({min}) exceeds max_search_length ({max})")]
    InvertedWindow { min: usize, max: usize },

    #[error("max_search_length ({max}) exceeds capacity minus tail marker ({limit})")]
    WindowExceedsCapacity { max: usize, limit: usize },

    #[error("resolver.legacy_marker must not be empty when legacy_compat is enabled")]
    EmptyLegacyMarker,

    #[error("legacy_marker length ({len}) exceeds capacity ({capacity})")]
    LegacyMarkerTooLong { len: usize, capacity: usize },

    #[error("fixed-literal mode needs either `literal` or `host`")]
    MissingLiteral,

    #[error("fixed-literal mode takes `literal` or `host`, not both")]
    AmbiguousLiteral,

    #[error("fixed header literal must not be empty")]
    EmptyLiteral,

    #[error("fixed header literal length ({len}) exceeds capacity ({capacity})")]
    LiteralTooLong { len: usize, capacity: usize },

    #[error("tail-only validation requires the literal to end with the tail marker")]
    LiteralLacksTail,

    #[error("resolver.deadline_ms must be greater than zero")]
    ZeroDeadline,

    #[error("buffer of {actual} bytes is smaller than the configured capacity ({required})")]
    BufferTooSmall { actual: usize, required: usize },

    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// Validate a full server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_listener(&config.listener, &mut errors);
    check_resolver(&config.resolver, &mut errors);
    check_observability(&config.observability, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate resolver settings on their own.
pub fn validate_resolver(settings: &ResolverSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_resolver(settings, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_listener(listener: &ListenerConfig, errors: &mut Vec<ValidationError>) {
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            listener.bind_address.clone(),
        ));
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
}

fn check_observability(observability: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }
}

fn check_resolver(settings: &ResolverSettings, errors: &mut Vec<ValidationError>) {
    let capacity = settings.capacity;
    let tail_len = settings.tail_marker.len();

    if capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }
    if tail_len == 0 {
        errors.push(ValidationError::EmptyTailMarker);
    }
    if settings.deadline_ms == Some(0) {
        errors.push(ValidationError::ZeroDeadline);
    }

    if settings.legacy_compat != LegacyCompat::Off {
        let len = settings.legacy_marker.len();
        if len == 0 {
            errors.push(ValidationError::EmptyLegacyMarker);
        } else if len > capacity {
            errors.push(ValidationError::LegacyMarkerTooLong { len, capacity });
        }
    }

    match &settings.mode {
        HeaderModeSettings::Search {
            min_header_length,
            max_search_length,
        } => {
            if min_header_length > max_search_length {
                errors.push(ValidationError::InvertedWindow {
                    min: *min_header_length,
                    max: *max_search_length,
                });
            }
            let limit = capacity.saturating_sub(tail_len);
            if *max_search_length > limit {
                errors.push(ValidationError::WindowExceedsCapacity {
                    max: *max_search_length,
                    limit,
                });
            }
        }
        HeaderModeSettings::FixedLiteral {
            literal,
            host,
            port,
            validation,
        } => {
            let literal = match (literal, host) {
                (Some(_), Some(_)) => {
                    errors.push(ValidationError::AmbiguousLiteral);
                    return;
                }
                (None, None) => {
                    errors.push(ValidationError::MissingLiteral);
                    return;
                }
                (Some(literal), None) => literal.clone(),
                (None, Some(host)) => host_literal(host, port.unwrap_or(DEFAULT_HOST_PORT)),
            };

            if literal.is_empty() {
                errors.push(ValidationError::EmptyLiteral);
            } else if literal.len() > capacity {
                errors.push(ValidationError::LiteralTooLong {
                    len: literal.len(),
                    capacity,
                });
            }
            if *validation == ValidationLevel::TailOnly
                && (tail_len == 0 || !literal.ends_with(settings.tail_marker.as_str()))
            {
                errors.push(ValidationError::LiteralLacksTail);
            }
        }
    }
}
