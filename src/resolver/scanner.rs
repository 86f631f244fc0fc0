//! Header window scanner.
//!
//! Pure classification of the bytes buffered so far. No I/O and no mutation;
//! the resolver decides what to do with the answer.
//!
//! ```text
//! search mode:
//!   0          min_header_length        min(buffered, max_search_length)
//!   |----------|==========================|
//!               tail marker must start here; its last bytes may run past
//!               max_search_length (capacity reserves room for them)
//! ```

use crate::config::{FixedLiteral, HeaderMode, ResolverConfig, SearchWindow, ValidationLevel};
use crate::resolver::error::MalformedHeader;

/// Classification of a partially received header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// Not enough bytes to decide; read more.
    Pending,
    /// The header occupies `[0, header_len)`.
    Found(usize),
    /// No valid header can be formed from these bytes.
    Malformed(MalformedHeader),
}

/// Classify `filled` (the valid prefix of the connection buffer).
pub fn scan(filled: &[u8], config: &ResolverConfig) -> Scan {
    match config.mode() {
        HeaderMode::Search(window) => scan_window(filled, *window, config.tail_marker()),
        HeaderMode::FixedLiteral(literal) => scan_literal(filled, literal, config.tail_marker()),
    }
}

/// Search for a `tail_marker` starting inside the window.
///
/// Start positions are `[min_header_length, min(buffered, max_search_length))`.
/// A marker prefix at the end of the buffered bytes keeps the scan pending,
/// even once the window is full, since the next read may complete it.
pub fn scan_window(filled: &[u8], window: SearchWindow, tail_marker: &[u8]) -> Scan {
    let buffered = filled.len();
    if buffered < window.min_header_length {
        return Scan::Pending;
    }

    let mut may_complete = false;
    for start in window.min_header_length..buffered.min(window.max_search_length) {
        let candidate = &filled[start..];
        if candidate.len() >= tail_marker.len() {
            if candidate.starts_with(tail_marker) {
                return Scan::Found(start + tail_marker.len());
            }
        } else if tail_marker.starts_with(candidate) {
            may_complete = true;
            break;
        }
    }

    if may_complete || buffered < window.max_search_length {
        Scan::Pending
    } else {
        Scan::Malformed(MalformedHeader::TerminatorNotFound {
            window_end: window.max_search_length,
        })
    }
}

/// Compare the buffered prefix against a fixed literal.
pub fn scan_literal(filled: &[u8], literal: &FixedLiteral, tail_marker: &[u8]) -> Scan {
    let expected = literal.as_bytes();
    let header_len = expected.len();
    let Some(received) = filled.get(..header_len) else {
        return Scan::Pending;
    };

    let matches = match literal.validation() {
        ValidationLevel::Skip => true,
        ValidationLevel::TailOnly => {
            let from = header_len.saturating_sub(tail_marker.len());
            received[from..] == expected[from..]
        }
        ValidationLevel::Full => received == expected,
    };

    if matches {
        Scan::Found(header_len)
    } else {
        Scan::Malformed(MalformedHeader::LiteralMismatch {
            validation: literal.validation(),
        })
    }
}
