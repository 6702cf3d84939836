//! # Base64 Enforcement
//!
//! Validity checks applied to Secret data values when `encryption.enforceBase64`
//! is set.
//!
//! - `relaxed` re-encodes the value and decodes it again. Any byte sequence
//!   survives that round trip, so relaxed mode never reports a violation. It only
//!   proves a value is representable as base64, not that it was stored encoded.
//! - `strict` treats a value as valid only if it contains no printable ASCII byte
//!   (32..=126). This is a "looks binary or encrypted" heuristic, not a base64
//!   grammar check.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// How data values are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base64Mode {
    #[default]
    Relaxed,
    Strict,
}

impl Base64Mode {
    /// Parse the mode from the policy spec
    ///
    /// Unset, empty or unrecognised values fall back to `Relaxed`.
    #[must_use]
    pub fn from_spec(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("strict") => Base64Mode::Strict,
            _ => Base64Mode::Relaxed,
        }
    }

    /// Whether the spec value names a known mode
    #[must_use]
    pub fn is_recognised(value: Option<&str>) -> bool {
        match value.map(str::trim) {
            None | Some("") => true,
            Some(mode) => {
                mode.eq_ignore_ascii_case("strict") || mode.eq_ignore_ascii_case("relaxed")
            }
        }
    }

    #[must_use]
    pub fn is_valid(self, value: &[u8]) -> bool {
        match self {
            Base64Mode::Relaxed => round_trips(value),
            Base64Mode::Strict => !value.iter().any(|b| is_printable_ascii(*b)),
        }
    }
}

fn is_printable_ascii(byte: u8) -> bool {
    (32..=126).contains(&byte)
}

fn round_trips(value: &[u8]) -> bool {
    let encoded = STANDARD.encode(value);
    STANDARD.decode(encoded).is_ok()
}
