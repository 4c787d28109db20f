//! Wire framing configuration.
//!
//! The original firmware selected separator, checksum, type-code width and
//! number format with preprocessor branches. Here they form one immutable
//! [`WireConfig`] value, constructed at startup, validated once and threaded
//! by reference through the codec, the validator and the reply encoder.
//! Both peers must be built with the same configuration; none of these
//! options change message semantics, only framing.

use crate::constants::{
    CR, DEFAULT_SEPARATOR, EMPTY_DATA, LF, START_ERROR, START_REPLY, START_REQUEST,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Encoding used for numeric payload fields.
///
/// Registers, stored bytes and checksums are always hexadecimal; this
/// selects the encoding of the remaining numeric fields (indices, counters,
/// samples, positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    /// Fixed-width, zero-padded, uppercase hexadecimal.
    Hex,
    /// Variable-width decimal. Requires a separator to stay parseable.
    Decimal,
}

/// Framing options shared by every component of the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireConfig {
    /// Field separator byte, or `None` for fixed-width framing.
    pub separator: Option<u8>,

    /// Append and verify a low-byte-sum checksum on every frame.
    pub use_checksum: bool,

    /// Two-character readable type codes (`PM`) instead of one-byte
    /// compact codes.
    pub readable_type_codes: bool,

    /// Encoding of numeric payload fields.
    pub number_format: NumberFormat,

    /// Echo the offending frame inside error replies (diagnostics aid).
    pub echo_input_on_error: bool,
}

impl Default for WireConfig {
    fn default() -> Self {
        WireConfig {
            separator: Some(DEFAULT_SEPARATOR),
            use_checksum: true,
            readable_type_codes: true,
            number_format: NumberFormat::Hex,
            echo_input_on_error: false,
        }
    }
}

impl WireConfig {
    /// Check internal consistency of the configuration.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if:
    /// - the number format is decimal but no separator is configured
    ///   (variable-width fields cannot be re-tokenized without one), or
    /// - the separator collides with a frame marker, the terminator, or a
    ///   hex digit (which would corrupt checksum extraction).
    pub fn validate(&self) -> Result<()> {
        if self.number_format == NumberFormat::Decimal && self.separator.is_none() {
            return Err(Error::InvalidConfig {
                message: "decimal number format requires a field separator".to_string(),
            });
        }

        if let Some(sep) = self.separator {
            if RESERVED_BYTES.contains(&sep) || sep.is_ascii_hexdigit() {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "separator byte {:#04x} collides with the wire grammar",
                        sep
                    ),
                });
            }
        }

        Ok(())
    }

    /// Number of characters of a type code under this configuration.
    pub fn type_code_len(&self) -> usize {
        if self.readable_type_codes { 2 } else { 1 }
    }
}

/// Bytes that may never be used as the field separator.
const RESERVED_BYTES: [u8; 6] = [START_REQUEST, START_REPLY, START_ERROR, EMPTY_DATA, CR, LF];
