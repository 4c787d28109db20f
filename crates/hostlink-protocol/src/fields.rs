//! Optional field decoding.
//!
//! The control byte announces whether an instance index and/or a storage
//! address follow the header. Both fields are independent and optional at
//! the protocol level; which combinations a concrete message type accepts
//! is the dispatcher's decision, not this module's.

use crate::codec;
use crate::message::ProtocolError;
use crate::request::Request;
use crate::validator::ValidatedHeader;
use hostlink_core::config::NumberFormat;
use hostlink_core::constants::{WIDTH_ADDRESS, WIDTH_INDEX};

/// Consume the optional index and address tokens announced by the control
/// byte. A missing or unparseable token is `InvalidIndex`/`InvalidAddress`.
pub fn decode_fields(
    header: ValidatedHeader<'_>,
    format: NumberFormat,
) -> Result<Request<'_>, ProtocolError> {
    let ValidatedHeader {
        message_type,
        mode,
        index_present,
        address_present,
        mut tokens,
    } = header;

    let index = if index_present {
        let value = tokens
            .next(WIDTH_INDEX)
            .and_then(|token| codec::parse_unsigned(token, format))
            .filter(|v| *v <= u32::from(u8::MAX))
            .ok_or(ProtocolError::InvalidIndex)?;
        Some(value as u8)
    } else {
        None
    };

    let address = if address_present {
        let value = tokens
            .next(WIDTH_ADDRESS)
            .and_then(|token| codec::parse_unsigned(token, format))
            .filter(|v| *v <= u32::from(u16::MAX))
            .ok_or(ProtocolError::InvalidAddress)?;
        Some(value as u16)
    } else {
        None
    };

    Ok(Request {
        message_type,
        mode,
        index,
        address,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AccessMode;
    use crate::validator::validate;
    use hostlink_core::WireConfig;

    fn bare_config() -> WireConfig {
        WireConfig {
            separator: None,
            use_checksum: false,
            ..WireConfig::default()
        }
    }

    fn decode(frame: &[u8]) -> Result<(Option<u8>, Option<u16>), ProtocolError> {
        let header = validate(frame, &bare_config()).unwrap();
        decode_fields(header, NumberFormat::Hex).map(|r| (r.index, r.address))
    }

    #[test]
    fn test_no_optional_fields() {
        assert_eq!(decode(b"$PM0"), Ok((None, None)));
    }

    #[test]
    fn test_index_only() {
        assert_eq!(decode(b"$DO20D"), Ok((Some(0x0D), None)));
    }

    #[test]
    fn test_address_only() {
        assert_eq!(decode(b"$EE40010"), Ok((None, Some(0x10))));
    }

    #[test]
    fn test_index_and_address() {
        assert_eq!(decode(b"$EE6050010"), Ok((Some(5), Some(0x10))));
    }

    #[test]
    fn test_missing_index() {
        assert_eq!(decode(b"$DO2"), Err(ProtocolError::InvalidIndex));
    }

    #[test]
    fn test_missing_address() {
        assert_eq!(decode(b"$EE4"), Err(ProtocolError::InvalidAddress));
    }

    #[test]
    fn test_index_decoded_before_address() {
        // both announced, only one token present: the index consumes it
        // and the address comes up missing
        assert_eq!(decode(b"$EE605"), Err(ProtocolError::InvalidAddress));
    }

    #[test]
    fn test_mode_preserved() {
        let header = validate(b"$DO304", &bare_config()).unwrap();
        let request = decode_fields(header, NumberFormat::Hex).unwrap();
        assert_eq!(request.mode, AccessMode::Write);
        assert_eq!(request.index, Some(4));
    }
}
