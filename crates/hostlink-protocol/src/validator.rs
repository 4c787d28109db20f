//! Inbound frame validation.
//!
//! A fixed five-stage pipeline runs over every assembled frame,
//! short-circuiting on the first failure. Each stage maps to exactly one
//! wire error code:
//!
//! 1. minimum viable length — `MessageTooShort`
//! 2. request start marker — `UnknownSender`
//! 3. checksum syntax — `InvalidChecksumFormat`, then value — `ChecksumMismatch`
//! 4. message type known and legal inbound — `InvalidMessageType`
//! 5. control byte is one hex digit — `InvalidReadWriteMode`
//!
//! A frame that passes all five stages is structurally valid and ready for
//! field decoding; a failing frame produces its error code and is never
//! dispatched, so collaborators never observe partially decoded data.

use crate::codec;
use crate::message::{MessageType, ProtocolError};
use crate::request::AccessMode;
use crate::tokens::Tokenizer;
use hostlink_core::constants::START_REQUEST;
use hostlink_core::WireConfig;

/// Outcome of the validation pipeline: the frame header, with payload
/// tokens still unconsumed.
#[derive(Debug)]
pub struct ValidatedHeader<'a> {
    pub message_type: MessageType,
    pub mode: AccessMode,
    pub index_present: bool,
    pub address_present: bool,
    pub tokens: Tokenizer<'a>,
}

/// Run the validation pipeline over one assembled frame (terminator
/// already stripped).
pub fn validate<'a>(
    frame: &'a [u8],
    config: &WireConfig,
) -> Result<ValidatedHeader<'a>, ProtocolError> {
    // Without a checksum the frame may end in a dangling field separator;
    // drop it so the length check sees only content.
    let mut len = frame.len();
    if !config.use_checksum {
        if let Some(sep) = config.separator {
            if len > 0 && frame[len - 1] == sep {
                len -= 1;
            }
        }
    }
    let frame = &frame[..len];

    // Stage 1: minimum viable length
    if len < minimum_length(config) {
        return Err(ProtocolError::MessageTooShort);
    }

    // Locate the checksum digits so tokenization can never consume them.
    let payload_end = if config.use_checksum {
        checksum_digits_start(frame, config)
    } else {
        len
    };

    let mut tokens = Tokenizer::new(frame, config.separator, payload_end);

    // Stage 2: request start marker
    match tokens.next(1) {
        Some(token) if token.as_bytes() == [START_REQUEST] => {}
        _ => return Err(ProtocolError::UnknownSender),
    }

    // Stage 3: checksum syntax, then value
    if config.use_checksum {
        let digits = std::str::from_utf8(&frame[payload_end..])
            .map_err(|_| ProtocolError::InvalidChecksumFormat)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::InvalidChecksumFormat);
        }
        let transmitted =
            codec::parse_hex(digits).ok_or(ProtocolError::InvalidChecksumFormat)?;
        // a zero that carries no literal '0' digit is a parse artifact
        if transmitted == 0 && !digits.contains('0') {
            return Err(ProtocolError::InvalidChecksumFormat);
        }

        let computed = codec::checksum(&frame[1..payload_end]);
        if transmitted != u32::from(computed) {
            return Err(ProtocolError::ChecksumMismatch);
        }
    }

    // Stage 4: message type
    let message_type = tokens
        .next(config.type_code_len())
        .and_then(|token| MessageType::from_wire(token, config.readable_type_codes))
        .filter(|t| t.descriptor().inbound)
        .ok_or(ProtocolError::InvalidMessageType)?;

    // Stage 5: control byte — exactly one hex digit
    let control = tokens
        .next(1)
        .filter(|token| token.len() == 1)
        .and_then(codec::parse_hex)
        .ok_or(ProtocolError::InvalidReadWriteMode)?;

    let mode = if control & 0b001 != 0 {
        AccessMode::Write
    } else {
        AccessMode::Read
    };

    Ok(ValidatedHeader {
        message_type,
        mode,
        index_present: control & 0b010 != 0,
        address_present: control & 0b100 != 0,
        tokens,
    })
}

/// Shortest frame this configuration can produce: marker + type code +
/// control byte, plus separators and checksum when enabled.
fn minimum_length(config: &WireConfig) -> usize {
    let mut min = 3; // "$aB"
    if config.separator.is_some() {
        min += 2; // "$_a_B"
    }
    if config.readable_type_codes {
        min += 1; // "$PMB"
    }
    if config.use_checksum {
        min += 2;
    }
    min
}

/// Index of the first checksum digit.
///
/// The checksum is the final 1–2 hex digits; with a separator configured, a
/// separator in the penultimate slot means a single-digit checksum.
fn checksum_digits_start(frame: &[u8], config: &WireConfig) -> usize {
    let len = frame.len();
    if let Some(sep) = config.separator {
        if frame[len - 2] == sep {
            return len - 1;
        }
    }
    len - 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_core::config::NumberFormat;
    use rstest::rstest;

    fn bare_config() -> WireConfig {
        WireConfig {
            separator: None,
            use_checksum: false,
            readable_type_codes: true,
            number_format: NumberFormat::Hex,
            echo_input_on_error: false,
        }
    }

    fn full_config() -> WireConfig {
        WireConfig::default()
    }

    /// Append the checksum the validator expects for this content. With a
    /// separator, the separator preceding the digits is part of the sum.
    fn with_checksum(body: &str, config: &WireConfig) -> String {
        if let Some(sep) = config.separator {
            let mut content = body.as_bytes()[1..].to_vec();
            content.push(sep);
            let sum = codec::checksum(&content);
            format!("{body}{}{sum:02X}", sep as char)
        } else {
            let sum = codec::checksum(&body.as_bytes()[1..]);
            format!("{body}{sum:02X}")
        }
    }

    #[test]
    fn test_valid_frame_bare() {
        let header = validate(b"$PM0", &bare_config()).unwrap();
        assert_eq!(header.message_type, MessageType::PinModes);
        assert_eq!(header.mode, AccessMode::Read);
        assert!(!header.index_present);
        assert!(!header.address_present);
    }

    #[test]
    fn test_valid_frame_with_separator_and_checksum() {
        let frame = with_checksum("$_PM_0", &full_config());
        let header = validate(frame.as_bytes(), &full_config()).unwrap();
        assert_eq!(header.message_type, MessageType::PinModes);
        assert_eq!(header.mode, AccessMode::Read);
    }

    #[test]
    fn test_control_byte_bits() {
        let frame = with_checksum("$_EE_7_05_0010_1", &full_config());
        let header = validate(frame.as_bytes(), &full_config()).unwrap();
        assert_eq!(header.mode, AccessMode::Write);
        assert!(header.index_present);
        assert!(header.address_present);
    }

    #[rstest]
    #[case("")]
    #[case("$P")]
    #[case("$PM")] // too short once checksum space is required
    fn test_too_short(#[case] body: &str) {
        assert_eq!(
            validate(body.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::MessageTooShort
        );
    }

    #[test]
    fn test_short_frame_never_reports_other_errors() {
        // garbage, but short: must be TS, not US/MT
        assert_eq!(
            validate(b"!!", &bare_config()).unwrap_err(),
            ProtocolError::MessageTooShort
        );
    }

    #[test]
    fn test_unknown_sender() {
        assert_eq!(
            validate(b"#PM0", &bare_config()).unwrap_err(),
            ProtocolError::UnknownSender
        );
        let frame = with_checksum("#_PM_0", &full_config());
        assert_eq!(
            validate(frame.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::UnknownSender
        );
    }

    #[test]
    fn test_checksum_format_error() {
        assert_eq!(
            validate(b"$_PM_0_ZZ", &full_config()).unwrap_err(),
            ProtocolError::InvalidChecksumFormat
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        assert_eq!(
            validate(b"$_PM_0_01", &full_config()).unwrap_err(),
            ProtocolError::ChecksumMismatch
        );
    }

    #[test]
    fn test_single_digit_checksum_with_separator() {
        // the content "_S0_1_ap_" sums to 0x101, so the transmitted
        // checksum is the single digit 1 preceded by a separator
        assert_eq!(
            codec::checksum(b"_S0_1_ap_"),
            0x01
        );
        let header = validate(b"$_S0_1_ap_1", &full_config()).unwrap();
        assert_eq!(header.message_type, MessageType::Text);
    }

    #[test]
    fn test_invalid_message_type() {
        let frame = with_checksum("$_ZZ_0", &full_config());
        assert_eq!(
            validate(frame.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::InvalidMessageType
        );
    }

    #[test]
    fn test_reply_only_type_rejected_inbound() {
        let frame = with_checksum("$_Bq_0", &full_config());
        assert_eq!(
            validate(frame.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::InvalidMessageType
        );
    }

    #[rstest]
    #[case("$_PM_zz")] // two chars
    #[case("$_PM_g0")] // not hex
    fn test_invalid_control_byte(#[case] body: &str) {
        let frame = with_checksum(body, &full_config());
        assert_eq!(
            validate(frame.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::InvalidReadWriteMode
        );
    }

    #[test]
    fn test_missing_control_byte() {
        // long enough to clear the length stage, but no token after the
        // type code
        let frame = with_checksum("$_PM_", &full_config());
        assert_eq!(
            validate(frame.as_bytes(), &full_config()).unwrap_err(),
            ProtocolError::InvalidReadWriteMode
        );
    }

    #[test]
    fn test_trailing_separator_stripped_without_checksum() {
        let config = WireConfig {
            use_checksum: false,
            ..WireConfig::default()
        };
        let header = validate(b"$_PM_0_", &config).unwrap();
        assert_eq!(header.message_type, MessageType::PinModes);
    }

    #[test]
    fn test_compact_type_codes() {
        let config = WireConfig {
            separator: None,
            use_checksum: false,
            readable_type_codes: false,
            number_format: NumberFormat::Hex,
            echo_input_on_error: false,
        };
        let header = validate(b"$`0", &config).unwrap();
        assert_eq!(header.message_type, MessageType::PinModes);
    }

    #[test]
    fn test_flipping_one_content_byte_breaks_checksum() {
        let frame = with_checksum("$_DO_3_00000001", &full_config());
        let bytes = frame.as_bytes();
        let crc_len = 2; // this body sums to a two-digit checksum

        for flip in 1..bytes.len() - crc_len {
            let mut mutated = bytes.to_vec();
            mutated[flip] ^= 0x01;
            let result = validate(&mutated, &full_config());
            // a flipped bit changes the byte sum, so the checksum stage
            // must reject; earlier stages may reject for their own reason
            assert!(result.is_err(), "mutation at {flip} was accepted");
        }
    }
}
