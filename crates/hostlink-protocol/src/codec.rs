//! Field-level encoding and decoding.
//!
//! Numeric fields travel in one of two interchangeable formats selected by
//! the wire configuration: fixed-width uppercase hexadecimal (zero-padded to
//! a per-field digit count) or variable-width decimal. Registers, stored
//! bytes and checksums are always hexadecimal; booleans are always a single
//! `0`/`1` character. Floats travel either as the 8-digit hex pattern of
//! their IEEE-754 bits or as a bounded-precision decimal string.
//!
//! The frame checksum is the low byte of the sum of the ASCII codes of every
//! frame byte strictly between the start marker and the checksum digits.

use hostlink_core::config::NumberFormat;
use hostlink_core::constants::FLOAT_DECIMALS;

/// Low-byte sum checksum over raw frame content.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Encode an unsigned value as uppercase hex, zero-padded to `width`.
///
/// Values wider than `width` keep all their digits; padding never truncates.
pub fn encode_hex(value: u32, width: usize) -> String {
    format!("{value:0width$X}")
}

/// Encode an unsigned value in the configured number format.
///
/// `width` is the hex digit count; decimal encoding is variable width.
pub fn encode_unsigned(value: u32, width: usize, format: NumberFormat) -> String {
    match format {
        NumberFormat::Hex => encode_hex(value, width),
        NumberFormat::Decimal => value.to_string(),
    }
}

/// Encode a boolean as its single wire character.
pub fn encode_bool(value: bool) -> char {
    if value { '1' } else { '0' }
}

/// Encode a float in the configured number format.
///
/// Decimal output is trimmed to the integer representation when the
/// fractional part is exactly zero.
pub fn encode_float(value: f32, format: NumberFormat) -> String {
    match format {
        NumberFormat::Hex => encode_hex(value.to_bits(), 8),
        NumberFormat::Decimal => {
            if value.fract() == 0.0 {
                format!("{value:.0}")
            } else {
                format!("{value:.prec$}", prec = FLOAT_DECIMALS)
            }
        }
    }
}

/// Decode a hexadecimal token.
pub fn parse_hex(token: &str) -> Option<u32> {
    u32::from_str_radix(token, 16).ok()
}

/// Decode an unsigned token in the configured number format.
pub fn parse_unsigned(token: &str, format: NumberFormat) -> Option<u32> {
    match format {
        NumberFormat::Hex => parse_hex(token),
        NumberFormat::Decimal => token.parse().ok(),
    }
}

/// Decode a boolean token: any non-zero integer is true, anything else
/// (including unparseable input) is false.
pub fn parse_bool(token: &str) -> bool {
    token.trim().parse::<i64>().map(|v| v != 0).unwrap_or(false)
}

/// Decode a float token in the configured number format.
pub fn parse_float(token: &str, format: NumberFormat) -> Option<f32> {
    match format {
        NumberFormat::Hex => parse_hex(token).map(f32::from_bits),
        NumberFormat::Decimal => token.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_checksum_is_low_byte_of_sum() {
        // 'A' = 0x41, so four of them sum to 0x104
        assert_eq!(checksum(b"AAAA"), 0x04);
        assert_eq!(checksum(b""), 0);
        // 'P' + 'M' + '0' = 0x50 + 0x4D + 0x30
        assert_eq!(checksum(b"PM0"), 0xCD);
    }

    #[rstest]
    #[case(0, 2, "00")]
    #[case(0x2A, 2, "2A")]
    #[case(0x2A, 4, "002A")]
    #[case(0x1234, 2, "1234")] // wider than the field keeps its digits
    fn test_encode_hex(#[case] value: u32, #[case] width: usize, #[case] expected: &str) {
        assert_eq!(encode_hex(value, width), expected);
    }

    #[rstest]
    #[case(255, NumberFormat::Hex, "00FF")]
    #[case(255, NumberFormat::Decimal, "255")]
    #[case(0, NumberFormat::Decimal, "0")]
    fn test_encode_unsigned(
        #[case] value: u32,
        #[case] format: NumberFormat,
        #[case] expected: &str,
    ) {
        assert_eq!(encode_unsigned(value, 4, format), expected);
    }

    #[test]
    fn test_encode_float_hex_is_bit_pattern() {
        assert_eq!(encode_float(1.5, NumberFormat::Hex), "3FC00000");
        assert_eq!(encode_float(0.0, NumberFormat::Hex), "00000000");
    }

    #[rstest]
    #[case(2.0, "2")] // zero fraction trims to integer form
    #[case(-3.0, "-3")]
    #[case(1.5, "1.500")]
    #[case(-0.25, "-0.250")]
    fn test_encode_float_decimal(#[case] value: f32, #[case] expected: &str) {
        assert_eq!(encode_float(value, NumberFormat::Decimal), expected);
    }

    #[rstest]
    #[case("FF", Some(255))]
    #[case("ff", Some(255))]
    #[case("0", Some(0))]
    #[case("", None)]
    #[case("G1", None)]
    fn test_parse_hex(#[case] token: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_hex(token), expected);
    }

    #[rstest]
    #[case("10", NumberFormat::Hex, Some(16))]
    #[case("10", NumberFormat::Decimal, Some(10))]
    #[case("x", NumberFormat::Decimal, None)]
    fn test_parse_unsigned(
        #[case] token: &str,
        #[case] format: NumberFormat,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(parse_unsigned(token, format), expected);
    }

    #[rstest]
    #[case("1", true)]
    #[case("0", false)]
    #[case("7", true)]
    #[case("-1", true)]
    #[case("garbage", false)]
    #[case("", false)]
    fn test_parse_bool(#[case] token: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(token), expected);
    }

    #[test]
    fn test_float_roundtrip_hex() {
        for value in [0.0_f32, 1.5, -27.125, 1e-6] {
            let encoded = encode_float(value, NumberFormat::Hex);
            assert_eq!(parse_float(&encoded, NumberFormat::Hex), Some(value));
        }
    }

    #[test]
    fn test_parse_float_decimal() {
        assert_eq!(parse_float("1.500", NumberFormat::Decimal), Some(1.5));
        assert_eq!(parse_float("2", NumberFormat::Decimal), Some(2.0));
        assert_eq!(parse_float("x", NumberFormat::Decimal), None);
    }
}
