//! Protocol-level constants for the hostlink wire format.
//!
//! The wire format is an ASCII line protocol: every frame is terminated by
//! CR LF, starts with a role marker, and carries hex or decimal encoded
//! fields, optionally separated by a configurable delimiter byte.
//!
//! ```text
//! $ <TYPE> <CTRL> [INDEX] [ADDRESS] PAYLOAD* [CRC] \r\n    request
//! # <TYPE> <CTRL> [INDEX] [ADDRESS] PAYLOAD* [&] [CRC] \r\n reply
//! ! <CODE> [ECHO] [CRC] \r\n                               error
//! ```
//!
//! Field widths below apply to the fixed-width (no separator) framing mode;
//! with a separator configured, fields are variable width tokens.

// ============================================================================
// Frame markers
// ============================================================================

/// Start marker of a host-to-board request.
pub const START_REQUEST: u8 = b'$';

/// Start marker of a normal board-to-host reply.
pub const START_REPLY: u8 = b'#';

/// Start marker of an error reply.
pub const START_ERROR: u8 = b'!';

/// Sentinel printed when a query legitimately has nothing to report,
/// distinguishing "no data" from "acknowledged, no payload".
pub const EMPTY_DATA: u8 = b'&';

/// Default field separator byte (used when the configuration enables one).
pub const DEFAULT_SEPARATOR: u8 = b'_';

/// Frame terminator, first byte.
pub const CR: u8 = b'\r';

/// Frame terminator, second byte.
pub const LF: u8 = b'\n';

// ============================================================================
// Buffers and limits
// ============================================================================

/// Capacity of the inbound frame buffer. A frame longer than this keeps
/// overwriting the final slot until a terminator arrives; the forcibly
/// terminated frame then fails validation normally.
pub const INPUT_BUFFER_CAPACITY: usize = 128;

/// Maximum number of (type, index) entries in a poll subscription list.
pub const POLL_LIST_CAPACITY: usize = 10;

/// Address/value pairs carried by one storage dump frame.
pub const DUMP_PAIRS_PER_FRAME: u16 = 4;

/// Number of logical slots scanned by the broadcast session.
pub const BROADCAST_SLOT_COUNT: u8 = 30;

/// Number of board descriptor pages (0..=4).
pub const BOARD_PAGE_COUNT: u8 = 5;

/// Minimum broadcast sequence period, in milliseconds.
pub const BROADCAST_PERIOD_MS: u64 = 50;

/// Minimum spacing between two poll replies, in milliseconds.
pub const POLL_THROTTLE_MS: u64 = 2;

// ============================================================================
// Fixed field widths (hex digits)
// ============================================================================

/// Instance index field.
pub const WIDTH_INDEX: usize = 2;

/// Storage address field.
pub const WIDTH_ADDRESS: usize = 4;

/// 32-bit I/O register field.
pub const WIDTH_REGISTER: usize = 8;

/// Stored byte value field.
pub const WIDTH_BYTE: usize = 2;

/// Analog input sample field.
pub const WIDTH_ANALOG_INPUT: usize = 3;

/// PWM duty field.
pub const WIDTH_PWM: usize = 2;

/// Servo position field (millidegrees).
pub const WIDTH_SERVO: usize = 5;

/// Engine cycle time field (microseconds, max 1 s).
pub const WIDTH_CYCLE_TIME: usize = 5;

/// Uptime field (milliseconds).
pub const WIDTH_UPTIME: usize = 8;

/// Float field (IEEE-754 bit pattern).
pub const WIDTH_FLOAT: usize = 8;

/// Library version field.
pub const WIDTH_VERSION: usize = 3;

/// Support library version field.
pub const WIDTH_SUPPORT_VERSION: usize = 5;

/// Storage size field.
pub const WIDTH_STORAGE_SIZE: usize = 4;

/// 16-bit diagnostic value field (addresses, free RAM).
pub const WIDTH_WORD: usize = 4;

/// Fraction digits kept when printing floats in decimal format.
pub const FLOAT_DECIMALS: usize = 3;
