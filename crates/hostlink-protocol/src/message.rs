//! Message type and error code tables.
//!
//! Every frame names a message type. Two interchangeable code tables exist,
//! selected by `WireConfig::readable_type_codes`: a readable two-character
//! table (`PM`, `DI`, `Xs`, ...) and a compact one-byte table. The tables
//! carry the same types; only their wire spelling differs.
//!
//! Each type also carries a static capability descriptor — whether it is
//! legal inbound, whether it accepts or requires an instance index, whether
//! it accepts a storage address. The validator and the dispatcher treat the
//! descriptor as the single source of truth for legality decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message types of the hostlink wire protocol.
///
/// Outbound-only variants (replies and session pages) are rejected with
/// `InvalidMessageType` when received as requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // Board lifecycle and descriptor
    BoardFeatures,     // Bf: request descriptor pages
    BoardFeaturesPage, // Bq: one descriptor page (reply)
    BoardStarted,      // BS: board has started or reset (reply)

    // Diagnostics
    MemoryProbes, // M0: heap break values + stack pointers
    FreeRam,      // FR: free RAM probe (polled)
    CycleTime,    // CT: engine cycle time in us
    Uptime,       // TM: time since start in ms

    // Shared data registers
    Text,           // S0: text register
    DigitalData,    // DD: digital data word
    AnalogDataMask, // AM: non-zero analog slot mask
    AnalogData,     // AD: analog data value

    // Persistent storage
    Eeprom,          // EE: byte/bit/bulk access
    EepromDumpStart, // Es: dump sequence start (reply)
    EepromDumpEnd,   // Ee: dump sequence end (reply)

    // Pin registers
    PinModes,        // PM: pin mode + input mode registers
    DigitalInputs,   // DI
    DigitalOutputs,  // DO
    AnalogInputs,    // AI
    OutputTypes,     // OT
    PwmAvailability, // PA
    PwmValues,       // PW
    ServoModes,      // SM
    ServoValues,     // SV

    // Broadcast (X) session
    BroadcastStart,  // Xs
    BroadcastStop,   // Xu
    BroadcastTiming, // X0: cycle time page (reply)
    AiPage1,         // X1: AI values 0-7 (reply)
    AiPage2,         // X2: AI values 8-15 (reply)
    PwmPage1,        // X3: active PWM values 0-7 (reply)
    PwmPage2,        // X4: active PWM values 8-15 (reply)
    ServoPage1,      // X5: servo values 0-5 (reply)
    ServoPage2,      // X6: servo values 6-11 (reply)
    ServoPage3,      // X7: servo values 12-17 (reply)
    ServoPage4,      // X8: servo values 18-23 (reply)
    ServoPage5,      // X9: servo values 24-29 (reply)
    ServoPage6,      // XA: servo values 30-35 (reply)
    ServoPage7,      // XB: servo values 36-41 (reply)
    ServoPage8,      // XC: servo values 42-47 (reply)
    AdPage1,         // XD: non-zero analog data 0-3 (reply)
    AdPage2,         // XE: non-zero analog data 4-7 (reply)
    AdPage3,         // XF: non-zero analog data 8-11 (reply)
    AdPage4,         // XG: non-zero analog data 12-15 (reply)
    AdPage5,         // XH: non-zero analog data 16-19 (reply)

    // Poll (A) session
    PollReply, // Aq: values of the subscribed list (reply)
    PollStart, // As
    PollStop,  // Au
}

/// Static capability descriptor of one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Legal as an inbound request.
    pub inbound: bool,
    /// An instance index may accompany this type.
    pub accepts_index: bool,
    /// A read without an index is an error rather than a defaulted read.
    pub requires_index: bool,
    /// A storage address may accompany this type.
    pub accepts_address: bool,
}

/// Table of every message type, readable code and compact code.
const WIRE_TABLE: &[(MessageType, &str, u8)] = &[
    (MessageType::BoardFeatures, "Bf", b'1'),
    (MessageType::BoardFeaturesPage, "Bq", b'0'),
    (MessageType::BoardStarted, "BS", b'2'),
    (MessageType::MemoryProbes, "M0", b':'),
    (MessageType::FreeRam, "FR", b'='),
    (MessageType::CycleTime, "CT", b'Z'),
    (MessageType::Uptime, "TM", b'\\'),
    (MessageType::Text, "S0", b'y'),
    (MessageType::Eeprom, "EE", b'p'),
    (MessageType::EepromDumpStart, "Es", b'q'),
    (MessageType::EepromDumpEnd, "Ee", b'r'),
    (MessageType::PinModes, "PM", b'`'),
    (MessageType::DigitalInputs, "DI", b'a'),
    (MessageType::DigitalOutputs, "DO", b'b'),
    (MessageType::AnalogInputs, "AI", b'c'),
    (MessageType::OutputTypes, "OT", b'd'),
    (MessageType::PwmAvailability, "PA", b'e'),
    (MessageType::PwmValues, "PW", b'f'),
    (MessageType::ServoModes, "SM", b'g'),
    (MessageType::ServoValues, "SV", b'h'),
    (MessageType::DigitalData, "DD", b'i'),
    (MessageType::AnalogDataMask, "AM", b'j'),
    (MessageType::AnalogData, "AD", b'k'),
    (MessageType::BroadcastStart, "Xs", b'['),
    (MessageType::BroadcastStop, "Xu", b']'),
    (MessageType::BroadcastTiming, "X0", b'@'),
    (MessageType::AiPage1, "X1", b'A'),
    (MessageType::AiPage2, "X2", b'B'),
    (MessageType::PwmPage1, "X3", b'C'),
    (MessageType::PwmPage2, "X4", b'D'),
    (MessageType::ServoPage1, "X5", b'E'),
    (MessageType::ServoPage2, "X6", b'F'),
    (MessageType::ServoPage3, "X7", b'G'),
    (MessageType::ServoPage4, "X8", b'H'),
    (MessageType::ServoPage5, "X9", b'I'),
    (MessageType::ServoPage6, "XA", b'J'),
    (MessageType::ServoPage7, "XB", b'K'),
    (MessageType::ServoPage8, "XC", b'L'),
    (MessageType::AdPage1, "XD", b'M'),
    (MessageType::AdPage2, "XE", b'N'),
    (MessageType::AdPage3, "XF", b'O'),
    (MessageType::AdPage4, "XG", b'P'),
    (MessageType::AdPage5, "XH", b'Q'),
    (MessageType::PollReply, "Aq", b'z'),
    (MessageType::PollStart, "As", b'{'),
    (MessageType::PollStop, "Au", b'}'),
];

impl MessageType {
    /// Two-character readable wire code.
    pub fn readable_code(self) -> &'static str {
        WIRE_TABLE
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, readable, _)| *readable)
            .unwrap_or("")
    }

    /// One-byte compact wire code.
    pub fn compact_code(self) -> u8 {
        WIRE_TABLE
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, _, compact)| *compact)
            .unwrap_or(0)
    }

    /// Decode a wire token under the given code table.
    ///
    /// Returns `None` for unknown codes and for tokens of the wrong length.
    pub fn from_wire(token: &str, readable: bool) -> Option<Self> {
        if readable {
            if token.len() != 2 {
                return None;
            }
            WIRE_TABLE
                .iter()
                .find(|(_, code, _)| *code == token)
                .map(|(t, _, _)| *t)
        } else {
            let &[byte] = token.as_bytes() else {
                return None;
            };
            WIRE_TABLE
                .iter()
                .find(|(_, _, code)| *code == byte)
                .map(|(t, _, _)| *t)
        }
    }

    /// Capability descriptor of this type.
    pub fn descriptor(self) -> TypeDescriptor {
        use MessageType::*;

        let inbound = matches!(
            self,
            BoardFeatures
                | MemoryProbes
                | FreeRam
                | CycleTime
                | Uptime
                | Text
                | Eeprom
                | PinModes
                | DigitalInputs
                | DigitalOutputs
                | AnalogInputs
                | OutputTypes
                | PwmAvailability
                | PwmValues
                | ServoModes
                | ServoValues
                | DigitalData
                | AnalogDataMask
                | AnalogData
                | BroadcastStart
                | BroadcastStop
                | PollStart
                | PollStop
        );

        let accepts_index = matches!(
            self,
            BoardFeatures
                | PinModes
                | DigitalInputs
                | DigitalOutputs
                | AnalogInputs
                | OutputTypes
                | PwmAvailability
                | PwmValues
                | ServoModes
                | ServoValues
                | DigitalData
                | AnalogDataMask
                | AnalogData
                | Eeprom
        );

        let requires_index = matches!(self, AnalogInputs | PwmValues | ServoValues | AnalogData);

        let accepts_address = matches!(self, Eeprom);

        TypeDescriptor {
            inbound,
            accepts_index,
            requires_index,
            accepts_address,
        }
    }

    /// Types whose value can be carried by a poll-session reply.
    pub fn is_pollable(self) -> bool {
        use MessageType::*;
        matches!(
            self,
            FreeRam
                | CycleTime
                | DigitalInputs
                | DigitalOutputs
                | AnalogInputs
                | PwmValues
                | ServoValues
                | DigitalData
                | AnalogData
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.readable_code())
    }
}

/// Closed enumeration of wire-level protocol errors.
///
/// Exactly one is produced per failed frame and reported inside an error
/// frame; none of these ever surfaces as a Rust error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    AddressMissing,        // AM
    IndexNotAllowed,       // IA
    InvalidMessageType,    // MT
    InvalidReadWriteMode,  // RW
    InvalidIndex,          // IN
    InvalidAddress,        // AD
    UnknownSender,         // US
    MessageTooShort,       // TS
    InvalidChecksumFormat, // CS
    ChecksumMismatch,      // CM
    IndexRequired,         // IR
}

impl ProtocolError {
    /// Two-character readable wire code.
    pub fn readable_code(self) -> &'static str {
        match self {
            ProtocolError::AddressMissing => "AM",
            ProtocolError::IndexNotAllowed => "IA",
            ProtocolError::InvalidMessageType => "MT",
            ProtocolError::InvalidReadWriteMode => "RW",
            ProtocolError::InvalidIndex => "IN",
            ProtocolError::InvalidAddress => "AD",
            ProtocolError::UnknownSender => "US",
            ProtocolError::MessageTooShort => "TS",
            ProtocolError::InvalidChecksumFormat => "CS",
            ProtocolError::ChecksumMismatch => "CM",
            ProtocolError::IndexRequired => "IR",
        }
    }

    /// One-byte compact wire code (`0`..`9`, `:`).
    pub fn compact_code(self) -> u8 {
        match self {
            ProtocolError::AddressMissing => b'0',
            ProtocolError::IndexNotAllowed => b'1',
            ProtocolError::InvalidMessageType => b'2',
            ProtocolError::InvalidReadWriteMode => b'3',
            ProtocolError::InvalidIndex => b'4',
            ProtocolError::InvalidAddress => b'5',
            ProtocolError::UnknownSender => b'6',
            ProtocolError::MessageTooShort => b'7',
            ProtocolError::InvalidChecksumFormat => b'8',
            ProtocolError::ChecksumMismatch => b'9',
            ProtocolError::IndexRequired => b':',
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.readable_code())
    }
}
