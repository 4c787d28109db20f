//! Static board capability data.
//!
//! Everything here is fixed at board bring-up and reported verbatim on the
//! board-features descriptor pages; nothing in the engine mutates it.

use serde::{Deserialize, Serialize};

/// Capability descriptor reported on descriptor page 0 (and 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardProfile {
    /// Protocol library version, encoded as e.g. `140` for 1.4.0.
    pub library_version: u16,
    /// Short board name, e.g. `UNO`.
    pub board_name: String,
    /// Processor name, e.g. `ATmega328P`.
    pub processor: String,
    /// Support library version, same encoding as `library_version`.
    pub support_version: u32,

    /// First and last digital I/O pin index.
    pub dio_start: u8,
    pub dio_end: u8,
    /// First and last analog input channel index.
    pub ai_start: u8,
    pub ai_end: u8,

    /// Maximum number of attachable servos.
    pub servo_capacity: u8,
    /// Number of digital data bits exposed to the host.
    pub digital_data_count: u8,
    /// Number of analog data slots exposed to the host.
    pub analog_data_count: u8,

    /// PWM resolution in bits, when the board reports one.
    pub pwm_resolution: Option<u8>,
    /// DAC resolution in bits, when the board reports one.
    pub dac_resolution: Option<u8>,

    /// Application-assigned project name and version (descriptor page 4).
    pub code_name: Option<String>,
    pub code_version: Option<String>,
}

impl BoardProfile {
    /// Number of analog input channels.
    pub fn ai_count(&self) -> u8 {
        self.ai_end.saturating_sub(self.ai_start) + 1
    }

    /// Number of digital I/O pins.
    pub fn dio_count(&self) -> u8 {
        self.dio_end.saturating_sub(self.dio_start) + 1
    }
}

/// Static RAM layout reported on descriptor page 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMap {
    pub ram_start: u16,
    pub ram_end: u16,
    pub data_start: u16,
    pub data_end: u16,
    pub bss_start: u16,
    pub bss_end: u16,
    pub heap_start: u16,
    pub heap_end: u16,
    pub malloc_heap_start: u16,
    pub malloc_heap_end: u16,
    pub malloc_margin: u16,
}

/// Peripheral enablement bytes reported on descriptor page 3.
///
/// Each byte packs per-instance flags (bit 0/1 of instance 0, and so on);
/// the engine forwards them opaquely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralModes {
    pub spi: u8,
    pub twi: u8,
    pub usart: u8,
    pub i2s: u8,
}
