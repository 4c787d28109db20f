//! Outbound frame encoding.
//!
//! Every reply shares one skeleton: start marker, message type, one control
//! byte naming which optional fields follow, the optional fields, payload
//! fields, an empty-data sentinel when a query has nothing to report, the
//! checksum and the CR LF terminator. [`ReplyWriter`] owns that skeleton:
//! every content byte it prints after the start marker is folded into a
//! running checksum accumulator, finalized just before the terminator.
//!
//! The engine-level send helpers in this module mirror the four reply
//! shapes of the protocol — plain, index-qualified, address-qualified and
//! index-and-address-qualified — plus error frames and the poll reply.

use crate::engine::Engine;
use crate::message::{MessageType, ProtocolError};
use bytes::{BufMut, BytesMut};
use hostlink_board::traits::{Board, Clock, DataRegisters, Diagnostics, EepromStore, IoRegisters, ServoBank, Transport};
use hostlink_core::constants::*;
use hostlink_core::WireConfig;
use tracing::trace;

use crate::codec;

/// Builder for one outbound frame.
pub struct ReplyWriter {
    config: WireConfig,
    buffer: BytesMut,
    crc: u8,
}

impl ReplyWriter {
    /// Open a frame with the given start marker. The marker itself is not
    /// part of the checksum; everything after it is.
    pub fn new(config: &WireConfig, marker: u8) -> Self {
        let mut writer = ReplyWriter {
            config: *config,
            buffer: BytesMut::with_capacity(64),
            crc: 0,
        };
        writer.buffer.put_u8(marker);
        writer.separator();
        writer
    }

    fn push(&mut self, byte: u8) {
        self.crc = self.crc.wrapping_add(byte);
        self.buffer.put_u8(byte);
    }

    fn push_all(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Emit the configured separator, if any.
    fn separator(&mut self) {
        if let Some(sep) = self.config.separator {
            self.push(sep);
        }
    }

    /// Emit a separator even in fixed-width mode. Variable-length string
    /// fields need one so the next field stays findable.
    fn forced_separator(&mut self) {
        self.push(self.config.separator.unwrap_or(DEFAULT_SEPARATOR));
    }

    /// Message type field.
    pub fn message_type(&mut self, message_type: MessageType) {
        if self.config.readable_type_codes {
            self.push_all(message_type.readable_code().as_bytes());
        } else {
            self.push(message_type.compact_code());
        }
        self.separator();
    }

    /// Error code field.
    pub fn error_code(&mut self, error: ProtocolError) {
        if self.config.readable_type_codes {
            self.push_all(error.readable_code().as_bytes());
        } else {
            self.push(error.compact_code());
        }
        self.separator();
    }

    /// Control byte: one unpadded hex digit.
    pub fn control_byte(&mut self, bits: u8) {
        self.push_all(codec::encode_hex(u32::from(bits & 0xF), 1).as_bytes());
        self.separator();
    }

    /// Always-hexadecimal field (registers, stored bytes).
    pub fn write_hex(&mut self, value: u32, width: usize) {
        self.push_all(codec::encode_hex(value, width).as_bytes());
        self.separator();
    }

    /// Numeric field in the configured number format.
    pub fn write_number(&mut self, value: u32, width: usize) {
        self.push_all(codec::encode_unsigned(value, width, self.config.number_format).as_bytes());
        self.separator();
    }

    /// Boolean field: a single `0`/`1` character.
    pub fn write_bool(&mut self, value: bool) {
        self.push(codec::encode_bool(value) as u8);
        self.separator();
    }

    /// Float field in the configured number format.
    pub fn write_float(&mut self, value: f32) {
        self.push_all(codec::encode_float(value, self.config.number_format).as_bytes());
        self.separator();
    }

    /// Verbatim string field. `forced` emits a separator even in
    /// fixed-width mode; use it whenever another field follows.
    pub fn write_str(&mut self, value: &str, forced: bool) {
        self.push_all(value.as_bytes());
        if forced {
            self.forced_separator();
        } else {
            self.separator();
        }
    }

    /// Raw byte echo (diagnostic error payload).
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.push_all(bytes);
        self.separator();
    }

    /// Empty-data sentinel for a query with nothing to report.
    pub fn empty_data(&mut self) {
        self.push(EMPTY_DATA);
        self.separator();
    }

    /// Finalize: checksum (never folded into itself) and terminator.
    pub fn finish(mut self) -> BytesMut {
        if self.config.use_checksum {
            let digits = codec::encode_hex(u32::from(self.crc), 2);
            self.buffer.put_slice(digits.as_bytes());
        }
        self.buffer.put_u8(CR);
        self.buffer.put_u8(LF);
        self.buffer
    }
}

impl<B: Board, T: Transport, C: Clock> Engine<B, T, C> {
    fn transmit(&mut self, writer: ReplyWriter) {
        let frame = writer.finish();
        self.transport.write_bytes(&frame);
    }

    /// Reply with no optional fields. Most types answer with their current
    /// state; types without a payload arm acknowledge with a bare header.
    pub(crate) fn send(&mut self, message_type: MessageType) {
        let mut writer = ReplyWriter::new(&self.config, START_REPLY);
        writer.message_type(message_type);
        writer.control_byte(0);

        let mut contains_data = true;
        match message_type {
            MessageType::MemoryProbes => {
                for probe in 0..3 {
                    writer.write_number(u32::from(self.board.heap_break_value(probe)), WIDTH_WORD);
                }
                for probe in 0..3 {
                    writer.write_number(u32::from(self.board.stack_pointer(probe)), WIDTH_WORD);
                }
            }
            MessageType::CycleTime => {
                writer.write_number(self.cycle_time_us, WIDTH_CYCLE_TIME);
            }
            MessageType::Uptime => {
                writer.write_number(self.clock.now_millis() as u32, WIDTH_UPTIME);
            }
            MessageType::Text => {
                writer.write_str(self.board.text(), false);
            }
            MessageType::PinModes => {
                writer.write_hex(self.board.pin_modes(), WIDTH_REGISTER);
                writer.write_hex(self.board.input_modes(), WIDTH_REGISTER);
            }
            MessageType::DigitalInputs => {
                writer.write_hex(self.board.digital_inputs(), WIDTH_REGISTER);
            }
            MessageType::DigitalOutputs => {
                writer.write_hex(self.board.digital_outputs(), WIDTH_REGISTER);
            }
            MessageType::OutputTypes => {
                writer.write_hex(self.board.output_types(), WIDTH_REGISTER);
            }
            MessageType::PwmAvailability => {
                writer.write_hex(self.board.pwm_available(), WIDTH_REGISTER);
            }
            MessageType::ServoModes => {
                writer.write_hex(self.board.servo_modes(), WIDTH_REGISTER);
            }
            MessageType::DigitalData => {
                writer.write_hex(self.board.digital_data(), WIDTH_REGISTER);
            }
            MessageType::AnalogDataMask => {
                writer.write_hex(self.board.analog_mask(), WIDTH_REGISTER);
            }
            MessageType::BroadcastTiming => {
                writer.write_number(self.cycle_time_us, WIDTH_CYCLE_TIME);
            }
            MessageType::AiPage1 => {
                self.write_ai_page(&mut writer, 0, 7);
            }
            MessageType::AiPage2 => {
                self.write_ai_page(&mut writer, 8, 15);
            }
            MessageType::PwmPage1 => {
                contains_data = self.write_pwm_page(&mut writer, 0, 7);
            }
            MessageType::PwmPage2 => {
                contains_data = self.write_pwm_page(&mut writer, 8, 15);
            }
            MessageType::ServoPage1 => {
                contains_data = self.write_servo_page(&mut writer, 0, 5);
            }
            MessageType::ServoPage2 => {
                contains_data = self.write_servo_page(&mut writer, 6, 11);
            }
            MessageType::ServoPage3 => {
                contains_data = self.write_servo_page(&mut writer, 12, 17);
            }
            MessageType::ServoPage4 => {
                contains_data = self.write_servo_page(&mut writer, 18, 23);
            }
            MessageType::ServoPage5 => {
                contains_data = self.write_servo_page(&mut writer, 24, 29);
            }
            MessageType::ServoPage6 => {
                contains_data = self.write_servo_page(&mut writer, 30, 35);
            }
            MessageType::ServoPage7 => {
                contains_data = self.write_servo_page(&mut writer, 36, 41);
            }
            MessageType::ServoPage8 => {
                contains_data = self.write_servo_page(&mut writer, 42, 47);
            }
            MessageType::AdPage1 => {
                contains_data = self.write_ad_page(&mut writer, 0, 3);
            }
            MessageType::AdPage2 => {
                contains_data = self.write_ad_page(&mut writer, 4, 7);
            }
            MessageType::AdPage3 => {
                contains_data = self.write_ad_page(&mut writer, 8, 11);
            }
            MessageType::AdPage4 => {
                contains_data = self.write_ad_page(&mut writer, 12, 15);
            }
            MessageType::AdPage5 => {
                contains_data = self.write_ad_page(&mut writer, 16, 19);
            }
            MessageType::PollReply => {
                self.write_poll_values(&mut writer);
            }
            // remaining types acknowledge with a bare header
            _ => {}
        }

        if !contains_data {
            writer.empty_data();
        }
        self.transmit(writer);
    }

    /// Index-qualified reply.
    pub(crate) fn send_with_index(&mut self, index: u8, message_type: MessageType) {
        let mut writer = ReplyWriter::new(&self.config, START_REPLY);
        writer.message_type(message_type);
        writer.control_byte(0b010);
        writer.write_number(u32::from(index), WIDTH_INDEX);

        match message_type {
            MessageType::BoardFeaturesPage => {
                self.write_board_page(&mut writer, index);
            }
            MessageType::PinModes => {
                writer.write_bool(self.board.pin_mode(index));
                writer.write_bool(self.board.input_mode(index));
            }
            MessageType::DigitalInputs => {
                writer.write_bool(self.board.digital_input(index));
            }
            MessageType::DigitalOutputs => {
                writer.write_bool(self.board.digital_output(index));
            }
            MessageType::AnalogInputs => {
                writer.write_number(u32::from(self.board.analog_input(index)), WIDTH_ANALOG_INPUT);
            }
            MessageType::OutputTypes => {
                writer.write_bool(self.board.output_type(index));
            }
            MessageType::PwmAvailability => {
                writer.write_bool(self.board.pwm_is_available(index));
            }
            MessageType::PwmValues => {
                writer.write_number(u32::from(self.board.pwm_value(index)), WIDTH_PWM);
            }
            MessageType::ServoModes => {
                writer.write_bool(self.board.servo_mode(index));
            }
            MessageType::ServoValues => {
                writer.write_number(self.board.position_millideg(index), WIDTH_SERVO);
            }
            MessageType::DigitalData => {
                writer.write_bool(self.board.digital_bit(index));
            }
            MessageType::AnalogDataMask => {
                let bit = self.board.analog_mask() >> index & 1;
                writer.write_float(bit as f32);
            }
            MessageType::AnalogData => {
                writer.write_float(self.board.analog_data(index));
            }
            // BoardFeatures (and anything else) acknowledges bare
            _ => {}
        }

        self.transmit(writer);
    }

    /// Address-qualified reply carrying `qty` consecutive address/value
    /// pairs from persistent storage.
    pub(crate) fn send_with_address_range(
        &mut self,
        start_address: u16,
        qty: u16,
        message_type: MessageType,
    ) {
        let mut writer = ReplyWriter::new(&self.config, START_REPLY);
        writer.message_type(message_type);
        writer.control_byte(0b100);

        for offset in 0..qty {
            let address = start_address + offset;
            writer.write_number(u32::from(address), WIDTH_ADDRESS);
            if message_type == MessageType::Eeprom {
                writer.write_hex(u32::from(self.board.read_byte(address)), WIDTH_BYTE);
            }
        }

        self.transmit(writer);
    }

    /// Index-and-address-qualified reply (a single stored bit).
    pub(crate) fn send_with_index_and_address(
        &mut self,
        index: u8,
        address: u16,
        message_type: MessageType,
    ) {
        let mut writer = ReplyWriter::new(&self.config, START_REPLY);
        writer.message_type(message_type);
        writer.control_byte(0b110);
        writer.write_number(u32::from(index), WIDTH_INDEX);
        writer.write_number(u32::from(address), WIDTH_ADDRESS);

        if message_type == MessageType::Eeprom {
            writer.write_bool(self.board.read_bit(address, index));
        }

        self.transmit(writer);
    }

    /// Error reply, optionally echoing the offending frame.
    pub(crate) fn send_error(&mut self, error: ProtocolError, offending: &[u8]) {
        trace!(%error, "error frame");
        let mut writer = ReplyWriter::new(&self.config, START_ERROR);
        writer.error_code(error);
        if self.config.echo_input_on_error {
            writer.write_raw(offending);
        }
        self.transmit(writer);
    }

    // Broadcast page bodies: values are emitted in slot-position order and
    // filtered to the window [min, max].

    fn write_ai_page(&self, writer: &mut ReplyWriter, min: u8, max: u8) -> bool {
        let profile = self.board.profile();
        let mut contains_data = false;
        for channel in profile.ai_start..=profile.ai_end {
            if (min..=max).contains(&channel) {
                writer.write_number(u32::from(self.board.analog_input(channel)), WIDTH_ANALOG_INPUT);
                contains_data = true;
            }
        }
        contains_data
    }

    fn write_pwm_page(&self, writer: &mut ReplyWriter, min: u8, max: u8) -> bool {
        let profile = self.board.profile();
        let mut contains_data = false;
        let mut position = 0u8;
        for pin in profile.dio_start..=profile.dio_end {
            if self.board.pwm_is_active(pin) {
                if (min..=max).contains(&position) {
                    writer.write_number(u32::from(self.board.pwm_value(pin)), WIDTH_PWM);
                    contains_data = true;
                }
                position += 1;
            }
        }
        contains_data
    }

    fn write_servo_page(&self, writer: &mut ReplyWriter, min: u8, max: u8) -> bool {
        let profile = self.board.profile();
        let mut contains_data = false;
        let mut position = 0u8;
        for pin in profile.dio_start..=profile.dio_end {
            if self.board.servo_mode(pin) {
                if (min..=max).contains(&position) {
                    writer.write_number(self.board.position_millideg(pin), WIDTH_SERVO);
                    contains_data = true;
                }
                position += 1;
            }
        }
        contains_data
    }

    fn write_ad_page(&self, writer: &mut ReplyWriter, min: u8, max: u8) -> bool {
        let mask = self.board.analog_mask();
        let mut contains_data = false;
        let mut position = 0u8;
        for slot in 0..self.board.profile().analog_data_count {
            if mask >> slot & 1 != 0 {
                if (min..=max).contains(&position) {
                    writer.write_float(self.board.analog_data(slot));
                    contains_data = true;
                }
                position += 1;
            }
        }
        contains_data
    }

    /// One poll reply carries the values of every subscribed (type, index)
    /// entry, in subscription order.
    fn write_poll_values(&self, writer: &mut ReplyWriter) {
        for &(message_type, index) in self.sessions.poll_items() {
            match message_type {
                MessageType::FreeRam => {
                    writer.write_number(u32::from(self.board.free_ram(index)), WIDTH_WORD);
                }
                MessageType::CycleTime => {
                    writer.write_number(self.cycle_time_us, WIDTH_CYCLE_TIME);
                }
                MessageType::DigitalInputs => {
                    writer.write_bool(self.board.digital_input(index));
                }
                MessageType::DigitalOutputs => {
                    writer.write_bool(self.board.digital_output(index));
                }
                MessageType::AnalogInputs => {
                    writer.write_number(
                        u32::from(self.board.analog_input(index)),
                        WIDTH_ANALOG_INPUT,
                    );
                }
                MessageType::PwmValues => {
                    writer.write_number(u32::from(self.board.pwm_value(index)), WIDTH_PWM);
                }
                MessageType::ServoValues => {
                    writer.write_number(self.board.position_millideg(index), WIDTH_SERVO);
                }
                MessageType::DigitalData => {
                    writer.write_bool(self.board.digital_bit(index));
                }
                MessageType::AnalogData => {
                    writer.write_float(self.board.analog_data(index));
                }
                // the subscribe path only admits pollable types
                _ => {}
            }
        }
    }

    /// Board descriptor pages, reported by the board-features session.
    fn write_board_page(&self, writer: &mut ReplyWriter, page: u8) {
        let profile = self.board.profile();
        match page {
            0 => {
                writer.write_number(u32::from(profile.library_version), WIDTH_VERSION);
                writer.write_str(&profile.board_name, true);
                writer.write_str(&profile.processor, true);
                writer.write_number(profile.support_version, WIDTH_SUPPORT_VERSION);
                writer.write_number(u32::from(profile.dio_start), WIDTH_INDEX);
                writer.write_number(u32::from(profile.dio_end), WIDTH_INDEX);
                writer.write_number(u32::from(profile.ai_start), WIDTH_INDEX);
                writer.write_number(u32::from(profile.ai_end), WIDTH_INDEX);
                writer.write_number(u32::from(profile.servo_capacity), WIDTH_INDEX);
                writer.write_number(u32::from(profile.digital_data_count), WIDTH_INDEX);
                writer.write_number(u32::from(profile.analog_data_count), WIDTH_INDEX);
                if let Some(resolution) = profile.pwm_resolution {
                    writer.write_number(u32::from(resolution), WIDTH_INDEX);
                }
                if let Some(resolution) = profile.dac_resolution {
                    writer.write_number(u32::from(resolution), WIDTH_INDEX);
                }
            }
            1 => {
                let size = self.board.size();
                if size == 0 {
                    writer.empty_data();
                } else {
                    writer.write_number(u32::from(size), WIDTH_STORAGE_SIZE);
                    writer.write_number(
                        u32::from(self.board.config_space_size()),
                        WIDTH_STORAGE_SIZE,
                    );
                    for &space in self.board.user_space_sizes() {
                        writer.write_number(u32::from(space), WIDTH_STORAGE_SIZE);
                    }
                    writer.write_number(
                        u32::from(self.board.max_string_length()),
                        WIDTH_INDEX,
                    );
                }
            }
            2 => {
                let map = self.board.memory_map();
                for value in [
                    map.ram_start,
                    map.ram_end,
                    map.data_start,
                    map.data_end,
                    map.bss_start,
                    map.bss_end,
                    map.heap_start,
                    map.heap_end,
                    map.malloc_heap_start,
                    map.malloc_heap_end,
                    map.malloc_margin,
                ] {
                    writer.write_number(u32::from(value), WIDTH_WORD);
                }
            }
            3 => {
                let modes = self.board.peripheral_modes();
                for value in [modes.spi, modes.twi, modes.usart, modes.i2s] {
                    writer.write_number(u32::from(value), WIDTH_BYTE);
                }
            }
            _ => {
                match &profile.code_name {
                    Some(name) => writer.write_str(name, true),
                    None => writer.write_str("", true),
                }
                match &profile.code_version {
                    Some(version) => writer.write_str(version, true),
                    None => writer.write_str("", true),
                }
            }
        }
    }
}
