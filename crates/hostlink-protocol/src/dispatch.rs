//! Command dispatch.
//!
//! Routes a decoded request to the owning collaborator (write path) and
//! selects the reply shape (read path), applying the per-type legality
//! rules the capability descriptor declares: a type that never takes an
//! index rejects one, a type that cannot answer without one rejects its
//! absence, and storage access picks byte, bit or bulk semantics from the
//! optional fields it received.
//!
//! Side effects are confined to collaborator accessor calls, session
//! start/stop, and exactly one reply (or error) transmission per request.
//! Legality is settled before any write is applied, so a rejected request
//! leaves no partial state behind.

use crate::codec;
use crate::engine::Engine;
use crate::message::{MessageType, ProtocolError};
use crate::request::Request;
use crate::tokens::Tokenizer;
use hostlink_board::traits::{
    Board, Clock, DataRegisters, EepromStore, IoRegisters, ServoBank, Transport,
};
use hostlink_core::constants::{
    POLL_LIST_CAPACITY, WIDTH_BYTE, WIDTH_FLOAT, WIDTH_INDEX, WIDTH_PWM, WIDTH_REGISTER,
    WIDTH_SERVO,
};
use hostlink_core::WireConfig;
use tracing::trace;

impl<B: Board, T: Transport, C: Clock> Engine<B, T, C> {
    /// Route one decoded request. `raw` is the original frame, kept for
    /// the diagnostic echo inside error replies.
    pub(crate) fn dispatch(&mut self, request: Request<'_>, raw: &[u8]) {
        trace!(message_type = %request.message_type, "dispatch");

        match request.index {
            None if request.message_type.descriptor().requires_index => {
                self.send_error(ProtocolError::IndexRequired, raw);
            }
            None => self.dispatch_plain(request),
            Some(index) => self.dispatch_indexed(index, request, raw),
        }
    }

    /// Requests without an instance index: whole-register access, session
    /// commands and bulk storage semantics.
    fn dispatch_plain(&mut self, mut request: Request<'_>) {
        use MessageType::*;

        let message_type = request.message_type;

        // Storage without an index is byte access when addressed, a bulk
        // operation otherwise — never an error.
        if message_type == Eeprom {
            if let Some(address) = request.address {
                if request.mode.is_write() {
                    if let Some(value) =
                        request.tokens.next(WIDTH_BYTE).and_then(codec::parse_hex)
                    {
                        self.board.write_byte(address, value as u8);
                    }
                }
                self.send_with_address_range(address, 1, Eeprom);
            } else {
                // acknowledge before the long-running dump starts
                self.sessions.start_dump();
                self.send(Eeprom);
                if request.mode.is_write() {
                    let clear = request.tokens.next(1).and_then(codec::parse_hex) == Some(0);
                    self.board.fill(if clear { 0x00 } else { 0xFF });
                }
            }
            return;
        }

        if request.mode.is_write() {
            match message_type {
                Text => {
                    if let Some(text) = request.tokens.rest() {
                        self.board.set_text(text);
                    }
                }
                PinModes => {
                    let pin_modes = next_register(&mut request.tokens);
                    let input_modes = next_register(&mut request.tokens);
                    if let (Some(pin_modes), Some(input_modes)) = (pin_modes, input_modes) {
                        self.board.set_pin_modes(pin_modes, input_modes);
                    }
                }
                DigitalOutputs => {
                    if let Some(values) = next_register(&mut request.tokens) {
                        self.board.set_digital_outputs(values);
                    }
                }
                OutputTypes => {
                    if let Some(types) = next_register(&mut request.tokens) {
                        self.board.set_output_types(types);
                    }
                }
                ServoModes => {
                    if let Some(modes) = next_register(&mut request.tokens) {
                        self.board.set_servo_modes(modes);
                    }
                }
                DigitalData => {
                    if let Some(values) = next_register(&mut request.tokens) {
                        self.board.set_digital_data(values);
                    }
                }
                // the remaining register types are read-only; a write
                // request still gets the read-back reply below
                _ => {}
            }
        }

        match message_type {
            BoardFeatures => self.sessions.start_board_features(),
            BroadcastStart => self.sessions.start_broadcast(),
            BroadcastStop => self.sessions.stop_broadcast(),
            PollStart => {
                let items = parse_poll_list(&mut request.tokens, &self.config);
                self.sessions.start_poll(items);
            }
            PollStop => self.sessions.stop_poll(),
            _ => {}
        }

        self.send(message_type);
    }

    /// Requests qualified by an instance index: single-instance access and
    /// the storage bit path.
    fn dispatch_indexed(&mut self, index: u8, mut request: Request<'_>, raw: &[u8]) {
        use MessageType::*;

        let message_type = request.message_type;

        // Addressed storage with an index is bit access; without the
        // address there is no byte to select the bit from.
        if message_type == Eeprom {
            let Some(address) = request.address else {
                self.send_error(ProtocolError::AddressMissing, raw);
                return;
            };
            if request.mode.is_write() {
                let value = next_bool(&mut request.tokens);
                self.board.write_bit(address, index, value);
            }
            self.send_with_index_and_address(index, address, Eeprom);
            return;
        }

        if !message_type.descriptor().accepts_index {
            self.send_error(ProtocolError::IndexNotAllowed, raw);
            return;
        }

        if request.mode.is_write() {
            match message_type {
                PinModes => {
                    if next_bool(&mut request.tokens) {
                        self.board.set_pin_mode(index, true);
                    } else {
                        let pull_up = next_bool(&mut request.tokens);
                        self.board.set_pin_mode(index, false);
                        self.board.set_input_mode(index, pull_up);
                    }
                    // a pin switched to input releases its servo
                    if !self.board.pin_mode(index) && self.board.servo_mode(index) {
                        self.board.set_servo_mode(index, false);
                    }
                }
                DigitalOutputs => {
                    let value = next_bool(&mut request.tokens);
                    self.board.set_digital_output(index, value);
                }
                OutputTypes => {
                    let value = next_bool(&mut request.tokens);
                    self.board.set_output_type(index, value);
                }
                PwmValues => {
                    if let Some(value) = request
                        .tokens
                        .next(WIDTH_PWM)
                        .and_then(|token| codec::parse_unsigned(token, self.config.number_format))
                    {
                        self.board.set_pwm_value(index, value as u16);
                    }
                }
                ServoModes => {
                    let attached = next_bool(&mut request.tokens);
                    self.board.set_servo_mode(index, attached);
                }
                ServoValues => {
                    if let Some(value) = request
                        .tokens
                        .next(WIDTH_SERVO)
                        .and_then(|token| codec::parse_unsigned(token, self.config.number_format))
                    {
                        self.board.set_position_millideg(index, value);
                    }
                }
                DigitalData => {
                    let value = next_bool(&mut request.tokens);
                    self.board.set_digital_bit(index, value);
                }
                AnalogData => {
                    if let Some(value) = request
                        .tokens
                        .next(WIDTH_FLOAT)
                        .and_then(|token| codec::parse_float(token, self.config.number_format))
                    {
                        self.board.set_analog_data(index, value);
                    }
                }
                _ => {}
            }
        }

        self.send_with_index(index, message_type);
    }
}

fn next_bool(tokens: &mut Tokenizer<'_>) -> bool {
    tokens.next(1).map(codec::parse_bool).unwrap_or(false)
}

fn next_register(tokens: &mut Tokenizer<'_>) -> Option<u32> {
    tokens.next(WIDTH_REGISTER).and_then(codec::parse_hex)
}

/// Decode the (type, index) pairs of a poll subscription, dropping
/// entries whose type cannot be polled and capping the list size.
fn parse_poll_list(tokens: &mut Tokenizer<'_>, config: &WireConfig) -> Vec<(MessageType, u8)> {
    let mut items = Vec::new();
    while let Some(type_token) = tokens.next(config.type_code_len()) {
        if items.len() >= POLL_LIST_CAPACITY {
            break;
        }
        let Some(index_token) = tokens.next(WIDTH_INDEX) else {
            break;
        };
        let Some(index) = codec::parse_unsigned(index_token, config.number_format)
            .filter(|v| *v <= u32::from(u8::MAX))
        else {
            continue;
        };
        if let Some(message_type) =
            MessageType::from_wire(type_token, config.readable_type_codes)
        {
            if message_type.is_pollable() {
                items.push((message_type, index as u8));
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlink_board::mock::{LoopbackTransport, ManualClock, MockBoard};

    fn engine() -> Engine<MockBoard, LoopbackTransport, ManualClock> {
        let config = WireConfig {
            separator: None,
            use_checksum: false,
            ..WireConfig::default()
        };
        Engine::new(
            config,
            MockBoard::new(),
            LoopbackTransport::new(),
            ManualClock::new(),
        )
        .unwrap()
    }

    fn exchange(
        engine: &mut Engine<MockBoard, LoopbackTransport, ManualClock>,
        frame: &str,
    ) -> Vec<String> {
        engine.transport_mut().push_line(frame);
        engine.tick();
        engine.transport_mut().take_lines()
    }

    #[test]
    fn test_index_required_never_dispatches() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$AI0");
        assert_eq!(replies, vec!["!IR"]);
    }

    #[test]
    fn test_index_not_allowed() {
        let mut engine = engine();
        // CycleTime does not take an index
        let replies = exchange(&mut engine, "$CT205");
        assert_eq!(replies, vec!["!IA"]);
    }

    #[test]
    fn test_indexed_analog_read() {
        let mut engine = engine();
        engine.board_mut().set_analog_input(2, 0x3FF);
        let replies = exchange(&mut engine, "$AI202");
        assert_eq!(replies, vec!["#AI2023FF"]);
    }

    #[test]
    fn test_digital_output_register_write() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$DO1000000F0");
        assert_eq!(engine.board().digital_outputs(), 0xF0);
        // the write is answered with the read-back register
        assert_eq!(replies, vec!["#DO0000000F0"]);
    }

    #[test]
    fn test_digital_output_bit_write() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$DO3041");
        assert!(engine.board().digital_output(4));
        assert_eq!(replies, vec!["#DO2041"]);
    }

    #[test]
    fn test_pin_mode_indexed_write_selects_input_pull_up() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$PM30501");
        assert!(!engine.board().pin_mode(5));
        assert!(engine.board().input_mode(5));
        assert_eq!(replies, vec!["#PM20501"]);
    }

    #[test]
    fn test_pin_to_input_releases_servo() {
        let mut engine = engine();
        engine.board_mut().set_pin_mode(9, true);
        engine.board_mut().set_servo_mode(9, true);

        // write pin 9 to plain input
        exchange(&mut engine, "$PM30900");
        assert!(!engine.board().servo_mode(9));
    }

    #[test]
    fn test_eeprom_byte_write_and_reply() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$EE50010AB");
        assert_eq!(engine.board().read_byte(0x10), 0xAB);
        assert_eq!(replies, vec!["#EE40010AB"]);
    }

    #[test]
    fn test_eeprom_bit_write_and_reply() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$EE70300101");
        assert!(engine.board().read_bit(0x10, 3));
        assert_eq!(replies, vec!["#EE60300101"]);
    }

    #[test]
    fn test_eeprom_index_without_address_is_address_missing() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$EE303");
        assert_eq!(replies, vec!["!AM"]);
    }

    #[test]
    fn test_eeprom_bulk_read_acknowledges_and_starts_dump() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$EE0");
        assert_eq!(replies, vec!["#EE0"]);

        // next idle tick emits the dump start marker and the first page
        engine.tick();
        let lines = engine.transport_mut().take_lines();
        assert_eq!(lines[0], "#Es0");
        assert!(lines[1].starts_with("#EE4"));
    }

    #[test]
    fn test_eeprom_bulk_clear_write() {
        let mut engine = engine();
        engine.board_mut().write_byte(5, 0xAA);
        exchange(&mut engine, "$EE10");
        assert_eq!(engine.board().read_byte(5), 0x00);
    }

    #[test]
    fn test_eeprom_bulk_set_write() {
        let mut engine = engine();
        exchange(&mut engine, "$EE11");
        assert_eq!(engine.board().read_byte(5), 0xFF);
    }

    #[test]
    fn test_text_write_roundtrip() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$S01hello");
        assert_eq!(engine.board().text(), "hello");
        assert_eq!(replies, vec!["#S00hello"]);
    }

    #[test]
    fn test_servo_value_write() {
        let mut engine = engine();
        let replies = exchange(&mut engine, "$SV3090EA60");
        assert_eq!(engine.board().position_millideg(9), 60_000);
        assert_eq!(replies, vec!["#SV2090EA60"]);
    }

    #[test]
    fn test_analog_data_float_write() {
        let mut engine = engine();
        exchange(&mut engine, "$AD3023FC00000");
        assert_eq!(engine.board().analog_data(2), 1.5);
    }

    #[test]
    fn test_poll_subscription_filters_unpollable_types() {
        let mut engine = engine();
        // subscribe AI channel 1 and (unpollable) PM pin 2
        exchange(&mut engine, "$As1AI01PM02");
        assert_eq!(
            engine.sessions.poll_items(),
            &[(MessageType::AnalogInputs, 1)]
        );
    }

    #[test]
    fn test_read_only_register_ignores_write() {
        let mut engine = engine();
        engine.board_mut().set_digital_inputs(0x0F);
        let replies = exchange(&mut engine, "$DI1deadbeef");
        // inputs unchanged, read-back reply produced
        assert_eq!(engine.board().digital_inputs(), 0x0F);
        assert_eq!(replies, vec!["#DI00000000F"]);
    }
}
