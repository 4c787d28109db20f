//! The protocol engine.
//!
//! One [`Engine`] value owns the inbound frame buffer, the four
//! subscription sessions and the wire configuration, and borrows its board,
//! transport and clock through the `hostlink-board` traits. All state is
//! mutated from a single logical thread of execution by [`Engine::tick`]:
//! the embedding application calls it from its main loop, and control
//! returns after at most one pending frame batch or one scheduled reply,
//! bounding per-tick latency so collaborators sharing the loop (motion
//! generators, sensors) are never starved.
//!
//! Each tick either drains pending transport bytes — handling every frame
//! completed by them synchronously — or, when no input is pending, lets the
//! subscription scheduler emit at most one scheduled reply.

use crate::assembler::FrameAssembler;
use crate::fields;
use crate::message::MessageType;
use crate::scheduler::Sessions;
use crate::validator;
use hostlink_board::traits::{Board, Clock, Diagnostics, Transport};
use hostlink_core::{Result, WireConfig};
use tracing::debug;

/// The wire protocol engine: frame assembly, validation, dispatch, reply
/// encoding and subscription scheduling behind a single `tick()` call.
///
/// # Examples
///
/// ```
/// use hostlink_board::mock::{LoopbackTransport, ManualClock, MockBoard};
/// use hostlink_core::WireConfig;
/// use hostlink_protocol::Engine;
///
/// let mut engine = Engine::new(
///     WireConfig::default(),
///     MockBoard::new(),
///     LoopbackTransport::new(),
///     ManualClock::new(),
/// )
/// .unwrap();
///
/// engine.transport_mut().push_line("$_DI_0_DA");
/// engine.tick();
/// let replies = engine.transport_mut().take_lines();
/// assert!(replies[0].starts_with("#_DI_0"));
/// ```
pub struct Engine<B, T, C> {
    pub(crate) config: WireConfig,
    pub(crate) board: B,
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) assembler: FrameAssembler,
    pub(crate) sessions: Sessions,
    pub(crate) cycle_time_us: u32,
    last_tick_us: Option<u64>,
}

impl<B: Board, T: Transport, C: Clock> Engine<B, T, C> {
    /// Build an engine over a validated configuration.
    ///
    /// # Errors
    /// Returns the configuration's validation error, if any.
    pub fn new(config: WireConfig, board: B, transport: T, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Engine {
            config,
            board,
            transport,
            clock,
            assembler: FrameAssembler::new(),
            sessions: Sessions::default(),
            cycle_time_us: 0,
            last_tick_us: None,
        })
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// The embedding application mutates board state between ticks through
    /// this accessor; the engine observes the changes on its next pass.
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Latest measured tick-to-tick cycle time, in microseconds.
    pub fn cycle_time_us(&self) -> u32 {
        self.cycle_time_us
    }

    /// Announce that the board has started (or reset).
    ///
    /// Emits a bare terminator first so any half-received line on the host
    /// side is flushed, then the started notification. Call once at
    /// initialization, before the first `tick()`.
    pub fn announce_startup(&mut self) {
        self.transport.write_bytes(b"\r\n");
        self.send(MessageType::BoardStarted);
        debug!("board startup announced");
    }

    /// Run one engine cycle.
    ///
    /// Measures cycle time, records SRAM probe 0, then either processes
    /// pending input (every frame completed this tick is validated,
    /// dispatched and replied to synchronously) or gives the subscription
    /// scheduler its slot.
    pub fn tick(&mut self) {
        let now_us = self.clock.now_micros();
        if let Some(last) = self.last_tick_us {
            self.cycle_time_us = now_us.saturating_sub(last) as u32;
        }
        self.last_tick_us = Some(now_us);

        self.board.record_probe(0);

        let mut received = false;
        while let Some(byte) = self.transport.read_byte() {
            received = true;
            if let Some(frame) = self.assembler.feed(byte) {
                self.handle_frame(&frame);
            }
        }

        if !received {
            let now_ms = self.clock.now_millis();
            self.scheduler_tick(now_ms);
        }
    }

    /// Validate, field-decode and dispatch one assembled frame, producing
    /// exactly one reply (normal or error).
    fn handle_frame(&mut self, frame: &[u8]) {
        let header = match validator::validate(frame, &self.config) {
            Ok(header) => header,
            Err(error) => {
                debug!(%error, "frame rejected");
                self.send_error(error, frame);
                return;
            }
        };

        let request = match fields::decode_fields(header, self.config.number_format) {
            Ok(request) => request,
            Err(error) => {
                debug!(%error, "field decoding failed");
                self.send_error(error, frame);
                return;
            }
        };

        self.dispatch(request, frame);
    }
}
