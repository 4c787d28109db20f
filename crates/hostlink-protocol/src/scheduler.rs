//! Subscription scheduling.
//!
//! Four independent sessions amortize large or continuous reply sequences
//! over many engine ticks, sharing the execution thread with everything
//! else in the embedding application:
//!
//! - **Board-features session** (one-shot): five descriptor pages, one per
//!   tick. Highest priority; preempts every other session while running.
//! - **Storage-dump session** (one-shot): a start marker, then up to four
//!   address/value pairs per tick, then an end marker. Second priority.
//! - **Broadcast session** (continuous): a 30-slot round-robin scan over
//!   the board's state categories, gated per category by change detection
//!   except during the first pass after the descriptor pages were served.
//! - **Poll session** (continuous): a client-declared list of (type, index)
//!   entries reported in one reply, throttled to one frame per 2 ms.
//!
//! When both continuous sessions are active they alternate tick by tick
//! through a binary flag, so neither can starve the other on a
//! bandwidth-constrained link.
//!
//! The broadcast scan deliberately lags: however many slots fall through
//! in one tick, the cursor advances exactly one position from where the
//! tick began, so skipped slots are re-examined on the very next tick and
//! per-tick work stays bounded at one emission.

use crate::engine::Engine;
use crate::message::MessageType;
use crate::timer::{Throttle, TickTimer};
use hostlink_board::traits::{Board, Clock, DataRegisters, Diagnostics, EepromStore, IoRegisters, ServoBank, Transport};
use hostlink_core::constants::{
    BOARD_PAGE_COUNT, BROADCAST_PERIOD_MS, BROADCAST_SLOT_COUNT, DUMP_PAIRS_PER_FRAME,
    POLL_THROTTLE_MS,
};
use tracing::debug;

/// One-shot enumeration of the board descriptor pages.
#[derive(Debug, Default)]
pub(crate) struct BoardFeaturesSession {
    pub running: bool,
    pub page: u8,
}

/// One-shot paginated dump of persistent storage.
#[derive(Debug, Default)]
pub(crate) struct DumpSession {
    pub running: bool,
    pub cursor: u16,
}

/// Continuous round-robin broadcast of board state categories.
#[derive(Debug, Default)]
pub(crate) struct BroadcastSession {
    pub running: bool,
    /// Scan start slot; `BROADCAST_SLOT_COUNT` means the pass is complete
    /// and the session is waiting out the period timer.
    pub cursor: u8,
    pub period: TickTimer,
}

/// Continuous client-declared polling list.
#[derive(Debug, Default)]
pub(crate) struct PollSession {
    pub running: bool,
    pub items: Vec<(MessageType, u8)>,
    pub throttle: Throttle,
}

/// All session state owned by the engine.
#[derive(Debug, Default)]
pub(crate) struct Sessions {
    pub board: BoardFeaturesSession,
    pub dump: DumpSession,
    pub broadcast: BroadcastSession,
    pub poll: PollSession,
    /// Forces one unconditional full broadcast pass; set when the
    /// descriptor pages finish, cleared once the scan reaches the last
    /// slot.
    pub first_pass: bool,
    /// Alternation flag between the broadcast and poll sessions.
    pub favour_broadcast: bool,
}

impl Sessions {
    pub fn start_board_features(&mut self) {
        self.board.running = true;
        self.board.page = 0;
    }

    pub fn start_dump(&mut self) {
        self.dump.running = true;
        self.dump.cursor = 0;
    }

    pub fn start_broadcast(&mut self) {
        self.broadcast.running = true;
        self.broadcast.cursor = 0;
    }

    pub fn stop_broadcast(&mut self) {
        self.broadcast.running = false;
    }

    pub fn start_poll(&mut self, items: Vec<(MessageType, u8)>) {
        debug!(entries = items.len(), "poll session started");
        self.poll.items = items;
        self.poll.running = true;
    }

    pub fn stop_poll(&mut self) {
        self.poll.running = false;
    }

    pub fn poll_items(&self) -> &[(MessageType, u8)] {
        &self.poll.items
    }
}

/// Outcome of examining one broadcast slot.
enum SlotOutcome {
    /// The slot emitted (or terminated the scan); the tick is over.
    Fired,
    /// Nothing to report; scanning falls through to the next slot.
    Skipped,
}

impl<B: Board, T: Transport, C: Clock> Engine<B, T, C> {
    /// Emit at most one scheduled reply for this tick, chosen by priority:
    /// board features, then storage dump, then broadcast/poll.
    pub(crate) fn scheduler_tick(&mut self, now_ms: u64) {
        if self.sessions.board.running {
            self.board_features_step();
        } else if self.sessions.dump.running {
            self.dump_step();
        } else if self.sessions.broadcast.running {
            self.sessions.broadcast.period.run(now_ms);

            // Period handling: if the previous pass finished inside the
            // 50 ms window, restart only once the timer elapses (the
            // restart tick itself emits nothing); if the pass outlasted
            // the window, restart immediately on the next tick.
            let executing = self.sessions.broadcast.cursor < BROADCAST_SLOT_COUNT;
            if !executing
                && self
                    .sessions
                    .broadcast
                    .period
                    .is_over(now_ms, BROADCAST_PERIOD_MS)
            {
                self.sessions.broadcast.cursor = 0;
                self.sessions.broadcast.period.reset();
            }

            if executing {
                if self.sessions.poll.running {
                    if self.sessions.favour_broadcast {
                        self.broadcast_step();
                    } else {
                        self.poll_step(now_ms);
                    }
                } else {
                    self.broadcast_step();
                }
            } else if self.sessions.poll.running {
                self.poll_step(now_ms);
            }
        } else if self.sessions.poll.running {
            self.poll_step(now_ms);
        }
    }

    /// One descriptor page per tick; the final page stops the session and
    /// arms the first-pass flag consumed by the broadcast session.
    fn board_features_step(&mut self) {
        let page = self.sessions.board.page;
        self.send_with_index(page, MessageType::BoardFeaturesPage);

        if page + 1 >= BOARD_PAGE_COUNT {
            self.sessions.board.running = false;
            self.sessions.board.page = 0;
            self.sessions.first_pass = true;
            debug!("board features served, first broadcast pass armed");
        } else {
            self.sessions.board.page = page + 1;
        }
    }

    /// Up to four address/value pairs per tick, bracketed by the dump
    /// start and end markers.
    fn dump_step(&mut self) {
        let size = self.board.size();
        let cursor = self.sessions.dump.cursor;

        if cursor >= size {
            self.sessions.dump.running = false;
            self.sessions.dump.cursor = 0;
            self.send(MessageType::EepromDumpEnd);
            return;
        }

        if cursor == 0 {
            self.send(MessageType::EepromDumpStart);
        }
        let qty = DUMP_PAIRS_PER_FRAME.min(size - cursor);
        self.send_with_address_range(cursor, qty, MessageType::Eeprom);
        self.sessions.dump.cursor = cursor + qty;
    }

    /// Scan forward from the cursor until one slot fires, then advance the
    /// cursor by exactly one position from where the tick began. Slots
    /// skipped this tick are re-examined next tick, converging over
    /// multiple ticks while keeping per-tick work bounded.
    fn broadcast_step(&mut self) {
        let start = self.sessions.broadcast.cursor;
        for slot in start..BROADCAST_SLOT_COUNT {
            if matches!(self.broadcast_slot(slot), SlotOutcome::Fired) {
                break;
            }
        }

        self.sessions.broadcast.cursor = start + 1;
        self.sessions.favour_broadcast = false;
    }

    /// Examine one broadcast slot: unconditional slots always send,
    /// change-gated slots send when their category changed (or during the
    /// first pass), quantity-gated slots send while the board declares
    /// enough instances. The final slot closes the pass and clears the
    /// first-pass flag without emitting.
    fn broadcast_slot(&mut self, slot: u8) -> SlotOutcome {
        use MessageType::*;

        let first = self.sessions.first_pass;
        match slot {
            0 => self.fire(BroadcastTiming),
            1 => {
                if first || self.board.memory_changed() {
                    self.fire(MemoryProbes)
                } else {
                    SlotOutcome::Skipped
                }
            }
            2 => {
                if first
                    || self.board.pin_modes_changed()
                    || self.board.input_modes_changed()
                {
                    self.fire(PinModes)
                } else {
                    SlotOutcome::Skipped
                }
            }
            3 => {
                if first || self.board.servo_modes_changed() {
                    self.fire(ServoModes)
                } else {
                    SlotOutcome::Skipped
                }
            }
            4 => {
                if first || self.board.output_types_changed() {
                    self.fire(OutputTypes)
                } else {
                    SlotOutcome::Skipped
                }
            }
            5 => {
                if first || self.board.pwm_availability_changed() {
                    self.fire(PwmAvailability)
                } else {
                    SlotOutcome::Skipped
                }
            }
            6 => {
                if first || self.board.analog_mask_changed() {
                    self.fire(AnalogDataMask)
                } else {
                    SlotOutcome::Skipped
                }
            }
            // slot 7 is a retired converter category and always falls
            // through
            7 => SlotOutcome::Skipped,
            8 => self.fire(DigitalInputs),
            9 => self.fire(DigitalOutputs),
            10 => self.fire(DigitalData),
            11 => {
                if first || self.board.text_changed() {
                    self.fire(Text)
                } else {
                    SlotOutcome::Skipped
                }
            }
            12 => self.fire(AiPage1),
            13 => self.gated(self.board.profile().ai_count() > 8, AiPage2),
            14 => self.gated(first || self.board.pwm_active_count() > 0, PwmPage1),
            15 => self.gated(self.board.pwm_active_count() > 8, PwmPage2),
            16 => self.gated(first || self.board.attached_count() > 0, ServoPage1),
            17 => self.gated(self.board.attached_count() > 6, ServoPage2),
            18 => self.gated(self.board.attached_count() > 12, ServoPage3),
            19 => self.gated(self.board.attached_count() > 18, ServoPage4),
            20 => self.gated(self.board.attached_count() > 24, ServoPage5),
            21 => self.gated(self.board.attached_count() > 30, ServoPage6),
            22 => self.gated(self.board.attached_count() > 36, ServoPage7),
            23 => self.gated(self.board.attached_count() > 42, ServoPage8),
            24 => self.gated(first || self.board.analog_active_count() > 0, AdPage1),
            25 => self.gated(self.board.analog_active_count() > 4, AdPage2),
            26 => self.gated(self.board.analog_active_count() > 8, AdPage3),
            27 => self.gated(self.board.analog_active_count() > 12, AdPage4),
            28 => self.gated(self.board.analog_active_count() > 16, AdPage5),
            // the last slot ends the pass and retires the first-pass flag
            // without emitting
            _ => {
                if self.sessions.first_pass {
                    self.sessions.first_pass = false;
                    debug!("first broadcast pass complete");
                }
                SlotOutcome::Fired
            }
        }
    }

    fn fire(&mut self, message_type: MessageType) -> SlotOutcome {
        self.send(message_type);
        SlotOutcome::Fired
    }

    fn gated(&mut self, condition: bool, message_type: MessageType) -> SlotOutcome {
        if condition {
            self.fire(message_type)
        } else {
            SlotOutcome::Skipped
        }
    }

    /// Poll replies ride the 2 ms throttle; the alternation flag hands the
    /// next contested tick to the broadcast session.
    fn poll_step(&mut self, now_ms: u64) {
        if self.sessions.poll.throttle.ready(now_ms, POLL_THROTTLE_MS) {
            self.send(MessageType::PollReply);
        }
        self.sessions.favour_broadcast = true;
    }
}
