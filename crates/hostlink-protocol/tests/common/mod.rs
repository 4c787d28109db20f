//! Shared helpers for the engine integration tests.

use hostlink_board::mock::{LoopbackTransport, ManualClock, MockBoard};
use hostlink_core::WireConfig;
use hostlink_protocol::Engine;

pub type TestEngine = Engine<MockBoard, LoopbackTransport, ManualClock>;

/// Engine over the default wire configuration (separator `_`, checksum,
/// readable type codes, hex numbers) plus a clock handle for advancing
/// time from the test.
pub fn engine() -> (TestEngine, ManualClock) {
    engine_with_board(MockBoard::new())
}

pub fn engine_with_board(board: MockBoard) -> (TestEngine, ManualClock) {
    let clock = ManualClock::new();
    let engine = Engine::new(
        WireConfig::default(),
        board,
        LoopbackTransport::new(),
        clock.clone(),
    )
    .unwrap();
    (engine, clock)
}

/// Append the checksum and frame `body` the way the engine's own encoder
/// would: the sum covers everything between the start marker and the
/// checksum digits, including the separator that precedes them.
pub fn checksummed(body: &str) -> String {
    let mut content = body.as_bytes()[1..].to_vec();
    content.push(b'_');
    let sum = content.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    format!("{body}_{sum:02X}")
}

/// Push one request, run one tick, return the emitted lines.
pub fn exchange(engine: &mut TestEngine, body: &str) -> Vec<String> {
    engine.transport_mut().push_line(&checksummed(body));
    engine.tick();
    engine.transport_mut().take_lines()
}

/// Run one idle tick and return the emitted lines.
pub fn idle_tick(engine: &mut TestEngine) -> Vec<String> {
    engine.tick();
    engine.transport_mut().take_lines()
}

/// The readable type code of a reply line (`#_PM_...` → `PM`).
pub fn reply_type(line: &str) -> &str {
    line.split('_').nth(1).unwrap_or("")
}
