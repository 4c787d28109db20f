//! Host-side board emulator.
//!
//! Runs the protocol engine over a mock board behind a TCP listener, so a
//! host application can be developed against the wire protocol without
//! hardware. Each accepted connection gets a fresh board: bytes from the
//! socket feed the engine's transport, engine output is flushed back, and
//! the engine is ticked once per millisecond in between so the
//! subscription sessions behave as they would on a real board.
//!
//! ```text
//! host app ──TCP──> emulator ──bytes──> Engine ──replies──> TCP ──> host
//! ```

use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hostlink_board::mock::{LoopbackTransport, MockBoard};
use hostlink_board::SystemClock;
use hostlink_core::WireConfig;
use hostlink_protocol::Engine;

const DEFAULT_ADDR: &str = "127.0.0.1:7150";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("board emulator listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!("host connected from {peer}");
        if let Err(error) = serve(stream).await {
            warn!("session ended: {error}");
        }
    }
}

/// Drive one engine for the lifetime of one host connection.
async fn serve(mut stream: TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;

    let mut board = MockBoard::new();
    board.set_code_identity("EMULATOR", "010");

    let mut engine = Engine::new(
        WireConfig::default(),
        board,
        LoopbackTransport::new(),
        SystemClock::new(),
    )?;
    engine.announce_startup();

    let mut ticker = tokio::time::interval(Duration::from_millis(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // a slow ramp on analog channel 0 gives subscriptions something to
    // report
    let mut sample: u16 = 0;
    let mut read_buf = [0u8; 1024];

    loop {
        let pending = engine.transport_mut().take_output();
        if !pending.is_empty() {
            stream.write_all(&pending).await?;
        }

        tokio::select! {
            _ = ticker.tick() => {
                sample = (sample + 1) % 1024;
                engine.board_mut().set_analog_input(0, sample);
                engine.tick();
            }
            ready = stream.readable() => {
                ready?;
                match stream.try_read(&mut read_buf) {
                    Ok(0) => {
                        info!("host disconnected");
                        return Ok(());
                    }
                    Ok(n) => {
                        engine.transport_mut().push_bytes(&read_buf[..n]);
                        engine.tick();
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}
