//! Wire protocol engine for hostlink boards.
//!
//! This crate implements the communication core that exposes a board's I/O
//! state to a host over a CR/LF framed, checksummed serial line protocol:
//! frame assembly, message validation, field decoding, command dispatch,
//! reply encoding and the four-session subscription scheduler that spreads
//! periodic state broadcast over many engine ticks.
//!
//! Everything is owned by one [`Engine`] value, generic over the board,
//! transport and clock traits of `hostlink-board`, and driven by calling
//! [`Engine::tick`] from the embedding application's main loop.

pub mod assembler;
pub mod codec;
pub mod engine;
pub mod fields;
pub mod message;
pub mod reply;
pub mod request;
pub mod scheduler;
pub mod timer;
pub mod tokens;
pub mod validator;

mod dispatch;

pub use assembler::FrameAssembler;
pub use engine::Engine;
pub use message::{MessageType, ProtocolError, TypeDescriptor};
pub use request::{AccessMode, Request};
pub use tokens::Tokenizer;
