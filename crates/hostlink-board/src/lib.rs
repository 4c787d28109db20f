//! Board-side collaborator interfaces for the hostlink protocol engine.
//!
//! The protocol engine never touches hardware directly: pin registers, servo
//! motion, persistent storage, RAM diagnostics, the serial transport and the
//! clock are all reached through the narrow traits defined here. Every value
//! crossing these seams is a primitive (bool, integer, float or short
//! string), which keeps the engine host-testable: the [`mock`] module
//! provides complete in-memory implementations.

pub mod clock;
pub mod mock;
pub mod profile;
pub mod traits;

pub use clock::SystemClock;
pub use profile::{BoardProfile, MemoryMap, PeripheralModes};
pub use traits::{
    Board, Clock, DataRegisters, Diagnostics, EepromStore, IoRegisters, ServoBank, Transport,
};
