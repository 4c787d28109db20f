//! Inbound frame assembly.
//!
//! Bytes from the transport accumulate into a logical line terminated by an
//! exact CR-then-LF pair. CR itself is never stored as content: it only arms
//! the end-of-frame marker, and any byte other than LF disarms it again, so
//! a lone CR is retracted without leaving a trace in the frame.
//!
//! The buffer has a fixed capacity. Once the write position reaches the last
//! usable slot, further bytes keep overwriting that final slot until a
//! terminator arrives: memory stays bounded, content before the final slot
//! is preserved, and the forcibly shortened frame is handed to validation
//! normally, where it will typically fail the checksum or structural checks.
//! No overflow error is raised — size the buffer for the largest legal frame
//! plus margin.

use hostlink_core::constants::{CR, INPUT_BUFFER_CAPACITY, LF};

/// Accumulates transport bytes into CR/LF terminated frames.
///
/// # Examples
///
/// ```
/// use hostlink_protocol::FrameAssembler;
///
/// let mut assembler = FrameAssembler::new();
/// for &b in b"$PM0\r" {
///     assert!(assembler.feed(b).is_none());
/// }
/// let frame = assembler.feed(b'\n').unwrap();
/// assert_eq!(frame, b"$PM0");
/// ```
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    /// Content length; capped at the buffer capacity on overflow.
    len: usize,
    cr_seen: bool,
}

impl FrameAssembler {
    /// Assembler with the default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(INPUT_BUFFER_CAPACITY)
    }

    /// Assembler with an explicit buffer capacity (at least one slot).
    pub fn with_capacity(capacity: usize) -> Self {
        FrameAssembler {
            buffer: vec![0; capacity.max(1)],
            len: 0,
            cr_seen: false,
        }
    }

    /// Feed one byte; returns the completed frame content (terminator
    /// excluded) when this byte completes a frame.
    pub fn feed(&mut self, byte: u8) -> Option<Vec<u8>> {
        if byte == CR {
            self.cr_seen = true;
            return None;
        }

        if self.cr_seen && byte == LF {
            let frame = self.buffer[..self.len].to_vec();
            self.len = 0;
            self.cr_seen = false;
            return Some(frame);
        }

        self.cr_seen = false;

        let capacity = self.buffer.len();
        // once full, the final slot keeps getting overwritten
        let slot = self.len.min(capacity - 1);
        self.buffer[slot] = byte;
        if self.len < capacity {
            self.len += 1;
        }

        None
    }

    /// Number of content bytes currently buffered.
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// Discard any partially assembled frame.
    pub fn clear(&mut self) {
        self.len = 0;
        self.cr_seen = false;
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
