use crate::traits::Transport;
use std::collections::VecDeque;

/// Queue-backed transport double.
///
/// Bytes queued with [`push_bytes`](LoopbackTransport::push_bytes) are
/// handed to the engine one at a time; everything the engine transmits is
/// captured and can be drained as raw bytes or split into CR LF lines.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes for the engine to receive.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Queue a frame body followed by CR LF.
    pub fn push_line(&mut self, line: &str) {
        self.push_bytes(line.as_bytes());
        self.push_bytes(b"\r\n");
    }

    /// Bytes still waiting to be read by the engine.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Everything transmitted so far, without consuming it.
    pub fn output(&self) -> &[u8] {
        &self.outbound
    }

    /// Drain and return everything transmitted so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Drain transmitted bytes and split them into CR LF terminated lines.
    ///
    /// An unterminated tail is kept buffered for the next call.
    pub fn take_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self
            .outbound
            .windows(2)
            .position(|pair| pair == b"\r\n")
        {
            let line: Vec<u8> = self.outbound.drain(..pos + 2).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }
}

impl Transport for LoopbackTransport {
    fn read_byte(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }
}
