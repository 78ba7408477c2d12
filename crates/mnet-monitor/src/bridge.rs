//! Bridge controller text lines
//!
//! The bridge speaks a line-oriented ASCII protocol. It is not decoded, only
//! collected into lines and passed through to the output.

/// Bytes kept per line; the rest of an over-long line is dropped
pub const MAX_LINE_LEN: usize = 80;

const CR: u8 = 0x0D;
const LF: u8 = 0x0A;

/// Lines holding this many bytes or fewer (newline included) are prompts or
/// echo noise and are not surfaced
const MIN_SURFACED_LEN: usize = 2;

/// Collects bridge bytes into lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeLineAssembler {
    buffer: Vec<u8>,
}

impl BridgeLineAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Feed one byte; returns a completed line worth showing
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == CR {
            return None;
        }
        if self.buffer.len() < MAX_LINE_LEN {
            self.buffer.push(byte);
        }
        if byte != LF {
            return None;
        }

        let line = if self.buffer.len() > MIN_SURFACED_LEN {
            let text = String::from_utf8_lossy(&self.buffer);
            Some(text.trim_end_matches('\n').to_string())
        } else {
            None
        };
        self.buffer.clear();
        line
    }

    /// Feed a chunk, collecting every completed line
    pub fn push_bytes(&mut self, data: &[u8]) -> Vec<String> {
        data.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Bytes of the line in progress
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}
