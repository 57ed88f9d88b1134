//! Newline framing for the inbound byte stream
//!
//! Serial reads arrive in arbitrary chunks. A status line may be split across
//! several reads, and one read may carry several lines. `LineFramer` buffers
//! bytes and hands out complete lines one at a time.

/// Longest line the framer will hold while waiting for a terminator
pub const MAX_LINE_LEN: usize = 256;

/// Streaming `\n`-delimited line splitter
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Create a new framer with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Push raw bytes into the framer's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // A device spewing garbage without newlines must not grow us forever.
        // Only the unterminated tail can be dropped; complete lines stay.
        let tail_start = self
            .buffer
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|p| p + 1)
            .unwrap_or(0);
        let tail_len = self.buffer.len() - tail_start;
        if tail_len > MAX_LINE_LEN * 4 {
            let keep_from = self.buffer.len() - MAX_LINE_LEN;
            tracing::warn!(
                "Discarding {} bytes of unterminated input",
                keep_from - tail_start
            );
            self.buffer.drain(tail_start..keep_from);
        }
    }

    /// Extract the next complete line, if one is buffered
    ///
    /// The terminator and surrounding whitespace (including `\r`) are
    /// stripped. Invalid UTF-8 is replaced rather than rejected.
    pub fn next_line(&mut self) -> Option<String> {
        let term_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=term_pos).collect();
        let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]);
        Some(line.trim().to_string())
    }

    /// Bytes buffered without a terminator yet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
