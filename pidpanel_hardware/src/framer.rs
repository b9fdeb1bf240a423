//! Byte stream to newline-terminated line framing.

/// Partial lines longer than this are dropped; the firmware never sends them.
pub const MAX_PENDING_BYTES: usize = 4096;

/// Accumulates raw serial bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
            tracing::warn!(
                dropped = self.pending.len(),
                "serial input without line terminator, discarding"
            );
            self.pending.clear();
        }
    }

    /// Pop the next complete line without its `\n` / `\r\n` terminator.
    ///
    /// A line that is not valid UTF-8 comes back as an empty string.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut raw: Vec<u8> = self.pending.drain(..=end).collect();
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        match String::from_utf8(raw) {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::debug!(len = e.as_bytes().len(), "undecodable serial line");
                Some(String::new())
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
