//! Output buffer for the interactive shell with tail-only prompt search.
//!
//! Show command output can be large (`show inventory all` on a loaded
//! chassis), so only the last `search_depth` bytes are searched for the
//! device prompt.

use regex::bytes::Regex;

/// Accumulates shell output and finds the prompt at its end.
#[derive(Debug)]
pub struct PromptBuffer {
    buffer: Vec<u8>,

    /// How many bytes from the end to search for the prompt.
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append received data with ANSI escape sequences and carriage
    /// returns removed.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer
            .extend(cleaned.into_iter().filter(|b| *b != b'\r'));
    }

    /// Find the prompt in the tail of the buffer.
    ///
    /// The search starts at the first line boundary inside the tail, so a
    /// line-anchored pattern never sees a partial line. The last match
    /// wins. Returns the byte offset in the whole buffer where the prompt
    /// starts.
    pub fn find_prompt(&self, prompt: &Regex) -> Option<usize> {
        let mut start = self.buffer.len().saturating_sub(self.search_depth);
        if start > 0 && self.buffer[start - 1] != b'\n' {
            start += memchr::memchr(b'\n', &self.buffer[start..])? + 1;
        }
        prompt
            .find_iter(&self.buffer[start..])
            .last()
            .map(|m| start + m.start())
    }

    /// Take the buffer contents, leaving it empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Regex {
        Regex::new(r"(?m)^[\w/:.\-]+[>#]\s*$").unwrap()
    }

    #[test]
    fn test_strips_ansi_and_carriage_returns() {
        let mut buffer = PromptBuffer::new(100);
        buffer.extend(b"\x1b[32mCisco IOS XR\x1b[0m\r\n");
        assert_eq!(buffer.take(), b"Cisco IOS XR\n");
    }

    #[test]
    fn test_find_prompt_in_tail() {
        let mut buffer = PromptBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nRP/0/RP0/CPU0:r1#");

        assert_eq!(buffer.find_prompt(&prompt()), Some(101));
    }

    #[test]
    fn test_prompt_outside_tail_is_ignored() {
        let mut buffer = PromptBuffer::new(10);
        buffer.extend(b"r1#");
        buffer.extend(&[b'x'; 100]);

        let prompt = Regex::new(r"r1#").unwrap();
        assert!(buffer.find_prompt(&prompt).is_none());
    }

    #[test]
    fn test_tail_starting_mid_line_skips_partial_line() {
        // The tail begins at "uplink#", which looks like a prompt on its own.
        let mut buffer = PromptBuffer::new(11);
        buffer.extend(b"description core-uplink#\nr1#");

        assert_eq!(buffer.find_prompt(&prompt()), Some(25));
    }

    #[test]
    fn test_last_prompt_wins() {
        let mut buffer = PromptBuffer::new(100);
        buffer.extend(b"r1#\nr1#");

        assert_eq!(buffer.find_prompt(&prompt()), Some(4));
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PromptBuffer::default();
        buffer.extend(b"show version");
        assert_eq!(buffer.take(), b"show version");
        assert!(buffer.take().is_empty());
    }
}
