//! NETCONF message framing (RFC 6242).
//!
//! Two framings exist. End-of-message framing terminates each message with
//! `]]>]]>` and is used for the `<hello>` exchange and for base:1.0
//! sessions. Chunked framing sends `\n#<size>\n<data>` chunks followed by
//! `\n##\n` and is used once both peers advertise base:1.1.

use bytes::{Buf, BytesMut};
use memchr::memmem;

use crate::error::FramingError;

/// End-of-message delimiter.
pub const EOM_DELIMITER: &[u8] = b"]]>]]>";

/// Largest chunk size allowed by RFC 6242.
const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// Longest chunk header: `\n#` + 10 digits + `\n`.
const MAX_CHUNK_HEADER: usize = 13;

/// Message framing in effect on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// `]]>]]>` terminated messages (base:1.0).
    #[default]
    EndOfMessage,
    /// Chunked messages (base:1.1).
    Chunked,
}

impl Framing {
    /// Frame a complete message for sending.
    pub fn encode(self, message: &[u8]) -> Vec<u8> {
        match self {
            Framing::EndOfMessage => {
                let mut out = Vec::with_capacity(message.len() + EOM_DELIMITER.len());
                out.extend_from_slice(message);
                out.extend_from_slice(EOM_DELIMITER);
                out
            }
            Framing::Chunked => {
                let header = format!("\n#{}\n", message.len());
                let mut out = Vec::with_capacity(header.len() + message.len() + 4);
                out.extend_from_slice(header.as_bytes());
                out.extend_from_slice(message);
                out.extend_from_slice(b"\n##\n");
                out
            }
        }
    }
}

/// Incremental decoder turning received bytes into whole messages.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    framing: Framing,

    /// Bytes received but not yet consumed.
    buffer: BytesMut,

    /// Chunks of the message currently being assembled (chunked framing).
    message: Vec<u8>,
}

impl FrameDecoder {
    /// Create a decoder in end-of-message framing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Framing currently in effect.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Switch framing. Takes effect for the next message.
    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of received bytes not yet returned as part of a message.
    pub fn pending(&self) -> usize {
        self.buffer.len() + self.message.len()
    }

    /// Pop the next complete message, if one has been received.
    ///
    /// Leading and trailing whitespace around the message is removed.
    pub fn next_message(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        match self.framing {
            Framing::EndOfMessage => Ok(self.next_eom_message()),
            Framing::Chunked => self.next_chunked_message(),
        }
    }

    /// Check that the peer did not leave half a message behind on close.
    pub fn finish(&self) -> Result<(), FramingError> {
        let leftover = self
            .buffer
            .iter()
            .chain(self.message.iter())
            .filter(|b| !b.is_ascii_whitespace())
            .count();
        if leftover > 0 {
            return Err(FramingError::Truncated(self.pending()));
        }
        Ok(())
    }

    fn next_eom_message(&mut self) -> Option<Vec<u8>> {
        let pos = memmem::find(&self.buffer, EOM_DELIMITER)?;
        let message = self.buffer.split_to(pos);
        self.buffer.advance(EOM_DELIMITER.len());
        Some(trim(&message).to_vec())
    }

    fn next_chunked_message(&mut self) -> Result<Option<Vec<u8>>, FramingError> {
        loop {
            if self.buffer.len() < 3 {
                return Ok(None);
            }
            if !self.buffer.starts_with(b"\n#") {
                // Some servers put extra newlines between messages
                if self.message.is_empty() && self.buffer[0].is_ascii_whitespace() && self.buffer[1] != b'#' {
                    self.buffer.advance(1);
                    continue;
                }
                return Err(FramingError::InvalidChunkHeader(header_preview(&self.buffer)));
            }

            if self.buffer[2] == b'#' {
                if self.buffer.len() < 4 {
                    return Ok(None);
                }
                if self.buffer[3] != b'\n' {
                    return Err(FramingError::InvalidChunkHeader(header_preview(&self.buffer)));
                }
                self.buffer.advance(4);
                let message = std::mem::take(&mut self.message);
                return Ok(Some(trim(&message).to_vec()));
            }

            let Some(newline) = memchr::memchr(b'\n', &self.buffer[2..]) else {
                if self.buffer.len() >= MAX_CHUNK_HEADER {
                    return Err(FramingError::InvalidChunkHeader(header_preview(&self.buffer)));
                }
                return Ok(None);
            };

            let size = parse_chunk_size(&self.buffer[2..2 + newline])
                .ok_or_else(|| FramingError::InvalidChunkHeader(header_preview(&self.buffer)))?;
            if size == 0 || size > MAX_CHUNK_SIZE {
                return Err(FramingError::InvalidChunkSize(size));
            }

            let start = 2 + newline + 1;
            let size = size as usize;
            if self.buffer.len() < start + size {
                return Ok(None);
            }
            self.buffer.advance(start);
            let chunk = self.buffer.split_to(size);
            self.message.extend_from_slice(&chunk);
        }
    }
}

fn parse_chunk_size(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() || digits.len() > 10 || digits[0] == b'0' {
        return None;
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn header_preview(buffer: &[u8]) -> String {
    let end = buffer.len().min(MAX_CHUNK_HEADER);
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

fn trim(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &data[start..end]
}
