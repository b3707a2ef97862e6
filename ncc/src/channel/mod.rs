//! Byte-level channel handling.
//!
//! NETCONF message framing (RFC 6242) for the `netconf` subsystem, and a
//! prompt buffer for the PTY shell used to run show commands.

mod buffer;
pub mod framing;

pub use buffer::PromptBuffer;
pub use framing::{FrameDecoder, Framing};
