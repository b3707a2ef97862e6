//! SSH transport layer wrapping russh.
//!
//! Connection setup, authentication and host key checking, plus the two
//! kinds of channels ncc needs: the `netconf` subsystem and a PTY shell for
//! scraping show commands.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{NetconfStream, ShellStream, SshTransport};
