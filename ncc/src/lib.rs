//! # ncc
//!
//! Async NETCONF client tooling for Cisco IOS-XR, IOS-XE and NX-OS devices.
//!
//! ## Features
//!
//! - NETCONF 1.0/1.1 sessions over SSH via russh, with RFC 6242 framing
//! - get / get-config / edit-config / lock / commit and event notifications
//! - Capability parsing and classification
//! - YANG schema capture: inventory, bulk download, import/include resolution
//! - Platform identification from show command output
//! - Publishing captured models to a git repository
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncc::{Filter, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ncc::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     let filter = Filter::subtree("<interfaces xmlns=\"urn:ietf:params:xml:ns:yang:ietf-interfaces\"/>");
//!     let reply = session.get(Some(&filter), None).await?;
//!     println!("{}", reply.data_xml()?.unwrap_or_default());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod capture;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod netconf;
pub mod platform;
pub mod schema;
pub mod snippets;
pub mod transport;

// Re-export main types for convenience
pub use capability::{Capability, Category, Classified, classify, supported_modules};
pub use cli::{CliSession, CommandRunner};
pub use config::ConnectionArgs;
pub use error::{Error, Result};
pub use netconf::{
    Datastore, DefaultOperation, Filter, NamespaceMap, NetconfSession, Notification, RpcReply,
    SessionBuilder, SessionCapabilities, WithDefaults,
};
pub use platform::{DeviceType, Identification};
pub use schema::{SchemaRef, SchemaSource};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
