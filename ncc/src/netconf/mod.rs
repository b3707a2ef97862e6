//! NETCONF client layer (RFC 6241) over the SSH `netconf` subsystem.

mod builder;
pub mod capabilities;
pub mod filter;
pub mod reply;
mod session;
pub mod xml;

pub use builder::SessionBuilder;
pub use capabilities::SessionCapabilities;
pub use filter::{
    Datastore, DefaultOperation, Filter, NamespaceClash, NamespaceMap, WithDefaults,
};
pub use reply::{Notification, RpcReply, ServerHello, ServerMessage};
pub use session::{MONITORING_NS, NOTIFICATION_NS, NetconfSession};

#[cfg(test)]
pub(crate) use session::tests as test_support;
