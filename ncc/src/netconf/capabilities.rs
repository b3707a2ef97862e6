//! Session capabilities negotiated in the `<hello>` exchange.

use super::filter::Datastore;

pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
pub const BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";
pub const WRITABLE_RUNNING: &str = "urn:ietf:params:netconf:capability:writable-running:1.0";
pub const CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const CONFIRMED_COMMIT: &str = "urn:ietf:params:netconf:capability:confirmed-commit:1.1";
pub const ROLLBACK_ON_ERROR: &str = "urn:ietf:params:netconf:capability:rollback-on-error:1.0";
pub const VALIDATE: &str = "urn:ietf:params:netconf:capability:validate:1.1";
pub const XPATH: &str = "urn:ietf:params:netconf:capability:xpath:1.0";
pub const NOTIFICATION: &str = "urn:ietf:params:netconf:capability:notification:1.0";
pub const INTERLEAVE: &str = "urn:ietf:params:netconf:capability:interleave:1.0";
pub const WITH_DEFAULTS: &str = "urn:ietf:params:netconf:capability:with-defaults:1.0";

/// What the server said it can do, fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCapabilities {
    /// Every capability URI from the server hello, in the order received.
    pub raw: Vec<String>,
    pub base_1_1: bool,
    pub candidate: bool,
    pub writable_running: bool,
    pub confirmed_commit: bool,
    pub rollback_on_error: bool,
    pub validate: bool,
    pub xpath: bool,
    pub notification: bool,
    pub interleave: bool,
    pub with_defaults: bool,
}

impl SessionCapabilities {
    /// Build from the capability URIs in a server hello.
    pub fn from_server(raw: Vec<String>) -> Self {
        // Parameterised forms ("...:with-defaults:1.0?basic-mode=explicit")
        // count as the base capability.
        let has = |uri: &str| {
            raw.iter()
                .any(|c| c == uri || c.split('?').next() == Some(uri))
        };
        Self {
            base_1_1: has(BASE_1_1),
            candidate: has(CANDIDATE),
            writable_running: has(WRITABLE_RUNNING),
            confirmed_commit: has(CONFIRMED_COMMIT),
            rollback_on_error: has(ROLLBACK_ON_ERROR),
            validate: has(VALIDATE),
            xpath: has(XPATH),
            notification: has(NOTIFICATION),
            interleave: has(INTERLEAVE),
            with_defaults: has(WITH_DEFAULTS),
            raw,
        }
    }

    /// Datastore to send edits to, preferring the candidate.
    ///
    /// `None` when the server supports neither candidate nor
    /// writable-running.
    pub fn edit_target(&self) -> Option<Datastore> {
        if self.candidate {
            Some(Datastore::Candidate)
        } else if self.writable_running {
            Some(Datastore::Running)
        } else {
            None
        }
    }

    /// Whether any advertised capability is exactly `uri`.
    pub fn contains(&self, uri: &str) -> bool {
        self.raw.iter().any(|c| c == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(list: &[&str]) -> SessionCapabilities {
        SessionCapabilities::from_server(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_flags_from_hello() {
        let caps = caps(&[
            BASE_1_0,
            BASE_1_1,
            CANDIDATE,
            "urn:ietf:params:netconf:capability:with-defaults:1.0?basic-mode=explicit",
            "http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg?module=Cisco-IOS-XR-ifmgr-cfg&revision=2017-09-07",
        ]);
        assert!(caps.base_1_1);
        assert!(caps.candidate);
        assert!(caps.with_defaults);
        assert!(!caps.writable_running);
        assert!(!caps.notification);
        assert_eq!(caps.raw.len(), 5);
    }

    #[test]
    fn test_edit_target_prefers_candidate() {
        assert_eq!(
            caps(&[WRITABLE_RUNNING, CANDIDATE]).edit_target(),
            Some(Datastore::Candidate)
        );
        assert_eq!(caps(&[WRITABLE_RUNNING]).edit_target(), Some(Datastore::Running));
        assert_eq!(caps(&[BASE_1_0]).edit_target(), None);
    }
}
