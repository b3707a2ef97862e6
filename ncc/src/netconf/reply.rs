//! Parsing of messages received from the server.

use roxmltree::{Document, Node};

use super::xml::{child, child_text, children, source_text, text_content};
use crate::error::{ReplyError, RpcError};

/// A message received after the hello exchange.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Reply(RpcReply),
    Notification(Notification),
}

impl ServerMessage {
    /// Classify a decoded message by its root element.
    pub fn parse(xml: String) -> Result<Self, ReplyError> {
        let root = {
            let doc = Document::parse(&xml)?;
            doc.root_element().tag_name().name().to_string()
        };
        match root.as_str() {
            "rpc-reply" => Ok(ServerMessage::Reply(RpcReply::parse(xml)?)),
            "notification" => Ok(ServerMessage::Notification(Notification::parse(xml)?)),
            _ => Err(ReplyError::UnexpectedElement {
                expected: "rpc-reply".to_string(),
                found: root,
            }),
        }
    }
}

/// The server's `<hello>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub capabilities: Vec<String>,
    pub session_id: Option<u32>,
}

impl ServerHello {
    pub fn parse(xml: &str) -> Result<Self, ReplyError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "hello" {
            return Err(ReplyError::UnexpectedElement {
                expected: "hello".to_string(),
                found: root.tag_name().name().to_string(),
            });
        }

        let capabilities: Vec<String> = child(root, "capabilities")
            .map(|caps| {
                children(caps, "capability")
                    .map(|c| text_content(c).trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if capabilities.is_empty() {
            return Err(ReplyError::NoCapabilities);
        }

        let session_id = child_text(root, "session-id").and_then(|s| s.parse().ok());

        Ok(Self {
            capabilities,
            session_id,
        })
    }
}

/// An `<rpc-reply>`.
#[derive(Debug, Clone)]
pub struct RpcReply {
    xml: String,
    message_id: Option<String>,
    ok: bool,
    errors: Vec<RpcError>,
}

impl RpcReply {
    pub fn parse(xml: String) -> Result<Self, ReplyError> {
        let (message_id, ok, errors) = {
            let doc = Document::parse(&xml)?;
            let root = doc.root_element();
            if root.tag_name().name() != "rpc-reply" {
                return Err(ReplyError::UnexpectedElement {
                    expected: "rpc-reply".to_string(),
                    found: root.tag_name().name().to_string(),
                });
            }
            let message_id = root.attribute("message-id").map(str::to_string);
            let ok = child(root, "ok").is_some();
            let errors = children(root, "rpc-error")
                .map(|e| parse_rpc_error(&xml, e))
                .collect();
            (message_id, ok, errors)
        };

        Ok(Self {
            xml,
            message_id,
            ok,
            errors,
        })
    }

    /// The complete reply as received.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Whether the reply was a bare `<ok/>`.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// All `<rpc-error>`s, warnings included.
    pub fn errors(&self) -> &[RpcError] {
        &self.errors
    }

    /// The first error of severity `error`, if any.
    pub fn first_error(&self) -> Option<&RpcError> {
        self.errors.iter().find(|e| e.is_error())
    }

    /// Source text of the `<data>` element.
    pub fn data_xml(&self) -> Result<Option<String>, ReplyError> {
        let doc = Document::parse(&self.xml)?;
        Ok(child(doc.root_element(), "data").map(|d| source_text(&self.xml, d).to_string()))
    }

    /// Text content of `<data>`, as returned by `<get-schema>`.
    pub fn data_text(&self) -> Result<Option<String>, ReplyError> {
        let doc = Document::parse(&self.xml)?;
        Ok(child(doc.root_element(), "data").map(text_content))
    }

    /// Run `f` over the parsed `<data>` element.
    pub fn with_data<T>(&self, f: impl FnOnce(Node<'_, '_>) -> T) -> Result<Option<T>, ReplyError> {
        let doc = Document::parse(&self.xml)?;
        Ok(child(doc.root_element(), "data").map(f))
    }
}

fn parse_rpc_error(xml: &str, node: Node<'_, '_>) -> RpcError {
    RpcError {
        error_type: child_text(node, "error-type").unwrap_or_default(),
        tag: child_text(node, "error-tag").unwrap_or_default(),
        severity: child_text(node, "error-severity").unwrap_or_else(|| "error".to_string()),
        app_tag: child_text(node, "error-app-tag"),
        path: child_text(node, "error-path"),
        message: child_text(node, "error-message").unwrap_or_default(),
        info: child(node, "error-info").map(|i| source_text(xml, i).to_string()),
    }
}

/// An RFC 5277 `<notification>`.
#[derive(Debug, Clone)]
pub struct Notification {
    xml: String,
    event_time: Option<String>,
}

impl Notification {
    pub fn parse(xml: String) -> Result<Self, ReplyError> {
        let event_time = {
            let doc = Document::parse(&xml)?;
            child_text(doc.root_element(), "eventTime")
        };
        Ok(Self { xml, event_time })
    }

    /// The complete notification as received.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn event_time(&self) -> Option<&str> {
        self.event_time.as_deref()
    }
}
