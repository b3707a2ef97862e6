//! Error types for ncc.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for ncc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// NETCONF message framing errors
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// The server answered an RPC with an `<rpc-error>`
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// The server sent something we could not make sense of
    #[error("Reply error: {0}")]
    Reply(#[from] ReplyError),

    /// Interactive CLI session errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Platform identification errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// YANG schema handling errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Git publishing errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Snippet template errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Local filesystem errors
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was reported by the server for a single RPC,
    /// as opposed to a failure of the session itself.
    pub fn is_rpc_failure(&self) -> bool {
        matches!(self, Error::Rpc(_) | Error::Reply(ReplyError::MissingData { .. }))
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict mode)
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// NETCONF framing errors (RFC 6242).
#[derive(Error, Debug)]
pub enum FramingError {
    /// Chunk header was not `\n#<size>\n`
    #[error("Invalid chunk header: {0:?}")]
    InvalidChunkHeader(String),

    /// Chunk size of zero or beyond the RFC limit
    #[error("Invalid chunk size {0}")]
    InvalidChunkSize(u64),

    /// Peer closed the stream in the middle of a message
    #[error("Stream closed with {0} bytes of incomplete message")]
    Truncated(usize),
}

/// An `<rpc-error>` returned by the server.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("severity={severity}, tag={tag}, message={message}")]
pub struct RpcError {
    /// `error-type`: transport, rpc, protocol or application.
    pub error_type: String,
    /// `error-tag`, e.g. `invalid-value` or `data-missing`.
    pub tag: String,
    /// `error-severity`: error or warning.
    pub severity: String,
    /// `error-app-tag`, if any.
    pub app_tag: Option<String>,
    /// `error-path`, if any.
    pub path: Option<String>,
    /// `error-message`, or empty.
    pub message: String,
    /// Raw `error-info` content, if any.
    pub info: Option<String>,
}

impl RpcError {
    /// Whether this is a hard error as opposed to a warning.
    pub fn is_error(&self) -> bool {
        self.severity != "warning"
    }
}

/// Malformed or unexpected server messages.
#[derive(Error, Debug)]
pub enum ReplyError {
    /// Message is not well-formed XML
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Message is not valid UTF-8
    #[error("Message is not valid UTF-8")]
    Utf8,

    /// Root element was not the one expected
    #[error("Expected <{expected}>, got <{found}>")]
    UnexpectedElement { expected: String, found: String },

    /// A reply carried a message-id we never sent
    #[error("Reply for unknown message-id {0:?}")]
    UnknownMessageId(String),

    /// The server hello carried no capabilities
    #[error("Server hello has no capabilities")]
    NoCapabilities,

    /// A reply was expected to carry `<data>` but did not
    #[error("Reply to {operation} carries no <data>")]
    MissingData { operation: String },
}

/// Interactive CLI (show command) session errors.
#[derive(Error, Debug)]
pub enum CliError {
    /// Failed to open the PTY shell
    #[error("Failed to open shell channel")]
    ShellOpenFailed,

    /// Prompt was not seen within the timeout
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Channel closed while waiting for output
    #[error("Channel closed")]
    Closed,
}

/// Platform identification errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Device type string not one of the supported families
    #[error("Unknown device type '{0}' (expected cisco_xr, cisco_xe, cisco_ios or cisco_nxos)")]
    UnknownDeviceType(String),

    /// Existing metadata document could not be parsed or written
    #[error("Invalid platform metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// YANG schema handling errors.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// YANG text could not be parsed
    #[error("{file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
}

/// Git publisher errors.
#[derive(Error, Debug)]
pub enum GitError {
    /// The git executable could not be run
    #[error("failed to run git: {0}")]
    Spawn(#[source] io::Error),

    /// A git command exited non-zero
    #[error("git {command} failed: {stderr}")]
    Command {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// Temporary clone directory could not be created
    #[error("failed to create clone directory: {0}")]
    TempDir(#[source] io::Error),
}

/// Snippet template errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template failed to load or render
    #[error(transparent)]
    Render(#[from] minijinja::Error),

    /// Template parameters were not valid JSON
    #[error("Invalid template parameters: {0}")]
    Params(#[from] serde_json::Error),
}

/// Result type alias using ncc's Error.
pub type Result<T> = std::result::Result<T, Error>;
