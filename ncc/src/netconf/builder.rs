//! Builder for NETCONF sessions over SSH.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::NetconfSession;
use crate::error::Result;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport};

/// Builder for connecting a [`NetconfSession`].
///
/// # Example
///
/// ```rust,no_run
/// use ncc::SessionBuilder;
///
/// # async fn example() -> Result<(), ncc::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .connect()
///     .await?;
/// println!("{:?}", session.server_capabilities());
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: String,
    auth: AuthMethod,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SessionBuilder {
    /// Create a builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 830,
            username: "cisco".to_string(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(60),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the NETCONF port (default: 830).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set the connect and per-RPC timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// The SSH configuration this builder describes.
    pub fn ssh_config(&self) -> SshConfig {
        SshConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            auth: self.auth.clone(),
            timeout: self.timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }

    /// Connect, start the `netconf` subsystem and exchange hellos.
    pub async fn connect(self) -> Result<NetconfSession> {
        let transport = SshTransport::connect(self.ssh_config()).await?;
        let stream = transport.open_netconf().await?;
        let mut session = NetconfSession::establish(stream, self.timeout).await?;
        session.attach_transport(transport);
        Ok(session)
    }
}
