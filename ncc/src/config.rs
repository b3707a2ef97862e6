//! Command-line connection settings and logging setup shared by the tools.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use log::LevelFilter;

use crate::netconf::SessionBuilder;
use crate::transport::{HostKeyVerification, SshConfig};

/// How to reach the device. Flattened into every tool's arguments.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// The IP address or name of the device to connect to
    #[arg(long, env = "NCC_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// NETCONF port
    #[arg(long, env = "NCC_PORT", default_value_t = 830)]
    pub port: u16,

    /// Username for SSH authentication
    #[arg(short, long, env = "NCC_USERNAME", default_value = "cisco")]
    pub username: String,

    /// Password for SSH authentication
    #[arg(
        short,
        long,
        env = "NCC_PASSWORD",
        default_value = "cisco",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,

    /// Per-operation timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Reject hosts whose key is not in known_hosts
    #[arg(long, conflicts_with = "accept_new_host_key")]
    pub strict_host_key: bool,

    /// Learn unknown host keys, reject changed ones
    #[arg(long)]
    pub accept_new_host_key: bool,

    /// known_hosts file to check against (default ~/.ssh/known_hosts)
    #[arg(long, value_name = "FILE")]
    pub known_hosts: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn host_key_verification(&self) -> HostKeyVerification {
        if self.strict_host_key {
            HostKeyVerification::Strict
        } else if self.accept_new_host_key {
            HostKeyVerification::AcceptNew
        } else {
            HostKeyVerification::Disabled
        }
    }

    /// Builder for the NETCONF session.
    pub fn session_builder(&self) -> SessionBuilder {
        let builder = SessionBuilder::new(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .timeout(self.timeout())
            .host_key_verification(self.host_key_verification());
        match &self.known_hosts {
            Some(path) => builder.known_hosts_path(path),
            None => builder,
        }
    }

    /// SSH settings for a plain CLI session on `port`.
    pub fn ssh_config(&self, port: u16) -> SshConfig {
        let mut config = SshConfig::new(&self.host, port, &self.username, &self.password);
        config.timeout = self.timeout();
        config.host_key_verification = self.host_key_verification();
        config.known_hosts_path = self.known_hosts.clone();
        config
    }
}

/// `env_logger` filter: `default` everywhere, `debug` for this crate when
/// verbose.
pub fn logging_filter(verbose: bool, default: LevelFilter) -> String {
    let default = default.as_str().to_lowercase();
    if verbose {
        format!("{default},ncc=debug")
    } else {
        default
    }
}

/// Initialize `env_logger`; `RUST_LOG` overrides the computed filter.
pub fn init_logging(verbose: bool, default: LevelFilter) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(logging_filter(verbose, default)),
    )
    .init();
}
