//! Interactive shell session for scraping show command output.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::channel::PromptBuffer;
use crate::error::{CliError, Result, TransportError};
use crate::transport::{ShellStream, SshConfig, SshTransport};

/// Prompt of IOS-XR, IOS-XE and NX-OS exec modes.
static PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[\w.\-@()/:]{1,63}[>#]\s?$").expect("static regex")
});

/// Something that can run a show command and return its output.
pub trait CommandRunner: Send {
    fn run_command(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;
}

/// A shell session on a device.
pub struct CliSession<S = ShellStream> {
    stream: S,
    buffer: PromptBuffer,
    prompt: Regex,
    timeout: Duration,
    transport: Option<SshTransport>,
}

impl CliSession<ShellStream> {
    /// Connect over SSH and open a shell.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let timeout = config.timeout;
        let transport = SshTransport::connect(config).await?;
        let stream = transport.open_shell().await?;
        let mut session = Self::open(stream, timeout).await?;
        session.transport = Some(transport);
        Ok(session)
    }
}

impl<S> CliSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wait for the first prompt and turn paging off.
    pub async fn open(stream: S, timeout: Duration) -> Result<Self> {
        let mut session = Self {
            stream,
            buffer: PromptBuffer::default(),
            prompt: PROMPT.clone(),
            timeout,
            transport: None,
        };
        session.read_until_prompt().await?;
        session.send_command("terminal length 0").await?;
        Ok(session)
    }

    /// Send a command and return its output, without the echoed command
    /// and trailing prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        debug!("sending command {:?}", command);
        self.stream
            .write_all(format!("{}\n", command).as_bytes())
            .await
            .map_err(TransportError::Io)?;
        self.stream.flush().await.map_err(TransportError::Io)?;

        let raw = self.read_until_prompt().await?;
        Ok(normalize_output(&raw, command))
    }

    /// Close the shell and the SSH connection.
    pub async fn close(mut self) -> Result<()> {
        let _ = self.stream.write_all(b"exit\n").await;
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    /// Read until the prompt; returns everything before it.
    async fn read_until_prompt(&mut self) -> Result<String> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_until_prompt_inner())
            .await
            .map_err(|_| CliError::PromptTimeout(timeout))?
    }

    async fn read_until_prompt_inner(&mut self) -> Result<String> {
        let mut buf = [0u8; 8192];
        loop {
            if let Some(pos) = self.buffer.find_prompt(&self.prompt) {
                let mut data = self.buffer.take();
                data.truncate(pos);
                let text = String::from_utf8_lossy(&data).into_owned();
                trace!("read: {:?}", text);
                return Ok(text);
            }

            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                return Err(CliError::Closed.into());
            }
            self.buffer.extend(&buf[..n]);
        }
    }
}

impl<S> CommandRunner for CliSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn run_command(&mut self, command: &str) -> Result<String> {
        self.send_command(command).await
    }
}

/// Strip the echoed command from the start of `raw` and surrounding
/// blank lines.
fn normalize_output(raw: &str, command: &str) -> String {
    let output = match raw.split_once('\n') {
        Some((first, rest)) if first.trim_end().ends_with(command.trim()) => rest,
        None if raw.trim_end().ends_with(command.trim()) => "",
        _ => raw,
    };
    output.trim_matches('\n').to_string()
}
