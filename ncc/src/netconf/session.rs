//! A NETCONF session over any async byte stream.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream};
use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::capabilities::{BASE_1_0, BASE_1_1, SessionCapabilities};
use super::filter::{Datastore, DefaultOperation, Filter, WithDefaults};
use super::reply::{Notification, RpcReply, ServerHello, ServerMessage};
use super::xml::{BASE_NS, escape};
use crate::channel::{FrameDecoder, Framing};
use crate::error::{Error, ReplyError, Result, TransportError};
use crate::transport::{NetconfStream, SshTransport};

/// Namespace of `<get-schema>` (RFC 6022).
pub const MONITORING_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring";

/// Namespace of `<create-subscription>` (RFC 5277).
pub const NOTIFICATION_NS: &str = "urn:ietf:params:xml:ns:netconf:notification:1.0";

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// An established NETCONF session.
///
/// Generic over the byte stream so that it can run over the SSH `netconf`
/// subsystem or, in tests, an in-memory pipe.
pub struct NetconfSession<S = NetconfStream> {
    stream: S,
    decoder: FrameDecoder,
    message_id: u64,
    session_id: Option<u32>,
    capabilities: SessionCapabilities,
    timeout: Duration,

    /// Notifications received while waiting for an RPC reply.
    notifications: VecDeque<Notification>,

    /// Keeps the SSH connection open for the life of the session.
    transport: Option<SshTransport>,
}

impl<S> NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Exchange `<hello>`s over `stream` and pick the framing.
    pub async fn establish(stream: S, timeout: Duration) -> Result<Self> {
        let mut session = Self {
            stream,
            decoder: FrameDecoder::new(),
            message_id: 100,
            session_id: None,
            capabilities: SessionCapabilities::from_server(Vec::new()),
            timeout,
            notifications: VecDeque::new(),
            transport: None,
        };

        let hello = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{BASE_NS}"><capabilities><capability>{BASE_1_0}</capability><capability>{BASE_1_1}</capability></capabilities></hello>"#
        );
        session.send(&hello).await?;

        let server_hello = session.read_message(Some(timeout)).await?;
        let ServerHello {
            capabilities,
            session_id,
        } = ServerHello::parse(&server_hello)?;

        session.capabilities = SessionCapabilities::from_server(capabilities);
        session.session_id = session_id;
        if session.capabilities.base_1_1 {
            session.decoder.set_framing(Framing::Chunked);
        }

        debug!(
            "NETCONF session {:?} established, {} capabilities, framing {:?}",
            session.session_id,
            session.capabilities.raw.len(),
            session.decoder.framing()
        );
        Ok(session)
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Capabilities negotiated at hello time.
    pub fn capabilities(&self) -> &SessionCapabilities {
        &self.capabilities
    }

    /// Capability URIs exactly as advertised by the server.
    pub fn server_capabilities(&self) -> &[String] {
        &self.capabilities.raw
    }

    /// Send an RPC and wait for its reply.
    ///
    /// An `<rpc-error>` of severity `error` becomes [`Error::Rpc`]; warnings
    /// are logged and the reply is returned.
    pub async fn rpc(&mut self, operation: &str) -> Result<RpcReply> {
        self.message_id += 1;
        let id = self.message_id.to_string();
        let message = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{id}" xmlns="{BASE_NS}">{operation}</rpc>"#
        );
        self.send(&message).await?;

        let reply = loop {
            let message = self.read_message(Some(self.timeout)).await?;
            match ServerMessage::parse(message)? {
                ServerMessage::Notification(n) => self.notifications.push_back(n),
                ServerMessage::Reply(reply) => match reply.message_id() {
                    Some(reply_id) if reply_id != id => {
                        return Err(ReplyError::UnknownMessageId(reply_id.to_string()).into());
                    }
                    _ => break reply,
                },
            }
        };

        if let Some(error) = reply.first_error() {
            return Err(Error::Rpc(error.clone()));
        }
        for warning in reply.errors() {
            warn!("rpc {} warning: {}", id, warning);
        }
        Ok(reply)
    }

    /// `<get>` operational and configuration state.
    pub async fn get(
        &mut self,
        filter: Option<&Filter>,
        with_defaults: Option<WithDefaults>,
    ) -> Result<RpcReply> {
        let mut op = String::from("<get>");
        if let Some(filter) = filter {
            op.push_str(&filter.to_xml());
        }
        if let Some(wd) = with_defaults {
            op.push_str(&wd.to_xml());
        }
        op.push_str("</get>");
        self.rpc(&op).await
    }

    /// `<get-config>` from `source`.
    pub async fn get_config(
        &mut self,
        source: Datastore,
        filter: Option<&Filter>,
        with_defaults: Option<WithDefaults>,
    ) -> Result<RpcReply> {
        let mut op = format!("<get-config><source>{}</source>", source.to_xml());
        if let Some(filter) = filter {
            op.push_str(&filter.to_xml());
        }
        if let Some(wd) = with_defaults {
            op.push_str(&wd.to_xml());
        }
        op.push_str("</get-config>");
        self.rpc(&op).await
    }

    /// `<get-schema>`, returning the schema text.
    pub async fn get_schema(
        &mut self,
        identifier: &str,
        version: Option<&str>,
        format: Option<&str>,
    ) -> Result<String> {
        let mut op = format!(
            r#"<get-schema xmlns="{MONITORING_NS}"><identifier>{}</identifier>"#,
            escape(identifier)
        );
        if let Some(version) = version {
            op.push_str(&format!("<version>{}</version>", escape(version)));
        }
        if let Some(format) = format {
            op.push_str(&format!("<format>{}</format>", escape(format)));
        }
        op.push_str("</get-schema>");

        let reply = self.rpc(&op).await?;
        reply
            .data_text()?
            .ok_or_else(|| {
                ReplyError::MissingData {
                    operation: "get-schema".to_string(),
                }
                .into()
            })
    }

    /// `<edit-config>` on `target`.
    ///
    /// `config` is wrapped in `<config>` unless it already is one.
    pub async fn edit_config(
        &mut self,
        target: Datastore,
        config: &str,
        default_operation: Option<DefaultOperation>,
    ) -> Result<RpcReply> {
        let mut op = format!("<edit-config><target>{}</target>", target.to_xml());
        if let Some(default_operation) = default_operation {
            op.push_str(&format!(
                "<default-operation>{}</default-operation>",
                default_operation.as_str()
            ));
        }
        op.push_str(&wrap_config(config));
        op.push_str("</edit-config>");
        self.rpc(&op).await
    }

    pub async fn commit(&mut self) -> Result<RpcReply> {
        self.rpc("<commit/>").await
    }

    pub async fn discard_changes(&mut self) -> Result<RpcReply> {
        self.rpc("<discard-changes/>").await
    }

    pub async fn lock(&mut self, target: Datastore) -> Result<RpcReply> {
        self.rpc(&format!("<lock><target>{}</target></lock>", target.to_xml()))
            .await
    }

    pub async fn unlock(&mut self, target: Datastore) -> Result<RpcReply> {
        self.rpc(&format!("<unlock><target>{}</target></unlock>", target.to_xml()))
            .await
    }

    /// Hold a lock on `target` while `f` runs.
    ///
    /// The unlock is sent whether or not `f` succeeds; an error from `f`
    /// takes precedence over an unlock failure.
    pub async fn locked<T, F>(&mut self, target: Datastore, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Self) -> BoxFuture<'s, Result<T>>,
    {
        self.lock(target).await?;
        let result = f(&mut *self).await;
        let unlocked = self.unlock(target).await;
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// RFC 5277 `<create-subscription>`.
    pub async fn create_subscription(
        &mut self,
        stream: Option<&str>,
        filter: Option<&Filter>,
        start_time: Option<&str>,
        stop_time: Option<&str>,
    ) -> Result<RpcReply> {
        let mut op = format!(r#"<create-subscription xmlns="{NOTIFICATION_NS}">"#);
        if let Some(stream) = stream {
            op.push_str(&format!("<stream>{}</stream>", escape(stream)));
        }
        if let Some(filter) = filter {
            op.push_str(&filter.to_xml());
        }
        if let Some(start) = start_time {
            op.push_str(&format!("<startTime>{}</startTime>", escape(start)));
        }
        if let Some(stop) = stop_time {
            op.push_str(&format!("<stopTime>{}</stopTime>", escape(stop)));
        }
        op.push_str("</create-subscription>");
        self.rpc(&op).await
    }

    /// Wait for the next notification, without a timeout.
    pub async fn next_notification(&mut self) -> Result<Notification> {
        if let Some(n) = self.notifications.pop_front() {
            return Ok(n);
        }
        loop {
            let message = self.read_message(None).await?;
            match ServerMessage::parse(message)? {
                ServerMessage::Notification(n) => return Ok(n),
                ServerMessage::Reply(reply) => {
                    warn!("ignoring unsolicited reply {:?}", reply.message_id());
                }
            }
        }
    }

    /// Notifications as a stream, ending when the session closes.
    pub fn notifications(self) -> impl Stream<Item = Result<Notification>> {
        stream::unfold(Some(self), |session| async move {
            let mut session = session?;
            match session.next_notification().await {
                Ok(n) => Some((Ok(n), Some(session))),
                Err(Error::Transport(TransportError::Disconnected)) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Send `<close-session>` and shut the transport down.
    ///
    /// Teardown errors are logged, not returned.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.rpc("<close-session/>").await {
            debug!("close-session failed: {}", e);
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!("stream shutdown failed: {}", e);
        }
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("SSH disconnect failed: {}", e);
            }
        }
        Ok(())
    }

    pub(crate) fn attach_transport(&mut self, transport: SshTransport) {
        self.transport = Some(transport);
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        trace!("send: {}", message);
        let framed = self.decoder.framing().encode(message.as_bytes());
        self.stream
            .write_all(&framed)
            .await
            .map_err(TransportError::Io)?;
        self.stream.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn read_message(&mut self, timeout: Option<Duration>) -> Result<String> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_frame())
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.read_frame().await,
        }
    }

    async fn read_frame(&mut self) -> Result<String> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            if let Some(message) = self.decoder.next_message()? {
                let message = String::from_utf8(message).map_err(|_| ReplyError::Utf8)?;
                trace!("recv: {}", message);
                return Ok(message);
            }

            let n = self
                .stream
                .read(&mut buf)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                self.decoder.finish()?;
                return Err(TransportError::Disconnected.into());
            }
            self.decoder.extend(&buf[..n]);
        }
    }
}

fn wrap_config(config: &str) -> String {
    let trimmed = config.trim();
    let is_wrapped = trimmed
        .strip_prefix("<config")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace());
    if is_wrapped {
        trimmed.to_string()
    } else {
        format!(r#"<config xmlns="{BASE_NS}">{trimmed}</config>"#)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use roxmltree::Document;
    use tokio::io::DuplexStream;

    const SERVER_HELLO_11: &str = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability><capability>urn:ietf:params:netconf:base:1.1</capability><capability>urn:ietf:params:netconf:capability:candidate:1.0</capability></capabilities><session-id>42</session-id></hello>"#;

    const SERVER_HELLO_10: &str = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities><session-id>7</session-id></hello>"#;

    /// Server side of an in-memory NETCONF session.
    pub(crate) struct FakeServer {
        io: DuplexStream,
        decoder: FrameDecoder,
        framing: Framing,
    }

    impl FakeServer {
        pub(crate) async fn recv(&mut self) -> String {
            let mut buf = [0u8; 4096];
            loop {
                if let Some(m) = self.decoder.next_message().unwrap() {
                    return String::from_utf8(m).unwrap();
                }
                let n = self.io.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed the stream");
                self.decoder.extend(&buf[..n]);
            }
        }

        pub(crate) async fn send(&mut self, message: &str) {
            let framed = self.framing.encode(message.as_bytes());
            self.io.write_all(&framed).await.unwrap();
        }

        /// Receive an RPC and answer it with `body` inside `<rpc-reply>`.
        pub(crate) async fn reply(&mut self, body: &str) -> String {
            let rpc = self.recv().await;
            let id = message_id(&rpc);
            self.send(&format!(
                r#"<rpc-reply message-id="{id}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">{body}</rpc-reply>"#
            ))
            .await;
            rpc
        }
    }

    pub(crate) fn message_id(rpc: &str) -> String {
        let doc = Document::parse(rpc).unwrap();
        doc.root_element()
            .attribute("message-id")
            .unwrap()
            .to_string()
    }

    /// Connect a session to a fake server that speaks base:1.1.
    pub(crate) async fn connect_pair() -> (NetconfSession<DuplexStream>, FakeServer) {
        connect_with_hello(SERVER_HELLO_11).await
    }

    async fn connect_with_hello(hello: &str) -> (NetconfSession<DuplexStream>, FakeServer) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let mut server = FakeServer {
            io: server,
            decoder: FrameDecoder::new(),
            framing: Framing::EndOfMessage,
        };

        let hello = hello.to_string();
        let server_task = tokio::spawn(async move {
            server.send(&hello).await;
            let client_hello = server.recv().await;
            assert!(client_hello.contains(BASE_1_1));
            if hello.contains(BASE_1_1) {
                server.decoder.set_framing(Framing::Chunked);
                server.framing = Framing::Chunked;
            }
            server
        });

        let session = NetconfSession::establish(client, Duration::from_secs(5))
            .await
            .unwrap();
        (session, server_task.await.unwrap())
    }

    #[tokio::test]
    async fn test_hello_negotiates_chunked_framing() {
        let (session, _server) = connect_pair().await;
        assert_eq!(session.session_id(), Some(42));
        assert!(session.capabilities().base_1_1);
        assert!(session.capabilities().candidate);
        assert_eq!(session.decoder.framing(), Framing::Chunked);
    }

    #[tokio::test]
    async fn test_hello_base_10_keeps_eom_framing() {
        let (mut session, mut server) = connect_with_hello(SERVER_HELLO_10).await;
        assert_eq!(session.session_id(), Some(7));
        assert_eq!(session.decoder.framing(), Framing::EndOfMessage);

        let server_task = tokio::spawn(async move { server.reply("<ok/>").await });
        let reply = session.commit().await.unwrap();
        assert!(reply.is_ok());
        assert!(server_task.await.unwrap().contains("<commit/>"));
    }

    #[tokio::test]
    async fn test_hello_with_tokio_test_mock() {
        let client_hello = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{BASE_NS}"><capabilities><capability>{BASE_1_0}</capability><capability>{BASE_1_1}</capability></capabilities></hello>]]>]]>"#
        );
        let mock = tokio_test::io::Builder::new()
            .write(client_hello.as_bytes())
            .read(SERVER_HELLO_10.as_bytes())
            .read(b"]]>]]>")
            .build();

        let session = NetconfSession::establish(mock, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(session.server_capabilities(), &[BASE_1_0.to_string()]);
    }

    #[tokio::test]
    async fn test_get_with_filter_and_defaults() {
        let (mut session, mut server) = connect_pair().await;

        let server_task = tokio::spawn(async move {
            server
                .reply(r#"<data><interfaces xmlns="urn:x"><interface><name>Gi0</name></interface></interfaces></data>"#)
                .await
        });

        let filter = Filter::subtree(r#"<interfaces xmlns="urn:x"/>"#);
        let reply = session
            .get(Some(&filter), Some(WithDefaults::ReportAll))
            .await
            .unwrap();
        assert_eq!(
            reply.data_xml().unwrap().unwrap(),
            r#"<data><interfaces xmlns="urn:x"><interface><name>Gi0</name></interface></interfaces></data>"#
        );

        let rpc = server_task.await.unwrap();
        assert!(rpc.contains(r#"<get><filter type="subtree"><interfaces xmlns="urn:x"/></filter>"#));
        assert!(rpc.contains(">report-all</with-defaults></get>"));
    }

    #[tokio::test]
    async fn test_rpc_error_becomes_error() {
        let (mut session, mut server) = connect_pair().await;
        let server_task = tokio::spawn(async move {
            server
                .reply("<rpc-error><error-type>protocol</error-type><error-tag>lock-denied</error-tag><error-severity>error</error-severity><error-message>locked by 12</error-message></rpc-error>")
                .await
        });

        let err = session.lock(Datastore::Running).await.unwrap_err();
        match err {
            Error::Rpc(e) => {
                assert_eq!(e.tag, "lock-denied");
                assert_eq!(e.message, "locked by 12");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
        assert!(
            server_task
                .await
                .unwrap()
                .contains("<lock><target><running/></target></lock>")
        );
    }

    #[tokio::test]
    async fn test_get_schema_returns_text() {
        let (mut session, mut server) = connect_pair().await;
        let server_task = tokio::spawn(async move {
            let rpc = server
                .reply(r#"<data xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring">module a { namespace "urn:a"; }</data>"#)
                .await;
            let empty = server.reply("<ok/>").await;
            (rpc, empty)
        });

        let text = session
            .get_schema("a", Some("2020-01-01"), None)
            .await
            .unwrap();
        assert_eq!(text, r#"module a { namespace "urn:a"; }"#);

        let err = session.get_schema("b", None, None).await.unwrap_err();
        assert!(err.is_rpc_failure());

        let (rpc, _) = server_task.await.unwrap();
        assert!(rpc.contains("<identifier>a</identifier><version>2020-01-01</version>"));
    }

    #[tokio::test]
    async fn test_notifications_queued_during_rpc() {
        let (mut session, mut server) = connect_pair().await;
        let server_task = tokio::spawn(async move {
            let rpc = server.recv().await;
            let id = message_id(&rpc);
            server
                .send(r#"<notification xmlns="urn:ietf:params:xml:ns:netconf:notification:1.0"><eventTime>2020-01-01T00:00:00Z</eventTime><event/></notification>"#)
                .await;
            server
                .send(&format!(
                    r#"<rpc-reply message-id="{id}" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#
                ))
                .await;
            rpc
        });

        session
            .create_subscription(Some("NETCONF"), None, None, None)
            .await
            .unwrap();
        let rpc = server_task.await.unwrap();
        assert!(rpc.contains("<stream>NETCONF</stream>"));

        let n = session.next_notification().await.unwrap();
        assert_eq!(n.event_time(), Some("2020-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_mismatched_message_id() {
        let (mut session, mut server) = connect_pair().await;
        tokio::spawn(async move {
            let _ = server.recv().await;
            server
                .send(r#"<rpc-reply message-id="9999" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#)
                .await;
            server
        });

        let err = session.commit().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Reply(ReplyError::UnknownMessageId(ref id)) if id == "9999"
        ));
    }

    #[tokio::test]
    async fn test_locked_unlocks_after_failure() {
        let (mut session, mut server) = connect_pair().await;
        let server_task = tokio::spawn(async move {
            let lock = server.reply("<ok/>").await;
            let edit = server
                .reply("<rpc-error><error-type>application</error-type><error-tag>invalid-value</error-tag><error-severity>error</error-severity></rpc-error>")
                .await;
            let unlock = server.reply("<ok/>").await;
            (lock, edit, unlock)
        });

        let result = session
            .locked(Datastore::Candidate, |s| {
                Box::pin(async move {
                    s.edit_config(Datastore::Candidate, "<a/>", None).await?;
                    Ok(())
                })
            })
            .await;
        assert!(matches!(result, Err(Error::Rpc(_))));

        let (lock, edit, unlock) = server_task.await.unwrap();
        assert!(lock.contains("<lock>"));
        assert!(edit.contains(r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><a/></config>"#));
        assert!(unlock.contains("<unlock><target><candidate/></target></unlock>"));
    }

    #[tokio::test]
    async fn test_disconnect_reported() {
        let (mut session, server) = connect_pair().await;
        drop(server);
        let err = session.commit().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Disconnected) | Error::Transport(TransportError::Io(_))
        ));
    }

    #[test]
    fn test_wrap_config() {
        assert_eq!(
            wrap_config("<config><a/></config>"),
            "<config><a/></config>"
        );
        assert_eq!(
            wrap_config("  <configuration/>"),
            format!(r#"<config xmlns="{BASE_NS}"><configuration/></config>"#)
        );
    }
}
