//! YANG schema inventory, download and dependency resolution.

mod download;
mod inventory;
mod report;
mod resolve;
pub mod yang;

use std::fmt;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ReplyError, Result};
use crate::netconf::{Filter, NetconfSession};

pub use download::{DownloadMode, DownloadOutcome, download_schemas};
pub use inventory::{
    IDENTIFIERS_FILTER, SCHEMAS_FILTER, cross_check, fetch_inventory, parse_inventory,
};
pub use report::CaptureReport;
pub use resolve::{
    FetchOutcome, Resolution, fetch_with_dependencies, module_name_from_file,
    resolve_dependencies, scan_dependencies,
};
pub use yang::YangModule;

/// A schema the device lists, by identifier and optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRef {
    pub name: String,
    pub version: Option<String>,
}

impl SchemaRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// A reference by name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// File the schema is saved to.
    pub fn file_name(&self, naming: FileNaming) -> String {
        match (naming, &self.version) {
            (FileNaming::Versioned, Some(version)) => format!("{}@{}.yang", self.name, version),
            _ => format!("{}.yang", self.name),
        }
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// How downloaded schema files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `<name>@<version>.yang` when the version is known.
    Versioned,
    /// Always `<name>.yang`.
    NameOnly,
}

/// Where schemas come from.
///
/// Implemented by [`NetconfSession`]; the capture workflow only needs
/// these three operations.
pub trait SchemaSource: Send {
    /// Capability URIs advertised by the server.
    fn server_capabilities(&self) -> &[String];

    /// `<get>` with `filter`, returning the source text of `<data>`.
    fn get_data(&mut self, filter: &Filter) -> impl Future<Output = Result<String>> + Send;

    /// `<get-schema>` for `identifier`, returning the schema text.
    fn get_schema(
        &mut self,
        identifier: &str,
        version: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl<S> SchemaSource for NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn server_capabilities(&self) -> &[String] {
        NetconfSession::server_capabilities(self)
    }

    async fn get_data(&mut self, filter: &Filter) -> Result<String> {
        let reply = self.get(Some(filter), None).await?;
        reply.data_xml()?.ok_or_else(|| {
            ReplyError::MissingData {
                operation: "get".to_string(),
            }
            .into()
        })
    }

    async fn get_schema(&mut self, identifier: &str, version: Option<&str>) -> Result<String> {
        NetconfSession::get_schema(self, identifier, version, None).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_naming() {
        let versioned = SchemaRef::new("ietf-interfaces", "2014-05-08");
        assert_eq!(
            versioned.file_name(FileNaming::Versioned),
            "ietf-interfaces@2014-05-08.yang"
        );
        assert_eq!(
            versioned.file_name(FileNaming::NameOnly),
            "ietf-interfaces.yang"
        );
        assert_eq!(
            SchemaRef::named("x").file_name(FileNaming::Versioned),
            "x.yang"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SchemaRef::new("a", "1").to_string(), "a@1");
        assert_eq!(SchemaRef::named("a").to_string(), "a");
    }

    #[tokio::test]
    async fn test_session_as_schema_source() {
        use crate::netconf::test_support::connect_pair;

        let (mut session, mut server) = connect_pair().await;
        let server_task = tokio::spawn(async move {
            let get = server
                .reply(r#"<data><netconf-state xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring"><schemas><schema><identifier>a</identifier><version>1</version></schema></schemas></netconf-state></data>"#)
                .await;
            let refused = server
                .reply("<rpc-error><error-type>application</error-type><error-tag>invalid-value</error-tag><error-severity>error</error-severity></rpc-error>")
                .await;
            (get, refused)
        });

        let refs = fetch_inventory(&mut session, SCHEMAS_FILTER).await.unwrap();
        assert_eq!(refs, vec![SchemaRef::new("a", "1")]);

        let err = SchemaSource::get_schema(&mut session, "b", None).await.unwrap_err();
        assert!(err.is_rpc_failure());

        let (get, refused) = server_task.await.unwrap();
        assert!(get.contains(r#"<filter type="subtree"><netconf-state"#));
        assert!(refused.contains("<identifier>b</identifier>"));
    }
}
