//! Schema and capabilities capture.
//!
//! [`capture_schemas`] is the core shared by the download tools: read the
//! schema list, cross-check it against the advertised capabilities,
//! download, then chase imports and includes. [`capture_platform`] adds
//! the artifacts that go into a models repository: capabilities file,
//! platform metadata, `REPORT.md` and `check-models.sh`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};
use roxmltree::Document;

use crate::error::{Error, Result};
use crate::git::GitRepo;
use crate::netconf::Filter;
use crate::netconf::xml::{BASE_NS, escape, source_text};
use crate::platform::{Identification, MetadataDocument, ModuleListFile};
use crate::schema::{
    CaptureReport, DownloadMode, DownloadOutcome, FileNaming, IDENTIFIERS_FILTER, Resolution,
    SCHEMAS_FILTER, SchemaRef, SchemaSource, cross_check, download_schemas, fetch_inventory,
    resolve_dependencies,
};

/// Lint script placed next to captured models.
pub const CHECK_MODELS_SCRIPT: &str = include_str!("../assets/check-models.sh");

pub const YANG_LIBRARY_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-yang-library";

pub const METADATA_FILE: &str = "platform-metadata.json";

/// How the schema list is read and files are named.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub inventory_filter: &'static str,
    pub naming: FileNaming,
    pub mode: DownloadMode,
}

impl CaptureOptions {
    /// Identifiers and versions, files named `<module>@<version>.yang`.
    pub fn versioned(mode: DownloadMode) -> Self {
        Self {
            inventory_filter: SCHEMAS_FILTER,
            naming: FileNaming::Versioned,
            mode,
        }
    }

    /// Identifiers only, files named `<module>.yang`.
    pub fn by_name(mode: DownloadMode) -> Self {
        Self {
            inventory_filter: IDENTIFIERS_FILTER,
            naming: FileNaming::NameOnly,
            mode,
        }
    }
}

/// Everything learned while capturing schemas.
#[derive(Debug, Default)]
pub struct SchemaCapture {
    pub inventory: Vec<SchemaRef>,
    pub not_in_inventory: BTreeSet<SchemaRef>,
    pub download: DownloadOutcome,
    pub resolution: Resolution,
}

impl SchemaCapture {
    /// Fold the results into a report.
    pub fn report(&self, os: &str, version: &str) -> CaptureReport {
        let mut report = CaptureReport::new(os, version);
        report.not_in_inventory = self.not_in_inventory.clone();
        report.not_advertised = self.resolution.not_advertised.clone();
        report.failed = self
            .download
            .failed
            .iter()
            .map(|s| s.name.clone())
            .chain(self.resolution.failed.iter().cloned())
            .collect();
        report
    }
}

/// Download the device's schemas into `dir` and resolve their dependencies.
pub async fn capture_schemas<S: SchemaSource>(
    source: &mut S,
    dir: &Path,
    options: &CaptureOptions,
) -> Result<SchemaCapture> {
    let inventory = fetch_inventory(source, options.inventory_filter).await?;

    info!("Checking schema list against capabilities...");
    let not_in_inventory = cross_check(source.server_capabilities(), &inventory);
    for schema in &not_in_inventory {
        debug!("{} not in /netconf-state/schemas", schema);
    }

    let download =
        download_schemas(source, &inventory, dir, options.naming, &options.mode).await?;

    let known: BTreeSet<String> = inventory.iter().map(|s| s.name.clone()).collect();
    let resolution = resolve_dependencies(source, dir, &known).await?;

    Ok(SchemaCapture {
        inventory,
        not_in_inventory,
        download,
        resolution,
    })
}

/// What the capabilities file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleListKind {
    YangLibrary,
    Capabilities,
}

impl ModuleListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleListKind::YangLibrary => "yang-library",
            ModuleListKind::Capabilities => "capabilities",
        }
    }
}

/// `/modules-state` from the YANG library, or `None` when the device
/// does not serve it.
pub async fn yang_library<S: SchemaSource>(source: &mut S) -> Result<Option<String>> {
    info!("Trying to use YANG Library...");
    let filter = Filter::XPath {
        select: "/modules-state".to_string(),
        namespaces: vec![("nc".to_string(), BASE_NS.to_string())],
    };
    let data = match source.get_data(&filter).await {
        Ok(data) => data,
        Err(e) if e.is_rpc_failure() => {
            info!("YANG Library not supported: {}", e);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let Ok(doc) = Document::parse(&data) else {
        return Ok(None);
    };
    let tags: Vec<&str> = doc
        .descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "modules-state"
                && n.tag_name().namespace() == Some(YANG_LIBRARY_NS)
        })
        .map(|n| source_text(&data, n))
        .collect();
    if tags.is_empty() {
        info!("YANG Library not supported!");
        return Ok(None);
    }
    let mut out = tags.join("\n");
    out.push('\n');
    Ok(Some(out))
}

/// A `<hello>` document listing `capabilities`.
pub fn hello_document<S: AsRef<str>>(capabilities: &[S]) -> String {
    let mut out = format!("<hello xmlns=\"{BASE_NS}\">\n <capabilities>\n");
    for cap in capabilities {
        out.push_str(&format!("  <capability>{}</capability>\n", escape(cap.as_ref())));
    }
    out.push_str(" </capabilities>\n</hello>\n");
    out
}

/// Write the module list to `path`, preferring the YANG library.
pub async fn write_module_list<S: SchemaSource>(
    source: &mut S,
    path: &Path,
) -> Result<ModuleListKind> {
    let (kind, contents) = match yang_library(source).await? {
        Some(library) => (ModuleListKind::YangLibrary, library),
        None => {
            info!("Logging capabilities");
            (
                ModuleListKind::Capabilities,
                hello_document(source.server_capabilities()),
            )
        }
    };
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(kind)
}

/// Where in a working tree a capture goes.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    /// Root of the working tree.
    pub root: PathBuf,
    /// `<git-path>/<os>/<version>`, relative to `root`.
    pub relative: String,
    pub owner: String,
    pub repository: String,
}

impl CaptureTarget {
    pub fn in_repo(repo: &GitRepo, git_path: &str, identification: &Identification) -> Self {
        Self {
            root: repo.local_dir().to_path_buf(),
            relative: identification.capture_path(git_path),
            owner: repo.owner().to_string(),
            repository: repo.repository().to_string(),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.relative)
    }
}

/// Capture everything about one platform into `target`.
pub async fn capture_platform<S: SchemaSource>(
    source: &mut S,
    target: &CaptureTarget,
    identification: &Identification,
    mode: DownloadMode,
) -> Result<CaptureReport> {
    let dir = target.dir();
    info!("Capturing schemas to relative path {}", target.relative);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::io(&dir, e))?;

    let caps_name = identification.capabilities_file_name();
    let kind = write_module_list(source, &dir.join(&caps_name)).await?;

    let module_list_file = ModuleListFile {
        kind: kind.as_str().to_string(),
        path: format!("{}/{}", target.relative, caps_name),
        owner: target.owner.clone(),
        repository: target.repository.clone(),
    };
    MetadataDocument::merge_into_file(
        &dir.join(METADATA_FILE),
        identification.metadata(module_list_file),
    )
    .await?;

    let capture = capture_schemas(source, &dir, &CaptureOptions::versioned(mode)).await?;
    let report = capture.report(
        identification.device_type.os_dir(),
        &identification.version_dir(),
    );

    info!("creating a report file");
    report.write(&dir).await?;
    let script = dir.join("check-models.sh");
    tokio::fs::write(&script, CHECK_MODELS_SCRIPT)
        .await
        .map_err(|e| Error::io(&script, e))?;

    Ok(report)
}

/// Commit message for a captured version.
pub fn commit_message(version: &str) -> String {
    format!("Push version {version} models.")
}

/// Add, commit and push everything, then delete the clone whatever the
/// outcome. A git failure is returned after the clone is gone.
pub async fn publish(repo: GitRepo, version: &str) -> Result<()> {
    let pushed = async {
        repo.add_all().await?;
        repo.commit_all(&commit_message(version)).await?;
        info!("Pushing schema updates to repo...");
        repo.push().await
    }
    .await;

    info!("Tidying up clone...");
    let removed = repo.remove();
    pushed.and(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::platform::DeviceType;
    use crate::schema::testing::FakeSource;

    const LIBRARY_DATA: &str = r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><modules-state xmlns="urn:ietf:params:xml:ns:yang:ietf-yang-library"><module-set-id>5</module-set-id></modules-state></data>"#;

    fn identification() -> Identification {
        Identification {
            device_type: DeviceType::Xr,
            name: "NCS-5500".to_string(),
            version: "6.5.1".to_string(),
            product_ids: vec!["NCS-5501".to_string()],
        }
    }

    #[test]
    fn test_hello_document() {
        let doc = hello_document(&[
            "urn:ietf:params:netconf:base:1.1",
            "http://openconfig.net/yang/bgp?module=openconfig-bgp&revision=2016-06-21",
        ]);
        assert!(doc.starts_with(
            "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\n <capabilities>\n"
        ));
        assert!(doc.contains("  <capability>urn:ietf:params:netconf:base:1.1</capability>\n"));
        assert!(doc.ends_with(" </capabilities>\n</hello>\n"));
        roxmltree::Document::parse(&doc).unwrap();
    }

    #[tokio::test]
    async fn test_yang_library_found() {
        let mut source = FakeSource {
            data: LIBRARY_DATA.to_string(),
            ..Default::default()
        };
        let library = yang_library(&mut source).await.unwrap().unwrap();
        assert!(library.starts_with("<modules-state"));
        assert!(library.contains("<module-set-id>5</module-set-id>"));
    }

    #[tokio::test]
    async fn test_module_list_falls_back_to_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncs-5500-capabilities.xml");
        let mut source = FakeSource {
            capabilities: vec!["urn:ietf:params:netconf:base:1.1".to_string()],
            data: "<data xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"/>".to_string(),
            ..Default::default()
        };

        let kind = write_module_list(&mut source, &path).await.unwrap();
        assert_eq!(kind, ModuleListKind::Capabilities);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<capability>urn:ietf:params:netconf:base:1.1</capability>"));
    }

    #[test]
    fn test_report_merges_failures() {
        let mut capture = SchemaCapture::default();
        capture.download.failed.push(SchemaRef::new("A", "1"));
        capture.resolution.not_advertised.insert("C".to_string());
        capture.resolution.failed.insert("C".to_string());
        capture
            .not_in_inventory
            .insert(SchemaRef::new("D", "2018-01-01"));

        let report = capture.report("xr", "6.5.1");
        assert_eq!(report.os, "xr");
        assert_eq!(report.failed.iter().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(report.not_advertised.len(), 1);
        assert_eq!(report.not_in_inventory.len(), 1);
    }

    #[tokio::test]
    async fn test_capture_platform_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let target = CaptureTarget {
            root: root.path().to_path_buf(),
            relative: identification().capture_path("vendor/cisco"),
            owner: "YangModels".to_string(),
            repository: "yang".to_string(),
        };
        let mut source = FakeSource {
            capabilities: vec![
                "http://cisco.com/ns/yang/Cisco-IOS-XR-types?module=Cisco-IOS-XR-types&revision=2018-06-29"
                    .to_string(),
            ],
            data: r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><netconf-state xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring"><schemas/></netconf-state></data>"#.to_string(),
            ..Default::default()
        };

        let report = capture_platform(
            &mut source,
            &target,
            &identification(),
            DownloadMode::All,
        )
        .await
        .unwrap();

        let dir = root.path().join("vendor/cisco/xr/6.5.1");
        assert_eq!(target.dir(), dir);
        assert_eq!(report.not_in_inventory.len(), 1);
        assert!(dir.join("ncs-5500-capabilities.xml").exists());
        assert!(dir.join("REPORT.md").exists());
        assert_eq!(
            std::fs::read_to_string(dir.join("check-models.sh")).unwrap(),
            CHECK_MODELS_SCRIPT
        );

        let metadata = MetadataDocument::load(&dir.join(METADATA_FILE)).await.unwrap();
        let record = &metadata.platforms.platform[0];
        assert_eq!(record.module_list_file.kind, "capabilities");
        assert_eq!(
            record.module_list_file.path,
            "vendor/cisco/xr/6.5.1/ncs-5500-capabilities.xml"
        );
        assert_eq!(record.module_list_file.owner, "YangModels");
    }

    #[tokio::test]
    async fn test_yang_library_rpc_error_is_not_fatal() {
        struct Refusing;
        impl SchemaSource for Refusing {
            fn server_capabilities(&self) -> &[String] {
                &[]
            }
            async fn get_data(&mut self, _filter: &Filter) -> Result<String> {
                Err(RpcError {
                    tag: "operation-not-supported".to_string(),
                    severity: "error".to_string(),
                    ..Default::default()
                }
                .into())
            }
            async fn get_schema(&mut self, _id: &str, _v: Option<&str>) -> Result<String> {
                unreachable!()
            }
        }
        assert!(yang_library(&mut Refusing).await.unwrap().is_none());
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(commit_message("6.5.1"), "Push version 6.5.1 models.");
    }
}
