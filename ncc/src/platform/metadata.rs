//! `platform-metadata.json`, shared by every capture of a version.

use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, PlatformError, Result};

/// Where the module list of a platform lives in the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleListFile {
    /// `capabilities` or `yang-library`.
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub owner: String,
    pub repository: String,
}

/// One platform record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformMetadata {
    pub vendor: String,
    pub product_ids: Vec<String>,
    pub name: String,
    pub os_type: String,
    pub software_flavor: String,
    pub software_version: String,
    pub module_list_file: ModuleListFile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platforms {
    pub platform: Vec<PlatformMetadata>,
}

/// The whole document: `{"platforms": {"platform": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub platforms: Platforms,
}

impl MetadataDocument {
    /// Load from `path`; a missing or empty file is an empty document.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io(path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&text).map_err(|source| {
            PlatformError::Metadata {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Add a record, or union its product ids into the record with the
    /// same vendor and name.
    pub fn merge(&mut self, record: PlatformMetadata) {
        let existing = self
            .platforms
            .platform
            .iter_mut()
            .find(|p| p.vendor == record.vendor && p.name == record.name);
        match existing {
            Some(platform) => {
                let existing = std::mem::take(&mut platform.product_ids);
                platform.product_ids = union_product_ids(existing, record.product_ids);
            }
            None => {
                let mut record = record;
                record.product_ids = union_product_ids(Vec::new(), record.product_ids);
                self.platforms.platform.push(record);
            }
        }
    }

    /// Serialize with four-space indentation.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json().map_err(|source| PlatformError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| Error::io(path, e))
    }

    /// Load, merge `record` and write back.
    pub async fn merge_into_file(path: &Path, record: PlatformMetadata) -> Result<Self> {
        let mut doc = Self::load(path).await?;
        doc.merge(record);
        doc.save(path).await?;
        Ok(doc)
    }
}

/// `existing` followed by the new ids in `added`, each id once, in
/// first-seen order.
fn union_product_ids(existing: Vec<String>, added: Vec<String>) -> Vec<String> {
    existing
        .into_iter()
        .chain(added)
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
