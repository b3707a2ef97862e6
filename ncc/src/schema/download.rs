//! Bulk `<get-schema>` into a directory.

use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{FileNaming, SchemaRef, SchemaSource};
use crate::error::{Error, Result};

/// Which part of the inventory to download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadMode {
    /// Every schema.
    #[default]
    All,
    /// Only schemas after the named one, to resume an interrupted run.
    /// Matches either the bare name or `name@version`.
    StartAfter(String),
    /// Nothing; only files already on disk are analysed.
    Skip,
}

impl DownloadMode {
    /// Mode from the `--start-after` and `--skip-download` flags; skipping
    /// wins.
    pub fn from_flags(start_after: Option<String>, skip_download: bool) -> Self {
        match (start_after, skip_download) {
            (_, true) => DownloadMode::Skip,
            (Some(cursor), false) => DownloadMode::StartAfter(cursor),
            (None, false) => DownloadMode::All,
        }
    }
}

/// Result of a bulk download.
#[derive(Debug, Default)]
pub struct DownloadOutcome {
    /// Files written, in download order.
    pub written: Vec<PathBuf>,
    /// Schemas the server refused or returned no text for.
    pub failed: Vec<SchemaRef>,
}

/// Download `refs` into `dir`.
///
/// A per-schema RPC failure is recorded and iteration continues; session
/// and file errors end the run.
pub async fn download_schemas<S: SchemaSource>(
    source: &mut S,
    refs: &[SchemaRef],
    dir: &Path,
    naming: FileNaming,
    mode: &DownloadMode,
) -> Result<DownloadOutcome> {
    let mut outcome = DownloadOutcome::default();

    let todo: &[SchemaRef] = match mode {
        DownloadMode::All => refs,
        DownloadMode::Skip => {
            info!("Skipping schema download");
            &[]
        }
        DownloadMode::StartAfter(cursor) => {
            match refs
                .iter()
                .position(|r| r.name == *cursor || r.to_string() == *cursor)
            {
                Some(pos) => &refs[pos + 1..],
                None => {
                    warn!("{} not in schema list, nothing to download", cursor);
                    &[]
                }
            }
        }
    };

    for schema in todo {
        match download_one(source, schema, dir, naming).await {
            Ok(path) => outcome.written.push(path),
            Err(e) if e.is_rpc_failure() => {
                info!("Failed to download schema {}: {}", schema, e);
                outcome.failed.push(schema.clone());
            }
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}

/// Fetch one schema and write it to its file in `dir`.
pub(crate) async fn download_one<S: SchemaSource>(
    source: &mut S,
    schema: &SchemaRef,
    dir: &Path,
    naming: FileNaming,
) -> Result<PathBuf> {
    info!("Downloading schema {}...", schema);
    let text = source
        .get_schema(&schema.name, schema.version.as_deref())
        .await?;
    let path = dir.join(schema.file_name(naming));
    write_schema(&path, &text).await?;
    Ok(path)
}

/// Write schema text, newline terminated.
pub(crate) async fn write_schema(path: &Path, text: &str) -> Result<()> {
    let mut contents = text.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(path, e))
}
