//! Import/include resolution over downloaded schema files.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::download::{download_one, write_schema};
use super::yang::YangModule;
use super::{FileNaming, SchemaRef, SchemaSource};
use crate::error::{Error, Result, SchemaError};

/// Module name a schema file is for: the file name up to the first `@`
/// or `.`.
pub fn module_name_from_file(file_name: &str) -> &str {
    let end = file_name.find(['@', '.']).unwrap_or(file_name.len());
    &file_name[..end]
}

/// Parsed `*.yang` files in a directory, keyed by file name.
#[derive(Debug, Default)]
struct ScannedFiles {
    /// Dependencies of each parsed file.
    dependencies: HashMap<String, Vec<String>>,
    /// Files that failed to parse, with the error.
    errors: HashMap<String, SchemaError>,
}

impl ScannedFiles {
    /// Parse any `*.yang` file in `dir` not seen before.
    async fn update(&mut self, dir: &Path) -> Result<()> {
        for (file_name, path) in yang_files(dir).await? {
            if self.dependencies.contains_key(&file_name) || self.errors.contains_key(&file_name) {
                continue;
            }
            debug!("Parsing {}", file_name);

            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Error::io(&path, e))?;
            let Ok(text) = String::from_utf8(bytes) else {
                let e = SchemaError::Parse {
                    file: file_name.clone(),
                    line: 1,
                    message: "not UTF-8".to_string(),
                };
                warn!("{}", e);
                self.errors.insert(file_name, e);
                continue;
            };
            match YangModule::parse(&text, &file_name) {
                Ok(module) if module.name == module_name_from_file(&file_name) => {
                    let deps = module.dependencies().map(str::to_string).collect();
                    self.dependencies.insert(file_name, deps);
                }
                Ok(module) => {
                    debug!("{} declares {}, ignoring its imports", file_name, module.name);
                    self.dependencies.insert(file_name, Vec::new());
                }
                Err(e) => {
                    warn!("{}", e);
                    self.errors.insert(file_name, e);
                }
            }
        }
        Ok(())
    }

    fn all_dependencies(&self) -> BTreeSet<String> {
        self.dependencies.values().flatten().cloned().collect()
    }
}

/// `*.yang` files in `dir` as (file name, path), sorted by name.
async fn yang_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file || path.extension().is_none_or(|ext| ext != "yang") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

/// Modules that have at least one file in `dir`.
async fn modules_on_disk(dir: &Path) -> Result<HashSet<String>> {
    Ok(yang_files(dir)
        .await?
        .iter()
        .map(|(name, _)| module_name_from_file(name).to_string())
        .collect())
}

/// Every import and include target across the files in `dir`, plus
/// the parse errors met on the way.
pub async fn scan_dependencies(dir: &Path) -> Result<(BTreeSet<String>, Vec<SchemaError>)> {
    let mut scanned = ScannedFiles::default();
    scanned.update(dir).await?;
    Ok((
        scanned.all_dependencies(),
        scanned.errors.into_values().collect(),
    ))
}

/// Outcome of dependency resolution.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Imported or included but not in the schema list.
    pub not_advertised: BTreeSet<String>,
    /// Of those, the ones the server would not return.
    pub failed: BTreeSet<String>,
    /// Files written while resolving.
    pub written: Vec<PathBuf>,
    /// Files that could not be parsed.
    pub parse_errors: Vec<SchemaError>,
}

/// Find imports and includes of the files in `dir` that are not among
/// `known`, and download them by name until nothing new turns up.
///
/// A module that already has a file in `dir` is not downloaded again.
pub async fn resolve_dependencies<S: SchemaSource>(
    source: &mut S,
    dir: &Path,
    known: &BTreeSet<String>,
) -> Result<Resolution> {
    info!("Checking downloaded schema for imports and includes...");
    let mut resolution = Resolution::default();
    let mut scanned = ScannedFiles::default();
    let mut attempted: HashSet<String> = HashSet::new();

    loop {
        scanned.update(dir).await?;
        let missing: Vec<String> = scanned
            .all_dependencies()
            .into_iter()
            .filter(|m| !known.contains(m))
            .collect();
        resolution.not_advertised.extend(missing.iter().cloned());

        let on_disk = modules_on_disk(dir).await?;
        let todo: Vec<String> = missing
            .into_iter()
            .filter(|m| !on_disk.contains(m) && attempted.insert(m.clone()))
            .collect();
        if todo.is_empty() {
            break;
        }

        for module in todo {
            let schema = SchemaRef::named(module.clone());
            match download_one(source, &schema, dir, FileNaming::NameOnly).await {
                Ok(path) => resolution.written.push(path),
                Err(e) if e.is_rpc_failure() => {
                    info!("Failed to download schema {}: {}", module, e);
                    resolution.failed.insert(module);
                }
                Err(e) => return Err(e),
            }
        }
    }

    resolution.parse_errors = scanned.errors.into_values().collect();
    Ok(resolution)
}

/// Result of fetching a module with its dependencies.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Modules written, as `name@revision`.
    pub written: Vec<SchemaRef>,
    /// Modules already present on disk.
    pub existing: Vec<SchemaRef>,
    /// Modules that could not be fetched or parsed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Download `name` and, recursively, everything it imports or includes.
///
/// Files are named `<module>@<latest revision>.yang`. A module whose file
/// already exists is neither rewritten nor followed.
pub async fn fetch_with_dependencies<S: SchemaSource>(
    source: &mut S,
    name: &str,
    version: Option<&str>,
    dir: &Path,
) -> Result<FetchOutcome> {
    let mut outcome = FetchOutcome::default();
    let mut queue = vec![SchemaRef {
        name: name.to_string(),
        version: version.map(str::to_string),
    }];
    let mut seen: HashSet<String> = HashSet::from([name.to_string()]);

    while let Some(schema) = queue.pop() {
        debug!("Retrieving {}", schema);
        let text = match source
            .get_schema(&schema.name, schema.version.as_deref())
            .await
        {
            Ok(text) => text,
            Err(e) if e.is_rpc_failure() => {
                outcome.failed.push((schema.name, e.to_string()));
                continue;
            }
            Err(e) => return Err(e),
        };

        let module = match YangModule::parse(&text, &schema.name) {
            Ok(module) => module,
            Err(e) => {
                outcome.failed.push((schema.name, e.to_string()));
                continue;
            }
        };

        let fetched = SchemaRef {
            name: module.name.clone(),
            version: module.latest_revision().map(str::to_string),
        };
        let path = dir.join(fetched.file_name(FileNaming::Versioned));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("{} already present", path.display());
            outcome.existing.push(fetched);
            continue;
        }

        for dep in module.dependencies() {
            if seen.insert(dep.to_string()) {
                queue.push(SchemaRef::named(dep));
            }
        }
        write_schema(&path, &text).await?;
        outcome.written.push(fetched);
    }

    Ok(outcome)
}
