//! The capture summary written to `REPORT.md`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use super::SchemaRef;
use crate::error::{Error, Result};

const NOT_IN_INVENTORY: &str =
    "The following models are advertised in capabilities but are not in schemas tree:";
const NOT_ADVERTISED: &str =
    "The following schema are imported or included, but not listed in schemas tree:";
const NOT_DOWNLOADABLE: &str =
    "The following schema are imported, included or advertised, but not downloadable:";

/// Anomalies found during a capture, with the platform header.
#[derive(Debug, Clone, Default)]
pub struct CaptureReport {
    pub os: String,
    pub version: String,
    /// Advertised in capabilities, absent from the schema list.
    pub not_in_inventory: BTreeSet<SchemaRef>,
    /// Imported or included, absent from the schema list.
    pub not_advertised: BTreeSet<String>,
    /// Could not be downloaded, by name.
    pub failed: BTreeSet<String>,
}

impl CaptureReport {
    pub fn new(os: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }

    /// Plain listing of the three sets, as printed by the download tools.
    pub fn to_listing(&self) -> String {
        Listing(self).to_string()
    }

    /// Write `REPORT.md` into `dir`.
    pub async fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join("REPORT.md");
        tokio::fs::write(&path, self.to_markdown())
            .await
            .map_err(|e| Error::io(&path, e))
    }
}

impl fmt::Display for CaptureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("# Schema & Capabilities Capture Report\n\n")?;
        writeln!(f, "- Operating System: {}", self.os)?;
        writeln!(f, "- Version: {}\n", self.version)?;

        if !self.not_in_inventory.is_empty() {
            writeln!(f, "{}\n", NOT_IN_INVENTORY)?;
            for schema in &self.not_in_inventory {
                match &schema.version {
                    Some(revision) => writeln!(f, "- {}, revision={}", schema.name, revision)?,
                    None => writeln!(f, "- {}", schema.name)?,
                }
            }
        }
        if !self.not_advertised.is_empty() {
            writeln!(f, "\n{}\n", NOT_ADVERTISED)?;
            for name in sorted_caseless(&self.not_advertised) {
                writeln!(f, "- {}", name)?;
            }
        }
        if !self.failed.is_empty() {
            writeln!(f, "\n{}\n", NOT_DOWNLOADABLE)?;
            for name in sorted_caseless(&self.failed) {
                writeln!(f, "- {}", name)?;
            }
        }
        f.write_str("\n")
    }
}

/// The report as the download tools print it to stdout.
struct Listing<'a>(&'a CaptureReport);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let not_in_inventory: BTreeSet<&str> = report
            .not_in_inventory
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        write_section(f, NOT_IN_INVENTORY, not_in_inventory.into_iter())?;
        write_section(f, NOT_ADVERTISED, sorted_caseless(&report.not_advertised).into_iter())?;
        write_section(f, NOT_DOWNLOADABLE, sorted_caseless(&report.failed).into_iter())
    }
}

fn write_section<'a>(
    f: &mut fmt::Formatter<'_>,
    heading: &str,
    items: impl ExactSizeIterator<Item = &'a str>,
) -> fmt::Result {
    if items.len() == 0 {
        return Ok(());
    }
    writeln!(f, "{}", heading)?;
    for item in items {
        writeln!(f, "    {}", item)?;
    }
    Ok(())
}

fn sorted_caseless(names: &BTreeSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = names.iter().map(String::as_str).collect();
    names.sort_by_key(|n| n.to_lowercase());
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_when_clean() {
        let report = CaptureReport::new("xr", "6.5.1");
        assert_eq!(
            report.to_markdown(),
            "# Schema & Capabilities Capture Report\n\n- Operating System: xr\n- Version: 6.5.1\n\n\n"
        );
        assert_eq!(report.to_listing(), "");
    }

    #[test]
    fn test_all_sections() {
        let mut report = CaptureReport::new("nx", "9.2-1");
        report.not_in_inventory.insert(SchemaRef::new("a", "2018-01-01"));
        report.not_in_inventory.insert(SchemaRef::named("a-dev"));
        report.not_advertised.insert("zeta".to_string());
        report.not_advertised.insert("Alpha".to_string());
        report.failed.insert("zeta".to_string());

        let expected = "\
# Schema & Capabilities Capture Report

- Operating System: nx
- Version: 9.2-1

The following models are advertised in capabilities but are not in schemas tree:

- a, revision=2018-01-01
- a-dev

The following schema are imported or included, but not listed in schemas tree:

- Alpha
- zeta

The following schema are imported, included or advertised, but not downloadable:

- zeta

";
        assert_eq!(report.to_markdown(), expected);

        let listing = report.to_listing();
        assert!(listing.starts_with(
            "The following models are advertised in capabilities but are not in schemas tree:\n    a\n    a-dev\n"
        ));
        assert!(listing.ends_with("not downloadable:\n    zeta\n"));
    }

    #[test]
    fn test_display_matches_markdown() {
        let mut report = CaptureReport::new("xr", "7.0.1");
        report.failed.insert("Cisco-IOS-XR-types".to_string());
        assert_eq!(format!("{report}"), report.to_markdown());
        assert!(report.to_listing().starts_with(
            "The following schema are imported, included or advertised, but not downloadable:\n    Cisco-IOS-XR-types\n"
        ));
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        CaptureReport::new("xe", "16.9.1").write(dir.path()).await.unwrap();
        let text = std::fs::read_to_string(dir.path().join("REPORT.md")).unwrap();
        assert!(text.contains("- Version: 16.9.1"));
    }
}
