//! The device's own schema list (`/netconf-state/schemas`, RFC 6022).

use std::collections::{BTreeSet, HashSet};

use log::{debug, info};
use roxmltree::Document;

use super::{SchemaRef, SchemaSource};
use crate::capability::Capability;
use crate::error::{ReplyError, Result};
use crate::netconf::Filter;
use crate::netconf::xml::child_text;

/// Subtree filter for the complete schema list.
pub const SCHEMAS_FILTER: &str = r#"<netconf-state xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring">
 <schemas/>
</netconf-state>"#;

/// Subtree filter for schema identifiers only.
pub const IDENTIFIERS_FILTER: &str = r#"<netconf-state xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring">
 <schemas>
  <schema>
   <identifier/>
  </schema>
 </schemas>
</netconf-state>"#;

/// Parse `<schema>` entries out of a `<data>` element.
///
/// Device order is kept; repeated (identifier, version) pairs and
/// non-YANG formats are dropped.
pub fn parse_inventory(data_xml: &str) -> std::result::Result<Vec<SchemaRef>, ReplyError> {
    let doc = Document::parse(data_xml)?;
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "schema")
    {
        let Some(name) = child_text(node, "identifier").filter(|s| !s.is_empty()) else {
            continue;
        };
        if let Some(format) = child_text(node, "format") {
            // Formats are identities, usually prefixed ("ncm:yang")
            let format = format.rsplit(':').next().unwrap_or_default();
            if format != "yang" {
                debug!("skipping {} in format {}", name, format);
                continue;
            }
        }
        let schema = SchemaRef {
            name,
            version: child_text(node, "version").filter(|s| !s.is_empty()),
        };
        if seen.insert(schema.clone()) {
            refs.push(schema);
        }
    }

    Ok(refs)
}

/// Read the schema list with the given subtree filter.
pub async fn fetch_inventory<S: SchemaSource>(
    source: &mut S,
    filter: &str,
) -> Result<Vec<SchemaRef>> {
    info!("Retrieving schema identifiers...");
    let data = source.get_data(&Filter::subtree(filter)).await?;
    let refs = parse_inventory(&data)?;
    debug!("device lists {} schemas", refs.len());
    Ok(refs)
}

/// Advertised modules that are missing from the inventory.
///
/// Capabilities with a revision are looked up by (module, revision),
/// those without by module name, and every deviation by name. An
/// inventory entry without a version matches any revision.
pub fn cross_check<S: AsRef<str>>(
    capabilities: &[S],
    inventory: &[SchemaRef],
) -> BTreeSet<SchemaRef> {
    let names: HashSet<&str> = inventory.iter().map(|s| s.name.as_str()).collect();
    let listed = |module: &str, revision: Option<&str>| {
        inventory.iter().any(|s| {
            s.name == module
                && match (s.version.as_deref(), revision) {
                    (Some(v), Some(r)) => v == r,
                    _ => true,
                }
        })
    };

    let mut missing = BTreeSet::new();
    for raw in capabilities {
        let Ok(cap) = Capability::parse(raw.as_ref()) else {
            continue;
        };
        if !listed(&cap.module, cap.revision.as_deref()) {
            debug!(
                "{} advertised in capabilities, not in /netconf-state/schemas",
                cap.module
            );
            missing.insert(SchemaRef {
                name: cap.module.clone(),
                version: cap.revision.clone(),
            });
        }
        for deviation in &cap.deviations {
            if !names.contains(deviation.as_str()) {
                debug!("deviation {} not in schema list", deviation);
                missing.insert(SchemaRef::named(deviation.clone()));
            }
        }
    }
    missing
}
