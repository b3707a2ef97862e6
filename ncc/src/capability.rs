//! Parsing and classification of advertised capability URIs.
//!
//! A YANG module capability looks like
//! `http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg?module=Cisco-IOS-XR-ifmgr-cfg&revision=2017-09-07&deviations=cisco-xr-openconfig-if-ip-deviations`.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

/// Prefix shared by the NETCONF protocol capabilities.
pub const NETCONF_BASE_PREFIX: &str = "urn:ietf:params:netconf";

/// A module capability decomposed into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub namespace: String,
    pub module: String,
    pub revision: Option<String>,
    pub features: Vec<String>,
    pub deviations: BTreeSet<String>,
}

/// Why a capability string is not a module capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParseError {
    #[error("no '?' query in capability")]
    NoQuery,

    #[error("empty namespace in capability")]
    EmptyNamespace,

    #[error("no module= parameter in capability")]
    NoModule,
}

impl Capability {
    /// Parse a capability URI carrying a `module=` parameter.
    pub fn parse(uri: &str) -> Result<Self, CapabilityParseError> {
        let (namespace, query) = uri
            .trim()
            .split_once('?')
            .ok_or(CapabilityParseError::NoQuery)?;
        if namespace.is_empty() {
            return Err(CapabilityParseError::EmptyNamespace);
        }

        let mut module = None;
        let mut revision = None;
        let mut features = Vec::new();
        let mut deviations = BTreeSet::new();

        // Some servers send "&amp;" unescaped into the text
        for param in query.split('&').filter(|p| !p.is_empty() && *p != "amp;") {
            let param = param.strip_prefix("amp;").unwrap_or(param);
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            match key {
                "module" if !value.is_empty() => module = Some(value.to_string()),
                "revision" if !value.is_empty() => revision = Some(value.to_string()),
                "features" => features.extend(split_list(value)),
                "deviations" => deviations.extend(split_list(value)),
                _ => {}
            }
        }

        Ok(Self {
            namespace: namespace.to_string(),
            module: module.ok_or(CapabilityParseError::NoModule)?,
            revision,
            features,
            deviations,
        })
    }

    /// `module (namespace)`, as shown in capability listings.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.module, self.namespace)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Capability listing category, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    NetconfBase,
    Ietf,
    OpenConfig,
    Cisco,
    CiscoXrAdmin,
    Mib,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::NetconfBase,
        Category::Ietf,
        Category::OpenConfig,
        Category::Cisco,
        Category::CiscoXrAdmin,
        Category::Mib,
        Category::Other,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Category::NetconfBase => "IETF NETCONF Capabilities:",
            Category::Ietf => "IETF Models:",
            Category::OpenConfig => "OpenConfig Models:",
            Category::Cisco => "Cisco Models:",
            Category::CiscoXrAdmin => "Cisco XR Admin Plane Models:",
            Category::Mib => "MIB Models:",
            Category::Other => "Other Models:",
        }
    }
}

/// Namespace prefixes and their category. More specific prefixes come
/// first; the first match wins.
const NAMESPACE_CATEGORIES: &[(&str, Category)] = &[
    ("urn:ietf:params:xml:ns:yang:smiv2", Category::Mib),
    ("urn:ietf:params:xml:ns", Category::Ietf),
    ("http://openconfig.net/yang", Category::OpenConfig),
    ("http://cisco.com/ns/yang", Category::Cisco),
    ("http://cisco.com/calvados", Category::CiscoXrAdmin),
    ("http://cisco.com/panini/calvados", Category::CiscoXrAdmin),
    ("http://tail-f.com/ns/mibs", Category::Mib),
    ("http://tail-f.com/ns", Category::CiscoXrAdmin),
    ("http://tail-f.com/test", Category::CiscoXrAdmin),
    ("http://tail-f.com/yang", Category::CiscoXrAdmin),
    ("http://www.cisco.com/calvados", Category::CiscoXrAdmin),
    ("http://www.cisco.com/ns/calvados", Category::CiscoXrAdmin),
    ("http://www.cisco.com/panini/calvados", Category::CiscoXrAdmin),
];

/// Category for a module namespace.
pub fn namespace_category(namespace: &str) -> Category {
    NAMESPACE_CATEGORIES
        .iter()
        .find(|(prefix, _)| namespace.starts_with(prefix))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

/// Capabilities grouped by category, each group sorted.
#[derive(Debug, Default)]
pub struct Classified {
    groups: IndexMap<Category, Vec<String>>,
}

impl Classified {
    /// Entries in a category; empty if none.
    pub fn get(&self, category: Category) -> &[String] {
        self.groups.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty categories in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.groups.get(&c).map(|v| (c, v.as_slice())))
    }
}

impl fmt::Display for Classified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (category, entries) in self.iter() {
            writeln!(f, "{}", category.heading())?;
            for entry in entries {
                writeln!(f, "\t{}", entry)?;
            }
        }
        Ok(())
    }
}

/// Sort advertised capabilities into display categories.
///
/// Strings that are not module capabilities end up under "Other"
/// verbatim.
pub fn classify<S: AsRef<str>>(capabilities: &[S]) -> Classified {
    let mut groups: IndexMap<Category, Vec<String>> = IndexMap::new();
    for raw in capabilities {
        let raw = raw.as_ref();
        let (category, entry) = if raw.starts_with(NETCONF_BASE_PREFIX) {
            (Category::NetconfBase, raw.to_string())
        } else {
            match Capability::parse(raw) {
                Ok(cap) => (namespace_category(&cap.namespace), cap.display_name()),
                Err(_) => (Category::Other, raw.to_string()),
            }
        };
        groups.entry(category).or_default().push(entry);
    }
    for entries in groups.values_mut() {
        entries.sort();
    }
    Classified { groups }
}

/// Module names from capabilities that match `pattern` anywhere.
pub fn supported_modules<S: AsRef<str>>(capabilities: &[S], pattern: &Regex) -> Vec<String> {
    capabilities
        .iter()
        .filter_map(|c| Capability::parse(c.as_ref()).ok())
        .filter(|c| pattern.is_match(&c.module))
        .map(|c| c.module)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const XR_IFMGR: &str = "http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg?module=Cisco-IOS-XR-ifmgr-cfg&revision=2017-09-07";

    #[test]
    fn test_parse_module_capability() {
        let cap = Capability::parse(
            "http://openconfig.net/yang/interfaces?module=openconfig-interfaces&revision=2016-12-22&features=a,b&deviations=cisco-xr-openconfig-interfaces-deviations,x",
        )
        .unwrap();
        assert_eq!(cap.namespace, "http://openconfig.net/yang/interfaces");
        assert_eq!(cap.module, "openconfig-interfaces");
        assert_eq!(cap.revision.as_deref(), Some("2016-12-22"));
        assert_eq!(cap.features, vec!["a", "b"]);
        assert_eq!(
            cap.deviations.iter().collect::<Vec<_>>(),
            vec!["cisco-xr-openconfig-interfaces-deviations", "x"]
        );
    }

    #[test]
    fn test_parse_without_revision() {
        let cap = Capability::parse("urn:ietf:params:xml:ns:yang:ietf-yang-types?module=ietf-yang-types").unwrap();
        assert_eq!(cap.module, "ietf-yang-types");
        assert!(cap.revision.is_none());
    }

    #[test]
    fn test_parse_escaped_ampersand() {
        let cap = Capability::parse("urn:x?module=x&amp;revision=2020-01-01").unwrap();
        assert_eq!(cap.revision.as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Capability::parse("urn:ietf:params:netconf:base:1.1"),
            Err(CapabilityParseError::NoQuery)
        );
        assert_eq!(
            Capability::parse("http://x?revision=1"),
            Err(CapabilityParseError::NoModule)
        );
        assert_eq!(
            Capability::parse("?module=x"),
            Err(CapabilityParseError::EmptyNamespace)
        );
    }

    #[test]
    fn test_namespace_category_most_specific_first() {
        assert_eq!(
            namespace_category("urn:ietf:params:xml:ns:yang:smiv2:IF-MIB"),
            Category::Mib
        );
        assert_eq!(
            namespace_category("urn:ietf:params:xml:ns:yang:ietf-interfaces"),
            Category::Ietf
        );
        assert_eq!(namespace_category("http://tail-f.com/ns/mibs/SNMPv2-MIB/200210160000Z"), Category::Mib);
        assert_eq!(namespace_category("http://tail-f.com/ns/aaa/1.1"), Category::CiscoXrAdmin);
        assert_eq!(namespace_category("http://www.cisco.com/calvados/fpd"), Category::CiscoXrAdmin);
        assert_eq!(namespace_category("http://example.com/foo"), Category::Other);
    }

    #[test]
    fn test_classify() {
        let caps = vec![
            "urn:ietf:params:netconf:capability:candidate:1.0",
            "urn:ietf:params:netconf:base:1.1",
            XR_IFMGR,
            "http://cisco.com/ns/yang/Cisco-IOS-XR-aaa-cfg?module=Cisco-IOS-XR-aaa-cfg&revision=2017-01-01",
            "http://openconfig.net/yang/bgp?module=openconfig-bgp&revision=2016-06-21",
            "http://example.com/nomodule",
        ];
        let classified = classify(&caps);

        assert_eq!(
            classified.get(Category::NetconfBase),
            &[
                "urn:ietf:params:netconf:base:1.1".to_string(),
                "urn:ietf:params:netconf:capability:candidate:1.0".to_string(),
            ]
        );
        assert_eq!(
            classified.get(Category::Cisco),
            &[
                "Cisco-IOS-XR-aaa-cfg (http://cisco.com/ns/yang/Cisco-IOS-XR-aaa-cfg)".to_string(),
                "Cisco-IOS-XR-ifmgr-cfg (http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg)".to_string(),
            ]
        );
        assert_eq!(
            classified.get(Category::Other),
            &["http://example.com/nomodule".to_string()]
        );
        assert!(classified.get(Category::Mib).is_empty());

        let categories: Vec<_> = classified.iter().map(|(c, _)| c).collect();
        assert_eq!(
            categories,
            vec![
                Category::NetconfBase,
                Category::OpenConfig,
                Category::Cisco,
                Category::Other
            ]
        );
    }

    #[test]
    fn test_display_skips_empty_categories() {
        let classified = classify(&["http://openconfig.net/yang/bgp?module=openconfig-bgp"]);
        assert_eq!(
            classified.to_string(),
            "OpenConfig Models:\n\topenconfig-bgp (http://openconfig.net/yang/bgp)\n"
        );
    }

    #[test]
    fn test_supported_modules_unanchored() {
        let caps = [
            XR_IFMGR,
            "http://openconfig.net/yang/bgp?module=openconfig-bgp&revision=2016-06-21",
            "urn:ietf:params:netconf:base:1.1",
        ];
        let re = Regex::new("ifmgr").unwrap();
        assert_eq!(supported_modules(&caps, &re), vec!["Cisco-IOS-XR-ifmgr-cfg"]);
    }
}
