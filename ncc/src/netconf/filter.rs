//! Filters, datastores and the other small enums RPCs are built from.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::xml::{BASE_NS, escape};

/// A configuration datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Candidate,
    Startup,
}

impl Datastore {
    pub fn as_str(self) -> &'static str {
        match self {
            Datastore::Running => "running",
            Datastore::Candidate => "candidate",
            Datastore::Startup => "startup",
        }
    }

    pub(crate) fn to_xml(self) -> String {
        format!("<{}/>", self.as_str())
    }
}

impl fmt::Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datastore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Datastore::Running),
            "candidate" => Ok(Datastore::Candidate),
            "startup" => Ok(Datastore::Startup),
            other => Err(format!("unknown datastore '{other}'")),
        }
    }
}

/// `<default-operation>` for `<edit-config>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultOperation {
    #[default]
    Merge,
    Replace,
    None,
}

impl DefaultOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            DefaultOperation::Merge => "merge",
            DefaultOperation::Replace => "replace",
            DefaultOperation::None => "none",
        }
    }
}

impl FromStr for DefaultOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(DefaultOperation::Merge),
            "replace" => Ok(DefaultOperation::Replace),
            "none" => Ok(DefaultOperation::None),
            other => Err(format!("unknown default operation '{other}'")),
        }
    }
}

/// RFC 6243 with-defaults retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaults {
    ReportAll,
    ReportAllTagged,
    Trim,
    Explicit,
}

impl WithDefaults {
    pub fn as_str(self) -> &'static str {
        match self {
            WithDefaults::ReportAll => "report-all",
            WithDefaults::ReportAllTagged => "report-all-tagged",
            WithDefaults::Trim => "trim",
            WithDefaults::Explicit => "explicit",
        }
    }

    pub(crate) fn to_xml(self) -> String {
        format!(
            r#"<with-defaults xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults">{}</with-defaults>"#,
            self.as_str()
        )
    }
}

impl FromStr for WithDefaults {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report-all" => Ok(WithDefaults::ReportAll),
            "report-all-tagged" => Ok(WithDefaults::ReportAllTagged),
            "trim" => Ok(WithDefaults::Trim),
            "explicit" => Ok(WithDefaults::Explicit),
            other => Err(format!("unknown with-defaults mode '{other}'")),
        }
    }
}

/// Prefix to namespace bindings used by XPath filters.
///
/// Always contains the `nc` binding for the NETCONF base namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMap {
    bindings: IndexMap<String, String>,
}

impl Default for NamespaceMap {
    fn default() -> Self {
        let mut bindings = IndexMap::new();
        bindings.insert("nc".to_string(), BASE_NS.to_string());
        Self { bindings }
    }
}

/// A prefix bound twice to different namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceClash {
    pub prefix: String,
    pub existing: String,
    pub redefinition: String,
}

impl fmt::Display for NamespaceClash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Clashing namespace defined:")?;
        writeln!(f, "  xmlns:{}=\"{}\" (existing)", self.prefix, self.existing)?;
        write!(f, "  xmlns:{}=\"{}\" (redefinition)", self.prefix, self.redefinition)
    }
}

impl NamespaceMap {
    /// Bind a prefix, refusing to silently change an existing binding.
    pub fn bind(
        &mut self,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<(), NamespaceClash> {
        let prefix = prefix.into();
        let namespace = namespace.into();
        match self.bindings.get(&prefix) {
            Some(existing) if *existing != namespace => Err(NamespaceClash {
                prefix,
                existing: existing.clone(),
                redefinition: namespace,
            }),
            _ => {
                self.bindings.insert(prefix, namespace);
                Ok(())
            }
        }
    }

    /// Merge bindings, overwriting existing ones.
    pub fn merge<I, K, V>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (prefix, namespace) in bindings {
            self.bindings.insert(prefix.into(), namespace.into());
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }
}

static XPATH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w\-]+):([\w\-]+)").expect("static regex"));

/// Selection filter for `<get>` and `<get-config>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Subtree filter; the content goes inside `<filter type="subtree">`.
    Subtree(String),

    /// XPath filter with the namespace declarations it needs.
    XPath {
        select: String,
        namespaces: Vec<(String, String)>,
    },
}

impl Filter {
    pub fn subtree(content: impl Into<String>) -> Self {
        Filter::Subtree(content.into())
    }

    /// Build an XPath filter, declaring every prefix used in `select`.
    ///
    /// Fails with the first prefix that has no binding in `namespaces`.
    pub fn xpath(select: impl Into<String>, namespaces: &NamespaceMap) -> Result<Self, String> {
        let select = select.into();
        let mut used: IndexMap<String, String> = IndexMap::new();
        used.insert("nc".to_string(), BASE_NS.to_string());
        for caps in XPATH_PREFIX.captures_iter(&select) {
            let prefix = &caps[1];
            match namespaces.get(prefix) {
                Some(ns) => {
                    used.insert(prefix.to_string(), ns.to_string());
                }
                None => return Err(prefix.to_string()),
            }
        }
        Ok(Filter::XPath {
            select,
            namespaces: used.into_iter().collect(),
        })
    }

    pub(crate) fn to_xml(&self) -> String {
        match self {
            Filter::Subtree(content) => format!(r#"<filter type="subtree">{content}</filter>"#),
            Filter::XPath { select, namespaces } => {
                let decls: Vec<String> = namespaces
                    .iter()
                    .map(|(p, ns)| format!(r#"xmlns:{}="{}""#, p, escape(ns)))
                    .collect();
                format!(
                    r#"<filter type="xpath" {} select="{}"/>"#,
                    decls.join(" "),
                    escape(select)
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtree_filter_xml() {
        let filter = Filter::subtree("<interfaces/>");
        assert_eq!(filter.to_xml(), r#"<filter type="subtree"><interfaces/></filter>"#);
    }

    #[test]
    fn test_xpath_declares_used_prefixes() {
        let mut ns = NamespaceMap::default();
        ns.bind("if", "urn:ietf:params:xml:ns:yang:ietf-interfaces")
            .unwrap();
        ns.bind("oc", "http://openconfig.net/yang/interfaces").unwrap();

        let filter = Filter::xpath("/if:interfaces/if:interface[if:name='Gi0']", &ns).unwrap();
        let xml = filter.to_xml();
        assert!(xml.contains(r#"xmlns:if="urn:ietf:params:xml:ns:yang:ietf-interfaces""#));
        assert!(xml.contains(r#"xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0""#));
        assert!(!xml.contains("xmlns:oc"));
        assert!(xml.contains("select=\"/if:interfaces/if:interface[if:name=&apos;Gi0&apos;]\""));
    }

    #[test]
    fn test_xpath_unbound_prefix() {
        let ns = NamespaceMap::default();
        assert_eq!(
            Filter::xpath("/bgp:bgp/bgp:global", &ns),
            Err("bgp".to_string())
        );
    }

    #[test]
    fn test_namespace_clash() {
        let mut ns = NamespaceMap::default();
        ns.bind("if", "urn:a").unwrap();
        assert!(ns.bind("if", "urn:a").is_ok());
        let clash = ns.bind("if", "urn:b").unwrap_err();
        assert_eq!(clash.existing, "urn:a");
        assert_eq!(clash.redefinition, "urn:b");
    }

    #[test]
    fn test_merge_overwrites() {
        let mut ns = NamespaceMap::default();
        ns.merge([("nc", "urn:other"), ("x", "urn:x")]);
        assert_eq!(ns.get("nc"), Some("urn:other"));
        assert_eq!(ns.get("x"), Some("urn:x"));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("candidate".parse::<Datastore>(), Ok(Datastore::Candidate));
        assert_eq!("replace".parse::<DefaultOperation>(), Ok(DefaultOperation::Replace));
        assert_eq!(
            "report-all-tagged".parse::<WithDefaults>(),
            Ok(WithDefaults::ReportAllTagged)
        );
        assert!("everything".parse::<WithDefaults>().is_err());
    }
}
