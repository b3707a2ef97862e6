//! Small XML helpers shared by the request builders and reply parsers.

use roxmltree::Node;

/// NETCONF base namespace.
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Escape text for use in element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// First child element with the given local name, ignoring namespaces.
pub fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// All child elements with the given local name.
pub fn children<'a, 'i>(node: Node<'a, 'i>, name: &'a str) -> impl Iterator<Item = Node<'a, 'i>> + 'a
where
    'i: 'a,
{
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Trimmed text of the named child element, if present.
pub fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).map(|n| text_content(n).trim().to_string())
}

/// Concatenated text of the node's direct text children.
///
/// CDATA sections are merged into text by the parser.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Source text of an element, exactly as received.
pub fn source_text<'i>(doc_text: &'i str, node: Node<'_, '_>) -> &'i str {
    &doc_text[node.range()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(escape("Cisco-IOS-XR-ifmgr-cfg"), "Cisco-IOS-XR-ifmgr-cfg");
    }

    #[test]
    fn test_child_lookup_ignores_namespace() {
        let doc = roxmltree::Document::parse(
            r#"<nc:schema xmlns:nc="urn:x"><nc:identifier> a </nc:identifier><version>1</version></nc:schema>"#,
        )
        .unwrap();
        let root = doc.root_element();
        assert_eq!(child_text(root, "identifier").as_deref(), Some("a"));
        assert_eq!(child_text(root, "version").as_deref(), Some("1"));
        assert!(child(root, "format").is_none());
    }

    #[test]
    fn test_text_content_merges_cdata() {
        let doc =
            roxmltree::Document::parse("<data>module a {<![CDATA[ x < y ]]>}</data>").unwrap();
        assert_eq!(text_content(doc.root_element()), "module a { x < y }");
    }
}
