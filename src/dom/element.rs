use crate::error::{AuditError, Result};
use indexmap::IndexMap;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

/// Tag name used for text runs in a serialized tree
pub const TEXT_TAG: &str = "#text";

/// Serialized snapshot of a DOM element, used to build a live [`Document`](super::Document)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "input"), or `#text` for a text run
    pub tag_name: String,

    /// Element attributes in source order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Text content of the element (for `#text` nodes, the text itself)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Computed style captured from the rendering engine (e.g., "cursor": "pointer")
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub computed_style: IndexMap<String, String>,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
            text_content: None,
            children: Vec::new(),
            computed_style: IndexMap::new(),
        }
    }

    /// Create a text run
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TEXT_TAG).with_text(text)
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: add one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: set a computed style property
    pub fn with_computed_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.computed_style.insert(property.into(), value.into());
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(child);
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Whether this node is a text run
    pub fn is_text(&self) -> bool {
        self.tag_name == TEXT_TAG
    }

    /// Remove script, style and noscript subtrees, which are never audited
    pub fn simplify(&mut self) {
        self.children.retain(|child| {
            !matches!(child.tag_name.as_str(), "script" | "style" | "noscript")
        });

        for child in &mut self.children {
            child.simplify();
        }
    }

    /// Parse a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AuditError::SnapshotParse(format!("Failed to parse DOM JSON: {}", e)))
    }

    /// Parse an HTML document into a snapshot rooted at `<html>`
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut root = Self::from_element_ref(document.root_element());
        root.simplify();
        root
    }

    fn from_element_ref(element: ElementRef<'_>) -> Self {
        let value = element.value();
        let mut node = Self::new(value.name());
        for (name, attr) in value.attrs() {
            node.add_attribute(name, attr);
        }

        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        node.add_child(Self::from_element_ref(child_ref));
                    }
                }
                Node::Text(text) => {
                    let text: &str = text;
                    if !text.trim().is_empty() {
                        node.add_child(Self::text(text));
                    }
                }
                _ => {}
            }
        }

        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_creation() {
        let element = ElementNode::new("button")
            .with_attribute("id", "test-id")
            .with_attribute("class", "btn primary")
            .with_text("Click me")
            .with_computed_style("cursor", "pointer");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.get_attribute("id"), Some(&"test-id".to_string()));
        assert_eq!(element.text_content, Some("Click me".to_string()));
        assert_eq!(element.computed_style.get("cursor").map(String::as_str), Some("pointer"));
        assert!(element.is_tag("BUTTON"));
        assert!(!element.is_text());
        assert!(ElementNode::text("hi").is_text());
    }

    #[test]
    fn test_simplify() {
        let mut parent = ElementNode::new("div");
        parent.add_child(ElementNode::new("p").with_text("Content"));
        parent.add_child(ElementNode::new("script").with_text("alert('test')"));
        parent.add_child(ElementNode::new("style").with_text(".test { color: red; }"));
        parent.add_child(ElementNode::new("span").with_text("More content"));

        parent.simplify();

        assert_eq!(parent.children.len(), 2);
        assert!(parent.children[0].is_tag("p"));
        assert!(parent.children[1].is_tag("span"));
    }

    #[test]
    fn test_from_json_accepts_minimal_nodes() {
        let json = r#"{"tag_name":"html","children":[{"tag_name":"body","attributes":{"lang":"en"}}]}"#;
        let root = ElementNode::from_json(json).unwrap();
        assert!(root.is_tag("html"));
        assert_eq!(root.children[0].get_attribute("lang"), Some(&"en".to_string()));
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        let err = ElementNode::from_json("{\"children\": []}").unwrap_err();
        assert!(matches!(err, AuditError::SnapshotParse(_)));
    }

    #[test]
    fn test_from_html_keeps_text_runs_and_attributes() {
        let root = ElementNode::from_html(
            r#"<html lang="en"><body><h1 id="t" class="x">Title</h1><script>var a;</script></body></html>"#,
        );
        assert!(root.is_tag("html"));
        assert_eq!(root.get_attribute("lang"), Some(&"en".to_string()));

        let body = root.children.iter().find(|c| c.is_tag("body")).unwrap();
        assert_eq!(body.children.len(), 1);
        let h1 = &body.children[0];
        assert_eq!(h1.get_attribute("id"), Some(&"t".to_string()));
        assert_eq!(h1.get_attribute("class"), Some(&"x".to_string()));
        assert!(h1.children[0].is_text());
        assert_eq!(h1.children[0].text_content.as_deref(), Some("Title"));
    }
}
