use crate::dom::document::{Document, NodeId};
use crate::error::{AuditError, Result};
use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser as SelectorParser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    self, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode, NeedsSelectorFlags,
    QuirksMode,
};
use selectors::parser::{ParseRelative, SelectorImpl};
use selectors::{Element, NthIndexCache, OpaqueElement, SelectorList};

const XHTML: &str = "http://www.w3.org/1999/xhtml";

/// A parsed CSS selector list
///
/// Parsing goes through scraper's selector grammar (structural
/// pseudo-classes, `:is`, `:where`, `:has`, `:not`, every combinator);
/// matching runs against the live [`Document`]. User-action pseudo-classes
/// such as `:hover` are rejected, since a snapshot has no interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    list: SelectorList<Simple>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        let list = SelectorList::parse(&SelectorParser, &mut parser, ParseRelative::No).map_err(|e| {
            AuditError::InvalidSelector {
                selector: source.to_string(),
                reason: SelectorErrorKind::from(e).to_string(),
            }
        })?;

        Ok(Self {
            source: source.to_string(),
            list,
        })
    }

    /// The selector text as given (trimmed)
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether the element matches any selector in the list
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if !doc.is_element(node) {
            return false;
        }

        let element = LiveElement { doc, node };
        let mut cache = NthIndexCache::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        self.list
            .0
            .iter()
            .any(|selector| matching::matches_selector(selector, 0, None, &element, &mut context))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// An element of a [`Document`] as seen by the selector matcher
#[derive(Clone, Copy)]
struct LiveElement<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> LiveElement<'a> {
    fn wrap(&self, node: NodeId) -> Self {
        Self { doc: self.doc, node }
    }

    fn sibling_element(&self, forward: bool) -> Option<Self> {
        let parent = self.doc.parent(self.node)?;
        let siblings = self.doc.children(parent);
        let position = siblings.iter().position(|&c| c == self.node)?;
        let found = if forward {
            siblings[position + 1..].iter().find(|&&c| self.doc.is_element(c))
        } else {
            siblings[..position].iter().rev().find(|&&c| self.doc.is_element(c))
        };
        found.map(|&c| self.wrap(c))
    }
}

impl std::fmt::Debug for LiveElement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> {}", self.doc.tag_name(self.node).unwrap_or("#text"), self.node)
    }
}

impl<'a> Element for LiveElement<'a> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        self.doc.opaque(self.node)
    }

    fn parent_element(&self) -> Option<Self> {
        self.doc
            .parent(self.node)
            .filter(|&p| self.doc.is_element(p))
            .map(|p| self.wrap(p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(false)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(true)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc
            .children(self.node)
            .iter()
            .find(|&&c| self.doc.is_element(c))
            .map(|&c| self.wrap(c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.doc.tag_name(self.node) == Some(&*name.0)
    }

    fn has_namespace(&self, ns: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
        ns.is_empty() || &**ns == XHTML
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.doc.tag_name(self.node) == other.doc.tag_name(other.node)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        // Attributes carry no namespace
        if matches!(*ns, NamespaceConstraint::Specific(url) if !url.is_empty()) {
            return false;
        }
        self.doc
            .attribute(self.node, &local_name.0)
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(&self, _pc: &NonTSPseudoClass, _context: &mut MatchingContext<'_, Simple>) -> bool {
        false
    }

    fn match_pseudo_element(&self, _pe: &PseudoElement, _context: &mut MatchingContext<'_, Simple>) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.doc.tag_name(self.node), Some("a" | "area" | "link")) && self.doc.has_attribute(self.node, "href")
    }

    fn is_html_slot_element(&self) -> bool {
        self.doc.tag_name(self.node) == Some("slot")
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.doc
            .attribute(self.node, "id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.doc.attribute(self.node, "class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.doc
            .children(self.node)
            .iter()
            .all(|&c| !self.doc.is_element(c) && self.doc.text_content(c).is_empty())
    }

    fn is_root(&self) -> bool {
        self.node == self.doc.document_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;

    fn sample() -> Document {
        let root = ElementNode::new("html").with_children(vec![ElementNode::new("body").with_children(vec![
            ElementNode::new("nav").with_attribute("id", "top").with_children(vec![
                ElementNode::new("a")
                    .with_attribute("href", "/home")
                    .with_attribute("class", "nav-link active")
                    .with_text("Home"),
                ElementNode::new("span").with_children(vec![ElementNode::new("a").with_text("Anchor")]),
            ]),
            ElementNode::new("h2").with_text("Section"),
            ElementNode::new("div")
                .with_attribute("role", "heading")
                .with_attribute("aria-level", "3")
                .with_text("Pseudo"),
        ])]);
        Document::new(root)
    }

    fn tags(doc: &Document, selector: &str) -> Vec<String> {
        doc.query_selector_all(selector)
            .unwrap()
            .into_iter()
            .map(|id| doc.tag_name(id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_type_and_list_selectors_keep_document_order() {
        let doc = sample();
        assert_eq!(tags(&doc, "h2, a"), vec!["a", "a", "h2"]);
        assert_eq!(tags(&doc, "h1, h2, h3, h4, h5, h6, [role=\"heading\"]"), vec!["h2", "div"]);
    }

    #[test]
    fn test_attribute_operators() {
        let doc = sample();
        assert_eq!(tags(&doc, "a[href]").len(), 1);
        assert_eq!(tags(&doc, "a[href^='/ho']").len(), 1);
        assert_eq!(tags(&doc, "a[href$=me]").len(), 1);
        assert_eq!(tags(&doc, "a[href*=\"om\"]").len(), 1);
        assert_eq!(tags(&doc, "[class~=active]").len(), 1);
        assert!(tags(&doc, "a[href='/other']").is_empty());
    }

    #[test]
    fn test_id_class_and_negation() {
        let doc = sample();
        assert_eq!(tags(&doc, "#top"), vec!["nav"]);
        assert_eq!(tags(&doc, "a.nav-link.active").len(), 1);
        assert_eq!(tags(&doc, "a:not([href])").len(), 1);
    }

    #[test]
    fn test_combinators() {
        let doc = sample();
        assert_eq!(tags(&doc, "nav a").len(), 2);
        assert_eq!(tags(&doc, "nav > a").len(), 1);
        assert_eq!(tags(&doc, "body > nav > span > a").len(), 1);
        assert!(tags(&doc, "h2 a").is_empty());
    }

    #[test]
    fn test_sibling_combinators_and_structural_pseudo_classes() {
        let doc = sample();
        assert_eq!(tags(&doc, "h2 + div"), vec!["div"]);
        assert_eq!(tags(&doc, "nav ~ div"), vec!["div"]);
        assert!(tags(&doc, "div + h2").is_empty());
        assert_eq!(tags(&doc, "nav > a:first-child"), vec!["a"]);
        assert_eq!(tags(&doc, "body > :nth-child(2)"), vec!["h2"]);
        assert_eq!(tags(&doc, "body > :last-child"), vec!["div"]);
        assert_eq!(tags(&doc, ":root"), vec!["html"]);
    }

    #[test]
    fn test_functional_pseudo_classes() {
        let doc = sample();
        assert_eq!(tags(&doc, ":is(h2, nav)"), vec!["nav", "h2"]);
        assert_eq!(tags(&doc, "span:has(a)"), vec!["span"]);
        assert_eq!(tags(&doc, "a:not(.active)"), vec!["a"]);
        assert_eq!(tags(&doc, "a:where([href])").len(), 1);
    }

    #[test]
    fn test_text_nodes_never_match() {
        let doc = sample();
        let h2 = doc.query_selector_all("h2").unwrap()[0];
        let text = doc.children(h2)[0];
        assert!(!Selector::parse("*").unwrap().matches(&doc, text));
        assert!(Selector::parse("*").unwrap().matches(&doc, h2));
    }

    #[test]
    fn test_malformed_selectors_are_errors() {
        for bad in ["", "h1[", "h1,", "a[href=", "::before", ":hover", "h1 >", "a[href!=x]"] {
            let err = Selector::parse(bad);
            assert!(
                matches!(err, Err(AuditError::InvalidSelector { .. })),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trips_source() {
        let selector = Selector::parse("  a[href] , button ").unwrap();
        assert_eq!(selector.to_string(), "a[href] , button");
    }
}
