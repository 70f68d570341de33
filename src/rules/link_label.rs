//! Link label consistency - WCAG 3.2.4 Consistent Identification
//!
//! Links are grouped by normalized destination. A group passes only when
//! every link in it has the same accessible label.

use crate::audit::{FixSuggestion, Impact, Rule, Severity, Validation};
use crate::dom::{collapse_whitespace, Document, NodeId};
use indexmap::IndexMap;
use url::Url;

/// Same-destination link label checker
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkLabelConsistency;

impl LinkLabelConsistency {
    pub const ID: &'static str = "link-label-consistency";
}

/// Destination with the fragment and trailing slash removed
///
/// Relative hrefs resolve against the document's base URL when it has one.
/// Returns `None` for links that do not navigate anywhere comparable
/// (empty, fragment-only, `javascript:`).
pub fn normalize_destination(doc: &Document, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let parsed = match doc.base_url() {
        Some(base) => base.join(href).ok(),
        None => Url::parse(href).ok(),
    };

    let normalized = match parsed {
        Some(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        None => href.split('#').next().unwrap_or_default().to_string(),
    };

    let normalized = normalized.trim_end_matches('/');
    // "/" alone stays meaningful
    Some(if normalized.is_empty() { "/".to_string() } else { normalized.to_string() })
}

/// Accessible label: `aria-label`, else the text of `aria-labelledby`
/// targets, else the visible text, else image alternatives, else `title`
pub fn accessible_label(doc: &Document, element: NodeId) -> String {
    if let Some(label) = doc.attribute(element, "aria-label").map(collapse_whitespace).filter(|l| !l.is_empty()) {
        return label;
    }

    if let Some(ids) = doc.attribute(element, "aria-labelledby") {
        let referenced: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| find_by_id(doc, id))
            .map(|node| doc.visible_text(node))
            .filter(|text| !text.is_empty())
            .collect();
        if !referenced.is_empty() {
            return referenced.join(" ");
        }
    }

    let text = doc.visible_text(element);
    if !text.is_empty() {
        return text;
    }

    let alternatives: Vec<String> = doc
        .descendants(element)
        .into_iter()
        .filter(|&n| doc.tag_name(n) == Some("img") && !doc.is_annotation(n))
        .filter_map(|n| doc.attribute(n, "alt").map(collapse_whitespace))
        .filter(|alt| !alt.is_empty())
        .collect();
    if !alternatives.is_empty() {
        return alternatives.join(" ");
    }

    doc.attribute(element, "title").map(collapse_whitespace).unwrap_or_default()
}

fn find_by_id(doc: &Document, id: &str) -> Option<NodeId> {
    doc.descendants(doc.document_element())
        .into_iter()
        .find(|&n| doc.attribute(n, "id") == Some(id))
}

impl Rule for LinkLabelConsistency {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Link label consistency"
    }

    fn category(&self) -> &'static str {
        "links"
    }

    fn wcag(&self) -> Option<&'static str> {
        Some("3.2.4")
    }

    fn selector(&self) -> &str {
        "a[href], area[href]"
    }

    fn validate_element(&self, doc: &Document, element: NodeId, elements: &[NodeId]) -> Validation {
        elements
            .iter()
            .position(|&el| el == element)
            .and_then(|i| self.validate_all(doc, elements).into_iter().nth(i))
            .unwrap_or_else(Validation::valid)
    }

    fn validate_all(&self, doc: &Document, elements: &[NodeId]) -> Vec<Validation> {
        let labels: Vec<String> = elements.iter().map(|&el| accessible_label(doc, el)).collect();

        let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (i, &el) in elements.iter().enumerate() {
            if let Some(destination) = doc
                .attribute(el, "href")
                .and_then(|href| normalize_destination(doc, href))
            {
                groups.entry(destination).or_default().push(i);
            }
        }

        let mut outcomes = vec![Validation::valid(); elements.len()];
        for (destination, members) in &groups {
            let mut distinct: Vec<&str> = Vec::new();
            for &i in members {
                if !distinct.contains(&labels[i].as_str()) {
                    distinct.push(&labels[i]);
                }
            }
            if distinct.len() < 2 {
                continue;
            }

            let quoted = distinct
                .iter()
                .map(|l| format!("\"{}\"", l))
                .collect::<Vec<_>>()
                .join(", ");
            for &i in members {
                outcomes[i] = Validation::invalid(
                    Severity::Medium,
                    format!("Links to {} have different labels: {}", destination, quoted),
                )
                .with_expected("the same label for every link to this destination")
                .with_found(format!("\"{}\"", labels[i]))
                .with_badge("label ≠");
            }
        }
        outcomes
    }

    fn impact(&self) -> Impact {
        Impact::screen_reader()
    }

    fn fix(&self, doc: &Document, element: NodeId, _outcome: &Validation) -> FixSuggestion {
        let href = doc.attribute(element, "href").unwrap_or_default();
        FixSuggestion::new("Use one accessible label for every link that leads to the same destination")
            .with_example(format!("<a href=\"{}\">{}</a>", href, accessible_label(doc, element)))
            .with_reference("https://www.w3.org/WAI/WCAG22/Understanding/consistent-identification.html")
    }
}
