//! Heading sequence - WCAG 1.3.1 Info and Relationships
//!
//! The first heading must be level 1. Every later heading may go at most one
//! level deeper than the last valid heading, and may always step back up.

use crate::audit::{FixSuggestion, Impact, Rule, Severity, Validation};
use crate::dom::{Document, NodeId};

/// Heading level order checker
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingOrder;

impl HeadingOrder {
    pub const ID: &'static str = "heading-order";
}

/// Level of a heading-like element: native `h1`-`h6`, or `role="heading"`
/// with `aria-level` (default 2). An explicit `aria-level` wins.
pub fn heading_level(doc: &Document, element: NodeId) -> Option<u8> {
    let aria_level = doc
        .attribute(element, "aria-level")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l));

    let native = doc
        .tag_name(element)
        .and_then(|tag| tag.strip_prefix('h'))
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|l| (1..=6).contains(l));

    let is_role_heading = doc
        .attribute(element, "role")
        .is_some_and(|r| r.trim().eq_ignore_ascii_case("heading"));

    match (aria_level, native, is_role_heading) {
        (Some(level), _, true) => Some(level),
        (_, Some(level), _) => Some(level),
        (None, None, true) => Some(2),
        _ => None,
    }
}

impl Rule for HeadingOrder {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Heading order"
    }

    fn category(&self) -> &'static str {
        "structure"
    }

    fn wcag(&self) -> Option<&'static str> {
        Some("1.3.1")
    }

    fn selector(&self) -> &str {
        "h1, h2, h3, h4, h5, h6, [role=heading]"
    }

    fn validate_element(&self, doc: &Document, element: NodeId, elements: &[NodeId]) -> Validation {
        // Only the headings up to and including this one matter
        elements
            .iter()
            .position(|&el| el == element)
            .and_then(|i| self.validate_all(doc, &elements[..=i]).pop())
            .unwrap_or_else(Validation::valid)
    }

    fn validate_all(&self, doc: &Document, elements: &[NodeId]) -> Vec<Validation> {
        let mut last_valid: Option<u8> = None;

        elements
            .iter()
            .map(|&el| {
                let level = heading_level(doc, el).unwrap_or(2);
                let outcome = check(level, last_valid, doc.visible_text(el).is_empty());

                // The first heading seeds the sequence even when it is wrong,
                // so one bad start is reported once
                if last_valid.is_none() || outcome.is_valid {
                    last_valid = Some(level);
                }
                outcome
            })
            .collect()
    }

    fn impact(&self) -> Impact {
        Impact::screen_reader()
    }

    fn fix(&self, doc: &Document, element: NodeId, outcome: &Validation) -> FixSuggestion {
        let text = doc.visible_text(element);
        let fix = match outcome.expected.as_deref() {
            Some(expected) if expected.starts_with('h') => {
                FixSuggestion::new(format!("Change this heading to <{}> or add the missing levels before it", expected))
                    .with_example(format!("<{0}>{1}</{0}>", expected, text))
            }
            _ => FixSuggestion::new("Give the heading descriptive text, or remove it if it is decorative"),
        };
        fix.with_reference("https://www.w3.org/WAI/tutorials/page-structure/headings/")
    }
}

fn check(level: u8, last_valid: Option<u8>, empty: bool) -> Validation {
    let found = format!("h{}", level);

    if empty {
        return Validation::invalid(Severity::High, format!("Heading <{}> has no text content", found))
            .with_expected("descriptive heading text")
            .with_found("empty heading")
            .with_badge(format!("H{} ✗", level));
    }

    match last_valid {
        None if level != 1 => Validation::invalid(
            Severity::Critical,
            format!("First heading is <{}> instead of <h1>", found),
        )
        .with_expected("h1")
        .with_found(found)
        .with_badge(format!("H{} ✗", level)),
        Some(last) if level > last + 1 => Validation::invalid(
            Severity::High,
            format!("Heading level skipped: <{}> follows <h{}>", found, last),
        )
        .with_expected(format!("h{}", last + 1))
        .with_found(found)
        .with_badge(format!("H{} ✗", level)),
        _ => Validation::valid().with_badge(format!("H{}", level)),
    }
}
