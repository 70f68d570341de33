use crate::audit::issue::{FixSuggestion, Impact, Severity};
use crate::dom::{Document, NodeId};

/// Result of validating one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub message: Option<String>,
    pub severity: Option<Severity>,
    /// The value that would have been valid
    pub expected: Option<String>,
    /// The value actually found
    pub found: Option<String>,
    /// Short label shown in the annotation badge
    pub badge: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
            severity: None,
            expected: None,
            found: None,
            badge: None,
        }
    }

    pub fn invalid(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            severity: Some(severity),
            ..Self::valid()
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }
}

/// One accessibility rule: what it selects and how it judges each element
///
/// Implementations are stateless. The lifecycle (annotation, snapshots,
/// revalidation) lives in [`Checker`](super::Checker).
pub trait Rule {
    /// Stable identifier, also the prefix of every issue id
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Toolbar category; at most one checker per category is active in a session
    fn category(&self) -> &'static str;

    /// WCAG success criterion the rule checks
    fn wcag(&self) -> Option<&'static str> {
        None
    }

    /// Selector for every element the rule applies to. Must be constant.
    fn selector(&self) -> &str;

    /// Validate `element`; `elements` is the full match list in document
    /// order, for rules that depend on sequence or grouping
    fn validate_element(&self, doc: &Document, element: NodeId, elements: &[NodeId]) -> Validation;

    /// Validate every element; the result is parallel to `elements`
    fn validate_all(&self, doc: &Document, elements: &[NodeId]) -> Vec<Validation> {
        elements
            .iter()
            .map(|&el| self.validate_element(doc, el, elements))
            .collect()
    }

    /// Who is affected when the rule fails
    fn impact(&self) -> Impact;

    /// How to fix a failing element
    fn fix(&self, doc: &Document, element: NodeId, outcome: &Validation) -> FixSuggestion;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_builders() {
        let ok = Validation::valid().with_badge("H1");
        assert!(ok.is_valid);
        assert_eq!(ok.badge.as_deref(), Some("H1"));
        assert!(ok.severity.is_none());

        let bad = Validation::invalid(Severity::High, "Skipped level")
            .with_expected("h2")
            .with_found("h3");
        assert!(!bad.is_valid);
        assert_eq!(bad.severity, Some(Severity::High));
        assert_eq!(bad.expected.as_deref(), Some("h2"));
        assert_eq!(bad.found.as_deref(), Some("h3"));
    }
}
