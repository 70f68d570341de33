//! Pointer affordance for interactive elements

use crate::audit::{FixSuggestion, Impact, Rule, Severity, Validation};
use crate::dom::{Document, NodeId};

/// Checks that controls show a pointer cursor
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveCursor;

impl InteractiveCursor {
    pub const ID: &'static str = "interactive-cursor";
}

/// Whether the control is disabled natively or through ARIA
pub fn is_disabled(doc: &Document, element: NodeId) -> bool {
    doc.has_attribute(element, "disabled")
        || doc
            .attribute(element, "aria-disabled")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

impl Rule for InteractiveCursor {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Interactive cursor"
    }

    fn category(&self) -> &'static str {
        "interaction"
    }

    fn selector(&self) -> &str {
        "a[href], button, summary, select, \
         input[type=submit], input[type=button], input[type=reset], input[type=checkbox], input[type=radio], \
         [role=button], [role=link], [role=checkbox], [role=menuitem], [role=tab], [role=switch]"
    }

    fn validate_element(&self, doc: &Document, element: NodeId, _elements: &[NodeId]) -> Validation {
        if is_disabled(doc, element) {
            return Validation::valid();
        }

        let cursor = doc
            .computed_style(element, "cursor")
            .unwrap_or_else(|| "auto".to_string());
        if cursor == "pointer" {
            return Validation::valid();
        }

        let tag = doc.tag_name(element).unwrap_or_default();
        Validation::invalid(
            Severity::Low,
            format!("Interactive <{}> shows cursor '{}' instead of 'pointer'", tag, cursor),
        )
        .with_expected("pointer")
        .with_found(cursor)
        .with_badge("cursor ✗")
    }

    fn impact(&self) -> Impact {
        Impact::pointer()
    }

    fn fix(&self, doc: &Document, element: NodeId, _outcome: &Validation) -> FixSuggestion {
        let tag = doc.tag_name(element).unwrap_or("button");
        FixSuggestion::new("Give the control a pointer cursor so it reads as clickable")
            .with_example(format!("{} {{ cursor: pointer; }}", tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;

    fn validate(doc: &Document) -> Vec<Validation> {
        let elements = doc.query_selector_all(InteractiveCursor.selector()).unwrap();
        InteractiveCursor.validate_all(doc, &elements)
    }

    #[test]
    fn test_links_have_pointer_by_default() {
        let doc = Document::from_html(r#"<a href="/x">Go</a>"#);
        assert!(validate(&doc)[0].is_valid);
    }

    #[test]
    fn test_button_without_pointer_is_flagged() {
        let doc = Document::from_html("<button>Save</button>");
        let result = validate(&doc);
        assert!(!result[0].is_valid);
        assert_eq!(result[0].severity, Some(Severity::Low));
        assert_eq!(result[0].found.as_deref(), Some("auto"));
    }

    #[test]
    fn test_inline_and_captured_styles_count() {
        let doc = Document::from_html(r#"<button style="cursor: pointer">Save</button>"#);
        assert!(validate(&doc)[0].is_valid);

        let captured = ElementNode::new("html").with_children(vec![ElementNode::new("div")
            .with_attribute("role", "button")
            .with_computed_style("cursor", "pointer")]);
        assert!(validate(&Document::new(captured))[0].is_valid);
    }

    #[test]
    fn test_disabled_controls_are_exempt() {
        let doc = Document::from_html(r#"<button disabled>Save</button><div role="button" aria-disabled="true">X</div>"#);
        assert!(validate(&doc).iter().all(|o| o.is_valid));
    }

    #[test]
    fn test_non_interactive_inputs_are_not_selected() {
        let doc = Document::from_html(r#"<input type="text"><a>No href</a>"#);
        assert!(validate(&doc).is_empty());
    }
}
