//! Keyboard reachability - WCAG 2.1.1 Keyboard, 2.4.3 Focus Order

use crate::audit::{FixSuggestion, Impact, Rule, Severity, Validation};
use crate::dom::{Document, NodeId};
use crate::rules::cursor::is_disabled;

const CONTROL_ROLES: [&str; 6] = ["button", "link", "checkbox", "menuitem", "tab", "switch"];

/// Checks that controls can be reached with the Tab key
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardReachability;

impl KeyboardReachability {
    pub const ID: &'static str = "keyboard-reachability";
}

/// Elements the browser puts in the tab order without a `tabindex`
pub fn is_natively_focusable(doc: &Document, element: NodeId) -> bool {
    match doc.tag_name(element) {
        Some("a") | Some("area") => doc.has_attribute(element, "href"),
        Some("button") | Some("select") | Some("textarea") | Some("summary") | Some("iframe") => true,
        Some("input") => !doc
            .attribute(element, "type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden")),
        _ => false,
    }
}

fn tabindex(doc: &Document, element: NodeId) -> Option<i32> {
    doc.attribute(element, "tabindex").and_then(|v| v.trim().parse().ok())
}

fn acts_as_control(doc: &Document, element: NodeId) -> bool {
    doc.has_attribute(element, "onclick")
        || doc
            .attribute(element, "role")
            .is_some_and(|r| CONTROL_ROLES.contains(&r.trim().to_ascii_lowercase().as_str()))
}

impl Rule for KeyboardReachability {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Keyboard reachability"
    }

    fn category(&self) -> &'static str {
        "interaction"
    }

    fn wcag(&self) -> Option<&'static str> {
        Some("2.1.1")
    }

    fn selector(&self) -> &str {
        "a[href], area[href], button, input, select, textarea, summary, [tabindex], [onclick], \
         [role=button], [role=link], [role=checkbox], [role=menuitem], [role=tab], [role=switch]"
    }

    fn validate_element(&self, doc: &Document, element: NodeId, _elements: &[NodeId]) -> Validation {
        if is_disabled(doc, element) {
            return Validation::valid();
        }

        let tag = doc.tag_name(element).unwrap_or_default();
        let index = tabindex(doc, element);
        let native = is_natively_focusable(doc, element);

        if native && index.is_some_and(|i| i < 0) {
            return Validation::invalid(
                Severity::High,
                format!("Focusable <{}> is removed from the tab order by a negative tabindex", tag),
            )
            .with_expected("no tabindex, or tabindex=\"0\"")
            .with_found(format!("tabindex=\"{}\"", index.unwrap_or_default()))
            .with_badge("tab ✗");
        }

        if !native && acts_as_control(doc, element) && !index.is_some_and(|i| i >= 0) {
            let found = match index {
                Some(i) => format!("tabindex=\"{}\"", i),
                None => "no tabindex".to_string(),
            };
            return Validation::invalid(
                Severity::High,
                format!("<{}> acts as a control but cannot be reached with the keyboard", tag),
            )
            .with_expected("tabindex=\"0\" and a keyboard handler, or a native <button>")
            .with_found(found)
            .with_badge("tab ✗");
        }

        if let Some(i) = index.filter(|&i| i > 0) {
            return Validation::invalid(
                Severity::Medium,
                format!("tabindex=\"{}\" on <{}> overrides the natural focus order", i, tag),
            )
            .with_expected("tabindex=\"0\"")
            .with_found(format!("tabindex=\"{}\"", i))
            .with_badge("tab ✗");
        }

        Validation::valid()
    }

    fn impact(&self) -> Impact {
        Impact::keyboard()
    }

    fn fix(&self, doc: &Document, element: NodeId, _outcome: &Validation) -> FixSuggestion {
        let fix = if is_natively_focusable(doc, element) {
            FixSuggestion::new("Remove the negative or positive tabindex and let the document order decide focus")
        } else {
            FixSuggestion::new("Use a native control, or make the element focusable and operable from the keyboard")
                .with_example(format!("<button type=\"button\">{}</button>", doc.visible_text(element)))
        };
        fix.with_reference("https://www.w3.org/WAI/WCAG22/Understanding/keyboard.html")
    }
}
