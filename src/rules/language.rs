//! Language tags - WCAG 3.1.1 Language of Page, 3.1.2 Language of Parts
//!
//! The root element must declare a language, and every `lang` value must be
//! a well-formed BCP 47 tag.

use crate::audit::{FixSuggestion, Impact, Rule, Severity, Validation};
use crate::dom::{Document, NodeId};
use regex::Regex;
use std::sync::LazyLock;

/// language (2-3 letters, up to three extlangs), script, region, variants,
/// extensions, private use; or a bare private-use / legacy `i-` tag
static BCP47: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)^(?:
            [a-z]{2,3}(?:-[a-z]{3}){0,3}
            (?:-[a-z]{4})?
            (?:-(?:[a-z]{2}|[0-9]{3}))?
            (?:-(?:[a-z0-9]{5,8}|[0-9][a-z0-9]{3}))*
            (?:-[0-9a-wy-z](?:-[a-z0-9]{2,8})+)*
            (?:-x(?:-[a-z0-9]{1,8})+)?
          | x(?:-[a-z0-9]{1,8})+
          | i-[a-z]{2,8}
        )$",
    )
    .expect("valid regex")
});

/// Whether `tag` is a well-formed BCP 47 language tag
pub fn is_valid_language_tag(tag: &str) -> bool {
    BCP47.is_match(tag.trim())
}

/// `lang` attribute checker
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageTag;

impl LanguageTag {
    pub const ID: &'static str = "language-tag";
}

impl Rule for LanguageTag {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Language tag"
    }

    fn category(&self) -> &'static str {
        "language"
    }

    fn wcag(&self) -> Option<&'static str> {
        Some("3.1.1")
    }

    fn selector(&self) -> &str {
        "html, [lang]"
    }

    fn validate_element(&self, doc: &Document, element: NodeId, _elements: &[NodeId]) -> Validation {
        let is_root = element == doc.document_element();
        let lang = doc.attribute(element, "lang").map(str::trim);

        match lang {
            None if is_root => Validation::invalid(Severity::Critical, "Page language is not set on <html>")
                .with_expected("lang=\"en\" (or the page's language)")
                .with_found("no lang attribute")
                .with_badge("lang ✗"),
            Some("") if is_root => Validation::invalid(Severity::Critical, "Page language on <html> is empty")
                .with_expected("a BCP 47 language tag")
                .with_found("lang=\"\"")
                .with_badge("lang ✗"),
            // Explicitly unknown language on a part of the page
            None | Some("") => Validation::valid(),
            Some(value) if is_valid_language_tag(value) => Validation::valid().with_badge(format!("lang={}", value)),
            Some(value) => Validation::invalid(
                if is_root { Severity::High } else { Severity::Medium },
                format!("'{}' is not a valid BCP 47 language tag", value),
            )
            .with_expected("a BCP 47 language tag such as en, en-GB or zh-Hant")
            .with_found(format!("lang=\"{}\"", value))
            .with_badge(format!("lang={} ✗", value)),
        }
    }

    fn impact(&self) -> Impact {
        Impact::screen_reader()
    }

    fn fix(&self, doc: &Document, element: NodeId, _outcome: &Validation) -> FixSuggestion {
        let tag = doc.tag_name(element).unwrap_or("html");
        FixSuggestion::new("Set lang to the BCP 47 tag of the content's language")
            .with_example(format!("<{} lang=\"en\">", tag))
            .with_reference("https://www.w3.org/International/questions/qa-choosing-language-tags")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;

    #[test]
    fn test_language_tag_grammar() {
        for tag in ["en", "en-GB", "zh-Hant", "zh-Hant-TW", "sr-Latn-RS", "es-419", "de-CH-1901", "x-klingon", "i-navajo", "en-a-bbb-x-ccc"] {
            assert!(is_valid_language_tag(tag), "{} should be valid", tag);
        }
        for tag in ["english", "e", "en_US", "en-", "-en", "123", "en--GB"] {
            assert!(!is_valid_language_tag(tag), "{} should be invalid", tag);
        }
    }

    #[test]
    fn test_missing_root_language() {
        let doc = Document::new(ElementNode::new("html"));
        let outcome = LanguageTag.validate_element(&doc, doc.document_element(), &[]);
        assert!(!outcome.is_valid);
        assert_eq!(outcome.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_empty_root_language() {
        let doc = Document::new(ElementNode::new("html").with_attribute("lang", " "));
        let outcome = LanguageTag.validate_element(&doc, doc.document_element(), &[]);
        assert_eq!(outcome.message.as_deref(), Some("Page language on <html> is empty"));
    }

    #[test]
    fn test_parts_of_the_page() {
        let doc = Document::new(ElementNode::new("html").with_attribute("lang", "en").with_children(vec![
            ElementNode::new("p").with_attribute("lang", "fr").with_text("Bonjour"),
            ElementNode::new("p").with_attribute("lang", "french").with_text("Bonjour"),
            ElementNode::new("p").with_attribute("lang", "").with_text("?"),
        ]));
        let elements = doc.query_selector_all(LanguageTag.selector()).unwrap();
        assert_eq!(elements.len(), 4);

        let outcomes = LanguageTag.validate_all(&doc, &elements);
        assert!(outcomes[0].is_valid);
        assert!(outcomes[1].is_valid);
        assert!(!outcomes[2].is_valid);
        assert_eq!(outcomes[2].severity, Some(Severity::Medium));
        assert!(outcomes[3].is_valid);
    }

    #[test]
    fn test_invalid_root_tag_is_high() {
        let doc = Document::new(ElementNode::new("html").with_attribute("lang", "en_US"));
        let outcome = LanguageTag.validate_element(&doc, doc.document_element(), &[]);
        assert_eq!(outcome.severity, Some(Severity::High));
        assert_eq!(outcome.found.as_deref(), Some("lang=\"en_US\""));
    }
}
