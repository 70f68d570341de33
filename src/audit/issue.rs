//! Structured diagnostic records
//!
//! [`AccessibilityIssue`] is the schema of record for downstream tooling.
//! Consumers should tolerate fields they do not know; unknown fields read
//! back from JSON are preserved in [`AccessibilityIssue::extensions`].

use crate::dom::{Document, NodeId};
use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How badly a failure affects users; Critical > High > Medium > Low
///
/// Levels this crate does not know (from records written by newer tools)
/// load as [`Severity::Other`] and rank below `Low`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    #[serde(untagged)]
    Other(String),
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

    fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Other(_) => 0,
        }
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (Severity::Other(a), Severity::Other(b)) => a.cmp(b),
            _ => Ordering::Equal,
        })
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Other(level) => write!(f, "{}", level.to_ascii_uppercase()),
        }
    }
}

/// Where the offending element sits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IssueLocation {
    /// XPath-like tree path, e.g. `/html[1]/body[1]/h3[1]`
    pub xpath: String,
    /// CSS selector that locates the element
    pub selector: String,
    /// Lower-case tag name
    pub element_type: String,
    /// Surrounding context (nearest landmark and parent)
    pub context: String,
}

impl IssueLocation {
    /// Describe a live element
    pub fn of(doc: &Document, node: NodeId) -> Self {
        Self {
            xpath: doc.xpath(node),
            selector: doc.css_path(node),
            element_type: doc.tag_name(node).unwrap_or("#text").to_string(),
            context: doc.context(node),
        }
    }
}

/// What was found versus what the rule expects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    pub found: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Serialized markup of the offending element
    pub snippet: String,
}

/// Who is affected and how
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Impact {
    pub user_groups: Vec<String>,
    pub assistive_technologies: Vec<String>,
    pub functional_categories: Vec<String>,
}

impl Impact {
    /// Blind users navigating with a screen reader
    pub fn screen_reader() -> Self {
        Self::new(
            &["blind", "low-vision"],
            &["screen reader"],
            &["navigation", "comprehension"],
        )
    }

    /// Users who cannot operate a pointing device
    pub fn keyboard() -> Self {
        Self::new(
            &["motor", "blind"],
            &["keyboard", "switch access", "screen reader"],
            &["operation"],
        )
    }

    /// Users who rely on visual cues to find controls
    pub fn pointer() -> Self {
        Self::new(&["cognitive", "low-vision"], &["screen magnifier"], &["operation", "perception"])
    }

    fn new(groups: &[&str], technologies: &[&str], categories: &[&str]) -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            user_groups: owned(groups),
            assistive_technologies: owned(technologies),
            functional_categories: owned(categories),
        }
    }
}

/// How to fix the failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FixSuggestion {
    pub description: String,
    /// Corrected markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub references: Vec<String>,
}

impl FixSuggestion {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            example: None,
            references: Vec::new(),
        }
    }

    /// Builder method: set corrected markup
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Builder method: add a reference link
    pub fn with_reference(mut self, url: impl Into<String>) -> Self {
        self.references.push(url.into());
        self
    }
}

/// One failed validation, independent of the live document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccessibilityIssue {
    /// Stable id derived from the rule and the element position
    pub issue_id: String,
    pub rule_id: String,
    pub rule_name: String,
    /// WCAG success criterion, e.g. "1.3.1"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub location: IssueLocation,
    pub evidence: Evidence,
    pub impact: Impact,
    pub fix: FixSuggestion,
    /// Fields this version does not know about
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl AccessibilityIssue {
    /// Create an issue; the id is derived from `rule_id` and the location's xpath
    pub fn new(rule_id: &str, severity: Severity, message: impl Into<String>, location: IssueLocation) -> Self {
        Self {
            issue_id: derive_issue_id(rule_id, &location.xpath),
            rule_id: rule_id.to_string(),
            rule_name: rule_id.to_string(),
            wcag: None,
            severity,
            message: message.into(),
            location,
            evidence: Evidence::default(),
            impact: Impact::default(),
            fix: FixSuggestion::default(),
            extensions: BTreeMap::new(),
        }
    }

    /// Builder method: human-readable rule name
    pub fn with_rule_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = name.into();
        self
    }

    /// Builder method: WCAG success criterion
    pub fn with_wcag(mut self, criterion: impl Into<String>) -> Self {
        self.wcag = Some(criterion.into());
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_fix(mut self, fix: FixSuggestion) -> Self {
        self.fix = fix;
        self
    }
}

/// `<rule_id>-<first 12 hex chars of sha256(rule_id, xpath)>`
pub fn derive_issue_id(rule_id: &str, xpath: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(xpath.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", rule_id, hex)
}

/// JSON schema of [`AccessibilityIssue`]
pub fn issue_schema() -> Result<serde_json::Value> {
    Ok(serde_json::to_value(schemars::schema_for!(AccessibilityIssue))?)
}

/// Sort most severe first, then by document position
pub fn sort_by_severity(issues: &mut [AccessibilityIssue]) {
    issues.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.location.xpath.cmp(&b.location.xpath))
    });
}

/// Issue counts by severity and by rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_rule: BTreeMap<String, usize>,
}

impl IssueSummary {
    pub fn from_issues(issues: &[AccessibilityIssue]) -> Self {
        let mut summary = Self {
            total: issues.len(),
            ..Self::default()
        };
        for issue in issues {
            *summary.by_severity.entry(issue.severity.to_string()).or_default() += 1;
            *summary.by_rule.entry(issue.rule_id.clone()).or_default() += 1;
        }
        summary
    }

    /// The most severe level present, if any
    pub fn worst(issues: &[AccessibilityIssue]) -> Option<Severity> {
        issues.iter().map(|i| &i.severity).max().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(xpath: &str) -> IssueLocation {
        IssueLocation {
            xpath: xpath.to_string(),
            selector: "h3".to_string(),
            element_type: "h3".to_string(),
            context: "in <main>".to_string(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        let mut all = vec![Severity::Low, Severity::Critical, Severity::Medium, Severity::High];
        all.sort();
        assert_eq!(all, vec![Severity::Low, Severity::Medium, Severity::High, Severity::Critical]);
    }

    #[test]
    fn test_issue_id_is_deterministic() {
        let a = derive_issue_id("heading-order", "/html[1]/body[1]/h3[1]");
        let b = derive_issue_id("heading-order", "/html[1]/body[1]/h3[1]");
        let other_rule = derive_issue_id("language-tag", "/html[1]/body[1]/h3[1]");
        let other_path = derive_issue_id("heading-order", "/html[1]/body[1]/h3[2]");

        assert_eq!(a, b);
        assert_ne!(a, other_rule);
        assert_ne!(a, other_path);
        assert!(a.starts_with("heading-order-"));
        assert_eq!(a.len(), "heading-order-".len() + 12);
    }

    #[test]
    fn test_issue_serialization_shape() {
        let issue = AccessibilityIssue::new("heading-order", Severity::High, "Skipped level", location("/h3[1]"))
            .with_wcag("1.3.1")
            .with_evidence(Evidence {
                found: "h3".into(),
                expected: Some("h2".into()),
                snippet: "<h3>x</h3>".into(),
            })
            .with_impact(Impact::screen_reader())
            .with_fix(FixSuggestion::new("Use h2").with_example("<h2>x</h2>"));

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "High");
        assert_eq!(json["evidence"]["expected"], "h2");
        assert_eq!(json["location"]["element_type"], "h3");
        assert_eq!(json["impact"]["assistive_technologies"][0], "screen reader");
        assert_eq!(json["fix"]["example"], "<h2>x</h2>");
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let issue = AccessibilityIssue::new("heading-order", Severity::Low, "m", location("/h1[1]"));
        let mut json = serde_json::to_value(&issue).unwrap();
        json["confidence"] = serde_json::json!(0.9);

        let parsed: AccessibilityIssue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.extensions.get("confidence"), Some(&serde_json::json!(0.9)));
        assert_eq!(parsed.issue_id, issue.issue_id);
    }

    #[test]
    fn test_unrecognized_severity_loads_and_ranks_lowest() {
        let issue = AccessibilityIssue::new("heading-order", Severity::Low, "m", location("/h1[1]"));
        let mut json = serde_json::to_value(&issue).unwrap();
        json["severity"] = serde_json::json!("Info");

        let parsed: AccessibilityIssue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.severity, Severity::Other("Info".to_string()));
        assert!(parsed.severity < Severity::Low);
        assert_eq!(parsed.severity.to_string(), "INFO");
        assert_eq!(serde_json::to_value(&parsed).unwrap()["severity"], "Info");

        let known: Severity = serde_json::from_str("\"Critical\"").unwrap();
        assert_eq!(known, Severity::Critical);
    }

    #[test]
    fn test_summary_and_sorting() {
        let mut issues = vec![
            AccessibilityIssue::new("a", Severity::Low, "m", location("/x[2]")),
            AccessibilityIssue::new("b", Severity::Critical, "m", location("/x[3]")),
            AccessibilityIssue::new("a", Severity::Low, "m", location("/x[1]")),
        ];
        sort_by_severity(&mut issues);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[1].location.xpath, "/x[1]");

        let summary = IssueSummary::from_issues(&issues);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_severity.get("LOW"), Some(&2));
        assert_eq!(summary.by_rule.get("b"), Some(&1));
        assert_eq!(IssueSummary::worst(&issues), Some(Severity::Critical));
        assert_eq!(IssueSummary::worst(&[]), None);
    }

    #[test]
    fn test_issue_schema_names_fields() {
        let schema = issue_schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("issue_id"));
        assert!(text.contains("Critical"));
    }
}
