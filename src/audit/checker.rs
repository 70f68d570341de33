use crate::audit::issue::{AccessibilityIssue, Evidence, IssueLocation, Severity};
use crate::audit::revalidation::RevalidationLoop;
use crate::audit::rule::{Rule, Validation};
use crate::audit::snapshot::SnapshotStore;
use crate::config::{AuditConfig, Palette};
use crate::dom::{is_void, Document, NodeId, Selector, ANNOTATION_MARKER};
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle request accepted by [`Checker::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Apply,
    Cleanup,
}

impl FromStr for RunMode {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apply" => Ok(RunMode::Apply),
            "cleanup" => Ok(RunMode::Cleanup),
            other => Err(AuditError::InvalidOperation(format!("Unknown run mode '{}'", other))),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Apply => write!(f, "apply"),
            RunMode::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Result of a lifecycle call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,

    /// Human-readable issue messages (successful apply only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

impl RunOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            issues: None,
        }
    }

    pub fn success_with(issues: Vec<String>) -> Self {
        Self {
            success: true,
            issues: Some(issues),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            issues: None,
        }
    }
}

/// A rule bound to its lifecycle state
///
/// Holds the active flag, the snapshot store, the nodes it inserted and, while
/// active, its revalidation loop. The loop exists exactly while the checker
/// is active.
pub struct Checker<R: Rule> {
    rule: R,
    config: AuditConfig,
    active: bool,
    snapshots: SnapshotStore,
    owned: Vec<NodeId>,
    tracked: Vec<NodeId>,
    revalidation: Option<RevalidationLoop>,
    issues: Vec<AccessibilityIssue>,
    revalidations: usize,
}

impl<R: Rule> Checker<R> {
    pub fn new(rule: R, config: AuditConfig) -> Self {
        Self {
            rule,
            config,
            active: false,
            snapshots: SnapshotStore::new(),
            owned: Vec::new(),
            tracked: Vec::new(),
            revalidation: None,
            issues: Vec::new(),
            revalidations: 0,
        }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// Selector for every element the rule applies to
    pub fn selector(&self) -> &str {
        self.rule.selector()
    }

    /// Query the current tree; never cached
    pub fn elements(&self, doc: &Document) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(self.rule.selector())?;
        Ok(matched(doc, &selector))
    }

    /// Validate one element against the current tree
    pub fn validate_element(&self, doc: &Document, element: NodeId) -> Result<Validation> {
        let elements = self.elements(doc)?;
        Ok(self.rule.validate_element(doc, element, &elements))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Records from the most recent validation pass
    pub fn issues(&self) -> &[AccessibilityIssue] {
        &self.issues
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Number of annotation nodes currently inserted
    pub fn annotation_count(&self) -> usize {
        self.owned.len()
    }

    /// Revalidation cycles run since creation
    pub fn revalidation_count(&self) -> usize {
        self.revalidations
    }

    /// Validate and annotate every matched element, then start revalidating
    pub fn apply(&mut self, doc: &mut Document) -> RunOutcome {
        if self.active {
            log::debug!("[{}] apply ignored: already active", self.rule.id());
            return RunOutcome::failure();
        }

        match self.build(doc, false) {
            Ok(Some(messages)) => RunOutcome::success_with(messages),
            Ok(None) => {
                log::info!("[{}] no elements match '{}'", self.rule.id(), self.rule.selector());
                RunOutcome::failure()
            }
            Err(e) => {
                log::warn!("[{}] apply failed: {}", self.rule.id(), e);
                if let Err(e) = self.teardown(doc) {
                    log::error!("[{}] rollback failed: {}", self.rule.id(), e);
                }
                RunOutcome::failure()
            }
        }
    }

    /// Stop revalidating, restore every snapshot and remove inserted nodes
    pub fn cleanup(&mut self, doc: &mut Document) -> RunOutcome {
        if !self.active {
            log::debug!("[{}] cleanup ignored: not active", self.rule.id());
            return RunOutcome::failure();
        }

        match self.teardown(doc) {
            Ok(()) => RunOutcome::success(),
            Err(e) => {
                log::warn!("[{}] cleanup failed: {}", self.rule.id(), e);
                RunOutcome::failure()
            }
        }
    }

    pub fn run(&mut self, doc: &mut Document, mode: RunMode) -> RunOutcome {
        match mode {
            RunMode::Apply => self.apply(doc),
            RunMode::Cleanup => self.cleanup(doc),
        }
    }

    /// Consume pending notifications and run the revalidation they call for
    ///
    /// Returns the number of cycles run. Errors are not retried.
    pub fn handle_notifications(&mut self, doc: &mut Document) -> Result<usize> {
        let Some(revalidation) = &self.revalidation else {
            return Ok(0);
        };

        let triggers = revalidation.poll(doc, &self.tracked);
        if triggers.is_empty() {
            return Ok(0);
        }

        let cycles = if self.config.coalesce_revalidation { 1 } else { triggers.len() };
        log::debug!("[{}] revalidating ({} cycle(s)) after {:?}", self.rule.id(), cycles, triggers);
        for _ in 0..cycles {
            self.revalidate(doc)?;
        }
        Ok(cycles)
    }

    fn revalidate(&mut self, doc: &mut Document) -> Result<()> {
        self.teardown(doc)?;
        self.revalidations += 1;
        if let Err(e) = self.build(doc, true) {
            // Undo whatever the failed pass annotated before reporting it
            if let Err(rollback) = self.teardown(doc) {
                log::error!("[{}] rollback failed: {}", self.rule.id(), rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Query, validate, annotate, mark active and start the loop
    ///
    /// Nothing is mutated until the query has succeeded. With `allow_empty`
    /// the checker stays active when nothing matches, so later insertions
    /// are still picked up.
    fn build(&mut self, doc: &mut Document, allow_empty: bool) -> Result<Option<Vec<String>>> {
        let selector = Selector::parse(self.rule.selector())?;
        let elements = matched(doc, &selector);
        self.issues.clear();
        if elements.is_empty() && !allow_empty {
            return Ok(None);
        }

        let outcomes = self.rule.validate_all(doc, &elements);

        // Describe before annotating so snippets show the page's own markup
        let issues: Vec<AccessibilityIssue> = elements
            .iter()
            .zip(&outcomes)
            .filter(|(_, outcome)| !outcome.is_valid)
            .map(|(&el, outcome)| self.describe(doc, el, outcome))
            .collect();

        let palette = self.config.palette(doc.color_scheme()).clone();
        for (&el, outcome) in elements.iter().zip(&outcomes) {
            self.annotate(doc, el, outcome, &palette)?;
        }

        self.active = true;
        self.revalidation = Some(RevalidationLoop::start(doc, selector));

        self.report(elements.len(), &issues);
        let messages = issues
            .iter()
            .map(|issue| format!("{}: {}", issue.location.selector, issue.message))
            .collect();
        self.tracked = elements;
        self.issues = issues;
        Ok(Some(messages))
    }

    fn teardown(&mut self, doc: &mut Document) -> Result<()> {
        if let Some(revalidation) = self.revalidation.take() {
            revalidation.stop(doc);
        }
        self.active = false;
        self.tracked.clear();

        let restored = self.snapshots.restore_all(doc)?;
        let owned = std::mem::take(&mut self.owned);
        let removed = owned.len();
        for node in owned {
            if doc.contains(node) {
                doc.dispose(node)?;
            }
        }

        log::debug!(
            "[{}] restored {} element(s), removed {} annotation node(s)",
            self.rule.id(),
            restored,
            removed
        );
        Ok(())
    }

    fn describe(&self, doc: &Document, element: NodeId, outcome: &Validation) -> AccessibilityIssue {
        let location = IssueLocation::of(doc, element);
        let evidence = Evidence {
            found: outcome.found.clone().unwrap_or_else(|| location.element_type.clone()),
            expected: outcome.expected.clone(),
            snippet: doc.snippet(element, self.config.snippet_max_chars),
        };
        let message = outcome
            .message
            .clone()
            .unwrap_or_else(|| format!("{} check failed", self.rule.name()));

        let mut issue = AccessibilityIssue::new(
            self.rule.id(),
            outcome.severity.clone().unwrap_or(Severity::Medium),
            message,
            location,
        )
        .with_rule_name(self.rule.name())
        .with_evidence(evidence)
        .with_impact(self.rule.impact())
        .with_fix(self.rule.fix(doc, element, outcome));

        if let Some(criterion) = self.rule.wcag() {
            issue = issue.with_wcag(criterion);
        }
        issue
    }

    fn annotate(&mut self, doc: &mut Document, element: NodeId, outcome: &Validation, palette: &Palette) -> Result<()> {
        if outcome.is_valid && !self.config.mark_passing {
            return Ok(());
        }

        let color = if outcome.is_valid { &palette.pass } else { &palette.fail };
        let outline = format!("{}px solid {}", self.config.outline_width, color);
        self.set_style(doc, element, "outline", &outline)?;
        self.set_style(doc, element, "outline-offset", "2px")?;

        if let Some(label) = outcome.badge.as_deref().filter(|_| self.config.badges) {
            self.insert_badge(doc, element, label, palette)?;
        }
        Ok(())
    }

    fn set_style(&mut self, doc: &mut Document, element: NodeId, property: &str, value: &str) -> Result<()> {
        self.snapshots.capture(doc, element, property);
        doc.set_style_property(element, property, value)
    }

    fn insert_badge(&mut self, doc: &mut Document, element: NodeId, label: &str, palette: &Palette) -> Result<()> {
        let badge = doc.create_element("span");
        doc.set_attribute(badge, ANNOTATION_MARKER, self.rule.id())?;
        doc.set_attribute(badge, "aria-hidden", "true")?;
        doc.set_attribute(
            badge,
            "style",
            &format!(
                "background-color: {}; color: {}; font: bold 11px monospace; padding: 0 4px; margin: 0 4px; border-radius: 3px;",
                palette.badge_background, palette.badge_text
            ),
        )?;
        let text = doc.create_text(label);
        doc.append_child(badge, text)?;
        self.owned.push(badge);

        let tag = doc.tag_name(element).unwrap_or_default().to_string();
        if element == doc.document_element() {
            // Badge for the root goes at the top of the body
            let parent = doc.body().unwrap_or(element);
            let first = doc.children(parent).first().copied();
            doc.insert_before(parent, badge, first)
        } else if is_void(&tag) {
            let Some(parent) = doc.parent(element) else {
                return Ok(());
            };
            let siblings = doc.children(parent);
            let next = siblings
                .iter()
                .position(|&c| c == element)
                .and_then(|i| siblings.get(i + 1).copied());
            doc.insert_before(parent, badge, next)
        } else {
            let first = doc.children(element).first().copied();
            doc.insert_before(element, badge, first)
        }
    }

    fn report(&self, checked: usize, issues: &[AccessibilityIssue]) {
        if issues.is_empty() {
            log::info!("[{}] {} element(s) checked, no issues", self.rule.id(), checked);
            return;
        }

        log::warn!(
            "[{}] {} element(s) checked, {} issue(s)",
            self.rule.id(),
            checked,
            issues.len()
        );
        for issue in issues {
            log::warn!(
                "[{}]   {} {} ({})",
                self.rule.id(),
                issue.severity,
                issue.message,
                issue.location.selector
            );
        }
    }
}

/// Matches in document order, excluding annotation nodes
fn matched(doc: &Document, selector: &Selector) -> Vec<NodeId> {
    doc.select(selector)
        .into_iter()
        .filter(|&n| !doc.is_annotation(n))
        .collect()
}

impl<R: Rule> std::fmt::Debug for Checker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("rule", &self.rule.id())
            .field("active", &self.active)
            .field("snapshots", &self.snapshots.len())
            .field("annotations", &self.owned.len())
            .field("issues", &self.issues.len())
            .finish()
    }
}

/// Object-safe view of a [`Checker`], held by the session registry
pub trait DynChecker {
    fn rule_id(&self) -> &'static str;
    fn rule_name(&self) -> &'static str;
    fn category(&self) -> &'static str;
    fn selector(&self) -> &str;
    fn is_active(&self) -> bool;
    fn issues(&self) -> &[AccessibilityIssue];
    fn run(&mut self, doc: &mut Document, mode: RunMode) -> RunOutcome;
    fn handle_notifications(&mut self, doc: &mut Document) -> Result<usize>;
}

impl<R: Rule> DynChecker for Checker<R> {
    fn rule_id(&self) -> &'static str {
        self.rule.id()
    }

    fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    fn category(&self) -> &'static str {
        self.rule.category()
    }

    fn selector(&self) -> &str {
        self.rule.selector()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn issues(&self) -> &[AccessibilityIssue] {
        &self.issues
    }

    fn run(&mut self, doc: &mut Document, mode: RunMode) -> RunOutcome {
        Checker::run(self, doc, mode)
    }

    fn handle_notifications(&mut self, doc: &mut Document) -> Result<usize> {
        Checker::handle_notifications(self, doc)
    }
}
