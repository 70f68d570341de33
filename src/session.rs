use crate::{audit::{sort_by_severity, AccessibilityIssue, DynChecker, IssueSummary, RunMode, RunOutcome},
            config::AuditConfig,
            dom::Document,
            error::{AuditError, Result},
            rules};
use indexmap::IndexMap;

/// A document plus the checkers registered against it
///
/// This is the toolbar boundary: callers pick checkers by rule id and only
/// ever see [`RunOutcome`]s and issue records. At most one checker per
/// category is active when selection goes through [`AuditSession::select`].
pub struct AuditSession {
    /// The live document every checker mutates
    document: Document,

    /// Registered checkers keyed by rule id, in registration order
    checkers: IndexMap<&'static str, Box<dyn DynChecker>>,

    config: AuditConfig,
}

impl AuditSession {
    /// Create a session with every built-in rule the config enables
    pub fn new(document: Document, config: AuditConfig) -> Result<Self> {
        let mut session = Self::empty(document, config.clone());
        for checker in rules::enabled_checkers(&config)? {
            session.register(checker);
        }
        Ok(session)
    }

    /// Create a session with no checkers registered
    pub fn empty(document: Document, config: AuditConfig) -> Self {
        Self {
            document,
            checkers: IndexMap::new(),
            config,
        }
    }

    /// Register a checker, replacing (and cleaning up) one with the same rule id
    pub fn register(&mut self, checker: Box<dyn DynChecker>) {
        let id = checker.rule_id();
        if let Some(mut previous) = self.checkers.insert(id, checker) {
            if previous.is_active() {
                previous.run(&mut self.document, RunMode::Cleanup);
            }
            log::debug!("Replaced checker '{}'", id);
        }
    }

    /// Builder method: register a checker
    pub fn with_checker(mut self, checker: Box<dyn DynChecker>) -> Self {
        self.register(checker);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for page-side changes; call [`AuditSession::dispatch`]
    /// afterwards to deliver the resulting notifications
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Clean up every active checker and hand back the document
    pub fn into_document(mut self) -> Document {
        self.cleanup_all();
        self.document
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.checkers.keys().copied().collect()
    }

    pub fn checker(&self, rule_id: &str) -> Option<&dyn DynChecker> {
        self.checkers.get(rule_id).map(|c| c.as_ref())
    }

    /// Rule ids grouped by toolbar category
    pub fn categories(&self) -> IndexMap<&'static str, Vec<&'static str>> {
        let mut categories: IndexMap<&'static str, Vec<&'static str>> = IndexMap::new();
        for (id, checker) in &self.checkers {
            categories.entry(checker.category()).or_default().push(*id);
        }
        categories
    }

    /// Rule ids of the currently active checkers
    pub fn active_rules(&self) -> Vec<&'static str> {
        self.checkers
            .iter()
            .filter(|(_, c)| c.is_active())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Run one checker directly
    pub fn run(&mut self, rule_id: &str, mode: RunMode) -> Result<RunOutcome> {
        let checker = self
            .checkers
            .get_mut(rule_id)
            .ok_or_else(|| AuditError::UnknownRule(rule_id.to_string()))?;
        log::debug!("Running '{}' ({})", rule_id, mode);
        Ok(checker.run(&mut self.document, mode))
    }

    /// Radio-style selection: clean up the active checker in the same
    /// category, then apply this one
    pub fn select(&mut self, rule_id: &str) -> Result<RunOutcome> {
        let category = self
            .checkers
            .get(rule_id)
            .map(|c| c.category())
            .ok_or_else(|| AuditError::UnknownRule(rule_id.to_string()))?;

        for (id, checker) in self.checkers.iter_mut() {
            if *id != rule_id && checker.category() == category && checker.is_active() {
                log::debug!("Deselecting '{}' in category '{}'", id, category);
                checker.run(&mut self.document, RunMode::Cleanup);
            }
        }

        self.run(rule_id, RunMode::Apply)
    }

    /// Clean up one checker
    pub fn deselect(&mut self, rule_id: &str) -> Result<RunOutcome> {
        self.run(rule_id, RunMode::Cleanup)
    }

    /// Apply every registered checker, ignoring categories
    pub fn apply_all(&mut self) -> Vec<(&'static str, RunOutcome)> {
        self.checkers
            .iter_mut()
            .map(|(id, checker)| (*id, checker.run(&mut self.document, RunMode::Apply)))
            .collect()
    }

    /// Clean up every active checker, last applied first
    pub fn cleanup_all(&mut self) {
        for (_, checker) in self.checkers.iter_mut().rev() {
            if checker.is_active() {
                checker.run(&mut self.document, RunMode::Cleanup);
            }
        }
    }

    /// Deliver pending change and color-scheme notifications to every active
    /// checker, the way a host event loop would
    ///
    /// Returns the number of revalidation cycles run. The first error stops
    /// delivery and is returned as-is.
    pub fn dispatch(&mut self) -> Result<usize> {
        let mut cycles = 0;
        for (_, checker) in self.checkers.iter_mut() {
            if checker.is_active() {
                cycles += checker.handle_notifications(&mut self.document)?;
            }
        }
        Ok(cycles)
    }

    /// Issues of every active checker, most severe first
    pub fn issues(&self) -> Vec<AccessibilityIssue> {
        let mut issues: Vec<AccessibilityIssue> = self
            .checkers
            .values()
            .filter(|c| c.is_active())
            .flat_map(|c| c.issues().iter().cloned())
            .collect();
        sort_by_severity(&mut issues);
        issues
    }

    pub fn summary(&self) -> IssueSummary {
        IssueSummary::from_issues(&self.issues())
    }
}

impl std::fmt::Debug for AuditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSession")
            .field("rules", &self.rule_ids())
            .field("active", &self.active_rules())
            .finish()
    }
}
