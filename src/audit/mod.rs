//! The checker framework
//!
//! - [`Rule`]: what a rule selects and how it judges each element
//! - [`Checker`]: a rule bound to its apply/cleanup lifecycle
//! - [`SnapshotStore`]: pre-annotation presentation state, restored on cleanup
//! - [`RevalidationLoop`]: re-runs an active checker when the tree or color scheme changes
//! - [`AccessibilityIssue`]: the diagnostic record emitted for every failure

pub mod checker;
pub mod issue;
pub mod revalidation;
pub mod rule;
pub mod snapshot;

pub use checker::{Checker, DynChecker, RunMode, RunOutcome};
pub use issue::{
    derive_issue_id, issue_schema, sort_by_severity, AccessibilityIssue, Evidence, FixSuggestion, Impact,
    IssueLocation, IssueSummary, Severity,
};
pub use revalidation::{RevalidationLoop, Trigger, ROOT_ATTRIBUTES};
pub use rule::{Rule, Validation};
pub use snapshot::{PresentationSnapshot, SnapshotStore};
