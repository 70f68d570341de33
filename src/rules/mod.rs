//! Built-in rules
//!
//! Each rule is a stateless [`Rule`](crate::audit::Rule); [`checker`] binds
//! one to its lifecycle state.

pub mod cursor;
pub mod heading_order;
pub mod keyboard;
pub mod language;
pub mod link_label;

pub use cursor::InteractiveCursor;
pub use heading_order::HeadingOrder;
pub use keyboard::KeyboardReachability;
pub use language::LanguageTag;
pub use link_label::LinkLabelConsistency;

use crate::audit::{Checker, DynChecker};
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};

/// Ids of every built-in rule, in registration order
pub const BUILTIN_RULES: [&str; 5] = [
    HeadingOrder::ID,
    LinkLabelConsistency::ID,
    InteractiveCursor::ID,
    KeyboardReachability::ID,
    LanguageTag::ID,
];

/// Create the checker for a built-in rule id
pub fn checker(id: &str, config: &AuditConfig) -> Result<Box<dyn DynChecker>> {
    let config = config.clone();
    let checker: Box<dyn DynChecker> = match id {
        HeadingOrder::ID => Box::new(Checker::new(HeadingOrder, config)),
        LinkLabelConsistency::ID => Box::new(Checker::new(LinkLabelConsistency, config)),
        InteractiveCursor::ID => Box::new(Checker::new(InteractiveCursor, config)),
        KeyboardReachability::ID => Box::new(Checker::new(KeyboardReachability, config)),
        LanguageTag::ID => Box::new(Checker::new(LanguageTag, config)),
        other => return Err(AuditError::UnknownRule(other.to_string())),
    };
    Ok(checker)
}

/// Checkers for every rule the config enables
///
/// Unknown ids in the config are an error rather than silently ignored.
pub fn enabled_checkers(config: &AuditConfig) -> Result<Vec<Box<dyn DynChecker>>> {
    if let Some(unknown) = config.rules.iter().find(|id| !BUILTIN_RULES.contains(&id.as_str())) {
        return Err(AuditError::UnknownRule(unknown.clone()));
    }

    BUILTIN_RULES
        .iter()
        .filter(|id| config.is_enabled(id))
        .map(|id| checker(id, config))
        .collect()
}
