//! Audit configuration options.

use crate::dom::ColorScheme;
use crate::error::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Colors used to annotate one color scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Outline color for compliant elements
    pub pass: String,
    /// Outline color for non-compliant elements
    pub fail: String,
    /// Badge background
    pub badge_background: String,
    /// Badge text
    pub badge_text: String,
}

impl Palette {
    pub fn light() -> Self {
        Self {
            pass: "#2e7d32".to_string(),
            fail: "#c62828".to_string(),
            badge_background: "#212121".to_string(),
            badge_text: "#ffffff".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            pass: "#81c784".to_string(),
            fail: "#ef9a9a".to_string(),
            badge_background: "#fafafa".to_string(),
            badge_text: "#000000".to_string(),
        }
    }
}

/// Configuration shared by every checker in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Outline width in pixels
    pub outline_width: u32,

    /// Palette used when the host prefers a light scheme
    pub light: Palette,

    /// Palette used when the host prefers a dark scheme
    pub dark: Palette,

    /// Insert text badges next to annotated elements
    pub badges: bool,

    /// Outline elements that pass as well as those that fail
    pub mark_passing: bool,

    /// Run at most one revalidation per checker per dispatched batch of notifications
    pub coalesce_revalidation: bool,

    /// Rule ids to register; empty means every built-in rule
    pub rules: Vec<String>,

    /// Maximum length of the markup snippet stored as evidence
    pub snippet_max_chars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            outline_width: 2,
            light: Palette::light(),
            dark: Palette::dark(),
            badges: true,
            mark_passing: true,
            coalesce_revalidation: true,
            rules: Vec::new(),
            snippet_max_chars: 200,
        }
    }
}

impl AuditConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| AuditError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Set the outline width.
    pub fn outline_width(mut self, px: u32) -> Self {
        self.outline_width = px;
        self
    }

    /// Enable or disable badges.
    pub fn badges(mut self, enabled: bool) -> Self {
        self.badges = enabled;
        self
    }

    /// Enable or disable outlines on passing elements.
    pub fn mark_passing(mut self, enabled: bool) -> Self {
        self.mark_passing = enabled;
        self
    }

    /// Enable or disable revalidation coalescing.
    pub fn coalesce_revalidation(mut self, enabled: bool) -> Self {
        self.coalesce_revalidation = enabled;
        self
    }

    /// Restrict the session to the given rule ids.
    pub fn rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Palette for the given scheme
    pub fn palette(&self, scheme: ColorScheme) -> &Palette {
        match scheme {
            ColorScheme::Light => &self.light,
            ColorScheme::Dark => &self.dark,
        }
    }

    /// Whether a rule id is enabled by this config
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r == rule_id)
    }
}
