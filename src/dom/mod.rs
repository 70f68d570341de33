//! Host document model
//!
//! The checkers never talk to a rendering engine directly. They run against a
//! [`Document`], which provides the primitives a live page offers:
//! - ElementNode: serialized snapshot of a tree (JSON, HTML, or captured from Chrome)
//! - Document: live arena tree with queries, styles, mutation and change notifications
//! - Selector: CSS selectors parsed with scraper's grammar and matched against a Document

pub mod document;
pub mod element;
pub mod selector;

pub use document::{
    collapse_whitespace, is_void, parse_declarations, ColorScheme, Document, MutationFilter, MutationRecord, NodeId, ObserverId,
    ANNOTATION_MARKER,
};
pub use element::ElementNode;
pub use selector::Selector;

#[cfg(feature = "chrome")]
use crate::error::{AuditError, Result};
#[cfg(feature = "chrome")]
use headless_chrome::Tab;
#[cfg(feature = "chrome")]
use std::sync::Arc;

/// Capture the rendered tree of a browser tab, including the computed styles
/// the checkers read
#[cfg(feature = "chrome")]
pub fn capture_tab(tab: &Arc<Tab>) -> Result<ElementNode> {
    let js_code = include_str!("capture_tree.js");

    let result = tab
        .evaluate(js_code, false)
        .map_err(|e| AuditError::Browser(format!("Failed to execute capture script: {}", e)))?;

    let json_value = result
        .value
        .ok_or_else(|| AuditError::Browser("No value returned from capture script".to_string()))?;

    // The script returns a JSON string
    let json_str: String = serde_json::from_value(json_value)
        .map_err(|e| AuditError::Browser(format!("Failed to get JSON string: {}", e)))?;

    let mut root = ElementNode::from_json(&json_str)?;
    root.simplify();
    Ok(root)
}
