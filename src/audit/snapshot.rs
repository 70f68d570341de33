use crate::dom::{parse_declarations, Document, NodeId};
use crate::error::Result;
use indexmap::IndexMap;

/// Pre-annotation presentation state of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationSnapshot {
    /// Raw `style` attribute as it was before the first touch
    pub style_attribute: Option<String>,
    /// Inline value of every property the checker has written; `None` = unset
    pub properties: IndexMap<String, Option<String>>,
}

/// Per-checker side table from element to its original presentation
///
/// Entries are keyed by [`NodeId`], which does not keep the node alive;
/// entries for nodes the page has disposed are skipped on restore.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: IndexMap<NodeId, PresentationSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&PresentationSnapshot> {
        self.entries.get(&node)
    }

    /// Record the current inline value of `property` unless already recorded
    ///
    /// Only the first capture for an element/property pair is kept, so values
    /// written by the checker itself are never mistaken for originals.
    pub fn capture(&mut self, doc: &Document, node: NodeId, property: &str) {
        let entry = self.entries.entry(node).or_insert_with(|| PresentationSnapshot {
            style_attribute: doc.attribute(node, "style").map(str::to_string),
            properties: IndexMap::new(),
        });
        entry
            .properties
            .entry(property.to_string())
            .or_insert_with(|| doc.style_property(node, property));
    }

    /// Restore every recorded element and empty the store
    pub fn restore_all(&mut self, doc: &mut Document) -> Result<usize> {
        let mut restored = 0;
        for (node, snapshot) in self.entries.drain(..) {
            if !doc.contains(node) {
                log::debug!("Skipping restore of disposed node {}", node);
                continue;
            }
            restore(doc, node, &snapshot)?;
            restored += 1;
        }
        Ok(restored)
    }
}

fn restore(doc: &mut Document, node: NodeId, snapshot: &PresentationSnapshot) -> Result<()> {
    let current = doc.attribute(node, "style").unwrap_or("");
    let original = snapshot.style_attribute.as_deref().unwrap_or("");

    // Only the properties written here differ: put the original text back verbatim
    if untouched(current, snapshot) == untouched(original, snapshot) {
        return match &snapshot.style_attribute {
            Some(original) => doc.set_attribute(node, "style", original),
            None => doc.remove_attribute(node, "style"),
        };
    }

    for (property, value) in &snapshot.properties {
        match value {
            Some(value) => doc.set_style_property(node, property, value)?,
            None => doc.remove_style_property(node, property)?,
        }
    }
    if snapshot.style_attribute.is_none() && doc.attribute(node, "style").is_some_and(|s| s.trim().is_empty()) {
        doc.remove_attribute(node, "style")?;
    }
    Ok(())
}

/// Declarations other than the ones the checker wrote
fn untouched(style: &str, snapshot: &PresentationSnapshot) -> Vec<(String, String)> {
    parse_declarations(style)
        .into_iter()
        .filter(|(name, _)| !snapshot.properties.contains_key(name))
        .collect()
}
