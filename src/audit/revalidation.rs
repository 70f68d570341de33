use crate::dom::{Document, MutationFilter, MutationRecord, NodeId, ObserverId, Selector};

/// Attributes on the document element whose change forces revalidation
/// (theme classes, language and direction toggles)
pub const ROOT_ATTRIBUTES: [&str; 5] = ["class", "data-theme", "data-color-scheme", "lang", "dir"];

/// Why a revalidation cycle was scheduled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A matched element (or an ancestor of one) was inserted or removed
    Structure { target: NodeId },
    /// An attribute of the document element changed
    RootAttribute(String),
    /// The host switched between light and dark
    ColorScheme,
}

/// Change subscriptions held by an active checker
///
/// Exists exactly while the checker is active: started at the end of a
/// successful apply and stopped at the start of cleanup.
#[derive(Debug)]
pub struct RevalidationLoop {
    mutations: ObserverId,
    scheme: ObserverId,
    selector: Selector,
}

impl RevalidationLoop {
    /// Subscribe to tree changes under the document element and to color-scheme changes
    pub fn start(doc: &mut Document, selector: Selector) -> Self {
        let root = doc.document_element();
        let mutations = doc.observe(root, MutationFilter::subtree_child_list().with_attributes(ROOT_ATTRIBUTES));
        let scheme = doc.watch_color_scheme();
        log::debug!("Revalidation loop started for '{}'", selector);
        Self {
            mutations,
            scheme,
            selector,
        }
    }

    /// Unsubscribe both sources, dropping undelivered notifications
    pub fn stop(self, doc: &mut Document) {
        doc.disconnect(self.mutations);
        doc.disconnect(self.scheme);
        log::debug!("Revalidation loop stopped for '{}'", self.selector);
    }

    /// Drain pending notifications; returns the relevant ones
    ///
    /// `tracked` are the elements matched by the last validation pass, used to
    /// recognise removals of nodes the page has already disposed.
    pub fn poll(&self, doc: &mut Document, tracked: &[NodeId]) -> Vec<Trigger> {
        let mut triggers = Vec::new();

        if doc.take_scheme_change(self.scheme) {
            triggers.push(Trigger::ColorScheme);
        }

        for record in doc.take_records(self.mutations) {
            if let Some(trigger) = self.classify(doc, &record, tracked) {
                triggers.push(trigger);
            }
        }

        triggers
    }

    fn classify(&self, doc: &Document, record: &MutationRecord, tracked: &[NodeId]) -> Option<Trigger> {
        match record {
            MutationRecord::Attributes { target, name } => {
                (*target == doc.document_element()).then(|| Trigger::RootAttribute(name.clone()))
            }
            MutationRecord::ChildList { target, added, removed } => {
                let relevant = added.iter().any(|&n| self.touches_matches(doc, n))
                    || removed
                        .iter()
                        .any(|&n| self.touches_matches(doc, n) || (!doc.contains(n) && tracked.contains(&n)));
                relevant.then_some(Trigger::Structure { target: *target })
            }
        }
    }

    /// Whether the node matches the selector or contains a node that does
    fn touches_matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(node) && !doc.is_annotation(node) && !doc.select_within(node, &self.selector).is_empty()
    }
}
