use crate::dom::element::{ElementNode, TEXT_TAG};
use crate::dom::selector::Selector;
use crate::error::{AuditError, Result};
use cssparser::{Delimiter, ParseError, Parser as CssParser, ParserInput};
use indexmap::IndexMap;
use selectors::OpaqueElement;
use serde::{Deserialize, Serialize};
use url::Url;

/// Attribute carried by every node the engine inserts for annotation
pub const ANNOTATION_MARKER: &str = "data-a11y-annotation";

/// Handle to a node in a [`Document`]
///
/// Ids are never reused within a document, so a stale handle can be detected
/// with [`Document::contains`] instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a change-notification or media-feature subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// Light/dark preference reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// What a mutation subscription is interested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationFilter {
    /// Report insertions and removals of children
    pub child_list: bool,
    /// Report changes in the whole subtree, not just the target
    pub subtree: bool,
    /// Attribute names to report; `None` disables attribute records
    pub attributes: Option<Vec<String>>,
}

impl MutationFilter {
    /// Child-list changes anywhere in the subtree
    pub fn subtree_child_list() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: None,
        }
    }

    /// Builder method: also report changes to the named attributes
    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// A single change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        name: String,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. } | MutationRecord::Attributes { target, .. } => *target,
        }
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        computed: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct MutationObserver {
    target: NodeId,
    filter: MutationFilter,
    records: Vec<MutationRecord>,
}

#[derive(Debug)]
enum Subscription {
    Mutations(MutationObserver),
    ColorScheme { pending: bool },
}

/// A live, mutable document tree
///
/// This is the host environment the checkers run against: tree queries,
/// a computed-style reader, inline style and attribute mutation, node
/// creation for annotation, change notifications and the color-scheme
/// media feature.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    base_url: Option<Url>,
    color_scheme: ColorScheme,
    subscriptions: IndexMap<ObserverId, Subscription>,
    next_subscription: usize,
}

impl Document {
    /// Build a live document from a serialized snapshot; the snapshot root
    /// becomes the document element
    pub fn new(root: ElementNode) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            base_url: None,
            color_scheme: ColorScheme::default(),
            subscriptions: IndexMap::new(),
            next_subscription: 0,
        };
        doc.root = doc.build(&root, None);
        doc
    }

    /// Parse a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(ElementNode::from_json(json)?))
    }

    /// Parse an HTML document
    pub fn from_html(html: &str) -> Self {
        Self::new(ElementNode::from_html(html))
    }

    /// Builder method: set the document URL used to resolve relative links
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn build(&mut self, source: &ElementNode, parent: Option<NodeId>) -> NodeId {
        if source.is_text() {
            let id = self.alloc(NodeData::Text(source.text_content.clone().unwrap_or_default()));
            self.node_mut(id).parent = parent;
            return id;
        }

        let id = self.alloc(NodeData::Element {
            tag: source.tag_name.to_ascii_lowercase(),
            attributes: source.attributes.clone(),
            computed: source.computed_style.clone(),
        });
        self.node_mut(id).parent = parent;

        let mut children = Vec::new();
        if let Some(text) = source.text_content.as_deref().filter(|t| !t.is_empty()) {
            let text_id = self.alloc(NodeData::Text(text.to_string()));
            self.node_mut(text_id).parent = Some(id);
            children.push(text_id);
        }
        for child in &source.children {
            children.push(self.build(child, Some(id)));
        }
        self.node_mut(id).children = children;
        id
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            data,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    // Only called with ids freshly allocated or checked by the caller
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            Some(node) => node,
            None => unreachable!("node {} was checked before mutation", id),
        }
    }

    /// Identity of a node's arena slot, stable while the document is borrowed
    pub(crate) fn opaque(&self, id: NodeId) -> OpaqueElement {
        match self.nodes.get(id.0) {
            Some(slot) => OpaqueElement::new(slot),
            None => OpaqueElement::new(self),
        }
    }

    fn checked(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(AuditError::NodeNotFound(id.0))
    }

    // ---- structure ---------------------------------------------------------

    /// The top-level element (`<html>`)
    pub fn document_element(&self) -> NodeId {
        self.root
    }

    /// The first `<body>` element, if any
    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.tag_name(id) == Some("body"))
    }

    /// Whether the id refers to a node that has not been disposed
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether the node is attached to the document element
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return self.contains(node);
            }
            current = self.node(node).and_then(|n| n.parent);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id), Some(Node { data: NodeData::Element { .. }, .. }))
    }

    /// Lower-case tag name, or `None` for text and disposed nodes
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// The node and all of its descendants in document (pre-)order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether the node is (inside) a node the engine inserted for annotation
    pub fn is_annotation(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if self.attribute(n, ANNOTATION_MARKER).is_some() {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // ---- attributes and text -----------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> Vec<(&str, &str)> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Set an attribute, notifying observers
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.checked(id)?;
        let changed = match &mut self.node_mut(id).data {
            NodeData::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
                true
            }
            NodeData::Text(_) => false,
        };
        if changed {
            self.notify(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Remove an attribute, notifying observers when it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.checked(id)?;
        let removed = match &mut self.node_mut(id).data {
            NodeData::Element { attributes, .. } => attributes.shift_remove(name).is_some(),
            NodeData::Text(_) => false,
        };
        if removed {
            self.notify(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.collect_text(id, false)
    }

    /// Text a user would read: annotation nodes skipped, whitespace collapsed
    pub fn visible_text(&self, id: NodeId) -> String {
        collapse_whitespace(&self.collect_text(id, true))
    }

    fn collect_text(&self, id: NodeId, skip_annotations: bool) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if skip_annotations && self.is_annotation(node) {
                continue;
            }
            if let Some(Node { data: NodeData::Text(text), .. }) = self.node(node) {
                out.push_str(text);
            }
        }
        out
    }

    // ---- style -------------------------------------------------------------

    /// Inline style property value
    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(id, "style")?;
        parse_declarations(style)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    /// Set an inline style property
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let mut declarations = parse_declarations(self.attribute(id, "style").unwrap_or(""));
        match declarations
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => declarations.push((property.to_ascii_lowercase(), value.to_string())),
        }
        self.set_attribute(id, "style", &serialize_declarations(&declarations))
    }

    /// Remove an inline style property
    pub fn remove_style_property(&mut self, id: NodeId, property: &str) -> Result<()> {
        let Some(style) = self.attribute(id, "style") else {
            return Ok(());
        };
        let mut declarations = parse_declarations(style);
        let before = declarations.len();
        declarations.retain(|(name, _)| !name.eq_ignore_ascii_case(property));
        if declarations.len() == before {
            return Ok(());
        }
        self.set_attribute(id, "style", &serialize_declarations(&declarations))
    }

    /// Computed style: inline style, then the style captured from the
    /// rendering engine, then user-agent defaults
    pub fn computed_style(&self, id: NodeId, property: &str) -> Option<String> {
        if let Some(value) = self.style_property(id, property) {
            return Some(value);
        }

        match &self.node(id)?.data {
            NodeData::Element { tag, attributes, computed } => computed
                .get(property)
                .cloned()
                .or_else(|| user_agent_default(tag, attributes, property).map(str::to_string)),
            NodeData::Text(_) => None,
        }
    }

    // ---- tree mutation -----------------------------------------------------

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            computed: IndexMap::new(),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    /// Insert `child` into `parent` before `reference` (or at the end)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        self.checked(parent)?;
        self.checked(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(AuditError::InvalidOperation(format!(
                "cannot insert {} into its own subtree",
                child
            )));
        }
        if self.parent(child).is_some() {
            self.remove(child)?;
        }

        let position = match reference {
            Some(r) => self
                .children(parent)
                .iter()
                .position(|&c| c == r)
                .ok_or(AuditError::NodeNotFound(r.0))?,
            None => self.children(parent).len(),
        };

        self.node_mut(parent).children.insert(position, child);
        self.node_mut(child).parent = Some(parent);
        self.notify(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Detach a node from its parent; the node stays alive and may be reinserted
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.checked(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent).children.retain(|&c| c != id);
        self.node_mut(id).parent = None;
        self.notify(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        Ok(())
    }

    /// Detach and free a node and its subtree
    pub fn dispose(&mut self, id: NodeId) -> Result<()> {
        self.remove(id)?;
        for node in self.descendants(id) {
            self.nodes[node.0] = None;
        }
        Ok(())
    }

    // ---- queries -----------------------------------------------------------

    /// All connected elements matching the selector, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(&selector))
    }

    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    /// Elements in the subtree rooted at `id` (inclusive) matching the selector
    pub fn select_within(&self, id: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    // ---- notifications -----------------------------------------------------

    /// Subscribe to changes under `target`
    pub fn observe(&mut self, target: NodeId, filter: MutationFilter) -> ObserverId {
        self.subscribe(Subscription::Mutations(MutationObserver {
            target,
            filter,
            records: Vec::new(),
        }))
    }

    /// Subscribe to color-scheme changes
    pub fn watch_color_scheme(&mut self) -> ObserverId {
        self.subscribe(Subscription::ColorScheme { pending: false })
    }

    fn subscribe(&mut self, subscription: Subscription) -> ObserverId {
        let id = ObserverId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, subscription);
        id
    }

    /// Drop a subscription and any undelivered notifications
    pub fn disconnect(&mut self, id: ObserverId) {
        self.subscriptions.shift_remove(&id);
    }

    pub fn is_subscribed(&self, id: ObserverId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Drain queued mutation records for a subscription
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        match self.subscriptions.get_mut(&id) {
            Some(Subscription::Mutations(observer)) => std::mem::take(&mut observer.records),
            _ => Vec::new(),
        }
    }

    /// Consume a pending color-scheme notification
    pub fn take_scheme_change(&mut self, id: ObserverId) -> bool {
        match self.subscriptions.get_mut(&id) {
            Some(Subscription::ColorScheme { pending }) => std::mem::take(pending),
            _ => false,
        }
    }

    /// Whether any subscription has undelivered notifications
    pub fn has_pending_notifications(&self) -> bool {
        self.subscriptions.values().any(|s| match s {
            Subscription::Mutations(observer) => !observer.records.is_empty(),
            Subscription::ColorScheme { pending } => *pending,
        })
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    /// Change the color-scheme preference, notifying watchers on change
    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        if self.color_scheme == scheme {
            return;
        }
        self.color_scheme = scheme;
        for subscription in self.subscriptions.values_mut() {
            if let Subscription::ColorScheme { pending } = subscription {
                *pending = true;
            }
        }
    }

    fn notify(&mut self, record: MutationRecord) {
        let target = record.target();
        if !self.is_connected(target) {
            return;
        }

        let interested: Vec<ObserverId> = self
            .subscriptions
            .iter()
            .filter_map(|(id, s)| match s {
                Subscription::Mutations(o) if self.wants(o, &record) => Some(*id),
                _ => None,
            })
            .collect();

        for id in interested {
            if let Some(Subscription::Mutations(observer)) = self.subscriptions.get_mut(&id) {
                observer.records.push(record.clone());
            }
        }
    }

    fn wants(&self, observer: &MutationObserver, record: &MutationRecord) -> bool {
        let target = record.target();
        let in_scope = if observer.filter.subtree {
            self.is_inclusive_ancestor(observer.target, target)
        } else {
            observer.target == target
        };
        if !in_scope {
            return false;
        }

        match record {
            MutationRecord::ChildList { .. } => observer.filter.child_list,
            MutationRecord::Attributes { name, .. } => observer
                .filter
                .attributes
                .as_ref()
                .is_some_and(|names| names.iter().any(|n| n == name)),
        }
    }

    // ---- locations and serialization ---------------------------------------

    /// XPath-like location, e.g. `/html[1]/body[1]/h2[2]`; annotation
    /// siblings are not counted
    pub fn xpath(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let parent = self.parent(node);
            let segment = match self.tag_name(node) {
                Some(tag) => {
                    let position = parent
                        .map(|p| {
                            self.children(p)
                                .iter()
                                .take_while(|&&c| c != node)
                                .filter(|&&c| self.tag_name(c) == Some(tag) && !self.is_annotation(c))
                                .count()
                        })
                        .unwrap_or(0);
                    format!("{}[{}]", tag, position + 1)
                }
                None => {
                    let position = parent
                        .map(|p| {
                            self.children(p)
                                .iter()
                                .take_while(|&&c| c != node)
                                .filter(|&&c| !self.is_element(c))
                                .count()
                        })
                        .unwrap_or(0);
                    format!("text()[{}]", position + 1)
                }
            };
            segments.push(segment);
            current = parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// CSS selector path; an `id` attribute short-circuits the walk
    pub fn css_path(&self, id: NodeId) -> String {
        let Some(tag) = self.tag_name(id) else {
            return self.parent(id).map(|p| self.css_path(p)).unwrap_or_default();
        };

        if let Some(element_id) = self.attribute(id, "id").filter(|v| !v.is_empty()) {
            return format!("#{}", element_id);
        }

        match self.parent(id) {
            Some(parent) => {
                let position = self
                    .element_children(parent)
                    .iter()
                    .filter(|&&c| !self.is_annotation(c))
                    .position(|&c| c == id)
                    .unwrap_or(0);
                format!("{} > {}:nth-child({})", self.css_path(parent), tag, position + 1)
            }
            None => tag.to_string(),
        }
    }

    /// Short description of where the node sits: nearest landmark and parent
    pub fn context(&self, id: NodeId) -> String {
        const LANDMARKS: [&str; 8] = ["main", "nav", "header", "footer", "aside", "section", "article", "form"];

        let parent = self.parent(id);
        let mut current = parent;
        while let Some(node) = current {
            if let Some(tag) = self.tag_name(node).filter(|t| LANDMARKS.contains(t)) {
                return match parent {
                    Some(p) if p != node => format!("in {} within <{}>", self.open_tag(p), tag),
                    _ => format!("in {}", self.open_tag(node)),
                };
            }
            current = self.parent(node);
        }

        parent
            .map(|p| format!("in {}", self.open_tag(p)))
            .unwrap_or_else(|| "document root".to_string())
    }

    /// Opening tag with attributes, e.g. `<a href="/x" class="nav">`
    pub fn open_tag(&self, id: NodeId) -> String {
        let Some(tag) = self.tag_name(id) else {
            return String::new();
        };
        let mut out = format!("<{}", tag);
        for (name, value) in self.attributes(id) {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
        }
        out.push('>');
        out
    }

    /// Serialized markup of the node and its subtree
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialized markup truncated to `max_chars`
    pub fn snippet(&self, id: NodeId, max_chars: usize) -> String {
        let html = self.outer_html(id);
        if html.chars().count() <= max_chars {
            return html;
        }
        let truncated: String = html.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.outer_html(self.root)
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(&escape(text, false)),
            Some(NodeData::Element { tag, .. }) => {
                out.push_str(&self.open_tag(id));
                if is_void(tag) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            None => {}
        }
    }

    /// Convert a subtree back into a serializable snapshot
    pub fn to_element_node(&self, id: NodeId) -> Option<ElementNode> {
        match &self.node(id)?.data {
            NodeData::Text(text) => Some(ElementNode::new(TEXT_TAG).with_text(text.clone())),
            NodeData::Element { tag, attributes, computed } => {
                let mut node = ElementNode::new(tag.clone()).with_attributes(attributes.clone());
                node.computed_style = computed.clone();
                node.children = self
                    .children(id)
                    .iter()
                    .filter_map(|&c| self.to_element_node(c))
                    .collect();
                Some(node)
            }
        }
    }
}

fn user_agent_default(tag: &str, attributes: &IndexMap<String, String>, property: &str) -> Option<&'static str> {
    match property {
        "cursor" if tag == "a" && attributes.contains_key("href") => Some("pointer"),
        "cursor" => Some("auto"),
        "outline" => Some("none"),
        "background-color" => Some("transparent"),
        _ => None,
    }
}

/// Split an inline style into `(property, value)` pairs
///
/// Declarations are tokenized, so a `;` inside a string or a block such as
/// `url(data:image/png;base64,...)` does not end the declaration.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    let mut input = ParserInput::new(style);
    let mut parser = CssParser::new(&mut input);
    let mut declarations = Vec::new();

    while !parser.is_exhausted() {
        let start = parser.position();
        if parser.parse_until_after(Delimiter::Semicolon, skip_tokens).is_err() {
            break;
        }
        let raw = parser.slice_from(start).trim().trim_end_matches(';');
        let Some((name, value)) = raw.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if !name.is_empty() {
            declarations.push((name.to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    declarations
}

fn skip_tokens<'i>(parser: &mut CssParser<'i, '_>) -> std::result::Result<(), ParseError<'i, ()>> {
    while parser.next_including_whitespace_and_comments().is_ok() {}
    Ok(())
}

fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Elements that cannot have children
pub fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_document() -> Document {
        let root = ElementNode::new("html").with_attribute("lang", "en").with_children(vec![
            ElementNode::new("body").with_children(vec![
                ElementNode::new("header").with_children(vec![
                    ElementNode::new("button")
                        .with_attribute("id", "nav-btn")
                        .with_text("Menu"),
                ]),
                ElementNode::new("main").with_children(vec![
                    ElementNode::new("h1").with_text("Title"),
                    ElementNode::new("p").with_children(vec![
                        ElementNode::text("Read "),
                        ElementNode::new("a").with_attribute("href", "/more").with_text("more"),
                    ]),
                    ElementNode::new("p").with_text("Second"),
                ]),
            ]),
        ]);
        Document::new(root)
    }

    fn first(doc: &Document, selector: &str) -> NodeId {
        doc.query_selector_all(selector).unwrap()[0]
    }

    #[test]
    fn test_document_structure() {
        let doc = create_test_document();
        let root = doc.document_element();
        assert_eq!(doc.tag_name(root), Some("html"));
        assert_eq!(doc.attribute(root, "lang"), Some("en"));
        assert_eq!(doc.body().and_then(|b| doc.tag_name(b)), Some("body"));
        assert_eq!(doc.visible_text(first(&doc, "p")), "Read more");
        assert_eq!(doc.text_content(first(&doc, "main")), "TitleRead moreSecond");
    }

    #[test]
    fn test_xpath_and_css_path() {
        let doc = create_test_document();
        let second_p = doc.query_selector_all("p").unwrap()[1];
        assert_eq!(doc.xpath(second_p), "/html[1]/body[1]/main[1]/p[2]");
        assert_eq!(doc.css_path(second_p), "html > body:nth-child(1) > main:nth-child(2) > p:nth-child(3)");
        assert_eq!(doc.css_path(first(&doc, "button")), "#nav-btn");
    }

    #[test]
    fn test_context_names_landmark() {
        let doc = create_test_document();
        assert_eq!(doc.context(first(&doc, "a")), "in <p> within <main>");
        assert_eq!(doc.context(first(&doc, "h1")), "in <main>");
        assert_eq!(doc.context(doc.document_element()), "document root");
    }

    #[test]
    fn test_inline_style_round_trip() {
        let mut doc = create_test_document();
        let h1 = first(&doc, "h1");

        assert_eq!(doc.style_property(h1, "outline"), None);
        assert_eq!(doc.computed_style(h1, "outline").as_deref(), Some("none"));

        doc.set_style_property(h1, "outline", "2px solid red").unwrap();
        doc.set_style_property(h1, "color", "blue").unwrap();
        assert_eq!(doc.attribute(h1, "style"), Some("outline: 2px solid red; color: blue;"));
        assert_eq!(doc.computed_style(h1, "outline").as_deref(), Some("2px solid red"));

        doc.remove_style_property(h1, "outline").unwrap();
        assert_eq!(doc.attribute(h1, "style"), Some("color: blue;"));
    }

    #[test]
    fn test_declarations_keep_semicolons_inside_urls_and_strings() {
        let declarations = parse_declarations(
            "background:url(data:image/png;base64,AAAA);font-family: 'a;b', serif ;; content:\"x;y\"",
        );
        assert_eq!(
            declarations,
            vec![
                ("background".to_string(), "url(data:image/png;base64,AAAA)".to_string()),
                ("font-family".to_string(), "'a;b', serif".to_string()),
                ("content".to_string(), "\"x;y\"".to_string()),
            ]
        );

        let mut doc = create_test_document();
        let h1 = first(&doc, "h1");
        doc.set_attribute(h1, "style", "background:url(\"a;b.png\") no-repeat;color:red").unwrap();
        doc.set_style_property(h1, "outline", "2px solid red").unwrap();
        assert_eq!(
            doc.style_property(h1, "background").as_deref(),
            Some("url(\"a;b.png\") no-repeat")
        );
        assert_eq!(doc.style_property(h1, "color").as_deref(), Some("red"));
    }

    #[test]
    fn test_computed_style_falls_back_to_user_agent() {
        let doc = Document::new(ElementNode::new("html").with_children(vec![
            ElementNode::new("a").with_attribute("href", "/x"),
            ElementNode::new("button").with_computed_style("cursor", "default"),
            ElementNode::new("div"),
        ]));
        assert_eq!(doc.computed_style(first(&doc, "a"), "cursor").as_deref(), Some("pointer"));
        assert_eq!(doc.computed_style(first(&doc, "button"), "cursor").as_deref(), Some("default"));
        assert_eq!(doc.computed_style(first(&doc, "div"), "cursor").as_deref(), Some("auto"));
    }

    #[test]
    fn test_mutation_records_follow_filter() {
        let mut doc = create_test_document();
        let root = doc.document_element();
        let observer = doc.observe(root, MutationFilter::subtree_child_list().with_attributes(["class"]));

        let main = first(&doc, "main");
        let h2 = doc.create_element("h2");
        doc.append_child(main, h2).unwrap();
        doc.set_attribute(root, "class", "dark").unwrap();
        doc.set_attribute(root, "style", "color: red;").unwrap();

        let records = doc.take_records(observer);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            MutationRecord::ChildList { target: main, added: vec![h2], removed: vec![] }
        );
        assert_eq!(records[1], MutationRecord::Attributes { target: root, name: "class".into() });
        assert!(doc.take_records(observer).is_empty());

        doc.disconnect(observer);
        doc.remove(h2).unwrap();
        assert!(!doc.has_pending_notifications());
    }

    #[test]
    fn test_detached_mutations_are_not_reported() {
        let mut doc = create_test_document();
        let observer = doc.observe(doc.document_element(), MutationFilter::subtree_child_list());
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();
        assert!(doc.take_records(observer).is_empty());
    }

    #[test]
    fn test_color_scheme_notifications() {
        let mut doc = create_test_document();
        let watcher = doc.watch_color_scheme();
        doc.set_color_scheme(ColorScheme::Light);
        assert!(!doc.take_scheme_change(watcher));

        doc.set_color_scheme(ColorScheme::Dark);
        assert!(doc.has_pending_notifications());
        assert!(doc.take_scheme_change(watcher));
        assert!(!doc.take_scheme_change(watcher));
    }

    #[test]
    fn test_dispose_invalidates_handles() {
        let mut doc = create_test_document();
        let main = first(&doc, "main");
        let h1 = first(&doc, "h1");
        doc.dispose(main).unwrap();
        assert!(!doc.contains(main));
        assert!(!doc.contains(h1));
        assert!(doc.query_selector_all("h1").unwrap().is_empty());
        assert!(matches!(doc.set_attribute(h1, "id", "x"), Err(AuditError::NodeNotFound(_))));
    }

    #[test]
    fn test_annotation_marker_and_visible_text() {
        let mut doc = create_test_document();
        let h1 = first(&doc, "h1");
        let badge = doc.create_element("span");
        doc.set_attribute(badge, ANNOTATION_MARKER, "badge").unwrap();
        let text = doc.create_text("H1");
        doc.append_child(badge, text).unwrap();
        doc.append_child(h1, badge).unwrap();

        assert!(doc.is_annotation(text));
        assert_eq!(doc.text_content(h1), "TitleH1");
        assert_eq!(doc.visible_text(h1), "Title");
    }

    #[test]
    fn test_outer_html_and_snippet() {
        let doc = create_test_document();
        let a = first(&doc, "a");
        assert_eq!(doc.outer_html(a), "<a href=\"/more\">more</a>");
        assert_eq!(doc.snippet(a, 10), "<a href...");
    }

    #[test]
    fn test_to_element_node_round_trip() {
        let doc = create_test_document();
        let rebuilt = Document::new(doc.to_element_node(doc.document_element()).unwrap());
        assert_eq!(rebuilt.to_html(), doc.to_html());
    }
}
