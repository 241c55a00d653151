//! In-memory element tree standing in for the host page.
//!
//! The reconciler only needs a small slice of DOM behaviour: element creation,
//! attributes and classes, text, `append_child` / `insert_before` / `remove`,
//! subtree child-list observation, and click dispatch. This module provides
//! exactly that slice over an arena of nodes addressed by [`NodeId`].
//!
//! # Mutation Observation
//!
//! [`Document::observe`] registers a callback for child-list changes anywhere
//! in a target's subtree. Callbacks run synchronously, right after the tree
//! edit, and receive a [`MutationRecord`]. Moving an already attached node
//! produces two records: one removal at the old parent, one addition at the
//! new parent.
//!
//! # Click Dispatch
//!
//! [`Document::click`] bubbles from the clicked node up to the root, invoking
//! listeners registered with [`Document::add_click_listener`] on the way.
//!
//! # Slot Reuse
//!
//! [`Document::remove`] frees the slots of the whole subtree and later
//! allocations reuse them. Every [`NodeId`] carries the generation of its
//! slot, so an id that outlived its node keeps failing with
//! [`DomError::Removed`] even after the slot has been handed out again.

mod matcher;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use matcher::{AttributeMatch, ElementMatcher};
use parking_lot::Mutex;
use thiserror::Error;

/// A document shared between the host and the reconciler.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Callback invoked for every child-list mutation inside an observed subtree.
pub type MutationCallback = Arc<dyn Fn(&MutationRecord) + Send + Sync>;

/// Listener invoked when a node (or one of its descendants) is clicked.
pub type ClickListener = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

// ============================================================================
// Identifiers and Errors
// ============================================================================

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.generation > 0 {
            write!(f, "v{}", self.generation)?;
        }
        Ok(())
    }
}

/// Handle to a registered subtree observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Errors raised by invalid tree operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomError {
    /// The node id was never allocated by this document.
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// The node was removed from the document and can no longer be edited.
    #[error("node {0} has been removed from the document")]
    Removed(NodeId),

    /// The reference node passed to `insert_before` is not a child of the parent.
    #[error("node {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },

    /// The insertion would make a node its own ancestor.
    #[error("inserting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// The operation requires an element but the node is text.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
}

/// A single child-list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: NodeId,
    /// Nodes inserted under `target`.
    pub added: Vec<NodeId>,
    /// Nodes detached from `target`.
    pub removed: Vec<NodeId>,
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
    free: bool,
}

impl Node {
    const fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            generation: 0,
            free: false,
        }
    }
}

struct Observation {
    id: ObserverId,
    target: NodeId,
    callback: MutationCallback,
}

// ============================================================================
// Document
// ============================================================================

/// Arena-backed element tree.
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: NodeId,
    observations: Vec<Observation>,
    next_observer: u64,
    listeners: HashMap<NodeId, Vec<ClickListener>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("slots", &self.slot_count())
            .field("live", &self.live_count())
            .field("observers", &self.observations.len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self { Self::new() }
}

impl Document {
    /// Creates an empty document with a `body` root element.
    #[must_use]
    pub fn new() -> Self {
        let root = Node::new(NodeData::Element(ElementData {
            tag: "body".to_string(),
            attributes: Vec::new(),
            classes: Vec::new(),
        }));

        Self {
            nodes: vec![root],
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            observations: Vec::new(),
            next_observer: 0,
            listeners: HashMap::new(),
        }
    }

    /// Wraps the document for sharing with a reconciler.
    #[must_use]
    pub fn into_shared(self) -> SharedDocument { Arc::new(Mutex::new(self)) }

    /// Returns the root element.
    #[must_use]
    pub const fn root(&self) -> NodeId { self.root }

    /// Number of arena slots allocated so far, live or free.
    #[must_use]
    pub fn slot_count(&self) -> usize { self.nodes.len() }

    /// Number of nodes that have not been removed.
    #[must_use]
    pub fn live_count(&self) -> usize { self.nodes.len() - self.free.len() }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_string(),
            attributes: Vec::new(),
            classes: Vec::new(),
        }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index];
            slot.data = data;
            slot.free = false;
            return NodeId { index, generation: slot.generation };
        }

        let index = self.nodes.len();
        self.nodes.push(Node::new(data));
        NodeId { index, generation: 0 }
    }

    /// Frees a detached node's slot. Its children must already be freed or moved.
    fn release(&mut self, id: NodeId) {
        let slot = &mut self.nodes[id.index];
        slot.free = true;
        slot.generation = slot.generation.wrapping_add(1);
        slot.parent = None;
        slot.children.clear();
        slot.data = NodeData::Text(String::new());
        self.free.push(id.index);
    }

    // ========================================================================
    // Node access
    // ========================================================================

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        let node = self.nodes.get(id.index).ok_or(DomError::UnknownNode(id))?;
        if node.free || node.generation != id.generation {
            return Err(DomError::Removed(id));
        }
        Ok(node)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        let node = self.nodes.get_mut(id.index).ok_or(DomError::UnknownNode(id))?;
        if node.free || node.generation != id.generation {
            return Err(DomError::Removed(id));
        }
        Ok(node)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).ok()?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// Returns the tag name of an element.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> { self.element(id).map(|e| e.tag.as_str()) }

    /// Returns the parent of a node, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    /// Returns the children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Returns the sibling immediately after a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Returns `true` if the node is reachable from the root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Returns all descendants of a node in document (pre-)order, excluding the node itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    // ========================================================================
    // Attributes, classes and text
    // ========================================================================

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown, removed, or not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if let Some(entry) = element.attributes.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value.to_string();
        } else {
            element.attributes.push((name.to_string(), value.to_string()));
        }
        Ok(())
    }

    /// Returns `true` if the element carries the class.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    /// Adds a class if not already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown, removed, or not an element.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        if !element.classes.iter().any(|c| c == class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Flips a class, returning whether it is present afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown, removed, or not an element.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> Result<bool, DomError> {
        let element = self.element_mut(id)?;
        if let Some(index) = element.classes.iter().position(|c| c == class) {
            element.classes.remove(index);
            Ok(false)
        } else {
            element.classes.push(class.to_string());
            Ok(true)
        }
    }

    /// Returns the concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Ok(Node { data: NodeData::Text(text), .. }) = self.node(id) {
            return text.clone();
        }

        self.descendants(id)
            .into_iter()
            .filter_map(|node| match &self.node(node).ok()?.data {
                NodeData::Text(text) => Some(text.as_str()),
                NodeData::Element(_) => None,
            })
            .collect()
    }

    // ========================================================================
    // Tree edits
    // ========================================================================

    /// Appends `child` as the last child of `parent`, moving it if attached elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown or removed, or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` under `parent` before `reference`, or last when `reference` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a node is unknown or removed, `reference` is not a child of
    /// `parent`, or the move would create a cycle.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node_mut(parent)?;
        self.node_mut(child)?;

        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }

        let mut reference = reference;
        if let Some(node) = reference {
            if self.parent(node) != Some(parent) {
                return Err(DomError::NotAChild { parent, reference: node });
            }
            if node == child {
                reference = self.next_sibling(child);
            }
        }

        self.detach(child);

        let index = match reference {
            Some(node) => self.children(parent).iter().position(|&c| c == node).unwrap_or(0),
            None => self.children(parent).len(),
        };
        self.nodes[parent.index].children.insert(index, child);
        self.nodes[child.index].parent = Some(parent);

        self.notify(&MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Detaches a node and discards its whole subtree, freeing its slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or already removed, or is the root.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node_mut(id)?;
        if id == self.root {
            return Err(DomError::NotAChild { parent: id, reference: id });
        }

        self.detach(id);

        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            self.listeners.remove(&node);
            self.release(node);
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index].parent.take() else {
            return;
        };
        self.nodes[parent.index].children.retain(|&c| c != id);
        self.notify(&MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Finds the connected element whose `id` attribute equals `value`.
    #[must_use]
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(value))
    }

    /// Returns the first descendant of `scope` that matches.
    #[must_use]
    pub fn query(&self, scope: NodeId, matcher: &ElementMatcher) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|&node| matcher.matches(self, node))
    }

    /// Returns every descendant of `scope` that matches, in document order.
    #[must_use]
    pub fn query_all(&self, scope: NodeId, matcher: &ElementMatcher) -> Vec<NodeId> {
        self.descendants(scope).into_iter().filter(|&node| matcher.matches(self, node)).collect()
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Observes child-list changes in `target`'s subtree.
    pub fn observe(&mut self, target: NodeId, callback: MutationCallback) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observations.push(Observation { id, target, callback });
        id
    }

    /// Stops an observation. Returns `false` if it was not registered.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observations.len();
        self.observations.retain(|o| o.id != id);
        self.observations.len() != before
    }

    /// Returns the number of active observations.
    #[must_use]
    pub fn observer_count(&self) -> usize { self.observations.len() }

    fn notify(&self, record: &MutationRecord) {
        for observation in &self.observations {
            if self.is_inclusive_ancestor(observation.target, record.target) {
                (observation.callback)(record);
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers a click listener on a node.
    pub fn add_click_listener(&mut self, id: NodeId, listener: ClickListener) {
        self.listeners.entry(id).or_default().push(listener);
    }

    /// Dispatches a click on `id`, bubbling to its ancestors.
    ///
    /// Returns the number of listeners invoked.
    pub fn click(&mut self, id: NodeId) -> usize {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }

        let mut invoked = 0;
        for node in path {
            let listeners = self.listeners.get(&node).cloned().unwrap_or_default();
            for listener in listeners {
                listener(self, node);
                invoked += 1;
            }
        }
        invoked
    }
}
