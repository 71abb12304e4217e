//! In-memory host document.
//!
//! Nodes live in a flat arena indexed by [`NodeId`]. Every adapter call is
//! appended to a mutation log ([`HostOp`]) and marks the touched node with
//! [`Dirty`] flags, which is what a painter would consume to redraw only the
//! changed parts.

use std::fmt::Write as _;

use bitflags::bitflags;
use tracing::trace;

use super::{HostAdapter, NodeKind};
use crate::element::{Event, EventHandler, PropValue, NODE_VALUE};
use crate::error::HostError;

// =============================================================================
// Types
// =============================================================================

/// Index of a node in a [`MemoryHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// What changed on a node since the last [`MemoryHost::clear_dirty`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Dirty: u8 {
        const NONE = 0;
        /// Node was created.
        const CREATED = 1 << 0;
        /// An attribute was set or removed.
        const PROPS = 1 << 1;
        /// A listener was added or removed.
        const LISTENERS = 1 << 2;
        /// A child was appended or removed.
        const CHILDREN = 1 << 3;
        /// Text value changed (text nodes only).
        const TEXT = 1 << 4;
    }
}

/// Kind of a node in the memory document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryNodeKind {
    /// Container created with [`MemoryHost::create_root`].
    Root,
    Element(String),
    Text,
}

/// One recorded adapter call.
#[derive(Clone, Debug, PartialEq)]
pub enum HostOp {
    Create { node: NodeId },
    SetProperty { node: NodeId, key: String, value: PropValue },
    RemoveProperty { node: NodeId, key: String },
    AddListener { node: NodeId, event: String, handler: EventHandler },
    RemoveListener { node: NodeId, event: String, handler: EventHandler },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
}

impl HostOp {
    /// The node the operation mutated (the parent for child operations).
    pub fn target(&self) -> NodeId {
        match self {
            Self::Create { node }
            | Self::SetProperty { node, .. }
            | Self::RemoveProperty { node, .. }
            | Self::AddListener { node, .. }
            | Self::RemoveListener { node, .. } => *node,
            Self::AppendChild { parent, .. } | Self::RemoveChild { parent, .. } => *parent,
        }
    }
}

/// A node in the memory document.
#[derive(Clone, Debug)]
pub struct MemoryNode {
    kind: MemoryNodeKind,
    properties: Vec<(String, PropValue)>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    dirty: Dirty,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
            dirty: Dirty::CREATED,
        }
    }

    pub fn kind(&self) -> &MemoryNodeKind {
        &self.kind
    }

    pub fn properties(&self) -> &[(String, PropValue)] {
        &self.properties
    }

    pub fn listeners(&self) -> &[(String, EventHandler)] {
        &self.listeners
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn property(&self, key: &str) -> Option<&PropValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

// =============================================================================
// MemoryHost
// =============================================================================

/// Arena-backed document implementing [`HostAdapter`].
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    log: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container node to render into. Not recorded in the log.
    pub fn create_root(&mut self) -> NodeId {
        self.push(MemoryNode::new(MemoryNodeKind::Root))
    }

    fn push(&mut self, node: MemoryNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| HostError::UnknownNode(format!("{id:?}")))
    }

    fn detach(&mut self, child: NodeId) -> Result<(), HostError> {
        if let Some(old_parent) = self.node_mut(child)?.parent.take() {
            let parent = self.node_mut(old_parent)?;
            parent.children.retain(|c| *c != child);
            parent.dirty |= Dirty::CHILDREN;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0)
    }

    /// Total nodes ever created, attached or not.
    ///
    /// The arena only grows. Removed nodes and nodes built by an abandoned
    /// render stay addressable (detached, with their last state) until the
    /// host is dropped, so ids are never reused.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(MemoryNode::children).unwrap_or_default()
    }

    /// Tag of an element node.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.node(id)?.kind() {
            MemoryNodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn property(&self, id: NodeId, key: &str) -> Option<&PropValue> {
        self.node(id)?.property(key)
    }

    /// Concatenated text of every text node below `id` (inclusive).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        if node.kind == MemoryNodeKind::Text {
            if let Some(value) = node.property(NODE_VALUE) {
                out.push_str(&value.to_string());
            }
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Element nodes below `root` with the given tag, in document order.
    pub fn query_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.tag(id) == Some(tag) {
                found.push(id);
            }
            stack.extend(self.children(id).iter().rev());
        }
        found
    }

    /// Serialize the subtree below `id` (exclusive for roots) as markup.
    ///
    /// Listeners are omitted; attributes keep insertion order.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            MemoryNodeKind::Root => {
                for child in &node.children {
                    self.write_markup(*child, out);
                }
            }
            MemoryNodeKind::Text => {
                if let Some(value) = node.property(NODE_VALUE) {
                    out.push_str(&value.to_string());
                }
            }
            MemoryNodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in &node.properties {
                    let _ = write!(out, " {key}=\"{value}\"");
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Deliver `event` to every listener on `node` registered for its name.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        let handlers: Vec<EventHandler> = self
            .node(node)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|(name, _)| *name == event.name)
                    .map(|(_, handler)| handler.clone())
                    .collect()
            })
            .unwrap_or_default();

        for handler in &handlers {
            handler.call(event);
        }
        handlers.len()
    }

    /// Shorthand for dispatching a `click` event.
    pub fn click(&self, node: NodeId) -> usize {
        self.dispatch(node, &Event::new("click"))
    }

    // -------------------------------------------------------------------------
    // Mutation log and dirty tracking
    // -------------------------------------------------------------------------

    pub fn ops(&self) -> &[HostOp] {
        &self.log
    }

    /// Drain the mutation log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.log)
    }

    pub fn dirty(&self, id: NodeId) -> Dirty {
        self.node(id).map(MemoryNode::dirty).unwrap_or_default()
    }

    /// Nodes with any dirty flag set.
    pub fn dirty_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.dirty.is_empty())
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Reset all dirty flags (after a paint) and the mutation log.
    pub fn clear_dirty(&mut self) {
        for node in &mut self.nodes {
            node.dirty = Dirty::NONE;
        }
        self.log.clear();
    }
}

impl HostAdapter for MemoryHost {
    type Node = NodeId;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, HostError> {
        let kind = match kind {
            NodeKind::Element("") => return Err(HostError::InvalidTag(String::new())),
            NodeKind::Element(tag) => MemoryNodeKind::Element(tag.to_owned()),
            NodeKind::Text => MemoryNodeKind::Text,
        };
        let node = self.push(MemoryNode::new(kind));
        trace!(?node, "create node");
        self.log.push(HostOp::Create { node });
        Ok(node)
    }

    fn set_property(
        &mut self,
        node: &NodeId,
        key: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        match target.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value.clone(),
            None => target.properties.push((key.to_owned(), value.clone())),
        }
        target.dirty |= if target.kind == MemoryNodeKind::Text && key == NODE_VALUE {
            Dirty::TEXT
        } else {
            Dirty::PROPS
        };
        self.log.push(HostOp::SetProperty {
            node: *node,
            key: key.to_owned(),
            value: value.clone(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: &NodeId, key: &str) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        target.properties.retain(|(k, _)| k != key);
        target.dirty |= Dirty::PROPS;
        self.log.push(HostOp::RemoveProperty {
            node: *node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        target.listeners.push((event.to_owned(), handler.clone()));
        target.dirty |= Dirty::LISTENERS;
        self.log.push(HostOp::AddListener {
            node: *node,
            event: event.to_owned(),
            handler: handler.clone(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let target = self.node_mut(*node)?;
        // Unknown handlers are ignored, like the DOM does.
        if let Some(pos) = target
            .listeners
            .iter()
            .position(|(name, h)| name == event && h.ptr_eq(handler))
        {
            target.listeners.remove(pos);
        }
        target.dirty |= Dirty::LISTENERS;
        self.log.push(HostOp::RemoveListener {
            node: *node,
            event: event.to_owned(),
            handler: handler.clone(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.node_mut(*parent)?;
        self.detach(*child)?;
        self.node_mut(*child)?.parent = Some(*parent);
        let target = self.node_mut(*parent)?;
        target.children.push(*child);
        target.dirty |= Dirty::CHILDREN;
        trace!(?parent, ?child, "append child");
        self.log.push(HostOp::AppendChild {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        if self.node_mut(*child)?.parent != Some(*parent) {
            return Err(HostError::NotAChild {
                parent: format!("{parent:?}"),
                child: format!("{child:?}"),
            });
        }
        self.detach(*child)?;
        trace!(?parent, ?child, "remove child");
        self.log.push(HostOp::RemoveChild {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_append_and_remove() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let div = host.create_node(NodeKind::Element("div")).unwrap();

        host.append_child(&root, &div).unwrap();
        assert_eq!(host.children(root), &[div]);
        assert_eq!(host.node(div).unwrap().parent(), Some(root));

        host.remove_child(&root, &div).unwrap();
        assert!(host.children(root).is_empty());
        assert_eq!(host.node(div).unwrap().parent(), None);
    }

    #[test]
    fn test_removed_nodes_stay_addressable() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let p = host.create_node(NodeKind::Element("p")).unwrap();
        host.append_child(&root, &p).unwrap();
        host.remove_child(&root, &p).unwrap();

        let span = host.create_node(NodeKind::Element("span")).unwrap();

        assert_eq!(host.node_count(), 3);
        assert_ne!(span, p);
        assert_eq!(host.tag(p), Some("p"));
    }

    #[test]
    fn test_remove_non_child_fails() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let div = host.create_node(NodeKind::Element("div")).unwrap();

        let err = host.remove_child(&root, &div).unwrap_err();
        assert!(matches!(err, HostError::NotAChild { .. }));
    }

    #[test]
    fn test_append_moves_node() {
        let mut host = MemoryHost::new();
        let a = host.create_root();
        let b = host.create_root();
        let span = host.create_node(NodeKind::Element("span")).unwrap();

        host.append_child(&a, &span).unwrap();
        host.append_child(&b, &span).unwrap();

        assert!(host.children(a).is_empty());
        assert_eq!(host.children(b), &[span]);
    }

    #[test]
    fn test_empty_tag_rejected() {
        let mut host = MemoryHost::new();
        assert_eq!(
            host.create_node(NodeKind::Element("")),
            Err(HostError::InvalidTag(String::new()))
        );
    }

    #[test]
    fn test_text_content_and_markup() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let p = host.create_node(NodeKind::Element("p")).unwrap();
        let t = host.create_node(NodeKind::Text).unwrap();
        host.set_property(&p, "id", &"x".into()).unwrap();
        host.set_property(&t, NODE_VALUE, &"hi".into()).unwrap();
        host.append_child(&p, &t).unwrap();
        host.append_child(&root, &p).unwrap();

        assert_eq!(host.text_content(root), "hi");
        assert_eq!(host.to_markup(root), "<p id=\"x\">hi</p>");
        assert_eq!(host.query_tag(root, "p"), vec![p]);
    }

    #[test]
    fn test_dispatch_and_remove_listener() {
        let mut host = MemoryHost::new();
        let button = host.create_node(NodeKind::Element("button")).unwrap();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let handler = EventHandler::new(move |_| hits_clone.set(hits_clone.get() + 1));

        host.add_listener(&button, "click", &handler).unwrap();
        assert_eq!(host.click(button), 1);
        assert_eq!(host.dispatch(button, &Event::new("input")), 0);
        assert_eq!(hits.get(), 1);

        host.remove_listener(&button, "click", &handler).unwrap();
        assert_eq!(host.click(button), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dirty_flags() {
        let mut host = MemoryHost::new();
        let root = host.create_root();
        let t = host.create_node(NodeKind::Text).unwrap();
        host.append_child(&root, &t).unwrap();
        host.clear_dirty();
        assert!(host.dirty_nodes().is_empty());
        assert!(host.ops().is_empty());

        host.set_property(&t, NODE_VALUE, &"2".into()).unwrap();
        assert_eq!(host.dirty(t), Dirty::TEXT);
        assert_eq!(host.dirty(root), Dirty::NONE);
        assert_eq!(host.dirty_nodes(), vec![t]);
    }
}
