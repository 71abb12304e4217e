//! Fiber Tree - Arena of fibers linked by index.
//!
//! Fibers are stored in a generational [`SlotMap`] and reference each other
//! through [`FiberId`]s: `parent`, first `child`, next `sibling`, and the
//! `alternate` from the other buffer. Dropping a finished tree means removing
//! its arena entries; a stale id simply resolves to nothing.
//!
//! ```text
//! root ── child ──▶ div ── child ──▶ h1 ── sibling ──▶ button
//!                    ▲                │                   │
//!                    └──── parent ────┴───── parent ──────┘
//! ```

use std::collections::HashSet;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::element::{Component, Element, ElementType, Props};
use crate::engine::hooks::HookRef;
use crate::error::{EngineError, Result};

new_key_type! {
    /// Stable handle to a fiber in the arena.
    pub struct FiberId;
}

// =============================================================================
// Types
// =============================================================================

/// Action the commit phase takes for a fiber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,
    /// New node, append under the nearest host ancestor.
    Placement,
    /// Same node as the alternate, diff props.
    Update,
    /// Previous-tree fiber with no counterpart, remove its nodes.
    Deletion,
}

/// What a fiber renders as.
#[derive(Clone, Debug, PartialEq)]
pub enum FiberType {
    /// The container passed to `render`.
    Root,
    Native(Rc<str>),
    Text,
    Component(Component),
}

impl FiberType {
    /// Identity/tag comparison used by the reconciler.
    pub fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (Self::Native(a), ElementType::Native(b)) => a == b,
            (Self::Text, ElementType::Text) => true,
            (Self::Component(a), ElementType::Component(b)) => a == b,
            _ => false,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component(_))
    }
}

impl From<&ElementType> for FiberType {
    fn from(ty: &ElementType) -> Self {
        match ty {
            ElementType::Native(tag) => Self::Native(tag.clone()),
            ElementType::Text => Self::Text,
            ElementType::Component(c) => Self::Component(c.clone()),
        }
    }
}

/// One tree position's rendering state for one render.
#[derive(Debug)]
pub struct Fiber<N> {
    pub ty: FiberType,
    pub props: Rc<Props>,
    /// Native node this fiber owns. Always `None` for components.
    pub host_node: Option<N>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// Same position in the other buffer. Cleared once the tree is committed.
    pub alternate: Option<FiberId>,
    pub effect: Effect,
    pub(crate) hooks: Vec<HookRef>,
}

impl<N: Clone> Fiber<N> {
    /// Root fiber owning the host container.
    pub(crate) fn root(container: N, props: Rc<Props>, alternate: Option<FiberId>) -> Self {
        Self {
            ty: FiberType::Root,
            props,
            host_node: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: Effect::None,
            hooks: Vec::new(),
        }
    }

    /// New fiber for an element with no reusable predecessor.
    pub(crate) fn placement(element: &Element, parent: FiberId) -> Self {
        Self {
            ty: FiberType::from(&element.ty),
            props: element.props.clone(),
            host_node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: Effect::Placement,
            hooks: Vec::new(),
        }
    }

    /// Fiber reusing `old`'s node with the element's new props.
    pub(crate) fn update(element: &Element, parent: FiberId, old_id: FiberId, old: &Self) -> Self {
        Self {
            ty: old.ty.clone(),
            props: element.props.clone(),
            host_node: old.host_node.clone(),
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: Some(old_id),
            effect: Effect::Update,
            hooks: Vec::new(),
        }
    }

    /// Number of hook cells recorded on the last render of this fiber.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

// =============================================================================
// FiberTree
// =============================================================================

/// Arena owning every live fiber of the current and work-in-progress trees.
#[derive(Debug)]
pub struct FiberTree<N> {
    fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Default for FiberTree<N> {
    fn default() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }
}

impl<N: Clone> FiberTree<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
        self.fibers.get(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Like [`FiberTree::get`], but a missing fiber is an error.
    pub(crate) fn fiber(&self, id: FiberId) -> Result<&Fiber<N>> {
        self.fibers
            .get(id)
            .ok_or(EngineError::MissingFiber { fiber: id })
    }

    pub(crate) fn fiber_mut(&mut self, id: FiberId) -> Result<&mut Fiber<N>> {
        self.fibers
            .get_mut(id)
            .ok_or(EngineError::MissingFiber { fiber: id })
    }

    /// Child fibers of `id` in sibling order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|f| f.child);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.get(child).and_then(|f| f.sibling);
        }
        out
    }

    /// Next fiber in pre-order after `id`, never leaving the subtree of `root`.
    ///
    /// Own child first; otherwise the nearest sibling of `id` or an ancestor.
    pub fn next_in_preorder(&self, id: FiberId, root: FiberId) -> Option<FiberId> {
        match self.get(id)?.child {
            Some(child) => Some(child),
            None => self.next_after_subtree(id, root),
        }
    }

    /// Next fiber in pre-order once the subtree of `id` is done.
    pub fn next_after_subtree(&self, id: FiberId, root: FiberId) -> Option<FiberId> {
        let mut cursor = id;
        while cursor != root {
            let current = self.get(cursor)?;
            if let Some(sibling) = current.sibling {
                return Some(sibling);
            }
            cursor = current.parent?;
        }
        None
    }

    /// Native node of the nearest ancestor that owns one.
    ///
    /// Component fibers own no node and are skipped.
    pub fn host_parent(&self, id: FiberId) -> Result<N> {
        let mut cursor = self.fiber(id)?.parent;
        while let Some(parent_id) = cursor {
            let parent = self.fiber(parent_id)?;
            if let Some(node) = &parent.host_node {
                return Ok(node.clone());
            }
            cursor = parent.parent;
        }
        Err(EngineError::OrphanFiber { fiber: id })
    }

    /// Keep only the tree rooted at `root`; everything else is dropped.
    ///
    /// Surviving fibers lose their `alternate` link since the other buffer is
    /// gone.
    pub(crate) fn retain_tree(&mut self, root: FiberId) {
        let mut live = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.fibers.get(id) else { continue };
            if !live.insert(id) {
                continue;
            }
            stack.extend(fiber.child);
            stack.extend(fiber.sibling.filter(|_| id != root));
        }
        self.fibers.retain(|id, fiber| {
            fiber.alternate = None;
            live.contains(&id)
        });
    }

    pub(crate) fn clear(&mut self) {
        self.fibers.clear();
    }
}
