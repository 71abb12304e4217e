//! Commit - Applies a finished work-in-progress tree to the host.
//!
//! Runs synchronously and in one go once the render phase has no units left:
//!
//! 1. remove every queued deletion from its nearest host ancestor
//! 2. walk the WIP tree in pre-order (skipping the root) and apply each
//!    fiber's effect
//! 3. make the WIP root current and drop the previous buffer
//!
//! Fibers without a node of their own (components) contribute nothing to the
//! host. Deleting one removes the nodes of its first native descendants.

use std::rc::Rc;

use tracing::{debug, trace};

use super::fiber::{Effect, FiberId};
use super::host_props::update_host_props;
use super::Engine;
use crate::error::{EngineError, Result};
use crate::host::HostAdapter;

/// Effect counts of one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub placements: usize,
    pub updates: usize,
    pub deletions: usize,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.deletions == 0
    }
}

impl<H: HostAdapter> Engine<H> {
    pub(crate) fn commit_root(&mut self) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();
        let Some(root) = self.state.wip_root else {
            return Ok(summary);
        };

        for id in std::mem::take(&mut self.state.deletions) {
            let parent = self.tree.host_parent(id)?;
            self.commit_deletion(id, &parent)?;
            summary.deletions += 1;
        }

        let mut cursor = self.tree.fiber(root)?.child;
        while let Some(id) = cursor {
            let descend = self.commit_work(id, &mut summary)?;
            cursor = if descend {
                self.tree.next_in_preorder(id, root)
            } else {
                self.tree.next_after_subtree(id, root)
            };
        }

        self.state.current_root = Some(root);
        self.state.wip_root = None;
        self.state.next_unit_of_work = None;
        self.tree.retain_tree(root);

        debug!(
            placements = summary.placements,
            updates = summary.updates,
            deletions = summary.deletions,
            fibers = self.tree.len(),
            "committed"
        );
        Ok(summary)
    }

    /// Apply one fiber's effect. Returns false if its subtree is gone.
    fn commit_work(&mut self, id: FiberId, summary: &mut CommitSummary) -> Result<bool> {
        let fiber = self.tree.fiber(id)?;
        let node = fiber.host_node.clone();

        match fiber.effect {
            Effect::Placement => {
                summary.placements += 1;
                if let Some(node) = node {
                    let parent = self.tree.host_parent(id)?;
                    trace!(?id, ?parent, ?node, "append");
                    self.host.append_child(&parent, &node)?;
                }
            }
            Effect::Update => {
                summary.updates += 1;
                if let Some(node) = node {
                    let alternate = fiber
                        .alternate
                        .ok_or(EngineError::MissingFiber { fiber: id })?;
                    let next = Rc::clone(&fiber.props);
                    let prev = Rc::clone(&self.tree.fiber(alternate)?.props);
                    update_host_props(&mut self.host, &node, &prev, &next)?;
                }
            }
            Effect::Deletion => {
                summary.deletions += 1;
                let parent = self.tree.host_parent(id)?;
                self.commit_deletion(id, &parent)?;
                return Ok(false);
            }
            Effect::None => {}
        }
        Ok(true)
    }

    /// Remove the nodes `id` stands for from `parent`.
    fn commit_deletion(&mut self, id: FiberId, parent: &H::Node) -> Result<()> {
        if let Some(node) = self.tree.fiber(id)?.host_node.clone() {
            trace!(?id, ?node, "remove");
            self.host.remove_child(parent, &node)?;
            return Ok(());
        }
        for child in self.tree.children(id) {
            self.commit_deletion(child, parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children;
    use crate::element::{create_element, text, Child, Component, Element, Props};
    use crate::engine::{Hooks, Unbounded};
    use crate::host::{HostOp, MemoryHost};

    fn wrapper(props: &Props, _: &mut Hooks) -> Element {
        create_element("section", Props::new(), props.children().iter().cloned().map(Child::from))
    }

    #[test]
    fn test_placement_appends_under_host_ancestor() {
        let mut engine = Engine::new(MemoryHost::new());
        let root = engine.host_mut().create_root();
        let element = create_element(
            Component::named("Wrapper", wrapper),
            Props::new(),
            children![create_element("p", Props::new(), children!["x"])],
        );

        engine.render(element, root);
        let summary = engine.flush().unwrap().unwrap();

        // Component, section, p, text
        assert_eq!(summary.placements, 4);
        assert_eq!(engine.host().to_markup(root), "<section><p>x</p></section>");
    }

    #[test]
    fn test_deletion_through_component() {
        let mut engine = Engine::new(MemoryHost::new());
        let root = engine.host_mut().create_root();
        let component = Component::named("Wrapper", wrapper);
        let wrapped = create_element(component, Props::new(), children![]);

        engine.render(create_element("div", Props::new(), children![wrapped, "tail"]), root);
        engine.flush().unwrap();
        engine.host_mut().take_ops();

        engine.render(create_element("div", Props::new(), children![]), root);
        let summary = engine.flush().unwrap().unwrap();

        assert_eq!(summary.deletions, 2);
        assert_eq!(engine.host().to_markup(root), "<div></div>");
        let removed = engine
            .host()
            .ops()
            .iter()
            .filter(|op| matches!(op, HostOp::RemoveChild { .. }))
            .count();
        assert_eq!(removed, 2);
    }

    fn maybe(props: &Props, _: &mut Hooks) -> Option<Element> {
        props
            .contains("show")
            .then(|| create_element("p", Props::new(), children!["x"]))
    }

    #[test]
    fn test_component_rendering_nothing_removes_content() {
        let mut engine = Engine::new(MemoryHost::new());
        let root = engine.host_mut().create_root();
        let element = |props: Props| create_element(Component::new(maybe), props, children![]);

        engine.render(element(Props::new().with("show", true)), root);
        engine.flush().unwrap();
        assert_eq!(engine.host().to_markup(root), "<p>x</p>");

        engine.render(element(Props::new()), root);
        let summary = engine.flush().unwrap().unwrap();
        assert_eq!(summary.deletions, 1);
        assert_eq!(engine.host().to_markup(root), "");

        engine.render(element(Props::new().with("show", true)), root);
        let summary = engine.flush().unwrap().unwrap();
        assert_eq!(summary.placements, 2);
        assert_eq!(engine.host().to_markup(root), "<p>x</p>");
    }

    #[test]
    fn test_unchanged_render_is_quiet() {
        let mut engine = Engine::new(MemoryHost::new());
        let root = engine.host_mut().create_root();
        let element = || create_element("p", Props::new().with("id", "a"), children![text("t")]);

        engine.render(element(), root);
        engine.flush().unwrap();
        engine.host_mut().take_ops();

        engine.render(element(), root);
        let summary = engine.flush().unwrap().unwrap();

        assert_eq!(summary.updates, 2);
        assert_eq!(summary.placements + summary.deletions, 0);
        assert!(engine.host().ops().is_empty());
    }

    #[test]
    fn test_commit_drops_previous_buffer() {
        let mut engine = Engine::new(MemoryHost::new());
        let root = engine.host_mut().create_root();
        let element = || create_element("p", Props::new(), children!["a", "b"]);

        engine.render(element(), root);
        engine.flush().unwrap();
        let fibers = engine.fibers().len();

        engine.render(element(), root);
        engine.work(&Unbounded).unwrap();

        // root, p, two texts
        assert_eq!(fibers, 4);
        assert_eq!(engine.fibers().len(), 4);
        let current = engine.current_root().unwrap();
        let p = engine.fibers().get(current).unwrap().child.unwrap();
        assert_eq!(engine.fibers().get(p).unwrap().alternate, None);
        assert_eq!(engine.fibers().get(p).unwrap().effect, Effect::Update);
    }

    #[test]
    fn test_summary_is_empty() {
        assert!(CommitSummary::default().is_empty());
        assert!(!CommitSummary { updates: 1, ..Default::default() }.is_empty());
    }
}
