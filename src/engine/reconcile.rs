//! Reconciler - Lockstep diff of new child elements against old child fibers.
//!
//! The new element list and the previous sibling chain are walked together by
//! index. There are no keys: position decides which old fiber an element is
//! compared with.
//!
//! | old fiber | new element | same type | result                          |
//! |-----------|-------------|-----------|---------------------------------|
//! | yes       | yes         | yes       | `Update` (reuse node)           |
//! | yes       | yes         | no        | `Placement` + old to deletions  |
//! | no        | yes         | -         | `Placement`                     |
//! | yes       | no          | -         | old to deletions                |
//!
//! Reordering same-typed children therefore updates each position in place
//! (props slide across nodes) instead of moving nodes.

use tracing::trace;

use super::fiber::{Fiber, FiberId, FiberTree};
use crate::element::Element;
use crate::error::Result;

/// Build `wip`'s child chain from `elements`, queueing unmatched old fibers
/// on `deletions`.
pub(crate) fn reconcile_children<N: Clone>(
    tree: &mut FiberTree<N>,
    deletions: &mut Vec<FiberId>,
    wip: FiberId,
    elements: &[Element],
) -> Result<()> {
    let alternate = {
        let parent = tree.fiber_mut(wip)?;
        parent.child = None;
        parent.alternate
    };
    let mut old = alternate
        .and_then(|alternate| tree.get(alternate))
        .and_then(|alternate| alternate.child);

    let mut prev: Option<FiberId> = None;
    let mut index = 0;

    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let old_fiber = old.and_then(|id| tree.get(id).map(|fiber| (id, fiber)));
        let same_type = matches!(
            (old_fiber, element),
            (Some((_, fiber)), Some(element)) if fiber.ty.matches(&element.ty)
        );

        let new_fiber = match (element, old_fiber) {
            (Some(element), Some((old_id, old))) if same_type => {
                Some(Fiber::update(element, wip, old_id, old))
            }
            (Some(element), _) => Some(Fiber::placement(element, wip)),
            (None, _) => None,
        };

        if let Some((old_id, _)) = old_fiber.filter(|_| !same_type) {
            trace!(?old_id, index, "queue deletion");
            deletions.push(old_id);
        }
        old = old_fiber.and_then(|(_, fiber)| fiber.sibling);

        if let Some(fiber) = new_fiber {
            trace!(index, effect = ?fiber.effect, ty = ?fiber.ty, "reconciled child");
            let id = tree.insert(fiber);
            match prev {
                Some(prev) => tree.fiber_mut(prev)?.sibling = Some(id),
                None => tree.fiber_mut(wip)?.child = Some(id),
            }
            prev = Some(id);
        }

        index += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::children;
    use crate::element::{create_element, text, Props};
    use crate::engine::fiber::Effect;

    fn li(id: &str) -> Element {
        create_element("li", Props::new().with("id", id), children![])
    }

    fn span() -> Element {
        create_element("span", Props::new(), children![])
    }

    /// Commit-free two-pass setup: `first` becomes the old children, then a
    /// new parent with the old one as alternate reconciles `second`.
    struct Pass {
        tree: FiberTree<u32>,
        old: Vec<FiberId>,
        new: Vec<FiberId>,
        deletions: Vec<FiberId>,
    }

    fn two_pass(first: &[Element], second: &[Element]) -> Pass {
        let mut tree = FiberTree::new();
        let mut deletions = Vec::new();

        let old_root = tree.insert(Fiber::root(0, Rc::new(Props::new()), None));
        reconcile_children(&mut tree, &mut deletions, old_root, first).unwrap();
        assert!(deletions.is_empty());
        let old = tree.children(old_root);
        for (n, id) in old.iter().enumerate() {
            tree.fiber_mut(*id).unwrap().host_node = Some(n as u32 + 100);
        }

        let new_root = tree.insert(Fiber::root(0, Rc::new(Props::new()), Some(old_root)));
        reconcile_children(&mut tree, &mut deletions, new_root, second).unwrap();
        let new = tree.children(new_root);

        Pass { tree, old, new, deletions }
    }

    fn effects(pass: &Pass) -> Vec<Effect> {
        pass.new
            .iter()
            .map(|id| pass.tree.get(*id).unwrap().effect)
            .collect()
    }

    #[test]
    fn test_first_render_places_everything() {
        let mut tree: FiberTree<u32> = FiberTree::new();
        let mut deletions = Vec::new();
        let root = tree.insert(Fiber::root(0, Rc::new(Props::new()), None));

        reconcile_children(&mut tree, &mut deletions, root, &[li("a"), text("t")]).unwrap();

        let children = tree.children(root);
        assert_eq!(children.len(), 2);
        for id in &children {
            let fiber = tree.get(*id).unwrap();
            assert_eq!(fiber.effect, Effect::Placement);
            assert_eq!(fiber.parent, Some(root));
            assert_eq!(fiber.alternate, None);
        }
        assert!(deletions.is_empty());
    }

    #[test]
    fn test_same_type_updates_and_reuses_node() {
        let pass = two_pass(&[li("a"), li("b")], &[li("a"), li("c")]);

        assert_eq!(effects(&pass), vec![Effect::Update, Effect::Update]);
        let second = pass.tree.get(pass.new[1]).unwrap();
        assert_eq!(second.alternate, Some(pass.old[1]));
        assert_eq!(second.host_node, Some(101));
        assert_eq!(second.props.get("id").unwrap().as_str(), Some("c"));
        assert!(pass.deletions.is_empty());
    }

    #[test]
    fn test_type_change_places_and_deletes() {
        let pass = two_pass(&[li("a"), span()], &[li("a"), text("x")]);

        assert_eq!(effects(&pass), vec![Effect::Update, Effect::Placement]);
        assert_eq!(pass.deletions, vec![pass.old[1]]);
        assert_eq!(pass.tree.get(pass.new[1]).unwrap().host_node, None);
    }

    #[test]
    fn test_shrink_deletes_trailing() {
        let pass = two_pass(&[li("a"), li("b"), li("c")], &[li("a"), li("b")]);

        assert_eq!(effects(&pass), vec![Effect::Update, Effect::Update]);
        assert_eq!(pass.deletions, vec![pass.old[2]]);
    }

    #[test]
    fn test_grow_places_trailing() {
        let pass = two_pass(&[li("a")], &[li("a"), li("b"), li("c")]);

        assert_eq!(
            effects(&pass),
            vec![Effect::Update, Effect::Placement, Effect::Placement]
        );
        assert!(pass.deletions.is_empty());
    }

    #[test]
    fn test_reorder_same_type_slides_props() {
        let pass = two_pass(&[li("1"), li("2")], &[li("2"), li("1")]);

        assert_eq!(effects(&pass), vec![Effect::Update, Effect::Update]);
        let first = pass.tree.get(pass.new[0]).unwrap();
        // Position 0 keeps its node and takes the props of the moved element.
        assert_eq!(first.host_node, Some(100));
        assert_eq!(first.props.get("id").unwrap().as_str(), Some("2"));
    }

    #[test]
    fn test_reorder_mixed_types_replaces_both() {
        let pass = two_pass(&[span(), text("t")], &[text("t"), span()]);

        assert_eq!(effects(&pass), vec![Effect::Placement, Effect::Placement]);
        assert_eq!(pass.deletions, pass.old);
    }

    #[test]
    fn test_all_removed() {
        let pass = two_pass(&[li("a"), li("b")], &[]);

        assert!(pass.new.is_empty());
        assert_eq!(pass.deletions, pass.old);
    }
}
