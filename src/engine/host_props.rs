//! Host-property diff - Applies the difference between two prop sets to a
//! native node.
//!
//! Order matters and is fixed:
//! 1. unsubscribe removed or changed handlers (using the old reference)
//! 2. reset attributes that disappeared
//! 3. set attributes that are new or changed
//! 4. subscribe handlers that are new or changed
//!
//! Removing before adding means an attribute or listener that is dropped and
//! re-added across renders never ends up duplicated or stale.

use crate::element::{event_name, PropValue, Props};
use crate::error::HostError;
use crate::host::HostAdapter;

fn changed(prev: &Props, next: &Props, key: &str) -> bool {
    prev.get(key) != next.get(key)
}

/// Apply `prev -> next` to `node`. Children are not touched.
pub(crate) fn update_host_props<H: HostAdapter>(
    host: &mut H,
    node: &H::Node,
    prev: &Props,
    next: &Props,
) -> Result<(), HostError> {
    for (key, value) in prev.events() {
        if !next.contains(key) || changed(prev, next, key) {
            if let PropValue::Handler(handler) = value {
                host.remove_listener(node, &event_name(key), handler)?;
            }
        }
    }

    for (key, _) in prev.attributes() {
        if !next.contains(key) {
            host.remove_property(node, key)?;
        }
    }

    for (key, value) in next.attributes() {
        if changed(prev, next, key) {
            host.set_property(node, key, value)?;
        }
    }

    for (key, value) in next.events() {
        if changed(prev, next, key) {
            if let PropValue::Handler(handler) = value {
                host.add_listener(node, &event_name(key), handler)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::EventHandler;
    use crate::host::{HostOp, MemoryHost, NodeKind};

    fn setup() -> (MemoryHost, crate::host::NodeId) {
        let mut host = MemoryHost::new();
        let node = host.create_node(NodeKind::Element("button")).unwrap();
        host.take_ops();
        (host, node)
    }

    #[test]
    fn test_initial_props_applied() {
        let (mut host, node) = setup();
        let handler = EventHandler::new(|_| {});
        let next = Props::new().with("id", "a").with("onClick", handler.clone());

        update_host_props(&mut host, &node, &Props::new(), &next).unwrap();

        assert_eq!(
            host.take_ops(),
            vec![
                HostOp::SetProperty { node, key: "id".into(), value: "a".into() },
                HostOp::AddListener { node, event: "click".into(), handler },
            ]
        );
    }

    #[test]
    fn test_unchanged_props_touch_nothing() {
        let (mut host, node) = setup();
        let handler = EventHandler::new(|_| {});
        let props = Props::new().with("id", "a").with("onClick", handler);

        update_host_props(&mut host, &node, &props, &props.clone()).unwrap();

        assert!(host.ops().is_empty());
    }

    #[test]
    fn test_event_swap_removes_then_adds() {
        let (mut host, node) = setup();
        let old = EventHandler::new(|_| {});
        let new = EventHandler::new(|_| {});
        let prev = Props::new().with("onClick", old.clone());
        let next = Props::new().with("onClick", new.clone());

        update_host_props(&mut host, &node, &prev, &next).unwrap();

        assert_eq!(
            host.take_ops(),
            vec![
                HostOp::RemoveListener { node, event: "click".into(), handler: old },
                HostOp::AddListener { node, event: "click".into(), handler: new },
            ]
        );
    }

    #[test]
    fn test_ordering_across_kinds() {
        let (mut host, node) = setup();
        let old = EventHandler::new(|_| {});
        let new = EventHandler::new(|_| {});
        let prev = Props::new()
            .with("onInput", new.clone())
            .with("onClick", old.clone())
            .with("title", "t")
            .with("id", "a");
        let next = Props::new()
            .with("id", "b")
            .with("onInput", new.clone())
            .with("onFocus", new.clone())
            .with("lang", "en");

        update_host_props(&mut host, &node, &prev, &next).unwrap();

        assert_eq!(
            host.take_ops(),
            vec![
                HostOp::RemoveListener { node, event: "click".into(), handler: old },
                HostOp::RemoveProperty { node, key: "title".into() },
                HostOp::SetProperty { node, key: "id".into(), value: "b".into() },
                HostOp::SetProperty { node, key: "lang".into(), value: "en".into() },
                HostOp::AddListener { node, event: "focus".into(), handler: new },
            ]
        );
    }

    #[test]
    fn test_value_change_is_reapplied() {
        let (mut host, node) = setup();
        let prev = Props::new().with("count", 1);
        let next = Props::new().with("count", 2);

        update_host_props(&mut host, &node, &prev, &next).unwrap();

        assert_eq!(host.property(node, "count"), Some(&PropValue::Int(2)));
        assert_eq!(host.ops().len(), 1);
    }
}
