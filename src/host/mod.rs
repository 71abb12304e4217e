//! Host Adapter - The capability surface the engine mutates.
//!
//! The engine never touches a platform directly. Everything it needs from the
//! output tree goes through [`HostAdapter`]: node creation, single-property
//! and listener changes, and child attachment.
//!
//! [`MemoryHost`] is an in-memory document implementing the trait, used for
//! headless rendering and tests.

mod memory;

pub use memory::*;

use std::fmt;

use crate::element::{EventHandler, PropValue};
use crate::error::HostError;

/// What kind of native node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// Element node with a tag (e.g. "div").
    Element(&'a str),
    /// Text node. Its value arrives through the `nodeValue` property.
    Text,
}

/// Host-side primitives consumed by the commit phase.
///
/// Every call may fail; failures propagate to whoever drove the engine.
pub trait HostAdapter {
    /// Handle to a native node. Cloning must not copy the node itself.
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<Self::Node, HostError>;

    fn set_property(
        &mut self,
        node: &Self::Node,
        key: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;

    /// Reset an attribute to its empty/default value.
    fn remove_property(&mut self, node: &Self::Node, key: &str) -> Result<(), HostError>;

    fn add_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    /// Remove the listener previously added with the same handler reference.
    fn remove_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
}
