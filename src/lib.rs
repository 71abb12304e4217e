//! # spark-fiber
//!
//! Incremental fiber reconciler with cooperative scheduling and hooks.
//!
//! ## Architecture
//!
//! A declarative [`Element`] tree is turned into a mutable output tree owned
//! by a [`HostAdapter`]. Work happens in two phases:
//!
//! ```text
//! Element tree → render phase (fibers, sliceable) → commit phase (host mutations)
//! ```
//!
//! The render phase builds a work-in-progress fiber tree one unit at a time
//! and can yield to the host between units. Nothing reaches the host until
//! the commit phase, which runs in one go once the tree is complete.
//!
//! ## Modules
//!
//! - [`element`] - Element descriptions, props, components
//! - [`host`] - Host adapter trait and the in-memory host
//! - [`engine`] - Fibers, reconciler, scheduler, commit, hooks
//! - [`error`] - Engine and host errors

pub mod element;
pub mod engine;
pub mod error;
pub mod host;

// Re-export commonly used items
pub use element::{
    clone_element, create_element, text, Child, Component, Element, ElementType, Event,
    EventHandler, PropValue, Props, NODE_VALUE, TEXT_ELEMENT,
};

pub use engine::{
    CommitSummary, Deadline, Effect, Engine, Fiber, FiberId, FiberTree, FiberType, Hooks, Phase,
    SchedulerConfig, StateSetter, StepBudget, TimeBudget, Unbounded, WorkStatus,
};

pub use error::{EngineError, HostError, Result};

pub use host::{
    Dirty, HostAdapter, HostOp, MemoryHost, MemoryNode, MemoryNodeKind, NodeId, NodeKind,
};
