//! Engine - Fiber tree, reconciler, scheduler, commit and hooks.
//!
//! The engine owns everything mutable: the host adapter, the fiber arena and
//! the [`EngineState`] tuple. A render cycle looks like this:
//!
//! ```text
//! render() / setter ──▶ seed WIP root ──▶ work() ─┬─▶ unit of work ─┐
//!                                                 │       ▲         │
//!                                                 │       └─────────┘ (until done or deadline)
//!                                                 ├─▶ Yielded (call work() again later)
//!                                                 └─▶ commit ──▶ WIP becomes current
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::{children, create_element, Engine, MemoryHost, Props, TimeBudget};
//! use std::time::Duration;
//!
//! let mut engine = Engine::new(MemoryHost::new());
//! let root = engine.host_mut().create_root();
//! engine.render(create_element("p", Props::new(), children!["hi"]), root);
//!
//! // From the host's idle callback:
//! while engine.has_pending_work() {
//!     engine.work(&TimeBudget::new(Duration::from_millis(5)))?;
//! }
//! ```

mod commit;
mod fiber;
mod hooks;
mod host_props;
mod reconcile;
mod scheduler;

pub use commit::CommitSummary;
pub use fiber::{Effect, Fiber, FiberId, FiberTree, FiberType};
pub use hooks::{Hooks, StateSetter};
pub use scheduler::{
    Deadline, Phase, SchedulerConfig, StepBudget, TimeBudget, Unbounded, WorkStatus,
};

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::element::{Element, Props};
use crate::host::HostAdapter;
use hooks::RenderTrigger;

// =============================================================================
// Engine State
// =============================================================================

/// The single mutable render tuple.
///
/// Empty when idle. `render` or a state update fills it, the scheduler
/// consumes it unit by unit, and a commit resets it.
#[derive(Debug, Default)]
pub struct EngineState {
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit_of_work: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
}

// =============================================================================
// Engine
// =============================================================================

/// Incremental renderer driving one host adapter.
pub struct Engine<H: HostAdapter> {
    host: H,
    tree: FiberTree<H::Node>,
    state: EngineState,
    trigger: Rc<RenderTrigger>,
    config: SchedulerConfig,
}

impl<H: HostAdapter> Engine<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, SchedulerConfig::default())
    }

    pub fn with_config(host: H, config: SchedulerConfig) -> Self {
        Self {
            host,
            tree: FiberTree::new(),
            state: EngineState::default(),
            trigger: Rc::new(RenderTrigger::default()),
            config,
        }
    }

    /// Schedule rendering `element` into `container`.
    ///
    /// Replaces any render still in progress. If `container` is the one the
    /// current tree was rendered into, the new tree is diffed against it;
    /// otherwise everything is placed fresh.
    pub fn render(&mut self, element: Element, container: H::Node) {
        let alternate = self.state.current_root.filter(|id| {
            self.tree.get(*id).and_then(|root| root.host_node.as_ref()) == Some(&container)
        });
        debug!(?container, diff = alternate.is_some(), "render requested");

        // Pending state updates are replayed by this render anyway.
        self.trigger.take();
        let props = Rc::new(Props::new().with_children(vec![element]));
        self.seed(Fiber::root(container, props, alternate));
    }

    /// Restart from the current root if a setter asked for it.
    pub(crate) fn take_render_request(&mut self) {
        if !self.trigger.take() {
            return;
        }
        let Some(current) = self.state.current_root else {
            return;
        };
        let Some(root) = self.tree.get(current) else {
            return;
        };
        let Some(container) = root.host_node.clone() else {
            return;
        };
        let props = Rc::clone(&root.props);
        debug!("state updated, re-rendering from the current root");
        self.seed(Fiber::root(container, props, Some(current)));
    }

    fn seed(&mut self, root: Fiber<H::Node>) {
        if self.state.wip_root.is_some() {
            trace!("abandoning work in progress");
            self.drop_work_in_progress();
        }
        let id = self.tree.insert(root);
        self.state.wip_root = Some(id);
        self.state.next_unit_of_work = Some(id);
        self.state.deletions.clear();
    }

    /// Forget the WIP tree and free every fiber outside the current tree.
    pub(crate) fn drop_work_in_progress(&mut self) {
        self.state.wip_root = None;
        self.state.next_unit_of_work = None;
        self.state.deletions.clear();
        match self.state.current_root {
            Some(current) => self.tree.retain_tree(current),
            None => self.tree.clear(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state.wip_root {
            None => Phase::Idle,
            Some(_) => Phase::Rendering,
        }
    }

    /// True if a render is in flight or a state update is waiting.
    pub fn has_pending_work(&self) -> bool {
        self.state.wip_root.is_some() || self.trigger.is_requested()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The fiber arena, for inspection.
    pub fn fibers(&self) -> &FiberTree<H::Node> {
        &self.tree
    }

    /// Root of the last committed tree.
    pub fn current_root(&self) -> Option<FiberId> {
        self.state.current_root
    }

    /// Root of the tree being rendered.
    pub fn wip_root(&self) -> Option<FiberId> {
        self.state.wip_root
    }

    /// Previous-tree fibers queued for removal by the render in progress.
    pub fn pending_deletions(&self) -> &[FiberId] {
        &self.state.deletions
    }
}

impl<H: HostAdapter + fmt::Debug> fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("fibers", &self.tree.len())
            .field("config", &self.config)
            .finish()
    }
}
