//! Scheduler - Cooperative, deadline-driven render loop.
//!
//! The host calls [`Engine::work`] from its idle callback with a [`Deadline`].
//! One unit of work processes one fiber; after every unit the deadline is
//! consulted and the loop yields once less than
//! [`SchedulerConfig::yield_threshold`] remains. When the last unit finishes
//! the tree is committed in the same call, synchronously.
//!
//! Unit order is pre-order over the WIP tree: own child, then sibling, then
//! the nearest ancestor's sibling. A fiber's children exist as soon as the
//! fiber itself has been processed, so the walk discovers the tree as it goes.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use super::commit::CommitSummary;
use super::fiber::{FiberId, FiberType};
use super::hooks::Hooks;
use super::host_props::update_host_props;
use super::reconcile::reconcile_children;
use super::Engine;
use crate::element::{Component, Props};
use crate::error::{EngineError, Result};
use crate::host::{HostAdapter, NodeKind};

// =============================================================================
// Deadlines
// =============================================================================

/// Source of "how much time is left in this slice".
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Wall-clock budget starting at construction.
#[derive(Clone, Copy, Debug)]
pub struct TimeBudget {
    start: Instant,
    budget: Duration,
}

impl TimeBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }
}

impl Deadline for TimeBudget {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }
}

/// Deterministic budget of a fixed number of units.
///
/// The scheduler asks once per completed unit, so `StepBudget::new(n)` lets
/// exactly `n` units run (at least one, as with any deadline).
#[derive(Debug)]
pub struct StepBudget {
    remaining: Cell<usize>,
}

impl StepBudget {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }
}

impl Deadline for StepBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.remaining.get().saturating_sub(1);
        self.remaining.set(left);
        if left == 0 {
            Duration::ZERO
        } else {
            Duration::MAX
        }
    }
}

/// Never runs out.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

// =============================================================================
// Config & Status
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Yield once less than this remains in the slice.
    pub yield_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
        }
    }
}

/// Outcome of one [`Engine::work`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// Nothing to do.
    Idle,
    /// Deadline hit with units left; call again.
    Yielded,
    /// The render finished and was committed.
    Committed(CommitSummary),
}

/// Where the engine stands between two [`Engine::work`] calls.
///
/// The commit runs inside the `work` call that finishes the last unit, so it
/// never shows up here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Rendering,
}

// =============================================================================
// Work Loop
// =============================================================================

impl<H: HostAdapter> Engine<H> {
    /// Run units of work until done or the deadline says stop.
    ///
    /// A render-phase error abandons the work-in-progress tree; the current
    /// tree and the attached host nodes stay as they were. A commit error
    /// leaves the host partially updated.
    pub fn work(&mut self, deadline: &dyn Deadline) -> Result<WorkStatus> {
        self.take_render_request();
        let Some(root) = self.state.wip_root else {
            return Ok(WorkStatus::Idle);
        };

        let mut units = 0usize;
        while let Some(unit) = self.state.next_unit_of_work {
            match self.perform_unit_of_work(unit, root) {
                Ok(next) => self.state.next_unit_of_work = next,
                Err(err) => {
                    warn!(%err, "render failed, abandoning work in progress");
                    self.drop_work_in_progress();
                    return Err(err);
                }
            }
            units += 1;
            if deadline.time_remaining() < self.config.yield_threshold {
                break;
            }
        }

        if self.state.next_unit_of_work.is_some() {
            trace!(units, "yield");
            return Ok(WorkStatus::Yielded);
        }

        trace!(units, "render phase complete");
        match self.commit_root() {
            Ok(summary) => Ok(WorkStatus::Committed(summary)),
            Err(err) => {
                warn!(%err, "commit failed");
                self.drop_work_in_progress();
                Err(err)
            }
        }
    }

    /// Work without a deadline until idle, including renders requested by
    /// state updates along the way. Returns the last commit, if any.
    pub fn flush(&mut self) -> Result<Option<CommitSummary>> {
        let mut last = None;
        loop {
            match self.work(&Unbounded)? {
                WorkStatus::Idle => return Ok(last),
                WorkStatus::Yielded => {}
                WorkStatus::Committed(summary) => last = Some(summary),
            }
        }
    }

    /// Process one fiber and return the next unit.
    fn perform_unit_of_work(&mut self, id: FiberId, root: FiberId) -> Result<Option<FiberId>> {
        let ty = self.tree.fiber(id)?.ty.clone();
        match &ty {
            FiberType::Component(component) => self.update_function_component(id, component)?,
            _ => self.update_host_component(id, &ty)?,
        }
        Ok(self.tree.next_in_preorder(id, root))
    }

    fn update_function_component(&mut self, id: FiberId, component: &Component) -> Result<()> {
        let fiber = self.tree.fiber(id)?;
        let props = Rc::clone(&fiber.props);
        let previous = fiber
            .alternate
            .and_then(|alternate| self.tree.get(alternate))
            .map(|alternate| alternate.hooks.clone())
            .unwrap_or_default();

        let mut hooks = Hooks::new(component.name(), previous, Rc::clone(&self.trigger));
        let guard = self.trigger.begin_render();
        let element = component.render(&props, &mut hooks);
        if guard.finish() > 0 {
            return Err(EngineError::UpdateDuringRender {
                component: component.name(),
            });
        }
        trace!(component = component.name(), hooks = hooks.len(), "rendered");

        self.tree.fiber_mut(id)?.hooks = hooks.finish()?;
        // A component rendering nothing reconciles against no children.
        reconcile_children(&mut self.tree, &mut self.state.deletions, id, element.as_slice())
    }

    fn update_host_component(&mut self, id: FiberId, ty: &FiberType) -> Result<()> {
        let fiber = self.tree.fiber(id)?;
        let props = Rc::clone(&fiber.props);
        let has_node = fiber.host_node.is_some();
        let kind = match ty {
            FiberType::Native(tag) => Some(NodeKind::Element(tag)),
            FiberType::Text => Some(NodeKind::Text),
            FiberType::Root | FiberType::Component(_) => None,
        };

        // Nodes are created here but only attached during commit.
        if let (false, Some(kind)) = (has_node, kind) {
            let node = self.host.create_node(kind)?;
            update_host_props(&mut self.host, &node, &Props::default(), &props)?;
            trace!(?id, ?node, "created node");
            self.tree.fiber_mut(id)?.host_node = Some(node);
        }

        reconcile_children(&mut self.tree, &mut self.state.deletions, id, props.children())
    }
}
