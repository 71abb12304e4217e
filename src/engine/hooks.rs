//! Hook Store - Positional local state for function components.
//!
//! Each component invocation receives a [`Hooks`] context. Calls to
//! [`Hooks::use_state`] are addressed by position: the n-th call reads the
//! n-th cell of the previous render of the same fiber, replays its queued
//! updaters, and records a fresh cell for this render.
//!
//! Setters never touch the engine directly. They queue an updater on their
//! cell and raise the shared [`RenderTrigger`]; the scheduler restarts from
//! the current root the next time it runs. Several updates before that point
//! therefore cost a single render.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::error::{EngineError, Result};

/// Type-erased hook cell (`Rc<RefCell<HookCell<T>>>`).
pub(crate) type HookRef = Rc<dyn Any>;

type Updater<T> = Rc<dyn Fn(&T) -> T>;

/// State plus the updaters queued against it since it was rendered.
pub(crate) struct HookCell<T> {
    state: T,
    queue: Vec<Updater<T>>,
}

// =============================================================================
// Render Trigger
// =============================================================================

/// Shared flag between setters and the scheduler.
#[derive(Debug, Default)]
pub(crate) struct RenderTrigger {
    requested: Cell<bool>,
    rendering: Cell<bool>,
    updates_during_render: Cell<usize>,
}

impl RenderTrigger {
    fn request(&self) {
        if self.rendering.get() {
            self.updates_during_render
                .set(self.updates_during_render.get() + 1);
            return;
        }
        self.requested.set(true);
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.get()
    }

    /// Consume a pending request.
    pub(crate) fn take(&self) -> bool {
        self.requested.replace(false)
    }

    /// Mark a component body as running until the guard drops.
    pub(crate) fn begin_render(self: &Rc<Self>) -> RenderGuard {
        self.rendering.set(true);
        self.updates_during_render.set(0);
        RenderGuard {
            trigger: Rc::clone(self),
        }
    }
}

/// Clears the rendering flag, also when a component body panics.
pub(crate) struct RenderGuard {
    trigger: Rc<RenderTrigger>,
}

impl RenderGuard {
    /// Number of setter calls made while the body was running.
    pub(crate) fn finish(self) -> usize {
        self.trigger.updates_during_render.replace(0)
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        self.trigger.rendering.set(false);
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Hook context passed into a component body.
pub struct Hooks {
    component: &'static str,
    previous: Vec<HookRef>,
    built: Vec<HookRef>,
    cursor: usize,
    trigger: Rc<RenderTrigger>,
    mismatch: Option<usize>,
}

impl Hooks {
    pub(crate) fn new(
        component: &'static str,
        previous: Vec<HookRef>,
        trigger: Rc<RenderTrigger>,
    ) -> Self {
        Self {
            component,
            previous,
            built: Vec::new(),
            cursor: 0,
            trigger,
            mismatch: None,
        }
    }

    /// Positional state cell.
    ///
    /// Returns the current value and a setter. On the first render the value
    /// is `initial`; afterwards it is the previous value with every queued
    /// update applied in order.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let index = self.cursor;
        self.cursor += 1;

        let state = match self.previous.get(index).cloned() {
            Some(old) => match old.downcast::<RefCell<HookCell<T>>>() {
                Ok(old) => {
                    // Copy out so updaters may call setters without re-borrowing.
                    let (base, queue) = {
                        let cell = old.borrow();
                        (cell.state.clone(), cell.queue.clone())
                    };
                    queue.iter().fold(base, |state, update| update(&state))
                }
                Err(_) => {
                    warn!(component = self.component, index, "hook state type changed");
                    if self.mismatch.is_none() {
                        self.mismatch = Some(index);
                    }
                    initial
                }
            },
            None => initial,
        };

        let cell = Rc::new(RefCell::new(HookCell {
            state: state.clone(),
            queue: Vec::new(),
        }));
        self.built.push(cell.clone());

        let setter = StateSetter {
            cell,
            trigger: Rc::clone(&self.trigger),
        };
        (state, setter)
    }

    /// Number of hooks called so far in this invocation.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Cells for the fiber, or the misuse that was recorded.
    pub(crate) fn finish(self) -> Result<Vec<HookRef>> {
        match self.mismatch {
            Some(index) => Err(EngineError::HookTypeMismatch {
                component: self.component,
                index,
            }),
            None => Ok(self.built),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("component", &self.component)
            .field("cursor", &self.cursor)
            .field("previous", &self.previous.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// State Setter
// =============================================================================

/// Queues updates for one state cell and requests a re-render.
pub struct StateSetter<T> {
    cell: Rc<RefCell<HookCell<T>>>,
    trigger: Rc<RenderTrigger>,
}

impl<T: 'static> StateSetter<T> {
    /// Queue an updater applied to the latest state on the next render.
    pub fn update(&self, updater: impl Fn(&T) -> T + 'static) {
        self.cell.borrow_mut().queue.push(Rc::new(updater));
        self.trigger.request();
    }

    /// Queue a replacement value.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(move |_| value.clone());
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            trigger: Rc::clone(&self.trigger),
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("queued", &self.cell.borrow().queue.len())
            .finish()
    }
}
