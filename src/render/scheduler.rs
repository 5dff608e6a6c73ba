//! Idle-time render scheduler.
//!
//! Render jobs are queued as [`FiberUnit`]s and drained during idle
//! periods. A job performs one fiber per step; between steps the scheduler
//! asks its yield point whether the slice is over. A partially finished
//! job is parked and resumed first in the next slice, so jobs complete in
//! the order they were scheduled.
//!
//! ```text
//! schedule(job) ──► queue ──► idle slice ──► step, step, ... ──► resolve task
//!                               ▲                  │ out of time
//!                               └──── park job ◄───┘
//! ```
//!
//! Hosts without idle callbacks get one microtask slice that never yields.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::host::{Completion, EventLoop, IdleDeadline};

use super::fiber::FiberId;
use super::queue::Queue;

/// A job step: given the fiber to perform (`None` on the first call),
/// return the next one, or `None` when the job is finished.
pub type Job = Box<dyn FnMut(Option<FiberId>) -> Option<FiberId>>;

/// Remaining time below which an idle slice yields, in milliseconds.
pub const YIELD_THRESHOLD_MS: f64 = 1.0;

// =============================================================================
// Yield points
// =============================================================================

/// Decides when a slice should hand control back to the host.
pub trait YieldPoint {
    fn should_yield(&self) -> bool;
}

impl YieldPoint for IdleDeadline {
    fn should_yield(&self) -> bool {
        self.time_remaining() < YIELD_THRESHOLD_MS
    }
}

/// Runs the whole queue in one slice.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverYield;

impl YieldPoint for NeverYield {
    fn should_yield(&self) -> bool {
        false
    }
}

/// How slices are requested from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceMode {
    /// `requestIdleCallback`-style slices with a deadline.
    Idle,
    /// One microtask that drains everything.
    Microtask,
}

// =============================================================================
// FiberUnit
// =============================================================================

/// A queued render job and the completion it resolves.
pub struct FiberUnit {
    task: Completion,
    unit: Option<FiberId>,
    started: bool,
    job: Job,
}

impl fmt::Debug for FiberUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberUnit")
            .field("unit", &self.unit)
            .field("started", &self.started)
            .finish()
    }
}

impl FiberUnit {
    /// Perform one step. Returns true when the job is finished.
    fn step(&mut self) -> bool {
        let input = if self.started { self.unit } else { None };
        self.started = true;
        self.unit = (self.job)(input);
        self.unit.is_none()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

struct Inner {
    event_loop: EventLoop,
    mode: SliceMode,
    queue: RefCell<Queue<FiberUnit>>,
    current: RefCell<Option<FiberUnit>>,
    loop_active: Cell<bool>,
}

/// Handle to a scheduler. Clones share the same queue.
#[derive(Clone)]
pub struct Scheduler(Rc<Inner>);

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("mode", &self.0.mode)
            .field("queued", &self.0.queue.borrow().len())
            .field("in_progress", &self.0.current.borrow().is_some())
            .finish()
    }
}

impl Scheduler {
    /// Idle slices when the host supports them, microtasks otherwise.
    pub fn new(event_loop: &EventLoop) -> Self {
        let mode = if event_loop.supports_idle_callbacks() {
            SliceMode::Idle
        } else {
            SliceMode::Microtask
        };
        Self::with_mode(event_loop, mode)
    }

    pub fn with_mode(event_loop: &EventLoop, mode: SliceMode) -> Self {
        Self(Rc::new(Inner {
            event_loop: event_loop.clone(),
            mode,
            queue: RefCell::new(Queue::new()),
            current: RefCell::new(None),
            loop_active: Cell::new(false),
        }))
    }

    pub fn mode(&self) -> SliceMode {
        self.0.mode
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.0.event_loop
    }

    /// Queue a job. The returned completion resolves when the job finishes.
    pub fn schedule(&self, job: impl FnMut(Option<FiberId>) -> Option<FiberId> + 'static) -> Completion {
        let task = Completion::new(&self.0.event_loop);
        self.0.queue.borrow_mut().push(FiberUnit {
            task: task.clone(),
            unit: None,
            started: false,
            job: Box::new(job),
        });
        if !self.0.loop_active.replace(true) {
            self.request_slice();
        }
        task
    }

    /// Jobs queued or in progress.
    pub fn pending(&self) -> usize {
        self.0.queue.borrow().len() + usize::from(self.0.current.borrow().is_some())
    }

    fn request_slice(&self) {
        if self.0.mode == SliceMode::Idle {
            let this = self.clone();
            let requested = self
                .0
                .event_loop
                .request_idle_callback(move |deadline| this.run_slice(&deadline));
            if requested.is_some() {
                return;
            }
        }
        let this = self.clone();
        self.0
            .event_loop
            .queue_microtask(move || this.run_slice(&NeverYield));
    }

    /// Work until the queue is empty or `yield_point` says stop. At least
    /// one step runs per slice.
    pub fn run_slice(&self, yield_point: &dyn YieldPoint) {
        let mut first = true;
        loop {
            if !first && yield_point.should_yield() {
                break;
            }
            let next = self.0.current.borrow_mut().take();
            let Some(mut unit) = next.or_else(|| self.0.queue.borrow_mut().pop()) else {
                break;
            };

            let mut finished = unit.step();
            first = false;
            while !finished && !yield_point.should_yield() {
                finished = unit.step();
            }

            if finished {
                unit.task.resolve();
            } else {
                *self.0.current.borrow_mut() = Some(unit);
                break;
            }
        }

        let more = self.0.current.borrow().is_some() || !self.0.queue.borrow().is_empty();
        if more {
            self.request_slice();
        } else {
            self.0.loop_active.set(false);
        }
    }
}
