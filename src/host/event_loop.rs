//! Host event loop.
//!
//! A deterministic, single-threaded model of the browser loop the framework
//! runs on: a microtask queue, `setTimeout`-style macrotasks on a virtual
//! millisecond clock, and idle callbacks with a deadline.
//!
//! Nothing runs on its own. The embedder drives the loop with
//! [`EventLoop::perform_microtask_checkpoint`], [`EventLoop::run_next_task`],
//! [`EventLoop::advance`] or [`EventLoop::run_until_idle`].

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

type Task = Box<dyn FnOnce()>;
type IdleTask = Box<dyn FnOnce(IdleDeadline)>;

/// Identifier of a pending timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Identifier of a pending idle callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdleId(u64);

// =============================================================================
// Config
// =============================================================================

/// Capabilities and limits of a host loop.
#[derive(Clone, Copy, Debug)]
pub struct EventLoopConfig {
    /// Whether `request_idle_callback` is available.
    pub idle_callbacks: bool,
    /// Idle time granted to each idle callback, in virtual milliseconds.
    pub idle_budget_ms: f64,
    /// Upper bound on iterations of `run_until_idle`.
    pub max_iterations: usize,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            idle_callbacks: true,
            idle_budget_ms: 50.0,
            max_iterations: 100_000,
        }
    }
}

// =============================================================================
// State
// =============================================================================

struct Inner {
    config: EventLoopConfig,
    now: Cell<f64>,
    next_id: Cell<u64>,
    microtasks: RefCell<VecDeque<Task>>,
    /// Keyed by (due time in micro-ms, sequence) so equal deadlines stay FIFO.
    timers: RefCell<BTreeMap<(u64, u64), (TimerId, Task)>>,
    idle: RefCell<VecDeque<(IdleId, IdleTask)>>,
}

/// Handle to a host event loop. Clones share the same loop.
#[derive(Clone)]
pub struct EventLoop(Rc<Inner>);

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.0.now.get())
            .field("microtasks", &self.0.microtasks.borrow().len())
            .field("timers", &self.0.timers.borrow().len())
            .field("idle", &self.0.idle.borrow().len())
            .finish()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

fn to_key(ms: f64) -> u64 {
    (ms.max(0.0) * 1000.0) as u64
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    pub fn with_config(config: EventLoopConfig) -> Self {
        Self(Rc::new(Inner {
            config,
            now: Cell::new(0.0),
            next_id: Cell::new(1),
            microtasks: RefCell::new(VecDeque::new()),
            timers: RefCell::new(BTreeMap::new()),
            idle: RefCell::new(VecDeque::new()),
        }))
    }

    pub fn config(&self) -> EventLoopConfig {
        self.0.config
    }

    pub fn supports_idle_callbacks(&self) -> bool {
        self.0.config.idle_callbacks
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> f64 {
        self.0.now.get()
    }

    /// Consume virtual time without running timers.
    pub fn charge(&self, ms: f64) {
        self.0.now.set(self.0.now.get() + ms.max(0.0));
    }

    pub(crate) fn downgrade(&self) -> WeakEventLoop {
        WeakEventLoop(Rc::downgrade(&self.0))
    }

    fn next_id(&self) -> u64 {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        id
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.0.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn set_timeout(&self, delay_ms: f64, task: impl FnOnce() + 'static) -> TimerId {
        let id = TimerId(self.next_id());
        let due = to_key(self.now() + delay_ms.max(0.0));
        self.0
            .timers
            .borrow_mut()
            .insert((due, id.0), (id, Box::new(task)));
        id
    }

    /// Cancel a timer. Returns false if it already ran or never existed.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut timers = self.0.timers.borrow_mut();
        let key = timers
            .iter()
            .find(|(_, (timer, _))| *timer == id)
            .map(|(key, _)| *key);
        match key {
            Some(key) => timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Request an idle callback. Returns `None` when the host has no idle support.
    pub fn request_idle_callback(&self, task: impl FnOnce(IdleDeadline) + 'static) -> Option<IdleId> {
        if !self.0.config.idle_callbacks {
            return None;
        }
        let id = IdleId(self.next_id());
        self.0.idle.borrow_mut().push_back((id, Box::new(task)));
        Some(id)
    }

    pub fn cancel_idle_callback(&self, id: IdleId) {
        self.0.idle.borrow_mut().retain(|(idle, _)| *idle != id);
    }

    // =========================================================================
    // Driving
    // =========================================================================

    /// Run microtasks until the queue is empty, including ones queued meanwhile.
    pub fn perform_microtask_checkpoint(&self) {
        loop {
            let task = self.0.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Run one macrotask (the earliest timer, else one idle callback),
    /// then a microtask checkpoint. Returns false if there was nothing to run.
    pub fn run_next_task(&self) -> bool {
        self.perform_microtask_checkpoint();

        // A timer runs first when it is already due or when nothing is idle-queued.
        let idle_pending = !self.0.idle.borrow().is_empty();
        let now_key = to_key(self.now());
        let timer = {
            let mut timers = self.0.timers.borrow_mut();
            let key = timers
                .keys()
                .next()
                .copied()
                .filter(|key| key.0 <= now_key || !idle_pending);
            key.and_then(|key| timers.remove(&key).map(|(_, task)| (key.0, task)))
        };
        if let Some((due, task)) = timer {
            let due_ms = due as f64 / 1000.0;
            if due_ms > self.now() {
                self.0.now.set(due_ms);
            }
            task();
            self.perform_microtask_checkpoint();
            return true;
        }

        let idle = self.0.idle.borrow_mut().pop_front();
        if let Some((_, task)) = idle {
            let deadline = IdleDeadline {
                event_loop: self.downgrade(),
                deadline: self.now() + self.0.config.idle_budget_ms,
            };
            task(deadline);
            self.perform_microtask_checkpoint();
            return true;
        }
        false
    }

    /// Advance the clock by `ms`, running every timer that becomes due.
    pub fn advance(&self, ms: f64) {
        let target = self.now() + ms.max(0.0);
        self.perform_microtask_checkpoint();
        loop {
            let next_due = self.0.timers.borrow().keys().next().map(|key| key.0);
            match next_due {
                Some(due) if due <= to_key(target) => {
                    self.run_next_task();
                }
                _ => break,
            }
        }
        if target > self.now() {
            self.0.now.set(target);
        }
    }

    /// Run everything until no microtask, timer or idle callback remains.
    ///
    /// Returns the number of macrotasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut iterations = 0;
        while self.run_next_task() {
            iterations += 1;
            if iterations >= self.0.config.max_iterations {
                tracing::error!(
                    target: "ovee",
                    "[Host ~ EventLoop] run_until_idle gave up after {} tasks",
                    iterations
                );
                break;
            }
        }
        iterations
    }

    /// Whether any work is pending.
    pub fn has_pending_work(&self) -> bool {
        !self.0.microtasks.borrow().is_empty()
            || !self.0.timers.borrow().is_empty()
            || !self.0.idle.borrow().is_empty()
    }
}

#[derive(Clone)]
pub(crate) struct WeakEventLoop(Weak<Inner>);

impl WeakEventLoop {
    pub(crate) fn upgrade(&self) -> Option<EventLoop> {
        self.0.upgrade().map(EventLoop)
    }
}

// =============================================================================
// IdleDeadline
// =============================================================================

/// Deadline handed to idle callbacks.
pub struct IdleDeadline {
    event_loop: WeakEventLoop,
    deadline: f64,
}

impl IdleDeadline {
    /// Remaining idle time in milliseconds (never negative).
    pub fn time_remaining(&self) -> f64 {
        match self.event_loop.upgrade() {
            Some(event_loop) => (self.deadline - event_loop.now()).max(0.0),
            None => 0.0,
        }
    }
}

impl fmt::Debug for IdleDeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleDeadline")
            .field("time_remaining", &self.time_remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microtasks_run_before_timers() {
        let event_loop = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        event_loop.set_timeout(0.0, move || l.borrow_mut().push("timeout"));
        let l = log.clone();
        event_loop.queue_microtask(move || l.borrow_mut().push("micro"));

        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["micro", "timeout"]);
    }

    #[test]
    fn test_timers_are_ordered_by_due_time() {
        let event_loop = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, name) in [(10.0, "b"), (0.0, "a"), (10.0, "c")] {
            let l = log.clone();
            event_loop.set_timeout(delay, move || l.borrow_mut().push(name));
        }
        event_loop.run_until_idle();

        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(event_loop.now(), 10.0);
    }

    #[test]
    fn test_clear_timeout() {
        let event_loop = EventLoop::new();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        let id = event_loop.set_timeout(5.0, move || r.set(true));

        assert!(event_loop.clear_timeout(id));
        assert!(!event_loop.clear_timeout(id));
        event_loop.run_until_idle();
        assert!(!ran.get());
    }

    #[test]
    fn test_advance_only_runs_due_timers() {
        let event_loop = EventLoop::new();
        let count = Rc::new(Cell::new(0));
        for delay in [5.0, 15.0] {
            let c = count.clone();
            event_loop.set_timeout(delay, move || c.set(c.get() + 1));
        }

        event_loop.advance(10.0);
        assert_eq!(count.get(), 1);
        assert_eq!(event_loop.now(), 10.0);

        event_loop.advance(10.0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_idle_deadline_shrinks_with_charged_time() {
        let event_loop = EventLoop::with_config(EventLoopConfig {
            idle_budget_ms: 10.0,
            ..Default::default()
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let el = event_loop.clone();
        event_loop.request_idle_callback(move |deadline| {
            s.borrow_mut().push(deadline.time_remaining());
            el.charge(4.0);
            s.borrow_mut().push(deadline.time_remaining());
        });

        event_loop.run_until_idle();
        assert_eq!(*seen.borrow(), vec![10.0, 6.0]);
    }

    #[test]
    fn test_no_idle_support() {
        let event_loop = EventLoop::with_config(EventLoopConfig {
            idle_callbacks: false,
            ..Default::default()
        });
        assert!(event_loop.request_idle_callback(|_| {}).is_none());
    }
}
