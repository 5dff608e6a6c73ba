//! Resolvable completion handle.
//!
//! The framework's answer to a promise: render jobs hand one out, mount
//! waits on it. Continuations registered with [`Completion::then`] always
//! run as microtasks, never synchronously inside `resolve()`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::event_loop::EventLoop;

type Continuation = Box<dyn FnOnce()>;

struct Inner {
    event_loop: EventLoop,
    settled: Cell<bool>,
    continuations: RefCell<Vec<Continuation>>,
}

/// One-shot completion signal shared by clones.
#[derive(Clone)]
pub struct Completion(Rc<Inner>);

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.0.settled.get())
            .finish()
    }
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Completion {
    pub fn new(event_loop: &EventLoop) -> Self {
        Self(Rc::new(Inner {
            event_loop: event_loop.clone(),
            settled: Cell::new(false),
            continuations: RefCell::new(Vec::new()),
        }))
    }

    /// A completion that is already settled.
    pub fn resolved(event_loop: &EventLoop) -> Self {
        let completion = Self::new(event_loop);
        completion.0.settled.set(true);
        completion
    }

    pub fn is_settled(&self) -> bool {
        self.0.settled.get()
    }

    /// Settle and queue every continuation. Later calls do nothing.
    pub fn resolve(&self) {
        if self.0.settled.replace(true) {
            return;
        }
        let continuations = std::mem::take(&mut *self.0.continuations.borrow_mut());
        for continuation in continuations {
            self.0.event_loop.queue_microtask(continuation);
        }
    }

    /// Run `f` once this completion settles.
    pub fn then(&self, f: impl FnOnce() + 'static) {
        if self.is_settled() {
            self.0.event_loop.queue_microtask(f);
        } else {
            self.0.continuations.borrow_mut().push(Box::new(f));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_then_runs_after_resolve_as_microtask() {
        let event_loop = EventLoop::new();
        let completion = Completion::new(&event_loop);
        let ran = Rc::new(Cell::new(0));

        let r = ran.clone();
        completion.then(move || r.set(r.get() + 1));
        assert_eq!(ran.get(), 0);

        completion.resolve();
        assert_eq!(ran.get(), 0, "continuations are deferred");
        event_loop.perform_microtask_checkpoint();
        assert_eq!(ran.get(), 1);

        completion.resolve();
        event_loop.perform_microtask_checkpoint();
        assert_eq!(ran.get(), 1, "resolve is idempotent");
    }

    #[test]
    fn test_then_on_settled() {
        let event_loop = EventLoop::new();
        let completion = Completion::resolved(&event_loop);
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        completion.then(move || r.set(true));
        event_loop.perform_microtask_checkpoint();
        assert!(ran.get());
    }
}
