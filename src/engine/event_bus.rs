//! In-memory callback bus for lifecycle events.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Callback = Rc<dyn Fn()>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Ordered list of callbacks fired together.
#[derive(Default)]
pub struct EventBus {
    callbacks: RefCell<Vec<(Subscription, Callback)>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, callback: impl Fn() + 'static) -> Subscription {
        let id = Subscription(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn off(&self, subscription: Subscription) {
        self.callbacks.borrow_mut().retain(|(id, _)| *id != subscription);
    }

    /// Call every callback in subscription order.
    ///
    /// Callbacks added while emitting run on the next emit.
    pub fn emit(&self) {
        let callbacks: Vec<Callback> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.callbacks.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_order_and_off() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        let first = bus.on(move || l.borrow_mut().push(1));
        let l = log.clone();
        bus.on(move || l.borrow_mut().push(2));

        bus.emit();
        bus.off(first);
        bus.emit();

        assert_eq!(*log.borrow(), vec![1, 2, 2]);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_subscribe_while_emitting() {
        let bus = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0));

        let b = bus.clone();
        let c = count.clone();
        bus.on(move || {
            let c = c.clone();
            b.on(move || c.set(c.get() + 1));
        });

        bus.emit();
        assert_eq!(count.get(), 0);
        bus.emit();
        assert_eq!(count.get(), 1);
    }
}
