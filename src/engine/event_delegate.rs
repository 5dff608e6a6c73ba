//! Event delegate: DOM listeners owned by a component or module.
//!
//! Every listener added through a delegate is remembered so the owner can
//! drop all of them at once when it goes away.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;

use crate::dom::{DomError, Event, EventListener, Node, Selector, listener};

/// Listener bookkeeping bound to one target node.
pub struct EventDelegate {
    target: Node,
    listeners: RefCell<Vec<(String, EventListener)>>,
}

impl fmt::Debug for EventDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDelegate")
            .field("target", &self.target)
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl EventDelegate {
    pub fn new(target: &Node) -> Self {
        Self {
            target: target.clone(),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn target(&self) -> &Node {
        &self.target
    }

    /// Listen for one or more space-separated events on the target.
    ///
    /// Returns the listener so it can be passed to [`EventDelegate::off`].
    pub fn on(&self, events: &str, handler: impl Fn(&Event) + 'static) -> EventListener {
        let handler = listener(handler);
        for event in events.split_whitespace() {
            self.target.add_event_listener(event, &handler);
            self.listeners
                .borrow_mut()
                .push((event.to_string(), handler.clone()));
        }
        handler
    }

    /// Listen for events whose target is, or is inside, an element matching
    /// `selector` below the delegate's target.
    pub fn on_selector(
        &self,
        events: &str,
        selector: &str,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<EventListener, DomError> {
        let selector = Selector::parse(selector)?;
        let root = self.target.downgrade();
        Ok(self.on(events, move |event| {
            let Some(root) = root.upgrade() else { return };
            let mut current = event.target();
            while let Some(node) = current {
                if node == root {
                    break;
                }
                if selector.matches(&node) {
                    handler(event);
                    break;
                }
                current = node.parent();
            }
        }))
    }

    /// Remove a listener for the given space-separated events.
    pub fn off(&self, events: &str, handler: &EventListener) {
        for event in events.split_whitespace() {
            self.target.remove_event_listener(event, handler);
            self.listeners
                .borrow_mut()
                .retain(|(name, l)| !(name == event && std::rc::Rc::ptr_eq(l, handler)));
        }
    }

    /// Dispatch a bubbling custom event with `detail` on the target.
    pub fn emit<T: Any>(&self, event: &str, detail: T) {
        self.target.dispatch_event(&Event::custom(event, detail));
    }

    /// Dispatch a bubbling custom event without detail.
    pub fn emit_empty(&self, event: &str) {
        self.target
            .dispatch_event(&Event::new(event).with_bubbles(true));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Remove every listener added through this delegate.
    pub fn destroy(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for (event, handler) in listeners {
            self.target.remove_event_listener(&event, &handler);
        }
    }
}
