//! DOM events.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::node::Node;

/// Listener callback. Identity (the `Rc` allocation) is what add/remove compare.
pub type EventListener = Rc<dyn Fn(&Event)>;

/// Wrap a closure into an [`EventListener`].
pub fn listener(f: impl Fn(&Event) + 'static) -> EventListener {
    Rc::new(f)
}

/// A dispatched event.
pub struct Event {
    name: String,
    bubbles: bool,
    detail: Option<Rc<dyn Any>>,
    target: RefCell<Option<Node>>,
    current_target: RefCell<Option<Node>>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    /// A non-bubbling event without detail.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bubbles: false,
            detail: None,
            target: RefCell::new(None),
            current_target: RefCell::new(None),
            propagation_stopped: Cell::new(false),
        }
    }

    /// A bubbling event carrying `detail` (the `CustomEvent` shape).
    pub fn custom<T: Any>(name: impl Into<String>, detail: T) -> Self {
        Self::new(name).with_bubbles(true).with_detail(detail)
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn target(&self) -> Option<Node> {
        self.target.borrow().clone()
    }

    pub fn current_target(&self) -> Option<Node> {
        self.current_target.borrow().clone()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub(crate) fn set_target(&self, node: &Node) {
        *self.target.borrow_mut() = Some(node.clone());
    }

    pub(crate) fn set_current_target(&self, node: Option<&Node>) {
        *self.current_target.borrow_mut() = node.cloned();
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("bubbles", &self.bubbles)
            .field("has_detail", &self.detail.is_some())
            .finish()
    }
}

/// Registered listener on a node.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) event: String,
    pub(crate) listener: EventListener,
}
