//! In-memory DOM.
//!
//! Just enough of the DOM for the framework to run against: element and
//! text nodes, attributes and properties, bubbling events, a minimal
//! selector engine, mutation observers and a custom element registry.
//!
//! # Architecture
//!
//! ```text
//! Document ─┬─ node tree (Node handles, identity = NodeId)
//!           ├─ MutationObserver list  (records queued, delivered per microtask)
//!           ├─ CustomElementRegistry  (connected/disconnected reactions)
//!           └─ EventLoop              (shared with everything scheduled on it)
//! ```

mod custom_elements;
mod document;
mod event;
mod node;
mod observer;
mod selector;

use thiserror::Error;

pub use custom_elements::{
    is_valid_custom_element_name, CustomElementDefinition, CustomElementRegistry,
};
pub use document::Document;
pub use event::{listener, Event, EventListener};
pub use node::{Node, NodeId, NodeKind, PropertyValue, WeakNode};
pub use observer::{MutationKind, MutationObserver, MutationRecord, ObserverOptions};
pub use selector::Selector;

/// DOM operation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("the operation would yield an incorrect node tree")]
    HierarchyRequest,
    #[error("the node is not a child of this node")]
    NotFound,
    #[error("'{0}' is not a valid selector")]
    InvalidSelector(String),
    #[error("'{0}' is not a valid custom element name")]
    InvalidCustomElementName(String),
    #[error("'{0}' has already been defined as a custom element")]
    AlreadyDefined(String),
}
