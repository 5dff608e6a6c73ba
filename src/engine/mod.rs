//! Framework core - components, modules and the managers that own them.
//!
//! - EventBus / EventDelegate: lifecycle callbacks and DOM listeners
//! - Context: the instance whose setup function is running
//! - Module / ModulesManager: app-wide singletons
//! - Component / ComponentsManager: behavior attached to elements
//! - Custom element bridge: `<foo-bar>` hosts get instances on connect
//!
//! # Architecture
//!
//! Instances are not stored on elements. The components manager keeps a
//! side table from element to instance list:
//!
//! ```text
//! <div data-a data-b>  ->  [ a instance, b instance ]
//! <foo-bar>            ->  [ foo-bar instance ]
//! ```
//!
//! so one element can host several components and teardown is a walk over
//! the removed subtree.

mod component;
mod components_manager;
mod context;
mod custom_element;
mod event_bus;
mod event_delegate;
mod module;
mod modules_manager;

pub use component::*;
pub use components_manager::*;
pub use context::{ActiveInstance, ContextGuard, has_context, inject, provide};
pub(crate) use context::{inject_component, inject_module};
pub use event_bus::*;
pub use event_delegate::*;
pub use module::*;
pub use modules_manager::*;
