//! # spark-ovee
//!
//! Component framework for progressively enhancing server-rendered DOM.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity.
//!
//! ## Architecture
//!
//! An [`App`] is bound to a root element. Registered components are
//! discovered on elements by tag name (`<foo-bar>`) or data attribute
//! (`data-foo-bar`), get an instance each, and are mounted on the next tick.
//! A mutation observer keeps instances in sync with the DOM afterwards.
//! Modules are app-wide singletons set up as soon as the app exists.
//!
//! ```text
//! AppConfigurator ── App ─┬─ ModulesManager    ── ModuleInternalInstance*
//!                         ├─ ComponentsManager ── ComponentInternalInstance* (per element)
//!                         └─ Scheduler         ── Renderer* (one per use_template)
//! ```
//!
//! Everything runs against the in-memory [`dom`] and a deterministic
//! [`host::EventLoop`] (microtasks, timers and idle callbacks on a virtual
//! clock).
//!
//! ## Modules
//!
//! - [`types`] - Shared types (Options, InstanceObject, name helpers)
//! - [`host`] - Event loop and completions
//! - [`dom`] - In-memory DOM, observers and custom elements
//! - [`engine`] - Components, modules, managers and the setup context
//! - [`composables`] - Lifecycle hooks, accessors and templates
//! - [`render`] - Virtual nodes, fiber reconciler and idle scheduler

pub mod app;
pub mod composables;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod host;
pub mod log;
pub mod render;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use app::{App, AppConfigurator, RegisteredComponent, RegisteredModule, WeakApp, create_app};

pub use config::{AppConfig, DEFAULT_NAMESPACE, MODE_ENV_VAR, Mode};

pub use error::{OveeError, Result};

pub use engine::{
    Component, ComponentContext, ComponentInternalInstance, ComponentKey, Module, ModuleContext,
    ModuleInternalInstance, ModuleKey,
};

pub use composables::{
    on_before_mount, on_destroy, on_init, on_mounted, on_unmounted, use_app, use_app_optional,
    use_component, use_component_optional, use_current_module, use_element, use_module,
    use_template,
};

pub use render::{Renderer, Scheduler, VNode, fragment, function, h, text};

pub use dom::{Document, Event, Node};

pub use host::{Completion, EventLoop, EventLoopConfig};
