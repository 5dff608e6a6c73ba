//! The application: registry of modules and components bound to a root
//! element.
//!
//! ```ignore
//! let app = create_app()
//!     .use_module("store", &store, Options::none())?
//!     .component("greeter", &greeter, Options::none())?
//!     .run(&root)?;
//! ```
//!
//! Modules are set up as soon as the app exists; components are discovered
//! when it runs.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::{AppConfig, display_namespace, show_production_tip};
use crate::dom::{Document, Event, Node};
use crate::engine::{
    Component, ComponentInternalInstance, ComponentKey, ComponentsManager, Module,
    ModuleInternalInstance, ModuleKey, ModulesManager, StoredComponent,
};
use crate::error::{OveeError, Result};
use crate::host::EventLoop;
use crate::log::Logger;
use crate::render::{ComponentResolver, Scheduler};
use crate::types::{InstanceObject, Options, is_valid_component_name, to_kebab_case};

// =============================================================================
// Registrations
// =============================================================================

/// A module registered on a configurator.
#[derive(Clone, Debug)]
pub struct RegisteredModule {
    module: Module,
    options: Options,
}

impl RegisteredModule {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// A component registered on a configurator.
#[derive(Clone, Debug)]
pub struct RegisteredComponent {
    component: Component,
    options: Options,
}

impl RegisteredComponent {
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

// =============================================================================
// AppConfigurator
// =============================================================================

/// Builder collecting modules, components and configuration.
#[derive(Clone, Debug, Default)]
pub struct AppConfigurator {
    config: AppConfig,
    modules: BTreeMap<String, RegisteredModule>,
    components: BTreeMap<String, RegisteredComponent>,
}

/// Start configuring an app.
pub fn create_app() -> AppConfigurator {
    AppConfigurator::new()
}

impl AppConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Register a module under `name`.
    pub fn use_module(mut self, name: &str, module: &Module, options: Options) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(OveeError::InvalidName {
                namespace: self.config.display_namespace(),
                name: name.to_string(),
                kind: "module",
            });
        }
        if self.modules.contains_key(name) {
            return Err(OveeError::DuplicateName {
                namespace: self.config.display_namespace(),
                name: name.to_string(),
                kind: "module",
            });
        }
        self.modules.insert(
            name.to_string(),
            RegisteredModule {
                module: module.clone(),
                options,
            },
        );
        Ok(self)
    }

    /// Register a component under `name` (stored kebab-cased).
    pub fn component(mut self, name: &str, component: &Component, options: Options) -> Result<Self> {
        let kebab = to_kebab_case(name);
        if !is_valid_component_name(&kebab) {
            return Err(OveeError::InvalidName {
                namespace: self.config.display_namespace(),
                name: name.to_string(),
                kind: "component",
            });
        }
        if self.components.contains_key(&kebab) {
            return Err(OveeError::DuplicateName {
                namespace: self.config.display_namespace(),
                name: kebab,
                kind: "component",
            });
        }
        self.components.insert(
            kebab,
            RegisteredComponent {
                component: component.clone(),
                options,
            },
        );
        Ok(self)
    }

    pub fn registered_modules(&self) -> &BTreeMap<String, RegisteredModule> {
        &self.modules
    }

    pub fn registered_components(&self) -> &BTreeMap<String, RegisteredComponent> {
        &self.components
    }

    /// Build the app on `root` without running it.
    pub fn create(self, root: &Node) -> Result<App> {
        App::new(self, root)
    }

    /// Build the app on `root` and run it.
    pub fn run(self, root: &Node) -> Result<App> {
        let app = App::new(self, root)?;
        app.run();
        Ok(app)
    }
}

// =============================================================================
// App
// =============================================================================

pub(crate) struct AppInner {
    root: Node,
    document: Document,
    config: AppConfig,
    components: ComponentsManager,
    modules: ModulesManager,
    scheduler: Scheduler,
    initialized: Cell<bool>,
    logger: Logger,
}

/// A configured application. Clones share the same app.
#[derive(Clone)]
pub struct App(Rc<AppInner>);

/// Non-owning handle to an [`App`].
#[derive(Clone)]
pub struct WeakApp(Weak<AppInner>);

impl WeakApp {
    pub fn upgrade(&self) -> Option<App> {
        self.0.upgrade().map(App)
    }
}

impl fmt::Debug for WeakApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakApp")
    }
}

impl PartialEq for App {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("namespace", &self.0.config.namespace)
            .field("root", &self.0.root)
            .field("initialized", &self.0.initialized.get())
            .finish()
    }
}

impl App {
    /// Bind a configurator to `root` and set up its modules.
    pub fn new(configurator: AppConfigurator, root: &Node) -> Result<App> {
        let AppConfigurator {
            config,
            modules,
            components,
        } = configurator;

        let document = config
            .document
            .clone()
            .or_else(|| root.document())
            .ok_or_else(|| OveeError::MissingDocument {
                namespace: config.display_namespace(),
            })?;

        let stored = components
            .into_iter()
            .map(|(name, registered)| {
                StoredComponent::new(&name, &registered.component, registered.options)
                    .map(Rc::new)
                    .map_err(|_| OveeError::InvalidName {
                        namespace: config.display_namespace(),
                        name,
                        kind: "component",
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let app = App(Rc::new(AppInner {
            root: root.clone(),
            scheduler: Scheduler::new(document.event_loop()),
            document,
            components: ComponentsManager::new(&config, stored),
            modules: ModulesManager::new(&config.namespace, modules),
            logger: Logger::new(&config.namespace, "App"),
            initialized: Cell::new(false),
            config,
        }));
        app.0.modules.instantiate(&app);
        Ok(app)
    }

    pub fn downgrade(&self) -> WeakApp {
        WeakApp(Rc::downgrade(&self.0))
    }

    pub fn root(&self) -> &Node {
        &self.0.root
    }

    pub fn document(&self) -> &Document {
        &self.0.document
    }

    pub fn event_loop(&self) -> &EventLoop {
        self.0.document.event_loop()
    }

    pub fn config(&self) -> &AppConfig {
        &self.0.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.0.scheduler
    }

    pub fn components(&self) -> &ComponentsManager {
        &self.0.components
    }

    pub fn modules(&self) -> &ModulesManager {
        &self.0.modules
    }

    pub fn is_initialized(&self) -> bool {
        self.0.initialized.get()
    }

    /// Initialize modules, discover components and announce
    /// `<namespace>:initialized` on the root.
    pub fn run(&self) {
        if self.0.initialized.get() {
            self.0.logger.warn("run() called on an app that is already running");
            return;
        }
        self.0.modules.run();
        self.0.components.run(self);
        self.0.initialized.set(true);
        show_production_tip(&self.0.config);
        self.0.root.dispatch_event(&Event::custom(
            self.0.config.event_name("initialized"),
            self.clone(),
        ));
    }

    /// Destroy every component instance and module. Only acts on a running app.
    pub fn destroy(&self) {
        if !self.0.initialized.get() {
            return;
        }
        self.0.components.destroy_all(self);
        self.0.modules.destroy();
        self.0.initialized.set(false);
    }

    /// Public surface of a module.
    pub fn get_module<'a>(&self, key: impl Into<ModuleKey<'a>>) -> Result<InstanceObject> {
        Ok(self.0.modules.get(key.into())?.instance())
    }

    /// Internal instance of a module.
    pub fn get_module_instance<'a>(
        &self,
        key: impl Into<ModuleKey<'a>>,
    ) -> Result<Rc<ModuleInternalInstance>> {
        self.0.modules.get(key.into())
    }

    /// Instance of a registered component hosted by `element`.
    ///
    /// Unknown components are an error; a known component the element does
    /// not host is `Ok(None)`.
    pub fn get_component<'a>(
        &self,
        element: &Node,
        key: impl Into<ComponentKey<'a>>,
    ) -> Result<Option<Rc<ComponentInternalInstance>>> {
        let stored = self.0.components.resolve(key.into())?;
        Ok(self.0.components.find_instance(element, stored.component()))
    }

    /// Harvest components in a subtree right away, without waiting for the
    /// mutation observer.
    pub fn update_dom(&self, subtree: &Node) {
        if !self.0.components.is_running() {
            return;
        }
        self.0.components.harvest(self, subtree);
        self.0.root.dispatch_event(
            &Event::new(self.0.config.event_name("dom:updated")).with_bubbles(true),
        );
    }

    pub fn display_namespace(&self) -> String {
        display_namespace(&self.0.config.namespace)
    }
}

impl ComponentResolver for WeakApp {
    fn tag_for(&self, component: &Component) -> Option<String> {
        let app = self.upgrade()?;
        app.components().tag_for(&app, component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_rejected() {
        let component = Component::new(|_, _| ());
        let err = create_app()
            .component("fooBar", &component, Options::none())
            .and_then(|c| c.component("foo-bar", &component, Options::none()))
            .unwrap_err();
        assert!(matches!(err, OveeError::DuplicateName { kind: "component", .. }));

        let module = Module::new(|_| ());
        let err = create_app()
            .use_module("store", &module, Options::none())
            .and_then(|c| c.use_module("store", &module, Options::none()))
            .unwrap_err();
        assert!(matches!(err, OveeError::DuplicateName { kind: "module", .. }));
    }

    #[test]
    fn test_invalid_component_name() {
        let component = Component::new(|_, _| ());
        assert!(matches!(
            create_app().component("9lives", &component, Options::none()),
            Err(OveeError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_modules_created_eagerly() {
        let doc = Document::new();
        let created = Rc::new(Cell::new(0));
        let c = created.clone();
        let module = Module::new(move |_| c.set(c.get() + 1));
        let app = create_app()
            .use_module("m", &module, Options::none())
            .unwrap()
            .create(&doc.body())
            .unwrap();
        assert_eq!(created.get(), 1);
        assert!(!app.is_initialized());
    }

    #[test]
    fn test_unknown_module_is_error() {
        let doc = Document::new();
        let app = create_app().run(&doc.body()).unwrap();
        assert!(matches!(
            app.get_module("nope"),
            Err(OveeError::UnregisteredModule { .. })
        ));
        let stray = Module::new(|_| ());
        assert!(app.get_module(&stray).is_err());
    }

    #[test]
    fn test_initialized_event() {
        let doc = Document::new();
        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        doc.body().add_event_listener(
            "ovee:initialized",
            &crate::dom::listener(move |event| s.set(event.detail::<App>().is_some())),
        );
        let app = create_app().run(&doc.body()).unwrap();
        assert!(seen.get());
        app.destroy();
        assert!(!app.is_initialized());
    }
}
