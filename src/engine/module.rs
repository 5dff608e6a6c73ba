//! Modules: app-wide singletons with an init/destroy lifecycle.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use spark_signals::effect_scope;

use crate::app::{App, WeakApp};
use crate::log::Logger;
use crate::types::{Cleanup, InstanceObject, Options, empty_instance};

use super::context::{ActiveInstance, provide};
use super::event_bus::{EventBus, Subscription};

type SetupResult = Result<InstanceObject, Box<dyn Error>>;
type ModuleSetup = dyn Fn(&ModuleContext) -> SetupResult;

// =============================================================================
// Definition
// =============================================================================

/// A module definition. Cheap to clone; clones are the same definition.
#[derive(Clone)]
pub struct Module(Rc<ModuleSetup>);

impl Module {
    /// Define a module from an infallible setup function.
    pub fn new<T, F>(setup: F) -> Self
    where
        T: Any,
        F: Fn(&ModuleContext) -> T + 'static,
    {
        Self(Rc::new(move |ctx: &ModuleContext| -> SetupResult {
            Ok(Rc::new(setup(ctx)) as InstanceObject)
        }))
    }

    /// Define a module whose setup can fail.
    ///
    /// A failed setup is logged and the instance falls back to `()`.
    pub fn try_new<T, E, F>(setup: F) -> Self
    where
        T: Any,
        E: Into<Box<dyn Error>>,
        F: Fn(&ModuleContext) -> Result<T, E> + 'static,
    {
        Self(Rc::new(move |ctx: &ModuleContext| -> SetupResult {
            setup(ctx)
                .map(|value| Rc::new(value) as InstanceObject)
                .map_err(Into::into)
        }))
    }

    pub fn ptr_eq(&self, other: &Module) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// What a module setup function receives.
#[derive(Clone, Debug)]
pub struct ModuleContext {
    instance: Rc<ModuleInternalInstance>,
}

impl ModuleContext {
    pub fn app(&self) -> Option<App> {
        self.instance.app()
    }

    pub fn name(&self) -> &str {
        self.instance.name()
    }

    pub fn options(&self) -> &Options {
        self.instance.options()
    }

    pub fn instance(&self) -> &Rc<ModuleInternalInstance> {
        &self.instance
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Runtime state of one module in one app.
pub struct ModuleInternalInstance {
    name: String,
    app: WeakApp,
    module: Module,
    options: Options,
    instance: RefCell<InstanceObject>,
    initialized: Cell<bool>,
    init_bus: EventBus,
    destroy_bus: EventBus,
    stop_scope: RefCell<Option<Cleanup>>,
    logger: Logger,
}

impl fmt::Debug for ModuleInternalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInternalInstance")
            .field("name", &self.name)
            .field("initialized", &self.initialized.get())
            .finish()
    }
}

impl ModuleInternalInstance {
    /// Run the module's setup with this instance as the current context.
    pub(crate) fn create(name: &str, app: &App, module: &Module, options: Options) -> Rc<Self> {
        let namespace = app.config().namespace.clone();
        let this = Rc::new(Self {
            name: name.to_string(),
            app: app.downgrade(),
            module: module.clone(),
            options,
            instance: RefCell::new(empty_instance()),
            initialized: Cell::new(false),
            init_bus: EventBus::new(),
            destroy_bus: EventBus::new(),
            stop_scope: RefCell::new(None),
            logger: Logger::new(&namespace, &format!("Module:{name}")),
        });

        let guard = provide(ActiveInstance::Module(this.clone()));
        let result: Rc<RefCell<Option<SetupResult>>> = Rc::new(RefCell::new(None));
        let scope = effect_scope(true);
        {
            let result = result.clone();
            let ctx = ModuleContext {
                instance: this.clone(),
            };
            let setup = this.module.0.clone();
            scope.run(move || {
                *result.borrow_mut() = Some(setup(&ctx));
            });
        }
        guard.cleanup();

        match result.borrow_mut().take() {
            Some(Ok(instance)) => *this.instance.borrow_mut() = instance,
            Some(Err(error)) => this.logger.error(format!("setup failed: {error}")),
            None => {}
        }
        *this.stop_scope.borrow_mut() = Some(Box::new(move || {
            scope.stop();
        }));
        this
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app(&self) -> Option<App> {
        self.app.upgrade()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Public surface returned by the setup function.
    pub fn instance(&self) -> InstanceObject {
        self.instance.borrow().clone()
    }

    /// Public surface downcast to `T`.
    pub fn instance_as<T: Any>(&self) -> Option<Rc<T>> {
        self.instance().downcast::<T>().ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn on_init(&self, callback: impl Fn() + 'static) -> Subscription {
        self.init_bus.on(callback)
    }

    pub fn on_destroy(&self, callback: impl Fn() + 'static) -> Subscription {
        self.destroy_bus.on(callback)
    }

    /// Fire the init callbacks. Does nothing when already initialized.
    pub fn init(&self) {
        if self.initialized.replace(true) {
            return;
        }
        self.init_bus.emit();
    }

    /// Fire the destroy callbacks. Does nothing unless initialized.
    pub fn destroy(&self) {
        if !self.initialized.replace(false) {
            return;
        }
        self.destroy_bus.emit();
    }
}

impl Drop for ModuleInternalInstance {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_scope.get_mut().take() {
            stop();
        }
    }
}
