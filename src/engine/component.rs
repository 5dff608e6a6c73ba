//! Components: behavior attached to DOM elements.
//!
//! A [`Component`] is a definition (a setup function). Every element that
//! hosts it gets its own [`ComponentInternalInstance`], created by the
//! components manager or by the custom element bridge.
//!
//! # Lifecycle
//!
//! ```text
//! create ── setup (context provided) ── beforeMount
//!    │
//!    ├── mount()   ── mounted      (deferred until a pending render settles)
//!    ├── unmount() ── unmounted
//!    └── dispose() ── unmount + stop effects + drop listeners + stop renders
//! ```
//!
//! `mount` and `unmount` are idempotent. Moving the host element keeps
//! its instance.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use spark_signals::effect_scope;

use crate::app::{App, WeakApp};
use crate::dom::{DomError, Event, EventListener, Node};
use crate::host::Completion;
use crate::log::Logger;
use crate::types::{Cleanup, InstanceObject, Options, empty_instance};

use super::context::{ActiveInstance, provide};
use super::event_bus::{EventBus, Subscription};
use super::event_delegate::EventDelegate;

type SetupResult = Result<InstanceObject, Box<dyn Error>>;
type ComponentSetup = dyn Fn(&Node, &ComponentContext) -> SetupResult;

// =============================================================================
// Definition
// =============================================================================

/// A component definition. Cheap to clone; clones are the same definition.
#[derive(Clone)]
pub struct Component(Rc<ComponentSetup>);

impl Component {
    /// Define a component from an infallible setup function.
    ///
    /// ```ignore
    /// let greeter = Component::new(|element, _ctx| {
    ///     let element = element.clone();
    ///     on_mounted(move || element.set_text_content("hi"));
    /// });
    /// ```
    pub fn new<T, F>(setup: F) -> Self
    where
        T: Any,
        F: Fn(&Node, &ComponentContext) -> T + 'static,
    {
        Self(Rc::new(
            move |element: &Node, ctx: &ComponentContext| -> SetupResult {
                Ok(Rc::new(setup(element, ctx)) as InstanceObject)
            },
        ))
    }

    /// Define a component whose setup can fail.
    ///
    /// A failed setup is logged; the instance stays alive with `()` as its
    /// public surface.
    pub fn try_new<T, E, F>(setup: F) -> Self
    where
        T: Any,
        E: Into<Box<dyn Error>>,
        F: Fn(&Node, &ComponentContext) -> Result<T, E> + 'static,
    {
        Self(Rc::new(
            move |element: &Node, ctx: &ComponentContext| -> SetupResult {
                setup(element, ctx)
                    .map(|value| Rc::new(value) as InstanceObject)
                    .map_err(Into::into)
            },
        ))
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// What a component setup function receives next to its element.
#[derive(Clone, Debug)]
pub struct ComponentContext {
    instance: Rc<ComponentInternalInstance>,
}

impl ComponentContext {
    pub fn app(&self) -> Option<App> {
        self.instance.app()
    }

    pub fn name(&self) -> &str {
        self.instance.name()
    }

    pub fn options(&self) -> &Options {
        self.instance.options()
    }

    pub fn instance(&self) -> &Rc<ComponentInternalInstance> {
        &self.instance
    }

    pub fn on(&self, events: &str, handler: impl Fn(&Event) + 'static) -> EventListener {
        self.instance.on(events, handler)
    }

    pub fn on_selector(
        &self,
        events: &str,
        selector: &str,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<EventListener, DomError> {
        self.instance.on_selector(events, selector, handler)
    }

    pub fn off(&self, events: &str, handler: &EventListener) {
        self.instance.off(events, handler)
    }

    pub fn emit<T: Any>(&self, event: &str, detail: T) {
        self.instance.emit(event, detail)
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Runtime state of one component on one element.
pub struct ComponentInternalInstance {
    name: String,
    element: Node,
    app: WeakApp,
    component: Component,
    options: Options,
    instance: RefCell<InstanceObject>,
    mounted: Cell<bool>,
    mount_generation: Cell<u64>,
    disposed: Cell<bool>,
    before_mount_bus: EventBus,
    mount_bus: EventBus,
    unmount_bus: EventBus,
    event_delegate: EventDelegate,
    render_promise: RefCell<Option<Completion>>,
    cleanups: RefCell<Vec<Cleanup>>,
    logger: Logger,
}

impl fmt::Debug for ComponentInternalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInternalInstance")
            .field("name", &self.name)
            .field("element", &self.element)
            .field("mounted", &self.mounted.get())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl ComponentInternalInstance {
    /// Create the instance and run setup.
    ///
    /// `attach` is called once setup has finished and before `beforeMount`
    /// fires, so the instance is already findable from its element when the
    /// before-mount callbacks run.
    pub(crate) fn create(
        name: &str,
        element: &Node,
        app: &App,
        component: &Component,
        options: Options,
        attach: impl FnOnce(&Rc<ComponentInternalInstance>),
    ) -> Rc<Self> {
        let namespace = app.config().namespace.clone();
        let this = Rc::new(Self {
            name: name.to_string(),
            element: element.clone(),
            app: app.downgrade(),
            component: component.clone(),
            options,
            instance: RefCell::new(empty_instance()),
            mounted: Cell::new(false),
            mount_generation: Cell::new(0),
            disposed: Cell::new(false),
            before_mount_bus: EventBus::new(),
            mount_bus: EventBus::new(),
            unmount_bus: EventBus::new(),
            event_delegate: EventDelegate::new(element),
            render_promise: RefCell::new(None),
            cleanups: RefCell::new(Vec::new()),
            logger: Logger::new(&namespace, &format!("Component:{name}")),
        });

        let guard = provide(ActiveInstance::Component(this.clone()));
        let result: Rc<RefCell<Option<SetupResult>>> = Rc::new(RefCell::new(None));
        // Detached: the manager owns this instance's lifetime, not whichever
        // setup happened to be running when it was created.
        let scope = effect_scope(true);
        {
            let result = result.clone();
            let ctx = ComponentContext {
                instance: this.clone(),
            };
            let setup = this.component.0.clone();
            let element = element.clone();
            scope.run(move || {
                *result.borrow_mut() = Some(setup(&element, &ctx));
            });
        }
        guard.cleanup();

        match result.borrow_mut().take() {
            Some(Ok(instance)) => *this.instance.borrow_mut() = instance,
            Some(Err(error)) => this.logger.error(format!("setup failed: {error}")),
            None => {}
        }
        this.add_cleanup(Box::new(move || {
            scope.stop();
        }));

        attach(&this);
        this.before_mount_bus.emit();
        this
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self) -> &Node {
        &self.element
    }

    pub fn app(&self) -> Option<App> {
        self.app.upgrade()
    }

    pub fn component(&self) -> &Component {
        &self.component
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

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub fn event_delegate(&self) -> &EventDelegate {
        &self.event_delegate
    }

    pub(crate) fn logger(&self) -> &Logger {
        &self.logger
    }

    // -------------------------------------------------------------------------
    // Lifecycle callbacks
    // -------------------------------------------------------------------------

    pub fn on_before_mount(&self, callback: impl Fn() + 'static) -> Subscription {
        self.before_mount_bus.on(callback)
    }

    pub fn on_mounted(&self, callback: impl Fn() + 'static) -> Subscription {
        self.mount_bus.on(callback)
    }

    pub fn on_unmounted(&self, callback: impl Fn() + 'static) -> Subscription {
        self.unmount_bus.on(callback)
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn on(&self, events: &str, handler: impl Fn(&Event) + 'static) -> EventListener {
        self.event_delegate.on(events, handler)
    }

    pub fn on_selector(
        &self,
        events: &str,
        selector: &str,
        handler: impl Fn(&Event) + 'static,
    ) -> Result<EventListener, DomError> {
        self.event_delegate.on_selector(events, selector, handler)
    }

    pub fn off(&self, events: &str, handler: &EventListener) {
        self.event_delegate.off(events, handler)
    }

    pub fn emit<T: Any>(&self, event: &str, detail: T) {
        self.event_delegate.emit(event, detail)
    }

    // -------------------------------------------------------------------------
    // Mount / unmount
    // -------------------------------------------------------------------------

    /// Mark the instance mounted and fire the mounted callbacks.
    ///
    /// While a render is still pending the callbacks wait for it to settle,
    /// so they observe the rendered DOM. Nothing fires if the instance was
    /// unmounted (or remounted) in the meantime.
    pub fn mount(self: &Rc<Self>) {
        if self.mounted.get() || self.disposed.get() {
            return;
        }
        self.mounted.set(true);
        let generation = self.mount_generation.get() + 1;
        self.mount_generation.set(generation);

        let pending = self
            .render_promise
            .borrow()
            .clone()
            .filter(|promise| !promise.is_settled());
        match pending {
            Some(promise) => {
                let weak = Rc::downgrade(self);
                promise.then(move || {
                    let Some(this) = weak.upgrade() else { return };
                    if this.mounted.get()
                        && !this.disposed.get()
                        && this.mount_generation.get() == generation
                    {
                        this.mount_bus.emit();
                    }
                });
            }
            None => self.mount_bus.emit(),
        }
    }

    /// Mark the instance unmounted and fire the unmounted callbacks.
    pub fn unmount(&self) {
        if !self.mounted.replace(false) {
            return;
        }
        self.unmount_bus.emit();
    }

    pub(crate) fn set_render_promise(&self, promise: Completion) {
        *self.render_promise.borrow_mut() = Some(promise);
    }

    pub fn render_promise(&self) -> Option<Completion> {
        self.render_promise.borrow().clone()
    }

    pub(crate) fn add_cleanup(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            cleanup();
            return;
        }
        self.cleanups.borrow_mut().push(cleanup);
    }

    /// Tear the instance down for good: unmount, stop its effects and
    /// renders, and drop every listener it added.
    pub(crate) fn dispose(&self) {
        if self.disposed.get() {
            return;
        }
        self.unmount();
        self.disposed.set(true);
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        self.event_delegate.destroy();
        self.render_promise.borrow_mut().take();
    }
}
