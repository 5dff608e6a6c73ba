//! Components manager.
//!
//! Finds the elements that host registered components, creates their
//! instances, mounts them on the next tick and tears them down when their
//! elements leave the DOM.
//!
//! A component named `foo-bar` is hosted by `<foo-bar>` elements and by
//! any element with a `data-foo-bar` attribute. Instances live in a side
//! table keyed by element, so one element can host several components.
//!
//! # Flow
//!
//! ```text
//! run()
//!  ├─ MutationObserver(root, childList | subtree)
//!  ├─ custom element per hyphenated name
//!  └─ harvest(root)
//!
//! harvest(subtree) ── create instance ── marker class ── schedule mount
//!                                                          │
//!                                    setTimeout(0) flush ◄─┘ (one timer per batch)
//!
//! mutation batch
//!  ├─ removed and detached ── destroy(subtree)
//!  ├─ added                ── harvest(subtree)
//!  └─ dispatch `<namespace>:dom:updated` on the root
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::app::App;
use crate::config::AppConfig;
use crate::dom::{
    DomError, Event, MutationObserver, MutationRecord, Node, NodeId, ObserverOptions, Selector,
};
use crate::error::{OveeError, Result};
use crate::host::TimerId;
use crate::log::Logger;
use crate::types::Options;

use super::component::{Component, ComponentInternalInstance};
use super::custom_element::register_custom_element;

// =============================================================================
// Keys
// =============================================================================

/// Look up a component by registered name or by definition.
#[derive(Clone, Copy, Debug)]
pub enum ComponentKey<'a> {
    Name(&'a str),
    Definition(&'a Component),
}

impl<'a> From<&'a str> for ComponentKey<'a> {
    fn from(name: &'a str) -> Self {
        ComponentKey::Name(name)
    }
}

impl<'a> From<&'a String> for ComponentKey<'a> {
    fn from(name: &'a String) -> Self {
        ComponentKey::Name(name)
    }
}

impl<'a> From<&'a Component> for ComponentKey<'a> {
    fn from(component: &'a Component) -> Self {
        ComponentKey::Definition(component)
    }
}

// =============================================================================
// StoredComponent
// =============================================================================

/// A registered component: kebab-case name, definition, options and the
/// selector that finds its host elements.
pub struct StoredComponent {
    name: String,
    component: Component,
    options: Options,
    selector: Selector,
    registered: Cell<bool>,
}

impl fmt::Debug for StoredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredComponent")
            .field("name", &self.name)
            .field("registered", &self.registered.get())
            .finish()
    }
}

impl StoredComponent {
    pub(crate) fn new(name: &str, component: &Component, options: Options) -> std::result::Result<Self, DomError> {
        Ok(Self {
            name: name.to_string(),
            component: component.clone(),
            options,
            selector: Selector::parse(&format!("{name}, [data-{name}]"))?,
            registered: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Whether `element` hosts this component (`<name>` or `[data-name]`).
    pub fn matches(&self, element: &Node) -> bool {
        self.selector.matches(element)
    }

    /// Flip the custom element registration flag; true the first time.
    pub(crate) fn mark_registered(&self) -> bool {
        !self.registered.replace(true)
    }
}

// =============================================================================
// ComponentsManager
// =============================================================================

type InstanceTable = HashMap<NodeId, Vec<Rc<ComponentInternalInstance>>>;

pub struct ComponentsManager {
    namespace: String,
    marker_class: String,
    updated_event: String,
    stored: Vec<Rc<StoredComponent>>,
    anonymous: RefCell<Vec<Rc<StoredComponent>>>,
    instances: RefCell<InstanceTable>,
    observer: RefCell<Option<MutationObserver>>,
    pending_mounts: RefCell<Vec<Weak<ComponentInternalInstance>>>,
    flush_timer: Cell<Option<TimerId>>,
    running: Cell<bool>,
    logger: Logger,
}

impl fmt::Debug for ComponentsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentsManager")
            .field("stored", &self.stored)
            .field("elements", &self.instances.borrow().len())
            .field("running", &self.running.get())
            .finish()
    }
}

impl ComponentsManager {
    pub(crate) fn new(config: &AppConfig, stored: Vec<Rc<StoredComponent>>) -> Self {
        Self {
            namespace: config.namespace.clone(),
            marker_class: config.marker_class(),
            updated_event: config.event_name("dom:updated"),
            stored,
            anonymous: RefCell::new(Vec::new()),
            instances: RefCell::new(HashMap::new()),
            observer: RefCell::new(None),
            pending_mounts: RefCell::new(Vec::new()),
            flush_timer: Cell::new(None),
            running: Cell::new(false),
            logger: Logger::new(&config.namespace, "ComponentsManager"),
        }
    }

    pub fn stored(&self) -> &[Rc<StoredComponent>] {
        &self.stored
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Start observing the root, register custom elements and harvest
    /// everything already in the DOM.
    pub(crate) fn run(&self, app: &App) {
        if self.running.replace(true) {
            return;
        }

        let weak = app.downgrade();
        let observer = MutationObserver::new(app.document(), move |records, _| {
            if let Some(app) = weak.upgrade() {
                app.components().handle_mutations(&app, records);
            }
        });
        observer.observe(app.root(), ObserverOptions::CHILD_LIST | ObserverOptions::SUBTREE);
        *self.observer.borrow_mut() = Some(observer);

        for stored in &self.stored {
            register_custom_element(app, stored);
        }
        for stored in self.anonymous.borrow().clone() {
            register_custom_element(app, &stored);
        }

        self.harvest(app, app.root());
        self.logger
            .debug(format!("running with {} component(s)", self.stored.len()));
    }

    /// Disconnect the observer, drop pending mounts and destroy every
    /// instance under the root.
    pub(crate) fn destroy_all(&self, app: &App) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(observer) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
        if let Some(timer) = self.flush_timer.take() {
            app.event_loop().clear_timeout(timer);
        }
        self.pending_mounts.borrow_mut().clear();
        self.destroy(app.root());

        // Instances outside the root (custom elements connected elsewhere).
        let rest: Vec<_> = self.instances.borrow_mut().drain().collect();
        for (_, instances) in rest {
            for instance in instances {
                instance.element().remove_class(&self.marker_class);
                instance.dispose();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Harvest / destroy
    // -------------------------------------------------------------------------

    /// Create instances for every element in `subtree` (inclusive) that
    /// hosts a registered component and does not have one yet.
    pub(crate) fn harvest(&self, app: &App, subtree: &Node) {
        let elements: Vec<Node> = subtree
            .inclusive_descendants()
            .into_iter()
            .filter(Node::is_element)
            .collect();
        for stored in &self.stored {
            for element in elements.iter().filter(|element| stored.matches(element)) {
                self.ensure_instance(app, stored, element);
            }
        }
    }

    /// Unmount and dispose every instance hosted in `subtree` (inclusive).
    pub(crate) fn destroy(&self, subtree: &Node) {
        for node in subtree.inclusive_descendants() {
            let removed = self.instances.borrow_mut().remove(&node.id());
            let Some(instances) = removed else { continue };
            for instance in instances {
                instance.dispose();
            }
            node.remove_class(&self.marker_class);
        }
    }

    fn handle_mutations(&self, app: &App, records: Vec<MutationRecord>) {
        if !self.running.get() {
            return;
        }
        let mut changed = false;
        for record in &records {
            for removed in &record.removed_nodes {
                changed = true;
                // Still attached somewhere: it was moved, not removed.
                if removed.parent().is_none() {
                    self.destroy(removed);
                }
            }
            for added in &record.added_nodes {
                changed = true;
                if added.is_element() && app.root().contains(added) {
                    self.harvest(app, added);
                }
            }
        }
        if changed {
            app.root()
                .dispatch_event(&Event::new(self.updated_event.as_str()).with_bubbles(true));
        }
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    pub(crate) fn ensure_instance(
        &self,
        app: &App,
        stored: &StoredComponent,
        element: &Node,
    ) -> Rc<ComponentInternalInstance> {
        if let Some(existing) = self.find_instance(element, stored.component()) {
            return existing;
        }
        let instance = ComponentInternalInstance::create(
            stored.name(),
            element,
            app,
            stored.component(),
            stored.options().clone(),
            |instance| self.attach(instance),
        );
        element.add_class(&self.marker_class);
        self.schedule_mount(app, &instance);
        instance
    }

    fn attach(&self, instance: &Rc<ComponentInternalInstance>) {
        self.instances
            .borrow_mut()
            .entry(instance.element().id())
            .or_default()
            .push(instance.clone());
    }

    /// Instance of `component` hosted by `element`, if any.
    pub fn find_instance(
        &self,
        element: &Node,
        component: &Component,
    ) -> Option<Rc<ComponentInternalInstance>> {
        self.instances
            .borrow()
            .get(&element.id())?
            .iter()
            .find(|instance| instance.component().ptr_eq(component))
            .cloned()
    }

    /// Every instance hosted by `element`, in creation order.
    pub fn instances_of(&self, element: &Node) -> Vec<Rc<ComponentInternalInstance>> {
        self.instances
            .borrow()
            .get(&element.id())
            .cloned()
            .unwrap_or_default()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.borrow().values().map(Vec::len).sum()
    }

    /// Resolve a name or definition to its registration.
    pub fn resolve(&self, key: ComponentKey<'_>) -> Result<Rc<StoredComponent>> {
        let found = match key {
            ComponentKey::Name(name) => {
                let kebab = crate::types::to_kebab_case(name);
                self.stored.iter().find(|stored| stored.name() == kebab).cloned()
            }
            ComponentKey::Definition(component) => self
                .stored
                .iter()
                .find(|stored| stored.component().ptr_eq(component))
                .cloned(),
        };
        found.ok_or_else(|| OveeError::UnregisteredComponent {
            namespace: crate::config::display_namespace(&self.namespace),
            name: match key {
                ComponentKey::Name(name) => name.to_string(),
                ComponentKey::Definition(_) => "<unnamed definition>".to_string(),
            },
        })
    }

    // -------------------------------------------------------------------------
    // Mount scheduling
    // -------------------------------------------------------------------------

    /// Queue `instance` for mounting on the next tick. All instances
    /// queued before the tick share one timer.
    pub(crate) fn schedule_mount(&self, app: &App, instance: &Rc<ComponentInternalInstance>) {
        self.pending_mounts.borrow_mut().push(Rc::downgrade(instance));
        if self.flush_timer.get().is_some() {
            return;
        }
        let weak = app.downgrade();
        let timer = app.event_loop().set_timeout(0.0, move || {
            if let Some(app) = weak.upgrade() {
                app.components().flush_mounts(&app);
            }
        });
        self.flush_timer.set(Some(timer));
    }

    fn flush_mounts(&self, app: &App) {
        self.flush_timer.set(None);
        let pending = std::mem::take(&mut *self.pending_mounts.borrow_mut());
        for instance in pending.iter().filter_map(Weak::upgrade) {
            let element = instance.element();
            let live = !instance.is_disposed()
                && (element.is_connected() || app.root().contains(element));
            if live {
                instance.mount();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Template components
    // -------------------------------------------------------------------------

    /// Tag name used to render `component` from a template.
    ///
    /// Registered components render as their own name. Anything else gets
    /// a generated `<namespace>-anonymous-<n>` custom element, once per
    /// definition.
    pub(crate) fn tag_for(&self, app: &App, component: &Component) -> Option<String> {
        if let Some(stored) = self.stored.iter().find(|s| s.component().ptr_eq(component)) {
            return Some(stored.name().to_string());
        }
        if let Some(stored) = self
            .anonymous
            .borrow()
            .iter()
            .find(|s| s.component().ptr_eq(component))
        {
            return Some(stored.name().to_string());
        }

        let index = self.anonymous.borrow().len() + 1;
        let name = format!("{}-anonymous-{index}", self.namespace.to_ascii_lowercase());
        let stored = match StoredComponent::new(&name, component, Options::none()) {
            Ok(stored) => Rc::new(stored),
            Err(error) => {
                self.logger
                    .error(format!("cannot render anonymous component '{name}': {error}"));
                return None;
            }
        };
        self.anonymous.borrow_mut().push(stored.clone());
        if self.running.get() {
            register_custom_element(app, &stored);
        }
        Some(name)
    }
}
