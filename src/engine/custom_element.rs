//! Custom element bridge.
//!
//! Registered components whose names are valid custom element names also
//! become custom elements, so `<foo-bar>` gets its instance the moment it
//! is connected instead of on the next mutation batch.
//!
//! Disconnection only unmounts once a microtask has passed with the
//! element still detached, so moving an element keeps it mounted.

use std::rc::{Rc, Weak};

use crate::app::{App, WeakApp};
use crate::dom::{CustomElementDefinition, Node, is_valid_custom_element_name};
use crate::log::Logger;

use super::components_manager::StoredComponent;

/// Define a custom element for `stored`. Returns true if one was defined.
///
/// Safe to call repeatedly; only the first call does anything.
pub(crate) fn register_custom_element(app: &App, stored: &Rc<StoredComponent>) -> bool {
    if !stored.mark_registered() {
        return false;
    }
    let name = stored.name();
    let logger = Logger::new(&app.config().namespace, "CustomElement");
    if !is_valid_custom_element_name(name) {
        logger.debug(format!("'{name}' is not a custom element name; relying on the observer"));
        return false;
    }
    let registry = app.document().custom_elements();
    if registry.is_defined(name) {
        logger.warn(format!("'{name}' is already defined in this document"));
        return false;
    }

    let definition = CustomElementDefinition::new()
        .on_connected({
            let app = app.downgrade();
            let stored = Rc::downgrade(stored);
            move |element| connected(&app, &stored, element)
        })
        .on_disconnected({
            let app = app.downgrade();
            let stored = Rc::downgrade(stored);
            move |element| disconnected(&app, &stored, element)
        });

    match registry.define(name, definition) {
        Ok(()) => true,
        Err(error) => {
            logger.warn(error);
            false
        }
    }
}

fn connected(app: &WeakApp, stored: &Weak<StoredComponent>, element: &Node) {
    let (Some(app), Some(stored)) = (app.upgrade(), stored.upgrade()) else {
        return;
    };
    let components = app.components();
    if !components.is_running() {
        return;
    }
    match components.find_instance(element, stored.component()) {
        Some(instance) => components.schedule_mount(&app, &instance),
        None => {
            components.ensure_instance(&app, &stored, element);
        }
    }
}

fn disconnected(app: &WeakApp, stored: &Weak<StoredComponent>, element: &Node) {
    let Some(app) = app.upgrade() else { return };
    let stored = stored.clone();
    let element = element.clone();
    let weak_app = app.downgrade();
    app.event_loop().queue_microtask(move || {
        if element.is_connected() {
            return;
        }
        let (Some(app), Some(stored)) = (weak_app.upgrade(), stored.upgrade()) else {
            return;
        };
        if let Some(instance) = app.components().find_instance(&element, stored.component()) {
            instance.unmount();
        }
    });
}
