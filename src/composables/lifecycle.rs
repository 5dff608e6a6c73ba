//! Lifecycle hooks.
//!
//! Called outside a setup function (or in the wrong kind of setup), they
//! log a warning and do nothing.

use crate::engine::{inject_component, inject_module};

/// Run `callback` right after setup, before the component is mounted.
pub fn on_before_mount(callback: impl Fn() + 'static) {
    if let Some(instance) = inject_component("on_before_mount") {
        instance.on_before_mount(callback);
    }
}

/// Run `callback` every time the component is mounted.
pub fn on_mounted(callback: impl Fn() + 'static) {
    if let Some(instance) = inject_component("on_mounted") {
        instance.on_mounted(callback);
    }
}

/// Run `callback` every time the component is unmounted.
pub fn on_unmounted(callback: impl Fn() + 'static) {
    if let Some(instance) = inject_component("on_unmounted") {
        instance.on_unmounted(callback);
    }
}

/// Run `callback` when the app initializes the module.
pub fn on_init(callback: impl Fn() + 'static) {
    if let Some(instance) = inject_module("on_init") {
        instance.on_init(callback);
    }
}

/// Run `callback` when the app destroys the module.
pub fn on_destroy(callback: impl Fn() + 'static) {
    if let Some(instance) = inject_module("on_destroy") {
        instance.on_destroy(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_hooks_outside_setup_are_ignored() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        on_mounted(move || h.set(h.get() + 1));
        let h = hits.clone();
        on_init(move || h.set(h.get() + 1));
        assert_eq!(hits.get(), 0);
    }
}
