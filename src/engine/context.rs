//! Setup context: the instance whose setup function is currently running.
//!
//! Composables find their owner through this slot. It is set right before a
//! setup function runs and cleared right after, so it is only meaningful
//! during synchronous setup code. Nested setups (a setup that inserts an
//! element which immediately hosts another component) restore the outer
//! instance when they finish.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::DEFAULT_NAMESPACE;
use crate::log::Logger;

use super::component::ComponentInternalInstance;
use super::module::ModuleInternalInstance;

/// The instance owning the current setup call.
#[derive(Clone, Debug)]
pub enum ActiveInstance {
    Component(Rc<ComponentInternalInstance>),
    Module(Rc<ModuleInternalInstance>),
}

impl ActiveInstance {
    pub fn as_component(&self) -> Option<&Rc<ComponentInternalInstance>> {
        match self {
            ActiveInstance::Component(instance) => Some(instance),
            ActiveInstance::Module(_) => None,
        }
    }

    pub fn as_module(&self) -> Option<&Rc<ModuleInternalInstance>> {
        match self {
            ActiveInstance::Module(instance) => Some(instance),
            ActiveInstance::Component(_) => None,
        }
    }

    pub fn app(&self) -> Option<crate::App> {
        match self {
            ActiveInstance::Component(instance) => instance.app(),
            ActiveInstance::Module(instance) => instance.app(),
        }
    }
}

// =============================================================================
// Slot
// =============================================================================

thread_local! {
    static CURRENT: RefCell<Option<ActiveInstance>> = const { RefCell::new(None) };
}

/// Clears the slot when dropped or when [`ContextGuard::cleanup`] is called.
#[must_use = "the context is cleared as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<Option<ActiveInstance>>,
}

impl ContextGuard {
    pub fn cleanup(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT.with(|slot| *slot.borrow_mut() = previous);
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Make `instance` the current setup context.
pub fn provide(instance: ActiveInstance) -> ContextGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(instance));
    ContextGuard {
        previous: Some(previous),
    }
}

/// Read the current setup context.
///
/// Logs a warning when there is none, unless `suppress_warning` is set.
pub fn inject(suppress_warning: bool) -> Option<ActiveInstance> {
    let current = CURRENT.with(|slot| slot.borrow().clone());
    if current.is_none() && !suppress_warning {
        Logger::new(DEFAULT_NAMESPACE, "Context").warn(
            "no active instance; composables must be called synchronously inside a setup function",
        );
    }
    current
}

/// Whether a setup function is running right now.
pub fn has_context() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Current component context, warning on behalf of `helper` when missing.
pub(crate) fn inject_component(helper: &str) -> Option<Rc<ComponentInternalInstance>> {
    match inject(true) {
        Some(ActiveInstance::Component(instance)) => Some(instance),
        Some(ActiveInstance::Module(module)) => {
            module
                .logger()
                .warn(format!("{helper}() can only be used inside a component setup function"));
            None
        }
        None => {
            Logger::new(DEFAULT_NAMESPACE, "Context").warn(format!(
                "{helper}() called without an active component instance"
            ));
            None
        }
    }
}

/// Current module context, warning on behalf of `helper` when missing.
pub(crate) fn inject_module(helper: &str) -> Option<Rc<ModuleInternalInstance>> {
    match inject(true) {
        Some(ActiveInstance::Module(instance)) => Some(instance),
        Some(ActiveInstance::Component(component)) => {
            component
                .logger()
                .warn(format!("{helper}() can only be used inside a module setup function"));
            None
        }
        None => {
            Logger::new(DEFAULT_NAMESPACE, "Context").warn(format!(
                "{helper}() called without an active module instance"
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_without_context() {
        assert!(!has_context());
        assert!(inject(true).is_none());
        assert!(inject_component("on_mounted").is_none());
        assert!(inject_module("on_init").is_none());
    }
}
