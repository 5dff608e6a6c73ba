//! Accessors for the instance whose setup is running.
//!
//! Unlike the lifecycle hooks these return an error outside a setup
//! function; the `_optional` variants return `None` instead.

use std::rc::Rc;

use crate::app::App;
use crate::config::{DEFAULT_NAMESPACE, display_namespace};
use crate::dom::Node;
use crate::engine::{
    ActiveInstance, ComponentInternalInstance, ModuleInternalInstance, ModuleKey, inject,
};
use crate::error::{OveeError, Result};

/// Namespaced against the running instance's app when there is one, so a
/// component helper misused in a module still names the right app.
fn missing(subsystem: &'static str, helper: &'static str) -> OveeError {
    let namespace = inject(true)
        .and_then(|active| active.app())
        .map(|app| app.config().display_namespace())
        .unwrap_or_else(|| display_namespace(DEFAULT_NAMESPACE));
    OveeError::MissingContext {
        namespace,
        subsystem,
        helper,
    }
}

/// The app owning the current component or module.
pub fn use_app() -> Result<App> {
    use_app_optional().ok_or_else(|| missing("Composables", "use_app"))
}

pub fn use_app_optional() -> Option<App> {
    inject(true)?.app()
}

/// The component whose setup is running.
pub fn use_component() -> Result<Rc<ComponentInternalInstance>> {
    use_component_optional().ok_or_else(|| missing("Composables", "use_component"))
}

pub fn use_component_optional() -> Option<Rc<ComponentInternalInstance>> {
    match inject(true)? {
        ActiveInstance::Component(instance) => Some(instance),
        ActiveInstance::Module(_) => None,
    }
}

/// The module whose setup is running.
pub fn use_current_module() -> Result<Rc<ModuleInternalInstance>> {
    match inject(true) {
        Some(ActiveInstance::Module(instance)) => Ok(instance),
        _ => Err(missing("Composables", "use_current_module")),
    }
}

/// Another module of the current app, by name or definition.
pub fn use_module<'a>(key: impl Into<ModuleKey<'a>>) -> Result<Rc<ModuleInternalInstance>> {
    use_app()?.get_module_instance(key)
}

/// Element hosting the component whose setup is running.
pub fn use_element() -> Result<Node> {
    use_component_optional()
        .map(|instance| instance.element().clone())
        .ok_or_else(|| missing("Composables", "use_element"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_outside_setup() {
        assert!(matches!(
            use_app(),
            Err(OveeError::MissingContext { helper: "use_app", .. })
        ));
        assert!(use_app_optional().is_none());
        assert!(use_component().is_err());
        assert!(use_element().is_err());
        assert!(use_module("anything").is_err());
    }

    #[test]
    fn test_wrong_kind_error_uses_app_namespace() {
        use std::cell::RefCell;

        use crate::app::AppConfigurator;
        use crate::config::AppConfig;
        use crate::dom::Document;
        use crate::engine::Module;
        use crate::types::Options;

        let seen: Rc<RefCell<Option<OveeError>>> = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let shop = Module::new(move |_| {
            *s.borrow_mut() = use_component().err();
        });

        let doc = Document::new();
        let root = doc.create_element("div");
        doc.body().append_child(&root).unwrap();
        let config = AppConfig {
            namespace: "shop".to_string(),
            ..AppConfig::default()
        };
        let _app = AppConfigurator::with_config(config)
            .use_module("cart", &shop, Options::none())
            .unwrap()
            .create(&root)
            .unwrap();

        let error = seen.borrow_mut().take().unwrap();
        assert!(error.to_string().starts_with("[Shop ~ Composables]"));
    }
}
