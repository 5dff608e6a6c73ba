//! Modules manager: owns every module instance of an app.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::app::{App, RegisteredModule};
use crate::config::display_namespace;
use crate::error::{OveeError, Result};
use crate::log::Logger;

use super::module::{Module, ModuleInternalInstance};

/// Look up a module by registered name or by definition.
#[derive(Clone, Copy, Debug)]
pub enum ModuleKey<'a> {
    Name(&'a str),
    Definition(&'a Module),
}

impl<'a> From<&'a str> for ModuleKey<'a> {
    fn from(name: &'a str) -> Self {
        ModuleKey::Name(name)
    }
}

impl<'a> From<&'a String> for ModuleKey<'a> {
    fn from(name: &'a String) -> Self {
        ModuleKey::Name(name)
    }
}

impl<'a> From<&'a Module> for ModuleKey<'a> {
    fn from(module: &'a Module) -> Self {
        ModuleKey::Definition(module)
    }
}

pub struct ModulesManager {
    namespace: String,
    registered: BTreeMap<String, RegisteredModule>,
    instances: RefCell<BTreeMap<String, Rc<ModuleInternalInstance>>>,
    logger: Logger,
}

impl fmt::Debug for ModulesManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModulesManager")
            .field("modules", &self.registered.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModulesManager {
    pub(crate) fn new(namespace: &str, registered: BTreeMap<String, RegisteredModule>) -> Self {
        Self {
            namespace: namespace.to_string(),
            registered,
            instances: RefCell::new(BTreeMap::new()),
            logger: Logger::new(namespace, "ModulesManager"),
        }
    }

    /// Run every module's setup. Called once, right after the app exists.
    pub(crate) fn instantiate(&self, app: &App) {
        for (name, registered) in &self.registered {
            let instance = ModuleInternalInstance::create(
                name,
                app,
                registered.module(),
                registered.options().clone(),
            );
            self.instances.borrow_mut().insert(name.clone(), instance);
        }
        self.logger
            .debug(format!("created {} module(s)", self.registered.len()));
    }

    /// Fire every module's init callbacks.
    pub(crate) fn run(&self) {
        for instance in self.all() {
            instance.init();
        }
    }

    /// Fire every module's destroy callbacks.
    pub(crate) fn destroy(&self) {
        for instance in self.all() {
            instance.destroy();
        }
    }

    fn all(&self) -> Vec<Rc<ModuleInternalInstance>> {
        self.instances.borrow().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.registered.keys().map(String::as_str).collect()
    }

    /// Module instance registered under a name, or for a definition.
    pub fn get(&self, key: ModuleKey<'_>) -> Result<Rc<ModuleInternalInstance>> {
        let name = match key {
            ModuleKey::Name(name) => Some(name),
            ModuleKey::Definition(module) => self
                .registered
                .iter()
                .find(|(_, registered)| registered.module().ptr_eq(module))
                .map(|(name, _)| name.as_str()),
        };
        name.and_then(|name| self.instances.borrow().get(name).cloned())
            .ok_or_else(|| OveeError::UnregisteredModule {
                namespace: display_namespace(&self.namespace),
                name: match key {
                    ModuleKey::Name(name) => name.to_string(),
                    ModuleKey::Definition(_) => "<unnamed definition>".to_string(),
                },
            })
    }
}
