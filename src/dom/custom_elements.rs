//! Custom element registry.
//!
//! A definition carries `connected` / `disconnected` reactions. They run
//! synchronously after the structural change that connects or disconnects
//! an element with the defined tag name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::DomError;
use super::document::WeakDocument;
use super::node::Node;

type Reaction = Rc<dyn Fn(&Node)>;

/// Lifecycle reactions of one custom element name.
#[derive(Clone, Default)]
pub struct CustomElementDefinition {
    connected: Option<Reaction>,
    disconnected: Option<Reaction>,
}

impl CustomElementDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connected(mut self, f: impl Fn(&Node) + 'static) -> Self {
        self.connected = Some(Rc::new(f));
        self
    }

    pub fn on_disconnected(mut self, f: impl Fn(&Node) + 'static) -> Self {
        self.disconnected = Some(Rc::new(f));
        self
    }

    pub(crate) fn connected(&self, node: &Node) {
        if let Some(reaction) = &self.connected {
            reaction(node);
        }
    }

    pub(crate) fn disconnected(&self, node: &Node) {
        if let Some(reaction) = &self.disconnected {
            reaction(node);
        }
    }
}

impl fmt::Debug for CustomElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomElementDefinition")
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .finish()
    }
}

/// Valid custom element names are lowercase, start with a letter and contain a hyphen.
pub fn is_valid_custom_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && name.contains('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' || c == '.')
}

/// Per-document registry of custom element definitions.
pub struct CustomElementRegistry {
    document: WeakDocument,
    definitions: RefCell<HashMap<String, Rc<CustomElementDefinition>>>,
}

impl fmt::Debug for CustomElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomElementRegistry")
            .field("definitions", &self.definitions.borrow().len())
            .finish()
    }
}

impl CustomElementRegistry {
    pub(crate) fn new(document: WeakDocument) -> Self {
        Self {
            document,
            definitions: RefCell::new(HashMap::new()),
        }
    }

    /// Define `name`. Already-connected elements with that tag are upgraded
    /// (their `connected` reaction runs now).
    pub fn define(&self, name: &str, definition: CustomElementDefinition) -> Result<(), DomError> {
        if !is_valid_custom_element_name(name) {
            return Err(DomError::InvalidCustomElementName(name.to_string()));
        }
        let definition = Rc::new(definition);
        {
            let mut definitions = self.definitions.borrow_mut();
            if definitions.contains_key(name) {
                return Err(DomError::AlreadyDefined(name.to_string()));
            }
            definitions.insert(name.to_string(), definition.clone());
        }

        if let Some(document) = self.document.upgrade() {
            for node in document.node().descendants() {
                if node.tag_name() == Some(name) {
                    definition.connected(&node);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Rc<CustomElementDefinition>> {
        self.definitions.borrow().get(name).cloned()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.borrow().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use std::cell::Cell;

    fn counting(doc: &Document, name: &str) -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let connected = Rc::new(Cell::new(0));
        let disconnected = Rc::new(Cell::new(0));
        let c = connected.clone();
        let d = disconnected.clone();
        doc.custom_elements()
            .define(
                name,
                CustomElementDefinition::new()
                    .on_connected(move |_| c.set(c.get() + 1))
                    .on_disconnected(move |_| d.set(d.get() + 1)),
            )
            .unwrap();
        (connected, disconnected)
    }

    #[test]
    fn test_names() {
        assert!(is_valid_custom_element_name("foo-bar"));
        assert!(!is_valid_custom_element_name("greeter"));
        assert!(!is_valid_custom_element_name("Foo-bar"));
        assert!(!is_valid_custom_element_name("-foo"));
    }

    #[test]
    fn test_define_rejects_duplicates() {
        let doc = Document::new();
        let registry = doc.custom_elements();
        registry.define("x-a", CustomElementDefinition::new()).unwrap();
        assert_eq!(
            registry.define("x-a", CustomElementDefinition::new()),
            Err(DomError::AlreadyDefined("x-a".into()))
        );
        assert!(registry.define("plain", CustomElementDefinition::new()).is_err());
    }

    #[test]
    fn test_reactions_on_connect_and_disconnect() {
        let doc = Document::new();
        let (connected, disconnected) = counting(&doc, "x-card");

        let wrapper = doc.create_element("div");
        let card = doc.create_element("x-card");
        wrapper.append_child(&card).unwrap();
        assert_eq!(connected.get(), 0, "not connected yet");

        doc.body().append_child(&wrapper).unwrap();
        assert_eq!(connected.get(), 1);

        wrapper.remove();
        assert_eq!(disconnected.get(), 1);
    }

    #[test]
    fn test_define_upgrades_existing() {
        let doc = Document::new();
        let card = doc.create_element("x-late");
        doc.body().append_child(&card).unwrap();
        let (connected, _) = counting(&doc, "x-late");
        assert_eq!(connected.get(), 1);
    }
}
