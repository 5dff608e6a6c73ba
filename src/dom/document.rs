//! The document: node factory and owner of document-wide state.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::EventLoop;

use super::custom_elements::CustomElementRegistry;
use super::node::{Node, NodeId, NodeKind};
use super::observer::{MutationKind, MutationObserver, MutationRecord};

pub(crate) struct DocumentInner {
    event_loop: EventLoop,
    next_id: Cell<u64>,
    mutations: Cell<u64>,
    observers: RefCell<Vec<MutationObserver>>,
    custom_elements: CustomElementRegistry,
    node: RefCell<Option<Node>>,
    head: RefCell<Option<Node>>,
    body: RefCell<Option<Node>>,
}

/// Handle to a document. Clones share the same document.
#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

#[derive(Clone)]
pub(crate) struct WeakDocument(Weak<DocumentInner>);

impl WeakDocument {
    pub(crate) fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(Document)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("mutations", &self.0.mutations.get())
            .field("observers", &self.0.observers.borrow().len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with an `<html><head></head><body></body></html>` skeleton
    /// and its own event loop.
    pub fn new() -> Self {
        Self::with_event_loop(EventLoop::new())
    }

    pub fn with_event_loop(event_loop: EventLoop) -> Self {
        let inner = Rc::new_cyclic(|weak| DocumentInner {
            event_loop,
            next_id: Cell::new(1),
            mutations: Cell::new(0),
            observers: RefCell::new(Vec::new()),
            custom_elements: CustomElementRegistry::new(WeakDocument(weak.clone())),
            node: RefCell::new(None),
            head: RefCell::new(None),
            body: RefCell::new(None),
        });
        let document = Document(inner);

        let node = document.create_node(NodeKind::Document);
        let html = document.create_element("html");
        let head = document.create_element("head");
        let body = document.create_element("body");
        // Fresh nodes with no cycles: these inserts cannot fail.
        let _ = html.append_child(&head);
        let _ = html.append_child(&body);
        let _ = node.append_child(&html);

        *document.0.node.borrow_mut() = Some(node);
        *document.0.head.borrow_mut() = Some(head);
        *document.0.body.borrow_mut() = Some(body);
        document.0.mutations.set(0);
        document
    }

    pub(crate) fn downgrade(&self) -> WeakDocument {
        WeakDocument(Rc::downgrade(&self.0))
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.0.event_loop
    }

    pub fn custom_elements(&self) -> &CustomElementRegistry {
        &self.0.custom_elements
    }

    fn create_node(&self, kind: NodeKind) -> Node {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        Node::new(NodeId(id), kind, self.downgrade())
    }

    pub fn create_element(&self, tag: &str) -> Node {
        self.create_node(NodeKind::Element(tag.to_ascii_lowercase()))
    }

    pub fn create_text_node(&self, text: &str) -> Node {
        let node = self.create_node(NodeKind::Text);
        *node.0.data_cell().borrow_mut() = text.to_string();
        node
    }

    /// The document node (root of the tree).
    pub fn node(&self) -> Node {
        self.0
            .node
            .borrow()
            .clone()
            .unwrap_or_else(|| self.create_node(NodeKind::Document))
    }

    pub fn document_element(&self) -> Option<Node> {
        self.node().first_child()
    }

    pub fn head(&self) -> Node {
        self.0.head.borrow().clone().unwrap_or_else(|| self.node())
    }

    pub fn body(&self) -> Node {
        self.0.body.borrow().clone().unwrap_or_else(|| self.node())
    }

    /// Number of DOM mutations performed so far.
    ///
    /// Counts child-list, attribute, property, text and listener changes.
    pub fn mutation_count(&self) -> u64 {
        self.0.mutations.get()
    }

    // =========================================================================
    // Internal notifications
    // =========================================================================

    pub(crate) fn note_mutation(&self) {
        self.0.mutations.set(self.0.mutations.get() + 1);
    }

    pub(crate) fn add_observer(&self, observer: &MutationObserver) {
        let mut observers = self.0.observers.borrow_mut();
        if !observers.iter().any(|o| o == observer) {
            observers.push(observer.clone());
        }
    }

    pub(crate) fn remove_observer(&self, observer: &MutationObserver) {
        self.0.observers.borrow_mut().retain(|o| o != observer);
    }

    fn dispatch_record(&self, record: MutationRecord) {
        let observers = self.0.observers.borrow().clone();
        for observer in observers {
            if observer.interested_in(&record) {
                observer.enqueue(record.clone(), &self.0.event_loop);
            }
        }
    }

    pub(crate) fn record_child_list(&self, target: &Node, added: Vec<Node>, removed: Vec<Node>) {
        if self.0.observers.borrow().is_empty() {
            return;
        }
        self.dispatch_record(MutationRecord {
            kind: MutationKind::ChildList,
            target: target.clone(),
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
        });
    }

    pub(crate) fn record_attribute(&self, target: &Node, name: &str) {
        if self.0.observers.borrow().is_empty() {
            return;
        }
        self.dispatch_record(MutationRecord {
            kind: MutationKind::Attributes,
            target: target.clone(),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
        });
    }

    /// Connected reactions for every defined element in `root`'s subtree.
    pub(crate) fn run_connected_reactions(&self, root: &Node) {
        for node in root.inclusive_descendants() {
            let Some(definition) = node.tag_name().and_then(|tag| self.custom_elements().get(tag))
            else {
                continue;
            };
            if node.is_connected() {
                definition.connected(&node);
            }
        }
    }

    /// Disconnected reactions for every defined element in `root`'s subtree.
    pub(crate) fn run_disconnected_reactions(&self, root: &Node) {
        for node in root.inclusive_descendants() {
            let Some(definition) = node.tag_name().and_then(|tag| self.custom_elements().get(tag))
            else {
                continue;
            };
            if !node.is_connected() {
                definition.disconnected(&node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::new();
        let html = doc.document_element().unwrap();
        assert_eq!(html.tag_name(), Some("html"));
        assert_eq!(doc.body().parent(), Some(html));
        assert!(doc.body().is_connected());
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_mutation_counter() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.set_attribute("a", "1");
        doc.body().append_child(&el).unwrap();
        el.remove_attribute("a");
        el.remove_attribute("a");
        assert_eq!(doc.mutation_count(), 3);
    }

    #[test]
    fn test_unique_ids() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
