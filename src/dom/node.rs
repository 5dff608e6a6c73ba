//! DOM nodes.
//!
//! A [`Node`] is a cheap identity handle; clones refer to the same node and
//! equality is identity. Structural changes report to the owning document,
//! which feeds mutation observers and runs custom element reactions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::DomError;
use super::document::{Document, WeakDocument};
use super::event::{Event, EventListener, ListenerEntry};
use super::selector::Selector;

/// Stable identity of a node within its document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// What kind of node this is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(String),
    Text,
}

/// Value of a DOM property (as opposed to an attribute).
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl PropertyValue {
    pub fn empty() -> Self {
        PropertyValue::Text(String::new())
    }
}

pub(crate) struct NodeData {
    id: NodeId,
    kind: NodeKind,
    document: WeakDocument,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
    attributes: RefCell<BTreeMap<String, String>>,
    properties: RefCell<BTreeMap<String, PropertyValue>>,
    data: RefCell<String>,
    listeners: RefCell<Vec<ListenerEntry>>,
}

impl NodeData {
    pub(crate) fn data_cell(&self) -> &RefCell<String> {
        &self.data
    }
}

/// Handle to a DOM node.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeData>);

/// Non-owning node handle.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeData>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Document => write!(f, "#document({})", self.0.id.0),
            NodeKind::Element(tag) => write!(f, "<{}>({})", tag, self.0.id.0),
            NodeKind::Text => write!(f, "#text({:?})", self.0.data.borrow()),
        }
    }
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, document: WeakDocument) -> Self {
        Self(Rc::new(NodeData {
            id,
            kind,
            document,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(BTreeMap::new()),
            properties: RefCell::new(BTreeMap::new()),
            data: RefCell::new(String::new()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.kind, NodeKind::Text)
    }

    /// Lowercase tag name for elements.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<Document> {
        self.0.document.upgrade()
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        let index = children.iter().position(|c| c == self)?;
        children.get(index + 1).cloned()
    }

    /// Inclusive ancestor check: true if `other` is `self` or below it.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether the node is attached to its document.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.0.kind == NodeKind::Document
    }

    /// Descendants in tree order, excluding `self`.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        fn walk(node: &Node, out: &mut Vec<Node>) {
            for child in node.0.children.borrow().iter() {
                out.push(child.clone());
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// `self` followed by its descendants.
    pub fn inclusive_descendants(&self) -> Vec<Node> {
        let mut out = vec![self.clone()];
        out.extend(self.descendants());
        out
    }

    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference` (or at the end).
    ///
    /// A child that already has a parent is moved: it is removed from its old
    /// parent first, which produces a removal record there.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        if self.is_text() || child.0.kind == NodeKind::Document || child.contains(self) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if reference.parent().as_ref() != Some(self) {
                return Err(DomError::NotFound);
            }
            if reference == child {
                return Ok(());
            }
        }

        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(child)?;
        }

        {
            let mut children = self.0.children.borrow_mut();
            let index = match reference {
                Some(reference) => children
                    .iter()
                    .position(|c| c == reference)
                    .ok_or(DomError::NotFound)?,
                None => children.len(),
            };
            children.insert(index, child.clone());
        }
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);

        if let Some(document) = self.document() {
            document.note_mutation();
            document.record_child_list(self, vec![child.clone()], Vec::new());
            if self.is_connected() {
                document.run_connected_reactions(child);
            }
        }
        Ok(())
    }

    pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
        let was_connected = self.is_connected();
        {
            let mut children = self.0.children.borrow_mut();
            let index = children
                .iter()
                .position(|c| c == child)
                .ok_or(DomError::NotFound)?;
            children.remove(index);
        }
        *child.0.parent.borrow_mut() = Weak::new();

        if let Some(document) = self.document() {
            document.note_mutation();
            document.record_child_list(self, Vec::new(), vec![child.clone()]);
            if was_connected {
                document.run_disconnected_reactions(child);
            }
        }
        Ok(())
    }

    /// Detach from the parent, if any.
    pub fn remove(&self) {
        if let Some(parent) = self.parent() {
            // The parent link was just read, so the child is present.
            let _ = parent.remove_child(self);
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text => self.0.data.borrow().clone(),
            _ => self
                .descendants()
                .iter()
                .filter(|n| n.is_text())
                .map(|n| n.0.data.borrow().clone())
                .collect(),
        }
    }

    /// Replace all children with one text node (or set the text of a text node).
    pub fn set_text_content(&self, text: &str) {
        if self.is_text() {
            self.set_node_value(text);
            return;
        }
        for child in self.children() {
            child.remove();
        }
        if !text.is_empty() {
            if let Some(document) = self.document() {
                let node = document.create_text_node(text);
                let _ = self.append_child(&node);
            }
        }
    }

    /// Text of a text node.
    pub fn node_value(&self) -> Option<String> {
        self.is_text().then(|| self.0.data.borrow().clone())
    }

    pub fn set_node_value(&self, value: &str) {
        if !self.is_text() {
            return;
        }
        *self.0.data.borrow_mut() = value.to_string();
        if let Some(document) = self.document() {
            document.note_mutation();
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.attributes.borrow().contains_key(name)
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.0.attributes.borrow().clone()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if !self.is_element() {
            return;
        }
        let name = name.to_ascii_lowercase();
        self.0
            .attributes
            .borrow_mut()
            .insert(name.clone(), value.to_string());
        if let Some(document) = self.document() {
            document.note_mutation();
            document.record_attribute(self, &name);
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        let name = name.to_ascii_lowercase();
        let removed = self.0.attributes.borrow_mut().remove(&name).is_some();
        if removed {
            if let Some(document) = self.document() {
                document.note_mutation();
                document.record_attribute(self, &name);
            }
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let value = match self.get_attribute("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute("class", &value);
    }

    pub fn remove_class(&self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let value = self
            .get_attribute("class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("class", &value);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn get_property(&self, name: &str) -> Option<PropertyValue> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: PropertyValue) {
        self.0.properties.borrow_mut().insert(name.to_string(), value);
        if let Some(document) = self.document() {
            document.note_mutation();
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Add a listener. Adding the same listener twice for one event is a no-op.
    pub fn add_event_listener(&self, event: &str, listener: &EventListener) {
        {
            let mut listeners = self.0.listeners.borrow_mut();
            if listeners
                .iter()
                .any(|entry| entry.event == event && Rc::ptr_eq(&entry.listener, listener))
            {
                return;
            }
            listeners.push(ListenerEntry {
                event: event.to_string(),
                listener: listener.clone(),
            });
        }
        if let Some(document) = self.document() {
            document.note_mutation();
        }
    }

    pub fn remove_event_listener(&self, event: &str, listener: &EventListener) {
        let removed = {
            let mut listeners = self.0.listeners.borrow_mut();
            let before = listeners.len();
            listeners.retain(|entry| !(entry.event == event && Rc::ptr_eq(&entry.listener, listener)));
            before != listeners.len()
        };
        if removed {
            if let Some(document) = self.document() {
                document.note_mutation();
            }
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.0
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == event)
            .count()
    }

    /// Dispatch `event` at this node, bubbling to ancestors if the event bubbles.
    pub fn dispatch_event(&self, event: &Event) {
        event.set_target(self);
        let mut current = Some(self.clone());
        while let Some(node) = current {
            event.set_current_target(Some(&node));
            let listeners: Vec<EventListener> = node
                .0
                .listeners
                .borrow()
                .iter()
                .filter(|entry| entry.event == event.name())
                .map(|entry| entry.listener.clone())
                .collect();
            for listener in listeners {
                listener(event);
            }
            if event.propagation_stopped() || !event.bubbles() {
                break;
            }
            current = node.parent();
        }
        event.set_current_target(None);
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    pub fn matches(&self, selector: &str) -> Result<bool, DomError> {
        Ok(Selector::parse(selector)?.matches(self))
    }

    /// Matching descendants in tree order (never `self`).
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|node| selector.matches(node))
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self.descendants().into_iter().find(|node| selector.matches(node)))
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, selector: &str) -> Result<Option<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if selector.matches(&node) {
                return Ok(Some(node));
            }
            current = node.parent();
        }
        Ok(None)
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize the subtree (attributes sorted by name).
    pub fn outer_html(&self) -> String {
        match &self.0.kind {
            NodeKind::Text => self.0.data.borrow().clone(),
            NodeKind::Document => self.inner_html(),
            NodeKind::Element(tag) => {
                let mut out = format!("<{}", tag);
                for (name, value) in self.0.attributes.borrow().iter() {
                    if value.is_empty() {
                        out.push_str(&format!(" {}", name));
                    } else {
                        out.push_str(&format!(" {}=\"{}\"", name, value));
                    }
                }
                out.push('>');
                out.push_str(&self.inner_html());
                out.push_str(&format!("</{}>", tag));
                out
            }
        }
    }

    pub fn inner_html(&self) -> String {
        self.0
            .children
            .borrow()
            .iter()
            .map(|child| child.outer_html())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::dom::event::listener;

    #[test]
    fn test_append_and_move() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");

        a.append_child(&child).unwrap();
        assert_eq!(child.parent(), Some(a.clone()));

        b.append_child(&child).unwrap();
        assert_eq!(child.parent(), Some(b.clone()));
        assert_eq!(a.child_count(), 0);
        assert_eq!(b.child_count(), 1);
    }

    #[test]
    fn test_insert_before_and_siblings() {
        let doc = Document::new();
        let parent = doc.create_element("ul");
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        parent.append_child(&second).unwrap();
        parent.insert_before(&first, Some(&second)).unwrap();

        assert_eq!(parent.first_child(), Some(first.clone()));
        assert_eq!(first.next_sibling(), Some(second.clone()));
        assert_eq!(second.next_sibling(), None);
    }

    #[test]
    fn test_hierarchy_errors() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        outer.append_child(&inner).unwrap();

        assert_eq!(inner.append_child(&outer), Err(DomError::HierarchyRequest));
        let text = doc.create_text_node("x");
        assert_eq!(text.append_child(&inner), Err(DomError::HierarchyRequest));
        let stranger = doc.create_element("p");
        assert_eq!(outer.remove_child(&stranger), Err(DomError::NotFound));
    }

    #[test]
    fn test_connected() {
        let doc = Document::new();
        let el = doc.create_element("div");
        assert!(!el.is_connected());
        doc.body().append_child(&el).unwrap();
        assert!(el.is_connected());
        el.remove();
        assert!(!el.is_connected());
    }

    #[test]
    fn test_text_content() {
        let doc = Document::new();
        let el = doc.create_element("p");
        el.set_text_content("hello");
        assert_eq!(el.text_content(), "hello");
        assert_eq!(el.inner_html(), "hello");
        el.set_text_content("");
        assert_eq!(el.child_count(), 0);
    }

    #[test]
    fn test_classes() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.add_class("a");
        el.add_class("b");
        el.add_class("a");
        assert_eq!(el.get_attribute("class").as_deref(), Some("a b"));
        el.remove_class("a");
        assert_eq!(el.get_attribute("class").as_deref(), Some("b"));
        assert!(!el.has_class("a"));
    }

    #[test]
    fn test_event_bubbling_and_stop() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        outer.append_child(&inner).unwrap();

        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let on_outer = listener(move |_| h.set(h.get() + 1));
        outer.add_event_listener("click", &on_outer);

        inner.dispatch_event(&Event::new("click").with_bubbles(true));
        assert_eq!(hits.get(), 1);

        inner.dispatch_event(&Event::new("click"));
        assert_eq!(hits.get(), 1, "non-bubbling event stays on target");

        let stopper = listener(|event| event.stop_propagation());
        inner.add_event_listener("click", &stopper);
        inner.dispatch_event(&Event::new("click").with_bubbles(true));
        assert_eq!(hits.get(), 1);

        outer.remove_event_listener("click", &on_outer);
        assert_eq!(outer.listener_count("click"), 0);
    }

    #[test]
    fn test_duplicate_listener_is_ignored() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let l = listener(|_| {});
        el.add_event_listener("click", &l);
        el.add_event_listener("click", &l);
        assert_eq!(el.listener_count("click"), 1);
    }

    #[test]
    fn test_query_and_closest() {
        let doc = Document::new();
        let root = doc.create_element("section");
        let a = doc.create_element("div");
        a.set_attribute("data-foo", "");
        let b = doc.create_element("foo");
        let c = doc.create_element("span");
        root.append_child(&a).unwrap();
        a.append_child(&b).unwrap();
        b.append_child(&c).unwrap();

        let found = root.query_selector_all("foo, [data-foo]").unwrap();
        assert_eq!(found, vec![a.clone(), b.clone()]);
        assert_eq!(c.closest("[data-foo]").unwrap(), Some(a.clone()));
        assert!(a.query_selector_all("[data-foo]").unwrap().is_empty());
    }

    #[test]
    fn test_outer_html() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.set_attribute("id", "x");
        el.set_attribute("hidden", "");
        el.set_text_content("hi");
        assert_eq!(el.outer_html(), "<div hidden id=\"x\">hi</div>");
    }
}
