//! Mutation observers.
//!
//! Records are queued on the observer at mutation time and delivered in a
//! single batch from a microtask, so one burst of DOM changes produces one
//! callback invocation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::host::EventLoop;

use super::document::WeakDocument;
use super::node::Node;

bitflags::bitflags! {
    /// What a registration observes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObserverOptions: u8 {
        const CHILD_LIST = 1 << 0;
        const SUBTREE = 1 << 1;
        const ATTRIBUTES = 1 << 2;
    }
}

/// Kind of change a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
}

/// One observed change.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: Node,
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub attribute_name: Option<String>,
}

type ObserverCallback = Box<dyn Fn(Vec<MutationRecord>, &MutationObserver)>;

struct Inner {
    document: WeakDocument,
    callback: ObserverCallback,
    registrations: RefCell<Vec<(Node, ObserverOptions)>>,
    records: RefCell<Vec<MutationRecord>>,
    delivery_scheduled: Cell<bool>,
}

/// Handle to a mutation observer.
#[derive(Clone)]
pub struct MutationObserver(Rc<Inner>);

impl PartialEq for MutationObserver {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("registrations", &self.0.registrations.borrow().len())
            .field("pending", &self.0.records.borrow().len())
            .finish()
    }
}

impl MutationObserver {
    pub fn new(
        document: &super::Document,
        callback: impl Fn(Vec<MutationRecord>, &MutationObserver) + 'static,
    ) -> Self {
        Self(Rc::new(Inner {
            document: document.downgrade(),
            callback: Box::new(callback),
            registrations: RefCell::new(Vec::new()),
            records: RefCell::new(Vec::new()),
            delivery_scheduled: Cell::new(false),
        }))
    }

    /// Start observing `target`. Observing the same target again replaces its options.
    pub fn observe(&self, target: &Node, options: ObserverOptions) {
        {
            let mut registrations = self.0.registrations.borrow_mut();
            registrations.retain(|(node, _)| node != target);
            registrations.push((target.clone(), options));
        }
        if let Some(document) = self.0.document.upgrade() {
            document.add_observer(self);
        }
    }

    /// Stop observing everything and drop pending records.
    pub fn disconnect(&self) {
        self.0.registrations.borrow_mut().clear();
        self.0.records.borrow_mut().clear();
        if let Some(document) = self.0.document.upgrade() {
            document.remove_observer(self);
        }
    }

    /// Take pending records without waiting for delivery.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.0.records.borrow_mut())
    }

    pub(crate) fn interested_in(&self, record: &MutationRecord) -> bool {
        let wanted = match record.kind {
            MutationKind::ChildList => ObserverOptions::CHILD_LIST,
            MutationKind::Attributes => ObserverOptions::ATTRIBUTES,
        };
        self.0.registrations.borrow().iter().any(|(node, options)| {
            options.contains(wanted)
                && (*node == record.target
                    || (options.contains(ObserverOptions::SUBTREE) && node.contains(&record.target)))
        })
    }

    pub(crate) fn enqueue(&self, record: MutationRecord, event_loop: &EventLoop) {
        self.0.records.borrow_mut().push(record);
        if self.0.delivery_scheduled.replace(true) {
            return;
        }
        let observer = self.clone();
        event_loop.queue_microtask(move || observer.deliver());
    }

    fn deliver(&self) {
        self.0.delivery_scheduled.set(false);
        let records = self.take_records();
        if !records.is_empty() {
            (self.0.callback)(records, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn recording_observer(doc: &Document) -> (MutationObserver, Rc<RefCell<Vec<Vec<MutationRecord>>>>) {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let b = batches.clone();
        let observer = MutationObserver::new(doc, move |records, _| b.borrow_mut().push(records));
        (observer, batches)
    }

    #[test]
    fn test_batches_records_per_microtask() {
        let doc = Document::new();
        let (observer, batches) = recording_observer(&doc);
        observer.observe(&doc.body(), ObserverOptions::CHILD_LIST | ObserverOptions::SUBTREE);

        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.body().append_child(&a).unwrap();
        a.append_child(&b).unwrap();
        assert!(batches.borrow().is_empty(), "delivery is deferred");

        doc.event_loop().perform_microtask_checkpoint();
        assert_eq!(batches.borrow().len(), 1);
        assert_eq!(batches.borrow()[0].len(), 2);
    }

    #[test]
    fn test_without_subtree_only_direct_children() {
        let doc = Document::new();
        let (observer, batches) = recording_observer(&doc);
        observer.observe(&doc.body(), ObserverOptions::CHILD_LIST);

        let a = doc.create_element("div");
        doc.body().append_child(&a).unwrap();
        a.append_child(&doc.create_element("span")).unwrap();
        doc.event_loop().perform_microtask_checkpoint();

        assert_eq!(batches.borrow()[0].len(), 1);
    }

    #[test]
    fn test_move_produces_removal_and_addition() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.body().append_child(&a).unwrap();
        doc.body().append_child(&b).unwrap();
        a.append_child(&child).unwrap();

        let (observer, batches) = recording_observer(&doc);
        observer.observe(&doc.body(), ObserverOptions::CHILD_LIST | ObserverOptions::SUBTREE);
        b.append_child(&child).unwrap();
        doc.event_loop().perform_microtask_checkpoint();

        let batch = &batches.borrow()[0];
        assert_eq!(batch[0].removed_nodes, vec![child.clone()]);
        assert_eq!(batch[1].added_nodes, vec![child.clone()]);
        assert!(child.parent().is_some());
    }

    #[test]
    fn test_disconnect_drops_records() {
        let doc = Document::new();
        let (observer, batches) = recording_observer(&doc);
        observer.observe(&doc.body(), ObserverOptions::CHILD_LIST);
        doc.body().append_child(&doc.create_element("div")).unwrap();
        observer.disconnect();
        doc.event_loop().perform_microtask_checkpoint();
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_attributes() {
        let doc = Document::new();
        let (observer, batches) = recording_observer(&doc);
        let el = doc.create_element("div");
        observer.observe(&el, ObserverOptions::ATTRIBUTES);
        el.set_attribute("data-x", "1");
        doc.event_loop().perform_microtask_checkpoint();
        assert_eq!(batches.borrow()[0][0].attribute_name.as_deref(), Some("data-x"));
    }
}
