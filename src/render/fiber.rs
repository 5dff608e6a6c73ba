//! Fiber arena.
//!
//! One render pass builds a fresh [`FiberTree`]. Fibers point at each other
//! by index (`parent`, first `child`, next `sibling`), and at the fiber they
//! replace in the previously committed tree (`alternate`).
//!
//! ```text
//! Root ── child ──► div ── sibling ──► p
//!                    │                 │
//!                  child             child
//!                    ▼                 ▼
//!                  "a"               "b"
//! ```

use std::fmt;
use std::rc::Rc;

use crate::dom::Node;

use super::vnode::{FunctionComponent, Props, VNode};

/// Index of a fiber in its tree.
pub type FiberId = usize;

/// The root fiber is always the first one allocated.
pub const ROOT: FiberId = 0;

/// What the commit phase does with a fiber of the new tree.
///
/// Deleted fibers belong to the previous tree, so they are not tagged; the
/// render pass collects their ids in a side list instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectTag {
    Placement,
    Update,
}

/// What a fiber stands for.
#[derive(Clone)]
pub enum FiberType {
    Root,
    Element(String),
    Text,
    Function(FunctionComponent),
    Fragment,
}

impl FiberType {
    /// Fibers of the same type reuse the previous fiber's DOM node.
    pub fn same_as(&self, other: &FiberType) -> bool {
        match (self, other) {
            (FiberType::Root, FiberType::Root)
            | (FiberType::Text, FiberType::Text)
            | (FiberType::Fragment, FiberType::Fragment) => true,
            (FiberType::Element(a), FiberType::Element(b)) => a == b,
            (FiberType::Function(a), FiberType::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Root, element and text fibers own a DOM node.
    pub fn is_host(&self) -> bool {
        matches!(self, FiberType::Root | FiberType::Element(_) | FiberType::Text)
    }
}

impl fmt::Debug for FiberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FiberType::Root => f.write_str("Root"),
            FiberType::Element(tag) => write!(f, "Element({tag})"),
            FiberType::Text => f.write_str("Text"),
            FiberType::Function(_) => f.write_str("Function"),
            FiberType::Fragment => f.write_str("Fragment"),
        }
    }
}

/// One unit of render work.
#[derive(Debug)]
pub struct Fiber {
    pub ty: FiberType,
    pub props: Props,
    /// Children still to be reconciled when this fiber is performed.
    pub pending: Vec<VNode>,
    pub node: Option<Node>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub alternate: Option<FiberId>,
    pub effect_tag: Option<EffectTag>,
}

impl Fiber {
    pub fn new(ty: FiberType, props: Props, pending: Vec<VNode>) -> Self {
        Self {
            ty,
            props,
            pending,
            node: None,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            effect_tag: None,
        }
    }
}

/// All fibers of one render pass.
#[derive(Debug, Default)]
pub struct FiberTree {
    fibers: Vec<Fiber>,
}

impl FiberTree {
    /// A tree holding only the root fiber, bound to `container`.
    pub fn with_root(container: &Node, children: Vec<VNode>) -> Self {
        let mut root = Fiber::new(FiberType::Root, Props::new(), children);
        root.node = Some(container.clone());
        Self { fibers: vec![root] }
    }

    pub fn push(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.push(fiber);
        self.fibers.len() - 1
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Children of `id`, in order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut next = self.get(id).and_then(|fiber| fiber.child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(|fiber| fiber.sibling);
        }
        out
    }

    /// Next fiber in depth-first order: first child, else the nearest
    /// sibling of `id` or of one of its ancestors.
    pub fn next_unit(&self, id: FiberId) -> Option<FiberId> {
        let fiber = self.get(id)?;
        if let Some(child) = fiber.child {
            return Some(child);
        }
        let mut current = Some(id);
        while let Some(fiber) = current.and_then(|c| self.get(c)) {
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            current = fiber.parent;
        }
        None
    }

    /// DOM nodes at the top of `id`'s subtree: its own node, or the nearest
    /// host nodes below it when it has none (fragments, function components).
    pub fn host_nodes(&self, id: FiberId) -> Vec<Node> {
        let Some(fiber) = self.get(id) else {
            return Vec::new();
        };
        if let Some(node) = &fiber.node {
            return vec![node.clone()];
        }
        self.children(id)
            .into_iter()
            .flat_map(|child| self.host_nodes(child))
            .collect()
    }

    /// Nearest ancestor of `id` that owns a DOM node.
    pub fn host_parent(&self, id: FiberId) -> Option<Node> {
        let mut current = self.get(id)?.parent;
        while let Some(fiber) = current.and_then(|c| self.get(c)) {
            if let Some(node) = &fiber.node {
                return Some(node.clone());
            }
            current = fiber.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn link(tree: &mut FiberTree, parent: FiberId, ty: FiberType) -> FiberId {
        let mut fiber = Fiber::new(ty, Props::new(), Vec::new());
        fiber.parent = Some(parent);
        let id = tree.push(fiber);
        match tree.children(parent).last().copied() {
            Some(last) => tree.get_mut(last).unwrap().sibling = Some(id),
            None => tree.get_mut(parent).unwrap().child = Some(id),
        }
        id
    }

    #[test]
    fn test_depth_first_walk() {
        let doc = Document::new();
        let mut tree = FiberTree::with_root(&doc.body(), Vec::new());
        let div = link(&mut tree, ROOT, FiberType::Element("div".into()));
        let a = link(&mut tree, div, FiberType::Text);
        let p = link(&mut tree, ROOT, FiberType::Element("p".into()));
        let b = link(&mut tree, p, FiberType::Text);

        let mut order = vec![ROOT];
        let mut next = tree.next_unit(ROOT);
        while let Some(id) = next {
            order.push(id);
            next = tree.next_unit(id);
        }
        assert_eq!(order, vec![ROOT, div, a, p, b]);
    }

    #[test]
    fn test_host_nodes_through_fragments() {
        let doc = Document::new();
        let mut tree = FiberTree::with_root(&doc.body(), Vec::new());
        let frag = link(&mut tree, ROOT, FiberType::Fragment);
        let x = link(&mut tree, frag, FiberType::Element("x".into()));
        let y = link(&mut tree, frag, FiberType::Element("y".into()));
        let (nx, ny) = (doc.create_element("x"), doc.create_element("y"));
        tree.get_mut(x).unwrap().node = Some(nx.clone());
        tree.get_mut(y).unwrap().node = Some(ny.clone());

        assert_eq!(tree.host_nodes(frag), vec![nx, ny]);
        assert_eq!(tree.host_parent(x), Some(doc.body()));
    }

    #[test]
    fn test_same_type() {
        let render: FunctionComponent = Rc::new(|_| VNode::Text(String::new()));
        let other: FunctionComponent = Rc::new(|_| VNode::Text(String::new()));
        assert!(FiberType::Function(render.clone()).same_as(&FiberType::Function(render.clone())));
        assert!(!FiberType::Function(render).same_as(&FiberType::Function(other)));
        assert!(!FiberType::Element("a".into()).same_as(&FiberType::Element("b".into())));
    }
}
