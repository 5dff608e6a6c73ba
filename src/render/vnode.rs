//! Virtual nodes produced by templates.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Event, EventListener, PropertyValue, listener};
use crate::engine::Component;

// =============================================================================
// Props
// =============================================================================

/// Value of one prop.
#[derive(Clone)]
pub enum PropValue {
    Text(String),
    Bool(bool),
    Number(f64),
    /// Event handler; only meaningful under `on<Event>` keys.
    Handler(EventListener),
}

impl PropValue {
    /// Attribute form of the value. Handlers have none.
    pub fn as_attribute(&self) -> Option<String> {
        match self {
            PropValue::Text(text) => Some(text.clone()),
            PropValue::Bool(true) => Some(String::new()),
            PropValue::Bool(false) => None,
            PropValue::Number(n) => Some(n.to_string()),
            PropValue::Handler(_) => None,
        }
    }

    /// Property form of the value. Handlers have none.
    pub fn as_property(&self) -> Option<PropertyValue> {
        match self {
            PropValue::Text(text) => Some(PropertyValue::Text(text.clone())),
            PropValue::Bool(b) => Some(PropertyValue::Bool(*b)),
            PropValue::Number(n) => Some(PropertyValue::Number(*n)),
            PropValue::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventListener> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }
}

/// Handlers compare by identity, everything else by value.
impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Text(a), PropValue::Text(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(text) => write!(f, "{text:?}"),
            PropValue::Bool(b) => write!(f, "{b}"),
            PropValue::Number(n) => write!(f, "{n}"),
            PropValue::Handler(_) => f.write_str("<handler>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<EventListener> for PropValue {
    fn from(value: EventListener) -> Self {
        PropValue::Handler(value)
    }
}

/// Props of one node, ordered by key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `onClick` -> `Some("click")`. Keys that do not look like `on<Upper>...`
/// are not events.
pub fn event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let first = rest.chars().next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

// =============================================================================
// VNode
// =============================================================================

/// Function component: props in, tree out.
pub type FunctionComponent = Rc<dyn Fn(&Props) -> VNode>;

/// One node of a template tree.
#[derive(Clone)]
pub enum VNode {
    Element {
        tag: String,
        props: Props,
        children: Vec<VNode>,
    },
    Text(String),
    Function {
        render: FunctionComponent,
        props: Props,
    },
    /// A framework component, rendered as its host element.
    Component {
        component: Component,
        props: Props,
        children: Vec<VNode>,
    },
    Fragment(Vec<VNode>),
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element {
                tag,
                props,
                children,
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("props", props)
                .field("children", children)
                .finish(),
            VNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            VNode::Function { props, .. } => {
                f.debug_struct("Function").field("props", props).finish()
            }
            VNode::Component {
                component,
                props,
                children,
            } => f
                .debug_struct("Component")
                .field("component", component)
                .field("props", props)
                .field("children", children)
                .finish(),
            VNode::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
        }
    }
}

/// Element node with no props and no children.
pub fn h(tag: &str) -> VNode {
    VNode::Element {
        tag: tag.to_string(),
        props: Props::new(),
        children: Vec::new(),
    }
}

/// Text node.
pub fn text(value: impl Into<String>) -> VNode {
    VNode::Text(value.into())
}

/// Fragment node.
pub fn fragment(children: Vec<VNode>) -> VNode {
    VNode::Fragment(children)
}

/// Function component node.
pub fn function(render: impl Fn(&Props) -> VNode + 'static, props: Props) -> VNode {
    VNode::Function {
        render: Rc::new(render),
        props,
    }
}

/// Framework component node.
pub fn component(component: &Component) -> VNode {
    VNode::Component {
        component: component.clone(),
        props: Props::new(),
        children: Vec::new(),
    }
}

impl VNode {
    /// Set a prop. Ignored on text and fragment nodes.
    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        match &mut self {
            VNode::Element { props, .. }
            | VNode::Function { props, .. }
            | VNode::Component { props, .. } => props.set(key, value),
            VNode::Text(_) | VNode::Fragment(_) => {}
        }
        self
    }

    /// Attach an event handler (`on("click", ..)` sets `onClick`).
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.handler(event, listener(handler))
    }

    /// Attach an existing listener, keeping its identity across renders.
    pub fn handler(self, event: &str, handler: EventListener) -> Self {
        let mut chars = event.chars();
        let key = match chars.next() {
            Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => return self,
        };
        self.prop(&key, handler)
    }

    /// Append a child. Ignored on text and function nodes.
    pub fn child(mut self, child: VNode) -> Self {
        match &mut self {
            VNode::Element { children, .. }
            | VNode::Component { children, .. }
            | VNode::Fragment(children) => children.push(child),
            VNode::Text(_) | VNode::Function { .. } => {}
        }
        self
    }

    pub fn children(self, children: impl IntoIterator<Item = VNode>) -> Self {
        children.into_iter().fold(self, VNode::child)
    }
}
