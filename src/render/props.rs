//! Patching a DOM node from one set of props to the next.
//!
//! - `on<Event>` keys are listeners; swapped only when the handler changes
//! - `style`, `class` and hyphenated keys (`data-*`, `aria-*`) are attributes
//! - everything else is a property; removal resets it to empty
//! - `nodeValue` on text nodes is the text itself
//! - `children` is never written

use crate::dom::{Node, PropertyValue};

use super::vnode::{PropValue, Props, event_name};

/// Key holding the text of a text fiber.
pub(crate) const NODE_VALUE: &str = "nodeValue";

const CHILDREN: &str = "children";

fn is_attribute(key: &str) -> bool {
    key == "style" || key == "class" || key.contains('-')
}

/// Apply the difference between `old` and `new` to `node`.
pub(crate) fn patch_props(node: &Node, old: &Props, new: &Props) {
    // Stale or changed listeners go first.
    for (key, old_value) in old.iter() {
        let (Some(event), Some(handler)) = (event_name(key), old_value.as_handler()) else {
            continue;
        };
        if new.get(key) != Some(old_value) {
            node.remove_event_listener(&event, handler);
        }
    }

    for (key, _) in old.iter() {
        if key == CHILDREN || event_name(key).is_some() || new.contains(key) {
            continue;
        }
        remove_prop(node, key);
    }

    for (key, value) in new.iter() {
        if key == CHILDREN || old.get(key) == Some(value) {
            continue;
        }
        match event_name(key) {
            Some(event) => {
                if let Some(handler) = value.as_handler() {
                    node.add_event_listener(&event, handler);
                }
            }
            None => set_prop(node, key, value),
        }
    }
}

fn set_prop(node: &Node, key: &str, value: &PropValue) {
    if node.is_text() {
        if key == NODE_VALUE {
            if let PropValue::Text(text) = value {
                node.set_node_value(text);
            }
        }
        return;
    }
    if is_attribute(key) {
        match value.as_attribute() {
            Some(attribute) => node.set_attribute(key, &attribute),
            None => node.remove_attribute(key),
        }
    } else if let Some(property) = value.as_property() {
        node.set_property(key, property);
    }
}

fn remove_prop(node: &Node, key: &str) {
    if node.is_text() {
        if key == NODE_VALUE {
            node.set_node_value("");
        }
        return;
    }
    if is_attribute(key) {
        node.remove_attribute(key);
    } else {
        node.set_property(key, PropertyValue::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, Event, listener};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_attributes_and_properties() {
        let doc = Document::new();
        let el = doc.create_element("input");
        let first = Props::new()
            .with("class", "a")
            .with("data-id", 3)
            .with("value", "x")
            .with("children", "ignored");
        patch_props(&el, &Props::new(), &first);

        assert_eq!(el.get_attribute("class").as_deref(), Some("a"));
        assert_eq!(el.get_attribute("data-id").as_deref(), Some("3"));
        assert_eq!(el.get_property("value"), Some(PropertyValue::Text("x".into())));
        assert!(!el.has_attribute("children"));
        assert!(el.get_property("children").is_none());

        let second = Props::new().with("class", "a");
        patch_props(&el, &first, &second);
        assert!(!el.has_attribute("data-id"));
        assert_eq!(el.get_property("value"), Some(PropertyValue::empty()));
    }

    #[test]
    fn test_unchanged_props_do_not_mutate() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let props = Props::new().with("class", "a").with("title", "t");
        patch_props(&el, &Props::new(), &props);
        let before = doc.mutation_count();
        patch_props(&el, &props, &props.clone());
        assert_eq!(doc.mutation_count(), before);
    }

    #[test]
    fn test_handlers_swapped_only_on_change() {
        let doc = Document::new();
        let el = doc.create_element("button");
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handler = listener(move |_| h.set(h.get() + 1));

        let props = Props::new().with("onClick", handler.clone());
        patch_props(&el, &Props::new(), &props);
        patch_props(&el, &props, &Props::new().with("onClick", handler));
        assert_eq!(el.listener_count("click"), 1);

        el.dispatch_event(&Event::new("click"));
        assert_eq!(hits.get(), 1);

        patch_props(&el, &props, &Props::new());
        assert_eq!(el.listener_count("click"), 0);
    }

    #[test]
    fn test_text_node_value() {
        let doc = Document::new();
        let node = doc.create_text_node("a");
        let old = Props::new().with(NODE_VALUE, "a");
        patch_props(&node, &old, &Props::new().with(NODE_VALUE, "b"));
        assert_eq!(node.node_value().as_deref(), Some("b"));
    }
}
