//! Shared types.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Cleanup function returned by anything that registers something.
pub type Cleanup = Box<dyn FnOnce()>;

/// Public surface returned by a setup function.
///
/// Setup functions may return any `'static` value; callers recover the
/// concrete type with [`Rc::downcast`].
pub type InstanceObject = Rc<dyn Any>;

/// The empty public surface (setup returned `()` or failed).
pub fn empty_instance() -> InstanceObject {
    Rc::new(())
}

// =============================================================================
// Options
// =============================================================================

/// Options attached to a registered component or module.
///
/// Stored type-erased; read back with [`Options::get`].
#[derive(Clone, Default)]
pub struct Options(Option<Rc<dyn Any>>);

impl Options {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Rc::new(value)))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the options as `T`, if they are a `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Options(..)"),
            None => f.write_str("Options(None)"),
        }
    }
}

// =============================================================================
// Names
// =============================================================================

/// Convert a component name to kebab case (`fooBar` -> `foo-bar`).
///
/// Already kebab-cased names pass through unchanged; underscores and
/// spaces become hyphens.
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else if ch == '_' || ch == ' ' || ch == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Names usable as a tag name and in a `data-` attribute selector.
pub fn is_valid_component_name(kebab: &str) -> bool {
    let mut chars = kebab.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
