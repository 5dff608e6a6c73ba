//! Composables - helpers called from setup functions.
//!
//! They find their owner through the setup context, so they only work when
//! called synchronously inside a component or module setup function.

mod accessors;
mod lifecycle;
mod template;

pub use accessors::*;
pub use lifecycle::*;
pub use template::*;
