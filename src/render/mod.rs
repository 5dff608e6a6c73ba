//! Template rendering - virtual nodes, fibers and the idle scheduler.
//!
//! - VNode: what templates return
//! - Props: how a node's props are patched onto the DOM
//! - Fiber / Renderer: incremental reconciliation and one-shot commit
//! - Queue / Scheduler: FIFO render jobs drained in idle slices
//!
//! # Architecture
//!
//! ```text
//! use_template(render) ── effect ── Renderer::render(vnode) ── Scheduler queue
//!                                                                    │
//!                       DOM ◄── commit ◄── fiber walk ◄── idle slice ◄┘
//! ```

mod fiber;
mod props;
mod queue;
mod reconciler;
mod scheduler;
mod vnode;

pub use fiber::{EffectTag, FiberId, FiberType};
pub use queue::Queue;
pub use reconciler::{ComponentResolver, Renderer};
pub use scheduler::{Job, NeverYield, Scheduler, SliceMode, YIELD_THRESHOLD_MS, YieldPoint};
pub use vnode::{
    FunctionComponent, PropValue, Props, VNode, component, event_name, fragment, function, h,
    text,
};
