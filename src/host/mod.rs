//! Host environment: the event loop and completion handles.
//!
//! Everything the framework schedules (mount flushes, mutation observer
//! delivery, render slices) goes through an [`EventLoop`]. The loop is
//! driven by the embedder, which keeps the whole framework deterministic.

mod completion;
mod event_loop;

pub use completion::Completion;
pub use event_loop::{EventLoop, EventLoopConfig, IdleDeadline, IdleId, TimerId};
