//! Tasks and their lifecycle
//!
//! A [`Task`] only knows its own intent. [`TaskNode`] wraps it with the
//! lifecycle state machine (`Fresh -> Running -> Finished | Stopped`) and
//! owns the child the task currently delegates to. Each tick a task
//! re-derives the child it wants; an equal child already held is kept with
//! its progress, anything else replaces it.

pub mod builtin;
mod node;
mod traits;

pub use node::{TaskNode, TaskState};
pub use traits::{AsAny, Task, same_kind, structural_eq};
