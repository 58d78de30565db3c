// ABOUTME: Task module - declarations, templates, and the validated dependency graph.
// ABOUTME: Provides TaskSpec, TaskRef, TaskId, TaskGraph, and `{name}` interpolation.

mod graph;
mod spec;
pub mod template;

pub use graph::{TaskGraph, TaskNode};
pub use spec::{TaskId, TaskRef, TaskSpec};
pub use template::{Params, interpolate};
