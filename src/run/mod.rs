// ABOUTME: Run module - per-run scheduling, context, the worker-pool driver, and reporting.
// ABOUTME: Provides Scheduler, Selection, RunContext, RunSettings, and CrewReport.

mod context;
pub(crate) mod driver;
mod report;
mod scheduler;

pub use context::{OutputQuality, RunContext, TaskOutput};
pub use driver::{DEFAULT_MAX_CONCURRENCY, RunSettings};
pub use report::{CrewReport, SkipReason, TaskOutcome, TaskStatus};
pub use scheduler::{Scheduler, Selection};
