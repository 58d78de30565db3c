// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use taskcrew::prelude::*;` to get started quickly.

pub use crate::agent::{Agent, AgentRegistry, Step, Transcript};
pub use crate::config::CrewConfig;
pub use crate::crew::{Crew, CrewBuilder, RunInputs};
pub use crate::error::{
    BuildError, ConfigError, CrewError, ReasonerError, RegistryError, RunError, TaskFailure,
    ToolError,
};
pub use crate::reasoner::{ChatReasoner, Decision, FnReasoner, Prompt, Reasoner, ReasonerConfig};
pub use crate::run::{CrewReport, RunSettings, SkipReason, TaskOutcome, TaskStatus};
pub use crate::task::{TaskRef, TaskSpec};
pub use crate::tool::{FnTool, Tool, ToolDescriptor, ToolDirectory, ToolResult};
pub use crate::tools::{DuckDuckGoResults, DuckDuckGoSearch, WebScraper, register_web_tools};
