// ABOUTME: Root module for taskcrew - dependency-aware task execution for agent crews.
// ABOUTME: Re-exports the main public types from submodules.

pub mod agent;
pub mod config;
pub mod crew;
pub mod error;
pub mod prelude;
pub mod reasoner;
pub mod run;
pub mod task;
pub mod tool;
pub mod tools;

pub use crew::{Crew, CrewBuilder, RunInputs};
pub use error::CrewError;
