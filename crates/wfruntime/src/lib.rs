//! Workflow execution runtime
//!
//! This crate provides the engine that runs workflows: the handler registry,
//! the depth-first executor, static graph analysis and the in-memory store.

mod executor;
pub mod graph;
mod registry;
mod runtime;
mod store;

pub use executor::{RunOptions, WorkflowExecutor};
pub use graph::{analyze, ConfigIssue, GraphReport};
pub use registry::HandlerRegistry;
pub use runtime::{RuntimeConfig, WorkflowRuntime};
pub use store::WorkflowStore;
