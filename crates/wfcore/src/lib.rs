//! Core abstractions for the workflow engine
//!
//! Graph model, typed node configuration, execution context, execution log
//! and result types, and the handler trait every node type implements.
//! Nothing in here drives execution.

pub mod config;
mod context;
mod error;
pub mod events;
pub mod io;
mod log;
mod node;
mod result;
pub mod templates;
mod workflow;

pub use config::NodeConfig;
pub use context::ExecutionContext;
pub use error::{FlowError, NodeError, WorkflowError};
pub use events::*;
pub use log::{
    ExecutionLog, ExecutionLogBook, LogCallback, LogEmitter, LogRecord, LogStatus, SYSTEM_NODE_ID,
};
pub use node::{NodeContext, NodeHandler};
pub use result::{ExecutionId, ExecutionResult, ExecutionStatus};
pub use workflow::{
    iso_millis, NodeData, NodeDataPatch, NodeId, NodeType, Position, Workflow, WorkflowDraft,
    WorkflowEdge, WorkflowId, WorkflowNode,
};

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, FlowError>;
