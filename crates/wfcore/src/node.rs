use crate::{ExecutionContext, LogEmitter, NodeError, NodeId, NodeType, WorkflowNode};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Evaluation strategy for one node type
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Node type this handler evaluates
    fn node_type(&self) -> NodeType;

    /// One-line description for listings
    fn description(&self) -> &str {
        ""
    }

    /// Run the node. Returns the incoming context merged with the node's
    /// own fields, or an error that aborts the run.
    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError>;
}

/// Everything a handler gets to see for one node visit
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,
    pub label: String,
    pub node_type: NodeType,

    /// Static configuration for this node
    pub config: Map<String, Value>,

    /// Context accumulated along the path that reached this node
    pub input: ExecutionContext,

    /// Appends entries to the run's log under this node's id
    pub log: LogEmitter,

    /// Cancelled when the caller abandons the run
    pub cancellation: CancellationToken,
}

impl NodeContext {
    pub fn for_node(
        node: &WorkflowNode,
        input: ExecutionContext,
        log: LogEmitter,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            label: node.data.label.clone(),
            node_type: node.node_type,
            config: node.data.config.clone(),
            input,
            log,
            cancellation,
        }
    }

    /// Fail fast if the run has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), NodeError> {
        if self.cancellation.is_cancelled() {
            return Err(NodeError::Cancelled);
        }
        Ok(())
    }
}
