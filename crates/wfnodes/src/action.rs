use async_trait::async_trait;
use serde_json::{json, Value};
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

use crate::now_iso;

/// Generic step that records that it ran; it has no side effects of its own
pub struct ActionNode;

#[async_trait]
impl NodeHandler for ActionNode {
    fn node_type(&self) -> NodeType {
        NodeType::Action
    }

    fn description(&self) -> &str {
        "Records a generic action"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let result = json!({
            "nodeId": ctx.node_id,
            "label": ctx.label,
            "executedAt": now_iso(),
            "config": Value::Object(ctx.config.clone()),
        });

        Ok(ctx.input.with("actionResult", result))
    }
}
