use async_trait::async_trait;
use wfcore::config::TriggerConfig;
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

use crate::now_iso;

/// Entry point of a workflow: stamps when and how the run started
pub struct TriggerNode;

#[async_trait]
impl NodeHandler for TriggerNode {
    fn node_type(&self) -> NodeType {
        NodeType::Trigger
    }

    fn description(&self) -> &str {
        "Starts a workflow run"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let config = TriggerConfig::from_config(&ctx.config);

        Ok(ctx
            .input
            .with("triggeredAt", now_iso())
            .with("triggerType", config.trigger_type)
            .with("triggeredBy", "system"))
    }
}
