use async_trait::async_trait;
use serde_json::json;
use wfcore::config::NotificationConfig;
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

use crate::now_iso;

/// Records a notification on the context. Delivery is not performed here.
pub struct NotificationNode;

#[async_trait]
impl NodeHandler for NotificationNode {
    fn node_type(&self) -> NodeType {
        NodeType::Notification
    }

    fn description(&self) -> &str {
        "Records a notification for a channel"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let config = NotificationConfig::from_config(&ctx.config);

        let sent = json!({
            "channel": config.channel,
            "message": config.message,
            "sentAt": now_iso(),
        });

        Ok(ctx.input.with("notificationSent", sent))
    }
}
