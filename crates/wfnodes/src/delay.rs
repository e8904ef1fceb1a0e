use async_trait::async_trait;
use tokio::time::sleep;
use wfcore::config::{DelayConfig, DEFAULT_MAX_DELAY_MS};
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

/// Pause the run. Requested durations are capped at `max_delay_ms`.
pub struct DelayNode {
    max_delay_ms: u64,
}

impl DelayNode {
    pub fn new(max_delay_ms: u64) -> Self {
        Self { max_delay_ms }
    }
}

impl Default for DelayNode {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY_MS)
    }
}

#[async_trait]
impl NodeHandler for DelayNode {
    fn node_type(&self) -> NodeType {
        NodeType::Delay
    }

    fn description(&self) -> &str {
        "Waits before continuing (capped)"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        ctx.check_cancelled()?;

        let config = DelayConfig::from_config(&ctx.config);
        let wait = config.effective(self.max_delay_ms);

        ctx.log
            .running(format!("Waiting for {}...", config.describe()))
            .await;
        tracing::debug!(
            "Delay node {} waiting {}ms (requested {}ms)",
            ctx.node_id,
            wait.as_millis(),
            config.requested_ms()
        );

        tokio::select! {
            _ = sleep(wait) => {}
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        }

        Ok(ctx.input.with("delayedFor", config.describe()))
    }
}
