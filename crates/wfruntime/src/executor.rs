use crate::registry::HandlerRegistry;
use futures::future::BoxFuture;
use std::collections::HashSet;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use wfcore::{
    ExecutionContext, ExecutionId, ExecutionLogBook, ExecutionResult, ExecutionStatus, FlowError,
    LogCallback, LogRecord, LogStatus, NodeContext, NodeError, NodeType, Workflow, WorkflowEdge,
    WorkflowError, WorkflowNode,
};

/// Per-run knobs for [`WorkflowExecutor::execute_with`]
#[derive(Clone)]
pub struct RunOptions {
    pub execution_id: ExecutionId,
    /// Called synchronously for every new log entry
    pub on_log: Option<LogCallback>,
    /// Context every trigger starts from
    pub initial_context: ExecutionContext,
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn with_observer(mut self, on_log: LogCallback) -> Self {
        self.on_log = Some(on_log);
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.initial_context = context;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            execution_id: ExecutionId::new_v4(),
            on_log: None,
            initial_context: ExecutionContext::new(),
            cancellation: CancellationToken::new(),
        }
    }
}

/// Runs workflows depth-first from their trigger nodes, one node at a time
pub struct WorkflowExecutor {
    node_pacing: Duration,
}

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self {
            node_pacing: Duration::ZERO,
        }
    }

    /// Pause before every node, e.g. so a UI can animate progress
    pub fn with_pacing(node_pacing: Duration) -> Self {
        Self { node_pacing }
    }

    /// Execute a workflow and report the trace. Never fails: errors end up
    /// as a `failed` result.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        registry: &HandlerRegistry,
        on_log: Option<LogCallback>,
    ) -> ExecutionResult {
        let options = RunOptions {
            on_log,
            ..RunOptions::default()
        };
        self.execute_with(workflow, registry, options).await
    }

    pub async fn execute_with(
        &self,
        workflow: &Workflow,
        registry: &HandlerRegistry,
        options: RunOptions,
    ) -> ExecutionResult {
        let mut result =
            ExecutionResult::start(options.execution_id, workflow.id.clone(), workflow.nodes.len());
        let log = ExecutionLogBook::new(options.on_log);

        tracing::info!("Starting workflow execution: {} ({})", workflow.name, workflow.id);

        let mut run = Run {
            workflow,
            registry,
            log: log.clone(),
            visited: HashSet::new(),
            cancellation: options.cancellation,
            pacing: self.node_pacing,
        };

        let status = match run.execute_triggers(&options.initial_context).await {
            Ok(()) => ExecutionStatus::Completed,
            Err(e) => {
                tracing::error!("Workflow {} failed: {}", workflow.id, e);
                log.add(LogRecord::system_error(e.to_string())).await;
                ExecutionStatus::Failed
            }
        };

        result.finish(status, run.visited.len(), log.entries().await);
        tracing::info!(
            "Workflow {} {:?}: {}/{} nodes",
            workflow.id,
            result.status,
            result.executed_nodes,
            result.total_nodes
        );
        result
    }
}

impl Default for WorkflowExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one execution
struct Run<'w> {
    workflow: &'w Workflow,
    registry: &'w HandlerRegistry,
    log: ExecutionLogBook,
    /// Shared by every trigger: a node runs at most once per run
    visited: HashSet<String>,
    cancellation: CancellationToken,
    pacing: Duration,
}

impl<'w> Run<'w> {
    async fn execute_triggers(&mut self, initial: &ExecutionContext) -> Result<(), FlowError> {
        let workflow = self.workflow;
        let triggers = workflow.trigger_nodes();
        if triggers.is_empty() {
            return Err(WorkflowError::NoTriggerNode.into());
        }

        for trigger in triggers {
            visit(self, trigger, initial.clone()).await?;
        }
        Ok(())
    }

    async fn record(&self, node: &WorkflowNode, status: LogStatus, message: String) {
        self.log
            .add(LogRecord::new(node.id.clone(), node.label(), status).with_message(message))
            .await;
    }

    async fn run_node(
        &self,
        node: &WorkflowNode,
        input: ExecutionContext,
    ) -> Result<ExecutionContext, NodeError> {
        if !self.pacing.is_zero() {
            tokio::select! {
                _ = sleep(self.pacing) => {}
                _ = self.cancellation.cancelled() => return Err(NodeError::Cancelled),
            }
        }

        let Some(handler) = self.registry.get(node.node_type) else {
            tracing::warn!(
                "No handler for node type {}; passing context through node {}",
                node.node_type,
                node.id
            );
            return Ok(input);
        };

        let ctx = NodeContext::for_node(
            node,
            input,
            self.log.emitter(node.id.clone(), node.label()),
            self.cancellation.clone(),
        );
        handler.execute(ctx).await
    }
}

/// Pre-order depth-first visit of `node` and everything reachable from it.
fn visit<'a, 'w: 'a>(
    run: &'a mut Run<'w>,
    node: &'w WorkflowNode,
    context: ExecutionContext,
) -> BoxFuture<'a, Result<(), NodeError>> {
    Box::pin(async move {
        if run.visited.contains(&node.id) {
            tracing::debug!("Node {} already executed, skipping", node.id);
            run.record(node, LogStatus::Skipped, "Node already executed".to_string())
                .await;
            return Ok(());
        }
        if run.cancellation.is_cancelled() {
            return Err(NodeError::Cancelled);
        }

        run.visited.insert(node.id.clone());
        run.record(node, LogStatus::Running, format!("Executing {} node", node.node_type))
            .await;
        tracing::debug!("Executing node {} ({})", node.id, node.node_type);

        let output = match run.run_node(node, context).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Node {} failed: {}", node.id, e);
                run.record(node, LogStatus::Error, e.to_string()).await;
                return Err(e);
            }
        };

        run.log
            .add(
                LogRecord::new(node.id.clone(), node.label(), LogStatus::Success)
                    .with_message(format!("{} completed successfully", node.node_type))
                    .with_data(output.to_value()),
            )
            .await;

        let workflow = run.workflow;
        for edge in workflow.outgoing_edges(&node.id) {
            // Edges pointing at missing nodes are ignored.
            let Some(next) = workflow.find_node(&edge.target) else {
                continue;
            };
            if !follows_edge(node, edge, &output) {
                continue;
            }
            // Each node on the path records the failure as it unwinds.
            if let Err(e) = visit(&mut *run, next, output.clone()).await {
                run.record(node, LogStatus::Error, e.to_string()).await;
                return Err(e);
            }
        }
        Ok(())
    })
}

/// Condition nodes only continue along the handle matching their result;
/// every other edge is always taken.
fn follows_edge(node: &WorkflowNode, edge: &WorkflowEdge, output: &ExecutionContext) -> bool {
    match (node.node_type, edge.source_handle.as_deref()) {
        (NodeType::Condition, Some(handle)) if !handle.is_empty() => match handle {
            "true" => output.condition_result() == Some(true),
            "false" => output.condition_result() == Some(false),
            _ => false,
        },
        _ => true,
    }
}
