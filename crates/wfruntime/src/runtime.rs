use crate::executor::{RunOptions, WorkflowExecutor};
use crate::registry::HandlerRegistry;
use crate::store::WorkflowStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Duration;
use wfcore::config::DEFAULT_MAX_DELAY_MS;
use wfcore::{
    EventBus, ExecutionEvent, ExecutionLog, ExecutionResult, FlowError, LogCallback, Workflow,
    WorkflowError,
};

/// Main runtime: handler registry, executor, workflow store and event bus
pub struct WorkflowRuntime {
    registry: Arc<HandlerRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
    store: Arc<WorkflowStore>,
    config: RuntimeConfig,
}

impl WorkflowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration and no handlers
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<HandlerRegistry>, config: RuntimeConfig) -> Self {
        let executor = Arc::new(WorkflowExecutor::with_pacing(config.node_pacing()));
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            executor,
            event_bus,
            store: Arc::new(WorkflowStore::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<WorkflowStore> {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Execute a stored workflow by id
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        options: RunOptions,
    ) -> Result<ExecutionResult, FlowError> {
        let workflow = self
            .store
            .get(workflow_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        Ok(self.execute(&workflow, options).await)
    }

    /// Execute a workflow directly (without storing it), publishing progress
    /// on the event bus as well as to the caller's observer
    pub async fn execute(&self, workflow: &Workflow, mut options: RunOptions) -> ExecutionResult {
        let execution_id = options.execution_id;

        self.event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_id: workflow.id.clone(),
            timestamp: Utc::now(),
        });

        let sender = self.event_bus.sender();
        let caller = options.on_log.take();
        let workflow_id = workflow.id.clone();
        let observer: LogCallback = Arc::new(move |log: &ExecutionLog| {
            if let Some(caller) = &caller {
                caller(log);
            }
            let _ = sender.send(ExecutionEvent::Log {
                execution_id,
                workflow_id: workflow_id.clone(),
                log: log.clone(),
            });
        });
        options.on_log = Some(observer);

        let result = self
            .executor
            .execute_with(workflow, &self.registry, options)
            .await;

        self.event_bus.emit(ExecutionEvent::WorkflowFinished {
            execution_id,
            workflow_id: workflow.id.clone(),
            status: result.status,
            executed_nodes: result.executed_nodes,
            total_nodes: result.total_nodes,
            duration_ms: result.duration_ms().unwrap_or_default(),
            timestamp: Utc::now(),
        });

        result
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }
}

impl Default for WorkflowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Pause before each node executes
    pub node_pacing_ms: u64,
    /// Ceiling applied to delay nodes
    pub max_delay_ms: u64,
    /// Request timeout for API nodes
    pub http_timeout_secs: u64,
}

impl RuntimeConfig {
    /// Defaults overridden by `WF_PACE_MS`, `WF_MAX_DELAY_MS`,
    /// `WF_HTTP_TIMEOUT_SECS` and `WF_EVENT_BUFFER`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            event_buffer_size: env_or("WF_EVENT_BUFFER", defaults.event_buffer_size),
            node_pacing_ms: env_or("WF_PACE_MS", defaults.node_pacing_ms),
            max_delay_ms: env_or("WF_MAX_DELAY_MS", defaults.max_delay_ms),
            http_timeout_secs: env_or("WF_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
        }
    }

    pub fn node_pacing(&self) -> Duration {
        Duration::from_millis(self.node_pacing_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            node_pacing_ms: 0,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            http_timeout_secs: 30,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
