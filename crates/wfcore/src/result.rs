use crate::{ExecutionLog, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ExecutionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub logs: Vec<ExecutionLog>,
    pub total_nodes: usize,
    /// Distinct nodes that ran, not the number of log entries.
    pub executed_nodes: usize,
}

impl ExecutionResult {
    pub fn start(execution_id: ExecutionId, workflow_id: impl Into<WorkflowId>, total_nodes: usize) -> Self {
        Self {
            execution_id,
            workflow_id: workflow_id.into(),
            start_time: Utc::now(),
            end_time: None,
            status: ExecutionStatus::Running,
            logs: Vec::new(),
            total_nodes,
            executed_nodes: 0,
        }
    }

    /// Move to a terminal status. Has no effect once `end_time` is set.
    pub fn finish(&mut self, status: ExecutionStatus, executed_nodes: usize, logs: Vec<ExecutionLog>) {
        if self.end_time.is_some() {
            return;
        }
        self.status = status;
        self.executed_nodes = executed_nodes;
        self.logs = logs;
        self.end_time = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}
