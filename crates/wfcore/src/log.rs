use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Observer invoked synchronously for every new log entry.
pub type LogCallback = Arc<dyn Fn(&ExecutionLog) + Send + Sync>;

/// Node id used for entries that belong to the run rather than a node.
pub const SYSTEM_NODE_ID: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

/// One lifecycle transition of a node during a run. Immutable once added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub node_label: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// An entry before the log book stamps it with an id and timestamp.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub node_id: String,
    pub node_label: String,
    pub status: LogStatus,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl LogRecord {
    pub fn new(node_id: impl Into<String>, node_label: impl Into<String>, status: LogStatus) -> Self {
        Self {
            node_id: node_id.into(),
            node_label: node_label.into(),
            status,
            message: None,
            data: None,
        }
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new(SYSTEM_NODE_ID, "System", LogStatus::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Append-only log of one run, shared by the executor and node handlers.
#[derive(Clone, Default)]
pub struct ExecutionLogBook {
    entries: Arc<Mutex<Vec<ExecutionLog>>>,
    observer: Option<LogCallback>,
}

impl ExecutionLogBook {
    pub fn new(observer: Option<LogCallback>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            observer,
        }
    }

    /// Stamp, append and publish an entry.
    pub async fn add(&self, record: LogRecord) -> ExecutionLog {
        let now = Utc::now();
        let entry = ExecutionLog {
            id: format!("{}-{}", now.timestamp_millis(), Uuid::new_v4().simple()),
            timestamp: now,
            node_id: record.node_id,
            node_label: record.node_label,
            status: record.status,
            message: record.message,
            data: record.data,
        };

        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        // Still under the lock so observers see entries in append order.
        if let Some(observer) = &self.observer {
            observer(&entry);
        }
        entry
    }

    pub async fn entries(&self) -> Vec<ExecutionLog> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn emitter(&self, node_id: impl Into<String>, node_label: impl Into<String>) -> LogEmitter {
        LogEmitter {
            node_id: node_id.into(),
            node_label: node_label.into(),
            book: self.clone(),
        }
    }
}

/// Lets a handler add entries attributed to its own node.
#[derive(Clone)]
pub struct LogEmitter {
    node_id: String,
    node_label: String,
    book: ExecutionLogBook,
}

impl LogEmitter {
    pub async fn emit(&self, status: LogStatus, message: impl Into<String>, data: Option<Value>) {
        let mut record = LogRecord::new(self.node_id.clone(), self.node_label.clone(), status)
            .with_message(message);
        record.data = data;
        self.book.add(record).await;
    }

    pub async fn running(&self, message: impl Into<String>) {
        self.emit(LogStatus::Running, message, None).await;
    }

    pub async fn success(&self, message: impl Into<String>, data: Value) {
        self.emit(LogStatus::Success, message, Some(data)).await;
    }
}
