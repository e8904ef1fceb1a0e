use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{0}")]
    Node(#[from] NodeError),

    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures raised by node handlers. Any of these aborts the current run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("API URL is required")]
    MissingUrl,

    #[error("Invalid headers JSON format")]
    InvalidHeaders,

    #[error("Invalid body JSON format")]
    InvalidBody,

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Wraps everything that goes wrong after the API node's URL check.
    #[error("API call failed: {0}")]
    ApiCall(Box<NodeError>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Execution cancelled")]
    Cancelled,
}

impl NodeError {
    pub fn api_call(inner: NodeError) -> Self {
        NodeError::ApiCall(Box::new(inner))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("No trigger node found in workflow")]
    NoTriggerNode,
}
