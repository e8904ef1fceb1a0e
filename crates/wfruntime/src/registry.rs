use std::collections::HashMap;
use std::sync::Arc;
use wfcore::{NodeHandler, NodeType};

/// Registry of handlers, keyed by the node type they evaluate
pub struct HandlerRegistry {
    handlers: HashMap<NodeType, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own node type, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        self.register_as(handler.node_type(), handler);
    }

    /// Register a handler for a type other than the one it reports (aliases)
    pub fn register_as(&mut self, node_type: NodeType, handler: Arc<dyn NodeHandler>) {
        tracing::debug!("Registering handler for node type: {}", node_type);
        self.handlers.insert(node_type, handler);
    }

    pub fn get(&self, node_type: NodeType) -> Option<&Arc<dyn NodeHandler>> {
        self.handlers.get(&node_type)
    }

    /// Registered node types, in declaration order
    pub fn list_node_types(&self) -> Vec<NodeType> {
        NodeType::ALL
            .into_iter()
            .filter(|t| self.handlers.contains_key(t))
            .collect()
    }

    pub fn description(&self, node_type: NodeType) -> Option<&str> {
        self.handlers.get(&node_type).map(|h| h.description())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
