use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

pub type WorkflowId = String;
pub type NodeId = String;

/// Kind of a workflow node; selects the handler the executor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Trigger,
    Action,
    Condition,
    Delay,
    Notification,
    Api,
    /// Notification alias whose channel defaults to email.
    Email,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::Trigger,
        NodeType::Action,
        NodeType::Condition,
        NodeType::Delay,
        NodeType::Notification,
        NodeType::Api,
        NodeType::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::Action => "action",
            NodeType::Condition => "condition",
            NodeType::Delay => "delay",
            NodeType::Notification => "notification",
            NodeType::Api => "api",
            NodeType::Email => "email",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    /// Scheduling flag managed outside the executor.
    #[serde(default)]
    pub is_active: bool,
    #[serde(with = "iso_millis", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_draft(draft: WorkflowDraft) -> Self {
        let mut workflow = Self::new(draft.name);
        workflow.description = draft.description;
        workflow.is_active = draft.is_active;
        workflow.nodes = draft.nodes;
        workflow.edges = draft.edges;
        workflow
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn find_node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes that are not the target of any edge, in node order.
    pub fn trigger_nodes(&self) -> Vec<&WorkflowNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a WorkflowEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Append a pre-built node and return its id.
    pub fn push_node(&mut self, node: WorkflowNode) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Plain edge, always followed.
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.push_edge(source.into(), target.into(), None);
    }

    /// Edge leaving a named output handle, e.g. a condition's `"true"` port.
    pub fn connect_handle(
        &mut self,
        source: impl Into<String>,
        handle: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.push_edge(source.into(), target.into(), Some(handle.into()));
    }

    fn push_edge(&mut self, source: String, target: String, source_handle: Option<String>) {
        let id = format!("e{}-{}", source, target);
        self.edges.push(WorkflowEdge {
            id,
            source,
            target,
            source_handle,
            extra: Map::new(),
        });
    }

    /// Create a node with a generated id.
    pub fn add_node(&mut self, node_type: NodeType, position: Position, data: NodeData) -> NodeId {
        let node = WorkflowNode {
            id: Uuid::new_v4().simple().to_string(),
            node_type,
            position,
            data,
            extra: Map::new(),
        };
        self.push_node(node)
    }

    /// Shallow-merge `patch` into a node's data. Returns false for unknown ids.
    pub fn update_node_data(&mut self, node_id: &str, patch: NodeDataPatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return false;
        };
        if let Some(label) = patch.label {
            node.data.label = label;
        }
        if let Some(description) = patch.description {
            node.data.description = Some(description);
        }
        if let Some(config) = patch.config {
            node.data.config = config;
        }
        if let Some(icon) = patch.icon {
            node.data.icon = Some(icon);
        }
        true
    }

    /// Remove a node together with every edge touching it.
    pub fn delete_node(&mut self, node_id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != node_id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != node_id && e.target != node_id);
        true
    }

    /// Editor-style connect: both ends must exist and the exact connection
    /// must not already be present.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
    ) -> Option<String> {
        if self.find_node(source).is_none() || self.find_node(target).is_none() {
            return None;
        }
        let duplicate = self.edges.iter().any(|e| {
            e.source == source && e.target == target && e.source_handle.as_deref() == source_handle
        });
        if duplicate {
            return None;
        }
        let id = format!(
            "reactflow__edge-{}{}-{}",
            source,
            source_handle.unwrap_or(""),
            target
        );
        self.edges.push(WorkflowEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.map(str::to_string),
            extra: Map::new(),
        });
        Some(id)
    }

    pub fn delete_edge(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != edge_id);
        self.edges.len() != before
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A workflow before it has been given an identity (templates, create requests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

/// Node in a workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
    /// Editor-only fields (size, selection, ...), carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            position: Position::default(),
            data: NodeData::new(label),
            extra: Map::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.config.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.data.description = Some(description.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form settings; the shape depends on the node type.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NodeData {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            config: Map::new(),
            icon: None,
        }
    }
}

/// Partial update for [`NodeData`]; `config` replaces the whole bag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDataPatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub config: Option<Map<String, Value>>,
    pub icon: Option<String>,
}

/// Directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// `targetHandle`, edge `data` and other editor fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Node position in visual editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// ISO-8601 timestamps with millisecond precision, the exchange format of
/// exported workflows.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
