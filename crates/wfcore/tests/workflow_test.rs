// crates/wfcore/tests/workflow_test.rs

use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wfcore::config::{ApiConfig, DelayConfig, NotificationConfig, TriggerConfig};
use wfcore::io::{export_file_name, export_workflow, import_workflow, validate_workflow_json};
use wfcore::templates::workflow_templates;
use wfcore::{
    EventBus, ExecutionContext, ExecutionEvent, ExecutionId, ExecutionLog, ExecutionLogBook,
    ExecutionResult, ExecutionStatus, LogCallback, LogRecord, LogStatus, NodeConfig, NodeData,
    NodeDataPatch, NodeError, NodeType, Position, Workflow, WorkflowNode,
};

fn config(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("config must be an object"),
    }
}

fn approval_workflow() -> Workflow {
    let mut workflow = Workflow::new("Approval Flow").with_description("review items");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Condition, "Check").with_config("condition", "value > 100"),
    );
    workflow.push_node(WorkflowNode::new("3", NodeType::Action, "High"));
    workflow.connect("1", "2");
    workflow.connect_handle("2", "true", "3");
    workflow
}

#[test]
fn test_trigger_nodes_are_nodes_without_incoming_edges() {
    let mut workflow = approval_workflow();
    workflow.push_node(WorkflowNode::new("4", NodeType::Notification, "Orphan"));

    let triggers: Vec<&str> = workflow.trigger_nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(triggers, vec!["1", "4"]);
}

#[test]
fn test_workflow_json_shape() {
    let workflow = approval_workflow();
    let json = serde_json::to_value(&workflow).unwrap();

    assert_eq!(json["isActive"], json!(false));
    assert_eq!(json["nodes"][1]["type"], json!("condition"));
    assert_eq!(json["nodes"][1]["data"]["config"]["condition"], json!("value > 100"));
    assert_eq!(json["edges"][1]["sourceHandle"], json!("true"));
    assert!(json["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_editor_fields_survive_deserialization() {
    let raw = json!({
        "id": "wf",
        "name": "Editor",
        "nodes": [{
            "id": "a",
            "type": "trigger",
            "position": { "x": 1.0, "y": 2.0 },
            "data": { "label": "A", "config": null },
            "selected": true
        }],
        "edges": [],
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z"
    });

    let workflow: Workflow = serde_json::from_value(raw).unwrap();
    let node = &workflow.nodes[0];
    assert!(node.data.config.is_empty());
    assert_eq!(node.extra.get("selected"), Some(&json!(true)));

    let back = serde_json::to_value(&workflow).unwrap();
    assert_eq!(back["nodes"][0]["selected"], json!(true));
}

#[test]
fn test_add_edge_rejects_duplicates_and_missing_nodes() {
    let mut workflow = approval_workflow();
    workflow.push_node(WorkflowNode::new("4", NodeType::Action, "Low"));

    let id = workflow.add_edge("2", "4", Some("false"));
    assert_eq!(id.as_deref(), Some("reactflow__edge-2false-4"));
    assert!(workflow.add_edge("2", "4", Some("false")).is_none());
    assert!(workflow.add_edge("2", "missing", None).is_none());

    // Same endpoints through a different handle is a distinct connection.
    assert!(workflow.add_edge("2", "4", Some("true")).is_some());
    assert_eq!(workflow.edges.len(), 4);

    assert!(workflow.delete_edge("reactflow__edge-2false-4"));
    assert!(!workflow.delete_edge("reactflow__edge-2false-4"));
}

#[test]
fn test_delete_node_removes_incident_edges() {
    let mut workflow = approval_workflow();

    assert!(workflow.delete_node("2"));
    assert!(workflow.edges.is_empty());
    assert_eq!(workflow.nodes.len(), 2);
    assert!(!workflow.delete_node("2"));
}

#[test]
fn test_add_and_update_node() {
    let mut workflow = Workflow::new("Editing");
    let id = workflow.add_node(NodeType::Delay, Position { x: 10.0, y: 20.0 }, NodeData::new("Wait"));

    let patched = workflow.update_node_data(
        &id,
        NodeDataPatch {
            label: Some("Wait a bit".to_string()),
            config: Some(config(json!({ "duration": 2, "unit": "seconds" }))),
            ..Default::default()
        },
    );
    assert!(patched);

    let node = workflow.find_node(&id).unwrap();
    assert_eq!(node.label(), "Wait a bit");
    assert_eq!(node.data.config.get("duration"), Some(&json!(2)));
    assert!(node.data.description.is_none());
    assert!(!workflow.update_node_data("nope", NodeDataPatch::default()));
}

#[test]
fn test_export_import_preserves_workflow() {
    let mut workflow = approval_workflow();
    workflow.is_active = true;

    let exported = export_workflow(&workflow).unwrap();
    let json: Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(json["version"], json!("1.0.0"));
    assert!(validate_workflow_json(&json));

    let imported = import_workflow(&exported).expect("export should import");
    assert_eq!(imported.id, workflow.id);
    assert_eq!(imported.nodes, workflow.nodes);
    assert_eq!(imported.edges, workflow.edges);
    assert!(imported.is_active);
    assert_eq!(
        imported.created_at.timestamp_millis(),
        workflow.created_at.timestamp_millis()
    );
}

#[test]
fn test_import_rejects_malformed_documents() {
    assert!(import_workflow("not json").is_none());
    assert!(import_workflow("[]").is_none());

    let workflow = approval_workflow();
    let mut json: Value = serde_json::from_str(&export_workflow(&workflow).unwrap()).unwrap();

    let mut missing_version = json.clone();
    missing_version.as_object_mut().unwrap().remove("version");
    assert!(import_workflow(&missing_version.to_string()).is_none());

    let mut bad_active = json.clone();
    bad_active["isActive"] = json!("yes");
    assert!(import_workflow(&bad_active.to_string()).is_none());

    json["createdAt"] = json!("yesterday");
    assert!(import_workflow(&json.to_string()).is_none());
}

#[test]
fn test_export_file_name() {
    let workflow = Workflow::new("My  Daily Report");
    let name = export_file_name(&workflow);

    assert!(name.starts_with("my-daily-report-"), "got {}", name);
    assert!(name.ends_with(".json"));
    let stamp = &name["my-daily-report-".len()..name.len() - ".json".len()];
    assert!(stamp.parse::<i64>().is_ok());
}

#[test]
fn test_falsy_settings_use_defaults() {
    let trigger = TriggerConfig::from_config(&config(json!({ "triggerType": "" })));
    assert_eq!(trigger.trigger_type, "manual");

    let notification = NotificationConfig::from_config(&config(json!({ "channel": null, "message": 0 })));
    assert_eq!(notification.channel, "email");
    assert_eq!(notification.message, "Notification sent");

    let delay = DelayConfig::from_config(&Map::new());
    assert_eq!(delay.describe(), "1 seconds");
    assert_eq!(delay.effective(5_000), Duration::from_secs(1));
}

#[test]
fn test_delay_is_clamped() {
    let long = DelayConfig::from_config(&config(json!({ "duration": 10, "unit": "minutes" })));
    assert_eq!(long.requested_ms(), 600_000.0);
    assert_eq!(long.effective(5_000), Duration::from_millis(5_000));
    assert_eq!(long.describe(), "10 minutes");

    let float = DelayConfig::from_config(&config(json!({ "duration": 10.0, "unit": "minutes" })));
    assert_eq!(float.describe(), "10 minutes");
    let fraction = DelayConfig::from_config(&config(json!({ "duration": 1.5 })));
    assert_eq!(fraction.describe(), "1.5 seconds");
    assert_eq!(fraction.effective(5_000), Duration::from_millis(1_500));

    let negative = DelayConfig::from_config(&config(json!({ "duration": -3 })));
    assert_eq!(negative.effective(5_000), Duration::ZERO);

    let garbage = DelayConfig::from_config(&config(json!({ "duration": "soon" })));
    assert_eq!(garbage.effective(5_000), Duration::ZERO);

    let unknown_unit = DelayConfig::from_config(&config(json!({ "duration": "2", "unit": "weeks" })));
    assert_eq!(unknown_unit.effective(5_000), Duration::from_secs(2));
}

#[test]
fn test_api_config_parsing() {
    assert_eq!(
        ApiConfig::from_config(&config(json!({ "method": "POST" }))),
        Err(NodeError::MissingUrl)
    );
    // URL is checked before headers.
    assert_eq!(
        ApiConfig::from_config(&config(json!({ "headers": "{bad" }))),
        Err(NodeError::MissingUrl)
    );
    assert_eq!(
        ApiConfig::from_config(&config(json!({ "url": "http://x", "headers": "{bad" }))),
        Err(NodeError::InvalidHeaders)
    );
    assert_eq!(
        ApiConfig::from_config(&config(json!({ "url": "http://x", "method": "post", "body": "{bad" }))),
        Err(NodeError::InvalidBody)
    );

    let get = ApiConfig::from_config(&config(json!({ "url": "http://x", "body": "{bad" }))).unwrap();
    assert_eq!(get.method, "GET");
    assert!(get.body.is_none());

    let post = ApiConfig::from_config(&config(json!({
        "url": "http://x",
        "method": "patch",
        "headers": "{\"Authorization\": \"Bearer t\"}",
        "body": "{\"a\": 1}"
    })))
    .unwrap();
    assert_eq!(post.method, "PATCH");
    assert_eq!(post.headers.get("Authorization").map(String::as_str), Some("Bearer t"));
    assert_eq!(post.body, Some(json!({ "a": 1 })));
}

#[test]
fn test_email_parses_as_notification() {
    let parsed = NodeConfig::parse(NodeType::Email, &config(json!({ "message": "hi" }))).unwrap();
    match parsed {
        NodeConfig::Notification(n) => {
            assert_eq!(n.channel, "email");
            assert_eq!(n.message, "hi");
        }
        other => panic!("unexpected config: {:?}", other),
    }
}

#[test]
fn test_context_merges_fields() {
    let ctx = ExecutionContext::new()
        .with("value", 150)
        .with("conditionResult", true)
        .with("value", 50);

    assert_eq!(ctx.len(), 2);
    assert_eq!(ctx.get("value"), Some(&json!(50)));
    assert_eq!(ctx.condition_result(), Some(true));
    assert_eq!(ctx.to_value(), json!({ "value": 50, "conditionResult": true }));
}

#[tokio::test]
async fn test_log_book_notifies_observer_in_order() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: LogCallback = Arc::new(move |log: &ExecutionLog| {
        sink.lock().unwrap().push(log.message.clone().unwrap_or_default());
    });

    let book = ExecutionLogBook::new(Some(observer));
    book.add(LogRecord::new("1", "Start", LogStatus::Running).with_message("first"))
        .await;
    book.emitter("1", "Start")
        .success("second", json!({ "ok": true }))
        .await;
    let system = book.add(LogRecord::system_error("third")).await;

    assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(system.node_id, "system");
    assert_eq!(system.node_label, "System");
    assert_eq!(system.status, LogStatus::Error);

    let entries = book.entries().await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].data, Some(json!({ "ok": true })));
    assert!(entries.windows(2).all(|w| w[0].id != w[1].id));
}

#[test]
fn test_result_finish_is_final() {
    let mut result = ExecutionResult::start(ExecutionId::nil(), "wf", 3);
    assert_eq!(result.status, ExecutionStatus::Running);
    assert!(result.duration_ms().is_none());

    result.finish(ExecutionStatus::Failed, 1, Vec::new());
    result.finish(ExecutionStatus::Completed, 3, Vec::new());

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.executed_nodes, 1);
    assert!(!result.is_success());
    assert!(result.duration_ms().unwrap() >= 0);
}

#[test]
fn test_templates() {
    let templates = workflow_templates();
    assert_eq!(templates.len(), 2);

    let email = &templates[0];
    assert_eq!(email.name, "Email Notification on Task Complete");
    assert_eq!(email.nodes.len(), 2);
    assert_eq!(email.edges.len(), 1);

    let approval = &templates[1];
    assert_eq!(approval.name, "Approval Workflow");
    let condition = approval.nodes.iter().find(|n| n.node_type == NodeType::Condition).unwrap();
    assert_eq!(condition.data.config.get("condition"), Some(&json!("status == approved")));
    let handles: Vec<_> = approval.edges.iter().filter_map(|e| e.source_handle.as_deref()).collect();
    assert_eq!(handles, vec!["true", "false"]);

    let workflow = Workflow::from_draft(approval.clone());
    assert!(!workflow.id.is_empty());
    assert_eq!(workflow.trigger_nodes().len(), 1);
}

#[tokio::test]
async fn test_event_bus_with_zero_capacity() {
    let bus = EventBus::new(0);
    let mut events = bus.subscribe();

    bus.emit(ExecutionEvent::WorkflowStarted {
        execution_id: ExecutionId::nil(),
        workflow_id: "wf".to_string(),
        timestamp: chrono::Utc::now(),
    });

    let event = events.recv().await.unwrap();
    assert_eq!(event.execution_id(), ExecutionId::nil());
}
