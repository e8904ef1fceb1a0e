// crates/wfnodes/tests/nodes_test.rs

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wfcore::{
    ExecutionContext, ExecutionLog, ExecutionLogBook, ExecutionResult, ExecutionStatus, LogStatus,
    NodeContext, NodeError, NodeHandler, NodeType, Workflow, WorkflowNode,
};
use wfnodes::{standard_registry, ApiNode, DelayNode};
use wfruntime::{HandlerRegistry, RunOptions, RuntimeConfig, WorkflowExecutor};

fn registry() -> HandlerRegistry {
    standard_registry(&RuntimeConfig::default())
}

async fn run(workflow: &Workflow, context: ExecutionContext) -> ExecutionResult {
    WorkflowExecutor::new()
        .execute_with(workflow, &registry(), RunOptions::default().with_context(context))
        .await
}

fn success_data<'a>(result: &'a ExecutionResult, node_id: &str) -> &'a Value {
    result
        .logs
        .iter()
        .filter(|l| l.node_id == node_id && l.status == LogStatus::Success)
        .last()
        .and_then(|l| l.data.as_ref())
        .unwrap_or_else(|| panic!("no success entry for {}", node_id))
}

fn messages<'a>(logs: &'a [ExecutionLog], node_id: &str) -> Vec<&'a str> {
    logs.iter()
        .filter(|l| l.node_id == node_id)
        .filter_map(|l| l.message.as_deref())
        .collect()
}

/// Local HTTP endpoint standing in for the APIs workflows call.
async fn spawn_api() -> SocketAddr {
    let app = Router::new()
        .route(
            "/send",
            post(|headers: HeaderMap, body: String| async move {
                let content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let token = headers
                    .get("x-token")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                (
                    StatusCode::ACCEPTED,
                    Json(json!({ "contentType": content_type, "token": token, "received": body })),
                )
            }),
        )
        .route("/ok", get(|| async { Json(json!({ "items": [1, 2, 3] })) }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database down") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn value_check_workflow() -> Workflow {
    let mut workflow = Workflow::new("Value check");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Condition, "Over 100?").with_config("condition", "value > 100"),
    );
    workflow.push_node(
        WorkflowNode::new("3", NodeType::Notification, "High")
            .with_config("channel", "slack")
            .with_config("message", "big one"),
    );
    workflow.push_node(WorkflowNode::new("4", NodeType::Action, "Low"));
    workflow.connect("1", "2");
    workflow.connect_handle("2", "true", "3");
    workflow.connect_handle("2", "false", "4");
    workflow
}

#[tokio::test]
async fn test_condition_takes_true_branch() {
    let workflow = value_check_workflow();

    let result = run(&workflow, ExecutionContext::new().with("value", 150)).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.executed_nodes, 3);

    let trigger = success_data(&result, "1");
    assert_eq!(trigger["triggerType"], "manual");
    assert_eq!(trigger["triggeredBy"], "system");
    assert_eq!(trigger["value"], 150);

    let condition = success_data(&result, "2");
    assert_eq!(condition["conditionResult"], true);
    assert_eq!(condition["conditionExpression"], "value > 100");

    let notification = success_data(&result, "3");
    assert_eq!(notification["notificationSent"]["channel"], "slack");
    assert_eq!(notification["notificationSent"]["message"], "big one");
    // Upstream fields are still visible downstream.
    assert_eq!(notification["triggeredBy"], "system");
    assert!(result.logs.iter().all(|l| l.node_id != "4"));
}

#[tokio::test]
async fn test_condition_takes_false_branch() {
    let workflow = value_check_workflow();

    let result = run(&workflow, ExecutionContext::new().with("value", 50)).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(success_data(&result, "2")["conditionResult"], false);

    let action = success_data(&result, "4");
    assert_eq!(action["actionResult"]["nodeId"], "4");
    assert_eq!(action["actionResult"]["label"], "Low");
    assert!(result.logs.iter().all(|l| l.node_id != "3"));
}

#[tokio::test]
async fn test_non_string_condition_is_false() {
    let mut workflow = Workflow::new("Odd condition");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(WorkflowNode::new("2", NodeType::Condition, "Check").with_config("condition", 7));
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(success_data(&result, "2")["conditionResult"], false);
}

#[tokio::test]
async fn test_email_node_defaults_to_email_channel() {
    let mut workflow = Workflow::new("Email");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(WorkflowNode::new("2", NodeType::Email, "Mail"));
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    let sent = &success_data(&result, "2")["notificationSent"];
    assert_eq!(sent["channel"], "email");
    assert_eq!(sent["message"], "Notification sent");
    assert!(sent["sentAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(
        messages(&result.logs, "2"),
        vec!["Executing email node", "email completed successfully"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delay_is_capped() {
    let mut workflow = Workflow::new("Slow");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Delay, "Wait")
            .with_config("duration", 10)
            .with_config("unit", "minutes"),
    );
    workflow.connect("1", "2");

    let start = Instant::now();
    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(start.elapsed(), Duration::from_millis(5_000));
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(success_data(&result, "2")["delayedFor"], "10 minutes");
    assert_eq!(
        messages(&result.logs, "2"),
        vec![
            "Executing delay node",
            "Waiting for 10 minutes...",
            "delay completed successfully"
        ]
    );
}

#[tokio::test]
async fn test_api_post_accepted() {
    let addr = spawn_api().await;
    let url = format!("http://{}/send", addr);

    let mut workflow = Workflow::new("Send mail");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Api, "Mailer")
            .with_config("url", url.clone())
            .with_config("method", "post")
            .with_config("headers", "{\"x-token\": \"secret\"}")
            .with_config("body", "{\"to\": \"team@example.com\"}"),
    );
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    let making = format!("Making POST request to {}", url);
    assert_eq!(
        messages(&result.logs, "2"),
        vec![
            "Executing api node",
            making.as_str(),
            "Email queued for sending (202 Accepted)",
            "api completed successfully",
        ]
    );

    let response = &success_data(&result, "2")["apiResponse"];
    assert_eq!(response["status"], 202);
    assert_eq!(response["statusText"], "Accepted");
    assert_eq!(response["data"]["contentType"], "application/json");
    assert_eq!(response["data"]["token"], "secret");
    assert_eq!(response["data"]["received"], json!({ "to": "team@example.com" }));
}

#[tokio::test]
async fn test_api_get_ignores_body() {
    let addr = spawn_api().await;

    let mut workflow = Workflow::new("Fetch");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Api, "Fetch")
            .with_config("url", format!("http://{}/ok", addr))
            .with_config("body", "{not json"),
    );
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    let response = &success_data(&result, "2")["apiResponse"];
    assert_eq!(response["status"], 200);
    assert_eq!(response["data"], json!({ "items": [1, 2, 3] }));
    assert!(messages(&result.logs, "2").contains(&"Request successful (200)"));
}

#[tokio::test]
async fn test_api_error_status_fails_run() {
    let addr = spawn_api().await;

    let mut workflow = Workflow::new("Broken");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Api, "Call").with_config("url", format!("http://{}/broken", addr)),
    );
    workflow.push_node(WorkflowNode::new("3", NodeType::Action, "Never"));
    workflow.connect("1", "2");
    workflow.connect("2", "3");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.executed_nodes, 2);

    let error = result
        .logs
        .iter()
        .find(|l| l.node_id == "2" && l.status == LogStatus::Error)
        .unwrap();
    assert_eq!(
        error.message.as_deref(),
        Some("API call failed: HTTP 500: database down")
    );
    let tail: Vec<_> = result.logs[result.logs.len() - 3..]
        .iter()
        .map(|l| (l.node_id.as_str(), l.status, l.message.clone()))
        .collect();
    assert_eq!(
        tail,
        vec![
            ("2", LogStatus::Error, error.message.clone()),
            ("1", LogStatus::Error, error.message.clone()),
            ("system", LogStatus::Error, error.message.clone()),
        ]
    );
    assert!(result.logs.iter().all(|l| l.node_id != "3"));
}

#[tokio::test]
async fn test_api_missing_url() {
    let mut workflow = Workflow::new("No url");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(WorkflowNode::new("2", NodeType::Api, "Call").with_config("method", "GET"));
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(
        result.logs.last().and_then(|l| l.message.as_deref()),
        Some("API URL is required")
    );
}

#[tokio::test]
async fn test_api_invalid_headers() {
    let mut workflow = Workflow::new("Bad headers");
    workflow.push_node(WorkflowNode::new("1", NodeType::Trigger, "Start"));
    workflow.push_node(
        WorkflowNode::new("2", NodeType::Api, "Call")
            .with_config("url", "http://127.0.0.1:1/unused")
            .with_config("headers", "{oops"),
    );
    workflow.connect("1", "2");

    let result = run(&workflow, ExecutionContext::new()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(
        result.logs.last().and_then(|l| l.message.as_deref()),
        Some("API call failed: Invalid headers JSON format")
    );
}

#[tokio::test]
async fn test_approval_template_runs() {
    let draft = wfcore::templates::workflow_templates().remove(1);
    let workflow = Workflow::from_draft(draft);

    let result = run(&workflow, ExecutionContext::new().with("status", "approved")).await;

    // `status` is not a context variable, so the comparison is literal text.
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.executed_nodes, 3);
    assert!(result.logs.iter().any(|l| l.node_id == "4"));
    assert!(result.logs.iter().all(|l| l.node_id != "3"));
}

#[test]
fn test_standard_registry_covers_every_type() {
    let registry = registry();

    assert_eq!(registry.list_node_types(), NodeType::ALL.to_vec());
    for node_type in NodeType::ALL {
        assert!(!registry.description(node_type).unwrap_or_default().is_empty());
    }
}

#[tokio::test]
async fn test_handlers_stop_when_already_cancelled() {
    let token = CancellationToken::new();
    token.cancel();
    let book = ExecutionLogBook::new(None);

    let delay = WorkflowNode::new("d", NodeType::Delay, "Wait").with_config("duration", 1);
    let ctx = NodeContext::for_node(
        &delay,
        ExecutionContext::new(),
        book.emitter("d", "Wait"),
        token.clone(),
    );
    let err = DelayNode::default().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Cancelled));

    let api = WorkflowNode::new("a", NodeType::Api, "Call")
        .with_config("url", "http://127.0.0.1:9/unreachable");
    let ctx = NodeContext::for_node(&api, ExecutionContext::new(), book.emitter("a", "Call"), token);
    let err = ApiNode::new().execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::Cancelled));

    // Neither handler got as far as logging its work.
    assert!(book.entries().await.is_empty());
}
