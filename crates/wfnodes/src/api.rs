use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use wfcore::config::ApiConfig;
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

/// Calls an arbitrary HTTP endpoint described by the node's config
pub struct ApiNode {
    client: reqwest::Client,
}

impl ApiNode {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }

    async fn call(&self, ctx: &NodeContext, config: &ApiConfig) -> Result<Value, NodeError> {
        ctx.check_cancelled()?;
        let method = Method::from_bytes(config.method.as_bytes())
            .map_err(|_| NodeError::Configuration(format!("Unsupported method: {}", config.method)))?;

        ctx.log
            .running(format!("Making {} request to {}", config.method, config.url))
            .await;

        let mut request = self.client.request(method, &config.url);
        let mut has_content_type = false;
        for (name, value) in &config.headers {
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &config.body {
            if !has_content_type {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body.to_string());
        }

        tracing::debug!(
            "API request from node {}: {} {} (body: {})",
            ctx.node_id,
            config.method,
            config.url,
            config.body.is_some()
        );

        let response = tokio::select! {
            sent = request.send() => sent.map_err(|e| NodeError::ExecutionFailed(e.to_string()))?,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let data = read_body(response, is_json).await;

        tracing::debug!("API response for node {}: {}", ctx.node_id, status);

        // Async-accept APIs (e.g. mail senders) answer 202 on success.
        if !(status.is_success() || status == StatusCode::ACCEPTED) {
            return Err(NodeError::HttpStatus {
                status: status.as_u16(),
                body: render(&data),
            });
        }

        let message = if status == StatusCode::ACCEPTED {
            "Email queued for sending (202 Accepted)".to_string()
        } else {
            format!("Request successful ({})", status.as_u16())
        };
        ctx.log
            .success(
                message,
                json!({
                    "status": status.as_u16(),
                    "statusText": status_text,
                    "response": data,
                }),
            )
            .await;

        Ok(json!({
            "status": status.as_u16(),
            "statusText": status_text,
            "data": data,
        }))
    }
}

impl Default for ApiNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeHandler for ApiNode {
    fn node_type(&self) -> NodeType {
        NodeType::Api
    }

    fn description(&self) -> &str {
        "Makes an HTTP request"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let config = ApiConfig::from_config(&ctx.config).map_err(|e| match e {
            NodeError::MissingUrl => e,
            other => NodeError::api_call(other),
        })?;

        let api_response = self.call(&ctx, &config).await.map_err(|e| match e {
            NodeError::Cancelled => e,
            other => NodeError::api_call(other),
        })?;

        Ok(ctx.input.with("apiResponse", api_response))
    }
}

async fn read_body(response: reqwest::Response, is_json: bool) -> Value {
    let placeholder = || json!({ "message": "No response body" });
    match response.text().await {
        Ok(text) if is_json => serde_json::from_str(&text).unwrap_or_else(|_| placeholder()),
        Ok(text) => Value::String(text),
        Err(_) => placeholder(),
    }
}

/// Body as it appears in error messages: strings verbatim, JSON pretty-printed.
fn render(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
