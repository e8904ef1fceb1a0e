//! Workflow exchange format: the workflow's own JSON plus a `version` tag.

use crate::workflow::iso_millis;
use crate::Workflow;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Serialize)]
struct ExportedWorkflow<'a> {
    #[serde(flatten)]
    workflow: &'a Workflow,
    version: &'a str,
}

/// Pretty-printed export document.
pub fn export_workflow(workflow: &Workflow) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportedWorkflow {
        workflow,
        version: EXPORT_VERSION,
    })
}

/// Structural check applied before an import is attempted.
pub fn validate_workflow_json(json: &Value) -> bool {
    let Some(obj) = json.as_object() else {
        return false;
    };
    let is_str = |key: &str| obj.get(key).is_some_and(Value::is_string);
    let is_array = |key: &str| obj.get(key).is_some_and(Value::is_array);

    is_str("id")
        && is_str("name")
        && is_str("description")
        && is_array("nodes")
        && is_array("edges")
        && obj.get("isActive").is_some_and(Value::is_boolean)
        && is_str("version")
}

/// Parse an export document. Any problem yields `None`.
pub fn import_workflow(raw: &str) -> Option<Workflow> {
    let json: Value = match serde_json::from_str(raw) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to import workflow: {}", e);
            return None;
        }
    };
    if !validate_workflow_json(&json) {
        tracing::warn!("Failed to import workflow: invalid workflow format");
        return None;
    }
    for key in ["createdAt", "updatedAt"] {
        let parsed = json.get(key).and_then(Value::as_str).and_then(iso_millis::parse);
        if parsed.is_none() {
            tracing::warn!("Failed to import workflow: invalid {}", key);
            return None;
        }
    }

    serde_json::from_value(json)
        .map_err(|e| tracing::warn!("Failed to import workflow: {}", e))
        .ok()
}

/// Download name: lower-cased, whitespace runs become `-`, plus a timestamp.
pub fn export_file_name(workflow: &Workflow) -> String {
    let mut slug = String::with_capacity(workflow.name.len());
    let mut in_space = false;
    for c in workflow.name.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.extend(c.to_lowercase());
            in_space = false;
        }
    }
    format!("{}-{}.json", slug, Utc::now().timestamp_millis())
}
