//! Typed views over a node's free-form `config` bag.
//!
//! Workflows arrive from a visual editor, so a setting that is missing,
//! `null`, `false`, `0` or `""` means "use the default".

use crate::{NodeError, NodeType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound applied to delay nodes unless the runtime overrides it.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Per-type configuration, parsed from the node's config bag.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Trigger(TriggerConfig),
    Action,
    Condition(ConditionConfig),
    Delay(DelayConfig),
    Notification(NotificationConfig),
    Api(ApiConfig),
}

impl NodeConfig {
    pub fn parse(node_type: NodeType, config: &Map<String, Value>) -> Result<Self, NodeError> {
        Ok(match node_type {
            NodeType::Trigger => NodeConfig::Trigger(TriggerConfig::from_config(config)),
            NodeType::Action => NodeConfig::Action,
            NodeType::Condition => NodeConfig::Condition(ConditionConfig::from_config(config)),
            NodeType::Delay => NodeConfig::Delay(DelayConfig::from_config(config)),
            NodeType::Notification | NodeType::Email => {
                NodeConfig::Notification(NotificationConfig::from_config(config))
            }
            NodeType::Api => NodeConfig::Api(ApiConfig::from_config(config)?),
        })
    }
}

/// JavaScript truthiness, which is what the editor's defaults are built on.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn setting<'a>(config: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    config.get(key).filter(|v| is_truthy(v))
}

fn text_or(config: &Map<String, Value>, key: &str, default: &str) -> String {
    match setting(config, key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    pub trigger_type: String,
}

impl TriggerConfig {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        Self {
            trigger_type: text_or(config, "triggerType", "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionConfig {
    /// The configured expression as given; usually a string such as
    /// `"value > 100"`. Falsy settings collapse to `""`.
    pub expression: Value,
}

impl ConditionConfig {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        Self {
            expression: setting(config, "condition")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayConfig {
    /// Duration as written in the config, used for log messages.
    pub duration_label: String,
    /// Numeric duration; NaN when the setting is not a number.
    pub duration: f64,
    pub unit: String,
}

impl DelayConfig {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        let (duration_label, duration) = match setting(config, "duration") {
            Some(Value::Number(n)) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                // f64 display drops a zero fraction: 10.0 reads "10"
                (f.to_string(), f)
            }
            Some(Value::String(s)) => (s.clone(), s.trim().parse::<f64>().unwrap_or(f64::NAN)),
            Some(other) => (other.to_string(), f64::NAN),
            None => ("1".to_string(), 1.0),
        };
        Self {
            duration_label,
            duration,
            unit: text_or(config, "unit", "seconds"),
        }
    }

    /// Milliseconds per unit; anything unrecognised counts as seconds.
    fn unit_ms(&self) -> f64 {
        match self.unit.as_str() {
            "minutes" => 60_000.0,
            "hours" => 3_600_000.0,
            "days" => 86_400_000.0,
            _ => 1_000.0,
        }
    }

    /// Requested wait, before clamping.
    pub fn requested_ms(&self) -> f64 {
        self.duration * self.unit_ms()
    }

    /// The wait actually honoured: `[0, max_ms]`, non-numeric durations wait 0.
    pub fn effective(&self, max_ms: u64) -> Duration {
        let requested = self.requested_ms();
        if requested.is_nan() || requested <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_millis(requested.min(max_ms as f64) as u64)
    }

    /// Human description, e.g. `"10 minutes"`.
    pub fn describe(&self) -> String {
        format!("{} {}", self.duration_label, self.unit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    pub channel: String,
    pub message: String,
}

impl NotificationConfig {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        Self {
            channel: text_or(config, "channel", "email"),
            message: text_or(config, "message", "Notification sent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Request payload; only ever set for POST, PUT and PATCH.
    pub body: Option<Value>,
}

impl ApiConfig {
    /// Fails with [`NodeError::MissingUrl`] before looking at anything else,
    /// then with the header/body JSON errors.
    pub fn from_config(config: &Map<String, Value>) -> Result<Self, NodeError> {
        let url = text_or(config, "url", "");
        if url.trim().is_empty() {
            return Err(NodeError::MissingUrl);
        }
        let method = text_or(config, "method", "GET").to_uppercase();

        let headers = match setting(config, "headers") {
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => header_pairs(&map),
                _ => return Err(NodeError::InvalidHeaders),
            },
            Some(Value::Object(map)) => header_pairs(map),
            _ => BTreeMap::new(),
        };

        let sends_body = matches!(method.as_str(), "POST" | "PUT" | "PATCH");
        let body = match setting(config, "body") {
            Some(Value::String(raw)) if sends_body => {
                let parsed: Value =
                    serde_json::from_str(raw).map_err(|_| NodeError::InvalidBody)?;
                Some(parsed).filter(is_truthy)
            }
            Some(value @ (Value::Object(_) | Value::Array(_))) if sends_body => Some(value.clone()),
            _ => None,
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

fn header_pairs(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}
