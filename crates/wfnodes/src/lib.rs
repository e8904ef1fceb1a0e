//! Standard node library
//!
//! One handler per workflow node type

mod action;
mod api;
mod condition;
mod delay;
mod notification;
mod trigger;

pub use action::ActionNode;
pub use api::ApiNode;
pub use condition::{evaluate_condition, ConditionNode};
pub use delay::DelayNode;
pub use notification::NotificationNode;
pub use trigger::TriggerNode;

use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use wfcore::NodeType;
use wfruntime::{HandlerRegistry, RuntimeConfig};

/// Register the handler for every node type with a registry
pub fn register_all(registry: &mut HandlerRegistry, config: &RuntimeConfig) {
    let notification = Arc::new(NotificationNode);

    registry.register(Arc::new(TriggerNode));
    registry.register(Arc::new(ActionNode));
    registry.register(Arc::new(ConditionNode));
    registry.register(Arc::new(DelayNode::new(config.max_delay_ms)));
    registry.register(notification.clone());
    registry.register_as(NodeType::Email, notification);
    registry.register(Arc::new(ApiNode::with_timeout(config.http_timeout())));
}

/// Registry holding every standard handler
pub fn standard_registry(config: &RuntimeConfig) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_all(&mut registry, config);
    registry
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
