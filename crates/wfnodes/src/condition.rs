use async_trait::async_trait;
use serde_json::Value;
use wfcore::config::{is_truthy, ConditionConfig};
use wfcore::{ExecutionContext, NodeContext, NodeError, NodeHandler, NodeType};

/// Branch point: evaluates a one-operator expression against the context.
///
/// Supported forms are `<left> > <number>` and `<left> == <text>`, where the
/// only variable is `value`. Anything else passes. Evaluation errors never
/// fail the run; they produce `false`.
pub struct ConditionNode;

#[async_trait]
impl NodeHandler for ConditionNode {
    fn node_type(&self) -> NodeType {
        NodeType::Condition
    }

    fn description(&self) -> &str {
        "Chooses the true or false branch"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<ExecutionContext, NodeError> {
        let config = ConditionConfig::from_config(&ctx.config);

        let result = evaluate_condition(&config.expression, &ctx.input).unwrap_or_else(|e| {
            tracing::warn!("Condition evaluation error in node {}: {}", ctx.node_id, e);
            false
        });

        Ok(ctx
            .input
            .with("conditionResult", result)
            .with("conditionExpression", config.expression))
    }
}

/// Evaluate `expression` against `context`.
pub fn evaluate_condition(expression: &Value, context: &ExecutionContext) -> Result<bool, String> {
    let expression = match expression {
        Value::String(s) => s.as_str(),
        other if !is_truthy(other) => "",
        other => return Err(format!("condition must be a string, got {}", other)),
    };

    if expression.contains('>') {
        let mut parts = expression.split('>').map(str::trim);
        let left = parts.next().unwrap_or_default();
        let right = parts.next().unwrap_or_default();

        let left = resolve(left, context).as_number();
        let right = parse_float(right);
        return Ok(left > right);
    }

    if expression.contains("==") {
        let mut parts = expression.split("==").map(str::trim);
        let left = parts.next().unwrap_or_default();
        let right: String = parts
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| *c != '\'' && *c != '"')
            .collect();

        return Ok(match resolve(left, context) {
            Operand::Text(text) => text == right,
            other => other.as_number() == to_number(&right),
        });
    }

    Ok(true)
}

enum Operand {
    Number(f64),
    Text(String),
    Opaque,
}

impl Operand {
    fn as_number(&self) -> f64 {
        match self {
            Operand::Number(n) => *n,
            Operand::Text(s) => to_number(s),
            Operand::Opaque => f64::NAN,
        }
    }
}

/// `value` reads the context (missing or falsy means 0); any other token is
/// taken literally.
fn resolve(token: &str, context: &ExecutionContext) -> Operand {
    if token != "value" {
        return Operand::Text(token.to_string());
    }
    match context.get("value") {
        Some(v) if !is_truthy(v) => Operand::Number(0.0),
        None => Operand::Number(0.0),
        Some(Value::Number(n)) => Operand::Number(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::Bool(true)) => Operand::Number(1.0),
        Some(Value::String(s)) => Operand::Text(s.clone()),
        Some(_) => Operand::Opaque,
    }
}

/// Whole-string numeric conversion: blank is 0, junk is NaN.
fn to_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(inf) = parse_infinity(s) {
        return if s.len() == inf.1 { inf.0 } else { f64::NAN };
    }
    if s.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Longest numeric prefix, ignoring leading whitespace; NaN if there is none.
fn parse_float(raw: &str) -> f64 {
    let s = raw.trim_start();
    if let Some((inf, _)) = parse_infinity(s) {
        return inf;
    }
    let candidate_len = s
        .find(|c: char| !matches!(c, '0'..='9' | '.' | 'e' | 'E' | '+' | '-'))
        .unwrap_or(s.len());
    (1..=candidate_len)
        .rev()
        .find_map(|end| s[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_infinity(s: &str) -> Option<(f64, usize)> {
    [("Infinity", f64::INFINITY), ("+Infinity", f64::INFINITY), ("-Infinity", f64::NEG_INFINITY)]
        .into_iter()
        .find(|(prefix, _)| s.starts_with(prefix))
        .map(|(prefix, value)| (value, prefix.len()))
}
