//! GraphQL Protocol Adapter (§4.9.3).
//!
//! No GraphQL execution happens in this adapter — the gateway only depth-
//! and complexity-guards the incoming query text before forwarding it
//! upstream unchanged, matching the spec's proxy (not execution) scope.

use crate::error::{GatewayError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
}

/// Count nested `{ }` depth, ignoring braces inside strings or `#` line
/// comments, and reject if it exceeds `max_depth`.
pub fn check_depth(query: &str, max_depth: u32) -> Result<()> {
    let mut depth: u32 = 0;
    let mut max_seen: u32 = 0;
    let mut in_string = false;
    let mut in_comment = false;
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => in_comment = true,
            '{' if !in_string => {
                depth += 1;
                max_seen = max_seen.max(depth);
            }
            '}' if !in_string => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if max_seen > max_depth {
        return Err(GatewayError::Validation(format!("GTW011: query depth {max_seen} exceeds limit {max_depth}")));
    }
    Ok(())
}

/// Heuristic complexity: count selected-field-like identifiers (tokens
/// immediately before `{` or on their own line inside a selection set).
pub fn check_complexity(query: &str, max_fields: u32) -> Result<()> {
    let field_count = query
        .split(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | ','))
        .filter(|tok| !tok.is_empty() && tok.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
        .count() as u32;
    if field_count > max_fields {
        return Err(GatewayError::Validation(format!("GTW011: query field count {field_count} exceeds limit {max_fields}")));
    }
    Ok(())
}

pub fn is_subscription(query: &str) -> bool {
    query.trim_start().starts_with("subscription")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deeply_nested_query_is_rejected() {
        let query = "{ a { b { c { d } } } }";
        assert!(check_depth(query, 2).is_err());
        assert!(check_depth(query, 10).is_ok());
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let query = r#"{ a(filter: "{not a brace}") }"#;
        assert!(check_depth(query, 1).is_ok());
    }

    #[test]
    fn subscription_operations_are_detected() {
        assert!(is_subscription("subscription { onMessage }"));
        assert!(!is_subscription("query { messages }"));
    }
}
