//! Endpoint validation schema (§4.10 step 10): type/min/max/format/enum,
//! applied recursively to JSON bodies, GraphQL variables, or (via the SOAP
//! adapter's own element-presence check) SOAP body children.

use crate::error::{GatewayError, Result};
use serde_json::Value;

pub fn validate(schema: &Value, body: &Value) -> Result<()> {
    validate_node(schema, body, "$")
}

fn validate_node(schema: &Value, value: &Value, path: &str) -> Result<()> {
    let Some(obj) = schema.as_object() else { return Ok(()) };

    if let Some(ty) = obj.get("type").and_then(Value::as_str) {
        if !matches_type(ty, value) {
            return Err(err(path, &format!("expected type `{ty}`")));
        }
    }

    if let Some(min) = obj.get("min").and_then(Value::as_f64) {
        if let Some(n) = value.as_f64() {
            if n < min {
                return Err(err(path, &format!("must be >= {min}")));
            }
        }
    }
    if let Some(max) = obj.get("max").and_then(Value::as_f64) {
        if let Some(n) = value.as_f64() {
            if n > max {
                return Err(err(path, &format!("must be <= {max}")));
            }
        }
    }

    if let Some(format) = obj.get("format").and_then(Value::as_str) {
        if let Some(s) = value.as_str() {
            if !matches_format(format, s) {
                return Err(err(path, &format!("does not match format `{format}`")));
            }
        }
    }

    if let Some(allowed) = obj.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(err(path, "not one of the allowed enum values"));
        }
    }

    if let Some(required) = obj.get("required").and_then(Value::as_array) {
        if let Some(body_obj) = value.as_object() {
            for field in required.iter().filter_map(Value::as_str) {
                if !body_obj.contains_key(field) {
                    return Err(err(path, &format!("missing required field `{field}`")));
                }
            }
        }
    }

    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
        if let Some(body_obj) = value.as_object() {
            for (key, sub_schema) in properties {
                if let Some(sub_value) = body_obj.get(key) {
                    validate_node(sub_schema, sub_value, &format!("{path}.{key}"))?;
                }
            }
        }
    }

    if let Some(items_schema) = obj.get("array_items") {
        if let Some(array) = value.as_array() {
            for (i, item) in array.iter().enumerate() {
                validate_node(items_schema, item, &format!("{path}[{i}]"))?;
            }
        }
    }

    Ok(())
}

fn matches_type(ty: &str, value: &Value) -> bool {
    match ty {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn matches_format(format: &str, s: &str) -> bool {
    match format {
        "email" => s.contains('@') && s.split('@').count() == 2,
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    }
}

fn err(path: &str, msg: &str) -> GatewayError {
    GatewayError::Validation(format!("GTW011: {path} {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_value_outside_min_max() {
        let schema = json!({"type": "number", "min": 1, "max": 10});
        assert!(validate(&schema, &json!(5)).is_ok());
        assert!(validate(&schema, &json!(11)).is_err());
    }

    #[test]
    fn nested_property_schema_applies_recursively() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        });
        assert!(validate(&schema, &json!({"name": "alice"})).is_ok());
        assert!(validate(&schema, &json!({})).is_err());
        assert!(validate(&schema, &json!({"name": 42})).is_err());
    }

    #[test]
    fn enum_constraint_rejects_unlisted_values() {
        let schema = json!({"enum": ["a", "b"]});
        assert!(validate(&schema, &json!("a")).is_ok());
        assert!(validate(&schema, &json!("z")).is_err());
    }
}
