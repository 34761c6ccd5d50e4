use serde_json::Value;

use crate::types::{PropertyRule, Tool};

impl Tool {
    /// Validate arguments against the tool's input schema metadata.
    ///
    /// A `null` value counts as absent.
    pub fn validate_arguments(&self, args: &Value) -> Result<(), String> {
        let obj = match args {
            Value::Object(obj) => obj,
            other => {
                return Err(format!(
                    "arguments must be an object, got {}",
                    type_name(other)
                ));
            }
        };
        let meta = &self.schema_meta;
        let present = |f: &str| obj.get(f).is_some_and(|v| !v.is_null());

        // Check required fields.
        for field in &meta.required {
            if !present(field) {
                return Err(format!("missing required field \"{}\"", field));
            }
        }

        // Check declared property constraints.
        for (field, value) in obj {
            if value.is_null() {
                continue;
            }
            if let Some(rule) = meta.properties.get(field) {
                check_property(field, value, rule)?;
            }
        }

        // Check oneOf: at least one set of required fields must be satisfied.
        if !meta.one_of.is_empty() {
            let satisfied = meta
                .one_of
                .iter()
                .any(|set| set.required.iter().all(|f| present(f)));
            if !satisfied {
                return Err("arguments must satisfy oneOf requirements".into());
            }
        }

        // Check dependencies: if field A is present, fields B must also be present.
        for (field, deps) in &meta.dependencies {
            if present(field) {
                for dep in deps {
                    if !present(dep) {
                        return Err(format!(
                            "field \"{}\" requires \"{}\" to also be present",
                            field, dep
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_property(field: &str, value: &Value, rule: &PropertyRule) -> Result<(), String> {
    if let Some(kind) = &rule.kind {
        if !matches_kind(value, kind) {
            return Err(format!(
                "field \"{}\" must be of type {}, got {}",
                field,
                kind,
                type_name(value)
            ));
        }
    }

    if let Some(allowed) = &rule.enum_values {
        if !allowed.contains(value) {
            let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            return Err(format!(
                "field \"{}\" must be one of [{}], got {}",
                field,
                options.join(", "),
                value
            ));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("field \"{}\" must be >= {}, got {}", field, min, n));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("field \"{}\" must be <= {}, got {}", field, max, n));
            }
        }
    }

    if let (Some(items_kind), Some(items)) = (&rule.items_kind, value.as_array()) {
        if let Some((idx, bad)) = items
            .iter()
            .enumerate()
            .find(|(_, item)| !matches_kind(item, items_kind))
        {
            return Err(format!(
                "field \"{}[{}]\" must be of type {}, got {}",
                field,
                idx,
                items_kind,
                type_name(bad)
            ));
        }
    }

    Ok(())
}

fn matches_kind(value: &Value, kind: &str) -> bool {
    match kind {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown types are not enforced.
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
