use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;

use crate::types::{McpError, PropertyRule, Resource, SchemaMeta, SchemaRequirementSet, Tool};

/// Load tool definitions from a JSON file on disk.
pub fn load_tools(path: impl AsRef<Path>) -> Result<Vec<Tool>, McpError> {
    let data = std::fs::read(path)?;
    parse_tools(&data)
}

/// Parse tool definitions from raw JSON bytes.
///
/// Tool names must be unique within one catalogue.
pub fn parse_tools(data: &[u8]) -> Result<Vec<Tool>, McpError> {
    let raw: Vec<Value> = serde_json::from_slice(data)?;
    let mut tools = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();

    for val in raw {
        let name = val["name"].as_str().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(McpError::Catalog("tool definition without a name".into()));
        }
        if !seen.insert(name.clone()) {
            return Err(McpError::Catalog(format!("duplicate tool name: {}", name)));
        }
        let description = val["description"].as_str().unwrap_or_default().to_string();
        let input_schema = val["inputSchema"].clone();

        // Parse schema metadata for validation.
        let schema_meta = parse_schema_meta(&input_schema);

        tools.push(Tool {
            name,
            description,
            input_schema,
            schema_meta,
        });
    }

    Ok(tools)
}

/// Load resource definitions from a JSON file on disk.
pub fn load_resources(path: impl AsRef<Path>) -> Result<Vec<Resource>, McpError> {
    let data = std::fs::read(path)?;
    parse_resources(&data)
}

/// Parse resource definitions from raw JSON bytes.
///
/// Both names and URIs must be unique.
pub fn parse_resources(data: &[u8]) -> Result<Vec<Resource>, McpError> {
    let resources: Vec<Resource> = serde_json::from_slice(data)?;
    let mut names = HashSet::new();
    let mut uris = HashSet::new();
    for r in &resources {
        if !names.insert(r.name.as_str()) {
            return Err(McpError::Catalog(format!("duplicate resource name: {}", r.name)));
        }
        if !uris.insert(r.uri.as_str()) {
            return Err(McpError::Catalog(format!("duplicate resource uri: {}", r.uri)));
        }
    }
    Ok(resources)
}

/// Extract validation metadata from a JSON Schema object.
fn parse_schema_meta(schema: &Value) -> SchemaMeta {
    let mut meta = SchemaMeta::default();

    if let Some(arr) = schema.get("required").and_then(|v| v.as_array()) {
        meta.required = string_list(arr);
    }

    if let Some(obj) = schema.get("properties").and_then(|v| v.as_object()) {
        meta.properties = obj
            .iter()
            .map(|(key, prop)| (key.clone(), parse_property(prop)))
            .collect();
    }

    if let Some(arr) = schema.get("oneOf").and_then(|v| v.as_array()) {
        meta.one_of = arr
            .iter()
            .filter_map(|v| {
                v.get("required")
                    .and_then(|r| r.as_array())
                    .map(|reqs| SchemaRequirementSet {
                        required: string_list(reqs),
                    })
            })
            .collect();
    }

    if let Some(obj) = schema.get("dependencies").and_then(|v| v.as_object()) {
        let mut deps = HashMap::new();
        for (key, val) in obj {
            if let Some(arr) = val.as_array() {
                deps.insert(key.clone(), string_list(arr));
            }
        }
        meta.dependencies = deps;
    }

    meta
}

fn parse_property(prop: &Value) -> PropertyRule {
    PropertyRule {
        kind: prop.get("type").and_then(|v| v.as_str()).map(String::from),
        enum_values: prop.get("enum").and_then(|v| v.as_array()).cloned(),
        minimum: prop.get("minimum").and_then(|v| v.as_f64()),
        maximum: prop.get("maximum").and_then(|v| v.as_f64()),
        items_kind: prop
            .get("items")
            .and_then(|i| i.get("type"))
            .and_then(|v| v.as_str())
            .map(String::from),
    }
}

fn string_list(arr: &[Value]) -> Vec<String> {
    arr.iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}
