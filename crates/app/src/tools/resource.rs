use std::sync::Arc;

use mcp_scaffold::{json_result, text_result, McpError, Server, ToolResult, TypedToolHandler};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::Deps;
use crate::resource_api::ListFilter;

#[derive(Debug, Deserialize)]
struct ResourceIdArgs {
    #[serde(rename = "resourceId")]
    resource_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    name: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(flatten)]
    changes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteArgs {
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(default)]
    confirm: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<u32>,
}

pub fn register(srv: &mut Server, deps: Arc<Deps>) {
    let d = deps.clone();
    srv.handle_tool("list-resources", TypedToolHandler::new(move |args: ListFilter| {
        let deps = d.clone();
        async move { handle_list(&deps, args).await }
    }));

    let d = deps.clone();
    srv.handle_tool("get-resource", TypedToolHandler::new(move |args: ResourceIdArgs| {
        let deps = d.clone();
        async move { handle_get(&deps, args).await }
    }));

    let d = deps.clone();
    srv.handle_tool("create-resource", TypedToolHandler::new(move |args: CreateArgs| {
        let deps = d.clone();
        async move { handle_create(&deps, args).await }
    }));

    let d = deps.clone();
    srv.handle_tool("update-resource", TypedToolHandler::new(move |args: UpdateArgs| {
        let deps = d.clone();
        async move { handle_update(&deps, args).await }
    }));

    let d = deps.clone();
    srv.handle_tool("delete-resource", TypedToolHandler::new(move |args: DeleteArgs| {
        let deps = d.clone();
        async move { handle_delete(&deps, args).await }
    }));

    let d = deps.clone();
    srv.handle_tool("search-resources", TypedToolHandler::new(move |args: SearchArgs| {
        let deps = d.clone();
        async move { handle_search(&deps, args).await }
    }));

    let d = deps;
    srv.handle_tool("clear-cache", TypedToolHandler::new(move |_: Map<String, Value>| {
        let deps = d.clone();
        async move {
            deps.resources.clear_cache();
            Ok(text_result("cache cleared"))
        }
    }));
}

async fn handle_list(deps: &Deps, filter: ListFilter) -> Result<ToolResult, McpError> {
    let response = deps.resources.list(&filter).await?;
    let items = items_of(&response);
    json_result(&json!({
        "resources": items,
        "count": items.len(),
        "filters": filter,
    }))
}

async fn handle_get(deps: &Deps, args: ResourceIdArgs) -> Result<ToolResult, McpError> {
    let id = required_id(&args.resource_id)?;
    let resource = deps.resources.get(id).await?;
    json_result(&resource)
}

async fn handle_create(deps: &Deps, args: CreateArgs) -> Result<ToolResult, McpError> {
    if args.name.trim().is_empty() {
        return Err(McpError::InvalidArguments("name must not be empty".into()));
    }
    let mut body = args.fields;
    body.insert("name".into(), Value::String(args.name));
    let created = deps.resources.create(&body).await?;
    json_result(&created)
}

async fn handle_update(deps: &Deps, args: UpdateArgs) -> Result<ToolResult, McpError> {
    let id = required_id(&args.resource_id)?;
    let updated = deps.resources.update(id, &args.changes).await?;
    json_result(&updated)
}

async fn handle_delete(deps: &Deps, args: DeleteArgs) -> Result<ToolResult, McpError> {
    let id = required_id(&args.resource_id)?;
    if args.confirm != Some(true) {
        return Err(McpError::InvalidArguments(
            "deletion requires confirm: true".into(),
        ));
    }
    deps.resources.delete(id).await?;
    json_result(&json!({ "resourceId": id, "deleted": true }))
}

async fn handle_search(deps: &Deps, args: SearchArgs) -> Result<ToolResult, McpError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(McpError::InvalidArguments("query must not be empty".into()));
    }

    let tags = args.tags.unwrap_or_default();
    let response = deps.resources.search(query, args.limit).await?;
    let matches: Vec<&Value> = items_of(&response)
        .into_iter()
        .filter(|item| matches_status(item, args.status.as_deref()))
        .filter(|item| shares_tag(item, &tags))
        .collect();

    json_result(&json!({
        "query": query,
        "filters": {
            "status": args.status,
            "tags": tags,
        },
        "count": matches.len(),
        "resources": matches,
    }))
}

fn required_id(id: &str) -> Result<&str, McpError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(McpError::InvalidArguments("resourceId must not be empty".into()));
    }
    Ok(id)
}

/// Items of an upstream collection response: a bare array, or an object
/// wrapping one under `resources`, `data` or `items`.
pub(crate) fn items_of(response: &Value) -> Vec<&Value> {
    let list = match response {
        Value::Array(items) => Some(items),
        Value::Object(obj) => ["resources", "data", "items"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|items| items.iter().collect()).unwrap_or_default()
}

fn matches_status(item: &Value, status: Option<&str>) -> bool {
    match status {
        Some(status) => item.get("status").and_then(Value::as_str) == Some(status),
        None => true,
    }
}

fn shares_tag(item: &Value, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    item.get("tags")
        .and_then(Value::as_array)
        .is_some_and(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .any(|t| wanted.iter().any(|w| w == t))
        })
}
