use std::collections::BTreeMap;
use std::sync::Arc;

use mcp_scaffold::{FnResourceHandler, McpError, Server};
use serde::Serialize;
use serde_json::{json, Value};

use crate::resource_api::ListFilter;
use crate::tools::resource::items_of;
use crate::tools::Deps;

/// Public description of the upstream binding. Never carries the API key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBinding {
    pub base_url: String,
    pub authenticated: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: Option<usize>,
    pub rate_limit: u32,
}

pub fn register(srv: &mut Server, deps: Arc<Deps>) {
    let d = deps.clone();
    srv.handle_resource("api-config", FnResourceHandler::new(move || {
        let deps = d.clone();
        async move { Ok::<_, McpError>(serde_json::to_string_pretty(&deps.api_binding)?) }
    }));

    let d = deps;
    srv.handle_resource("resource-summary", FnResourceHandler::new(move || {
        let deps = d.clone();
        async move { resource_summary(&deps).await }
    }));
}

async fn resource_summary(deps: &Deps) -> Result<String, McpError> {
    let response = deps.resources.list(&ListFilter::default()).await?;
    let items = items_of(&response);

    let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &items {
        let status = item.get("status").and_then(Value::as_str).unwrap_or("unknown");
        *by_status.entry(status).or_default() += 1;
    }

    Ok(serde_json::to_string_pretty(&json!({
        "total": items.len(),
        "byStatus": by_status,
    }))?)
}
