pub mod calculator;
pub mod resource;
pub mod weather;

use std::sync::Arc;

use crate::resource_api::ResourceApi;
use crate::resources::ApiBinding;

/// Shared dependencies for all tool and resource handlers.
pub struct Deps {
    pub resources: Arc<dyn ResourceApi>,
    pub api_binding: ApiBinding,
}

/// Register all tool handlers on the given MCP server.
pub fn register_all(srv: &mut mcp_scaffold::Server, deps: Arc<Deps>) {
    calculator::register(srv);
    weather::register(srv);
    resource::register(srv, deps);
}
