//! `mcp_scaffold`: building blocks for MCP (Model Context Protocol) servers.
//!
//! Implements the MCP 2025-03-26 protocol as a transport-agnostic handler.
//! Tools and resources are declared in JSON catalogues, handlers are
//! registered by name, and requests arrive either over stdio
//! ([`serve_stdio`]) or HTTP ([`http_router`]). An [`ApiClient`] with a
//! read-through [`TtlCache`] is provided for tools that front a REST API.
//!
//! # Quick start
//!
//! ```rust
//! use mcp_scaffold::{Server, FnToolHandler, text_result, JsonRpcRequest};
//! use serde_json::Value;
//!
//! # async fn example() {
//! let mut server = Server::builder()
//!     .tools_json(r#"[{"name":"echo","description":"echoes","inputSchema":{"type":"object","properties":{"message":{"type":"string"}},"required":["message"]}}]"#.as_bytes())
//!     .server_info("my-server", "0.1.0")
//!     .build();
//!
//! server.handle_tool("echo", FnToolHandler::new(|args: Value| async move {
//!     let msg = args.get("message").and_then(|v| v.as_str()).unwrap_or("");
//!     Ok(text_result(msg))
//! }));
//!
//! let req: JsonRpcRequest = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
//! let resp = server.handle(req).await;
//! let json = serde_json::to_string(&resp).unwrap();
//! # }
//! ```

pub mod api_client;
pub mod cache;
pub mod loader;
pub mod server;
pub mod transport_http;
pub mod transport_stdio;
pub mod types;
mod validate;

// Re-export the most commonly used items at the crate root.
pub use api_client::{ApiClient, ApiClientConfig, ApiError, QueryParam};
pub use cache::TtlCache;
pub use loader::{load_resources, load_tools, parse_resources, parse_tools};
pub use server::{
    FnResourceHandler, FnToolHandler, ResourceHandler, Server, ServerBuilder, ToolHandler,
    TypedToolHandler,
};
pub use transport_http::http_router;
pub use transport_stdio::{serve_lines, serve_stdio};
pub use types::{
    error_result, json_result, new_error_response, new_failure_response, text_result,
    ContentBlock, JsonRpcRequest, JsonRpcResponse, McpError, Resource, ResourceContent, RpcError,
    Tool, ToolResult, PROTOCOL_VERSION,
};
