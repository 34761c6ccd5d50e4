use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api_client::ApiError;

/// JSON-RPC 2.0 error codes.
pub const ERR_CODE_PARSE: i32 = -32700;
pub const ERR_CODE_INVALID_REQ: i32 = -32600;
pub const ERR_CODE_NO_METHOD: i32 = -32601;
pub const ERR_CODE_BAD_PARAMS: i32 = -32602;
pub const ERR_CODE_INTERNAL: i32 = -32603;
/// MCP-specific code for `resources/read` on an unknown resource.
pub const ERR_CODE_RESOURCE_NOT_FOUND: i32 = -32002;

/// MCP Protocol version this server implements.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

// ── Request ──

/// Inbound JSON-RPC 2.0 request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

// ── Response ──

/// JSON-RPC 2.0 response returned by [`Server::handle()`](crate::Server::handle).
///
/// A response with neither `id`, `result` nor `error` is the notification
/// sentinel: transports send no body for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Returns true when this is a notification sentinel (no body needed).
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.result.is_none() && self.error.is_none()
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ── MCP domain types ──

/// MCP tool definition loaded from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// Parsed schema metadata for validation (not serialized to clients).
    #[serde(skip)]
    pub schema_meta: SchemaMeta,
}

/// MCP resource definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    pub description: String,
    pub uri: String,
    pub mime_type: String,
}

/// Tool call result returned by handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Text of the first content block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|b| b.text.as_deref())
    }
}

/// Single content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Resource content returned by resource handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

/// Parsed schema metadata used for argument validation.
#[derive(Debug, Clone, Default)]
pub struct SchemaMeta {
    pub required: Vec<String>,
    pub properties: HashMap<String, PropertyRule>,
    pub one_of: Vec<SchemaRequirementSet>,
    pub dependencies: HashMap<String, Vec<String>>,
}

/// Constraints declared for a single property.
#[derive(Debug, Clone, Default)]
pub struct PropertyRule {
    /// JSON Schema `type` (`string`, `number`, `integer`, `boolean`, `array`, `object`).
    pub kind: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// `items.type` for arrays.
    pub items_kind: Option<String>,
}

/// A set of required fields for oneOf validation.
#[derive(Debug, Clone)]
pub struct SchemaRequirementSet {
    pub required: Vec<String>,
}

// ── Convenience constructors ──

/// Create a simple text tool result.
pub fn text_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock {
            block_type: "text".into(),
            text: Some(text.into()),
        }],
        is_error: false,
    }
}

/// Create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![ContentBlock {
            block_type: "text".into(),
            text: Some(text.into()),
        }],
        is_error: true,
    }
}

/// Create a text tool result holding `value` as pretty-printed JSON.
pub fn json_result<T: Serialize>(value: &T) -> Result<ToolResult, McpError> {
    Ok(text_result(serde_json::to_string_pretty(value)?))
}

/// Build a JSON-RPC error response.
pub fn new_error_response(id: Option<Value>, code: i32, message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data: None,
        }),
    }
}

/// Build a JSON-RPC error response from a dispatch failure.
pub fn new_failure_response(id: Option<Value>, err: &McpError) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: None,
        error: Some(err.to_rpc_error()),
    }
}

/// Build a JSON-RPC success response.
pub fn new_ok_response(id: Option<Value>, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id,
        result: Some(result),
        error: None,
    }
}

/// Build a notification sentinel (empty response, triggers HTTP 202).
pub fn notification_response() -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id: None,
        result: None,
        error: None,
    }
}

/// MCP error type for the crate.
///
/// Every variant is relayed to the caller as a structured error; the
/// dispatcher never lets one escape to the transport.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Raised by a handler for a business-rule failure.
    #[error("tool error: {0}")]
    ToolError(String),
    /// A handler failure, tagged with the operation that produced it.
    #[error("error executing {operation}: {message}")]
    Execution { operation: String, message: String },
    #[error(transparent)]
    Upstream(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed tool or resource catalogue.
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl McpError {
    /// Stable machine-readable kind, carried in the error's `data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::MethodNotFound(_) => "method_not_found",
            McpError::ResourceNotFound(_) => "resource_not_found",
            McpError::InvalidArguments(_) => "invalid_arguments",
            _ => "execution_error",
        }
    }

    /// JSON-RPC error code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            McpError::MethodNotFound(_) => ERR_CODE_NO_METHOD,
            McpError::ResourceNotFound(_) => ERR_CODE_RESOURCE_NOT_FOUND,
            McpError::InvalidArguments(_) => ERR_CODE_BAD_PARAMS,
            _ => ERR_CODE_INTERNAL,
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        RpcError {
            code: self.code(),
            message: self.to_string(),
            data: Some(json!({ "kind": self.kind() })),
        }
    }
}

// Internal params structs for deserialization.

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceReadParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}
