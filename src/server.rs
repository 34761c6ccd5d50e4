use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::loader;
use crate::types::*;

/// Handler trait for MCP tools. Implement this or use closures.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<ToolResult, McpError>;
}

/// Handler trait for MCP resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn call(&self, uri: &str) -> Result<ResourceContent, McpError>;
}

/// Wraps an async closure over raw JSON arguments into a ToolHandler.
pub struct FnToolHandler<F> {
    f: F,
}

impl<F, Fut> FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
        (self.f)(args).await
    }
}

/// Wraps an async closure taking a typed argument struct into a ToolHandler.
///
/// Arguments are deserialized after schema validation; a value the schema
/// accepted but `A` cannot represent is reported as invalid arguments and
/// the closure never runs.
pub struct TypedToolHandler<A, F> {
    f: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F, Fut> TypedToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ToolHandler> {
        Arc::new(Self {
            f,
            _args: PhantomData,
        })
    }
}

#[async_trait]
impl<A, F, Fut> ToolHandler for TypedToolHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, McpError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
        let args: A =
            serde_json::from_value(args).map_err(|e| McpError::InvalidArguments(e.to_string()))?;
        (self.f)(args).await
    }
}

/// Wraps a zero-argument async producer of text into a ResourceHandler.
///
/// The MIME type is taken from the resource definition.
pub struct FnResourceHandler<F> {
    f: F,
}

impl<F, Fut> FnResourceHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, McpError>> + Send + 'static,
{
    pub fn new(f: F) -> Arc<dyn ResourceHandler> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F, Fut> ResourceHandler for FnResourceHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, McpError>> + Send + 'static,
{
    async fn call(&self, uri: &str) -> Result<ResourceContent, McpError> {
        let text = (self.f)().await?;
        Ok(ResourceContent {
            uri: uri.to_string(),
            mime_type: None,
            text: Some(text),
            blob: None,
        })
    }
}

/// The MCP server. Create with `ServerBuilder`, register handlers, then serve.
pub struct Server {
    pub(crate) server_name: String,
    pub(crate) server_version: String,
    pub(crate) tools: HashMap<String, Tool>,
    pub(crate) tool_list: Vec<Tool>,
    pub(crate) resources: HashMap<String, Resource>,
    pub(crate) resource_list: Vec<Resource>,
    pub(crate) tool_handlers: HashMap<String, Arc<dyn ToolHandler>>,
    pub(crate) resource_handlers: HashMap<String, Arc<dyn ResourceHandler>>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Register a tool handler.
    pub fn handle_tool(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        if !self.tools.contains_key(&name) {
            tracing::warn!(tool = %name, "handler registered for undeclared tool");
        }
        self.tool_handlers.insert(name, handler);
    }

    /// Register a resource handler, keyed by resource name.
    pub fn handle_resource(&mut self, name: impl Into<String>, handler: Arc<dyn ResourceHandler>) {
        let name = name.into();
        if !self.resources.contains_key(&name) {
            tracing::warn!(resource = %name, "handler registered for undeclared resource");
        }
        self.resource_handlers.insert(name, handler);
    }

    /// Server name reported by `initialize`.
    pub fn name(&self) -> &str {
        &self.server_name
    }

    /// Server version reported by `initialize`.
    pub fn version(&self) -> &str {
        &self.server_version
    }

    /// Declared tools in catalogue order.
    pub fn tools(&self) -> &[Tool] {
        &self.tool_list
    }

    /// Declared resources in catalogue order.
    pub fn resources(&self) -> &[Resource] {
        &self.resource_list
    }

    /// Static description of the server and its catalogue.
    pub fn info(&self) -> Value {
        let tools: Vec<Value> = self
            .tool_list
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                })
            })
            .collect();
        json!({
            "name": self.server_name,
            "version": self.server_version,
            "protocolVersion": PROTOCOL_VERSION,
            "tools": tools,
            "resources": self.resource_list,
        })
    }

    /// Look up, validate and execute a tool.
    ///
    /// No handler runs when the name is unknown or the arguments fail schema
    /// validation. Handler failures other than invalid arguments come back
    /// as [`McpError::Execution`] naming the tool.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResult, McpError> {
        let started = Instant::now();
        let result = self.dispatch_tool(name, args).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(tool = name, elapsed_ms, "tool call"),
            Err(e) => tracing::warn!(tool = name, elapsed_ms, kind = e.kind(), error = %e, "tool call failed"),
        }
        result
    }

    async fn dispatch_tool(&self, name: &str, args: Value) -> Result<ToolResult, McpError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::MethodNotFound(name.to_string()))?;

        let args = if args.is_null() { json!({}) } else { args };
        tool.validate_arguments(&args)
            .map_err(McpError::InvalidArguments)?;

        let handler = self.tool_handlers.get(name).ok_or_else(|| McpError::Execution {
            operation: name.to_string(),
            message: "no handler registered".into(),
        })?;

        handler
            .call(args)
            .await
            .map_err(|e| execution_failure(name, e))
    }

    /// Read a resource by name or URI.
    ///
    /// A declared resource without a registered handler yields its metadata
    /// with empty text.
    pub async fn read_resource(&self, target: &str) -> Result<ResourceContent, McpError> {
        let resource = self
            .resources
            .get(target)
            .or_else(|| self.resource_list.iter().find(|r| r.uri == target))
            .ok_or_else(|| McpError::ResourceNotFound(target.to_string()))?;

        let Some(handler) = self.resource_handlers.get(&resource.name) else {
            return Ok(ResourceContent {
                uri: resource.uri.clone(),
                mime_type: Some(resource.mime_type.clone()),
                text: Some(String::new()),
                blob: None,
            });
        };

        let mut content = handler
            .call(&resource.uri)
            .await
            .map_err(|e| execution_failure(&resource.uri, e))?;
        if content.mime_type.is_none() {
            content.mime_type = Some(resource.mime_type.clone());
        }
        Ok(content)
    }

    /// Route a JSON-RPC request to the appropriate MCP handler.
    pub async fn handle(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        if req.jsonrpc != "2.0" {
            return new_error_response(req.id, ERR_CODE_INVALID_REQ, "jsonrpc must be '2.0'");
        }

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => self.handle_ping(req),
            "notifications/initialized" | "notifications/cancelled" => notification_response(),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req).await,
            "resources/list" => self.handle_resources_list(req),
            "resources/read" => self.handle_resources_read(req).await,
            _ => new_error_response(
                req.id,
                ERR_CODE_NO_METHOD,
                format!("Method not found: {}", req.method),
            ),
        }
    }

    fn handle_initialize(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        if let Some(params) = &req.params {
            if let Ok(p) = serde_json::from_value::<InitializeParams>(params.clone()) {
                let client_name = p.client_info.as_ref().map_or("", |c| c.name.as_str());
                let client_version = p.client_info.as_ref().map_or("", |c| c.version.as_str());
                tracing::info!(
                    client_name,
                    client_version,
                    protocol_version = ?p.protocol_version,
                    "initialize"
                );
            }
        }

        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {"subscribe": false, "listChanged": false},
            },
            "serverInfo": {
                "name": self.server_name,
                "version": self.server_version,
            },
        });

        new_ok_response(req.id, result)
    }

    fn handle_ping(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        new_ok_response(req.id, json!({}))
    }

    fn handle_tools_list(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let result = json!({ "tools": self.tool_list });
        new_ok_response(req.id, result)
    }

    async fn handle_tools_call(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let params: ToolCallParams = match parse_params(&req) {
            Ok(p) => p,
            Err(resp) => return resp,
        };

        match self.call_tool(&params.name, params.arguments).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => new_ok_response(req.id, value),
                Err(e) => new_failure_response(req.id, &McpError::from(e)),
            },
            Err(e) => new_failure_response(req.id, &e),
        }
    }

    fn handle_resources_list(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let result = json!({ "resources": self.resource_list });
        new_ok_response(req.id, result)
    }

    async fn handle_resources_read(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let params: ResourceReadParams = match parse_params(&req) {
            Ok(p) => p,
            Err(resp) => return resp,
        };

        let Some(target) = params.name.or(params.uri) else {
            return new_error_response(
                req.id,
                ERR_CODE_BAD_PARAMS,
                "either name or uri must be provided",
            );
        };

        match self.read_resource(&target).await {
            Ok(content) => new_ok_response(req.id, json!({ "contents": [content] })),
            Err(e) => new_failure_response(req.id, &e),
        }
    }
}

fn parse_params<T: DeserializeOwned>(req: &JsonRpcRequest) -> Result<T, JsonRpcResponse> {
    let Some(p) = req.params.as_ref() else {
        return Err(new_error_response(
            req.id.clone(),
            ERR_CODE_BAD_PARAMS,
            "params required",
        ));
    };
    serde_json::from_value(p.clone()).map_err(|e| {
        new_error_response(
            req.id.clone(),
            ERR_CODE_BAD_PARAMS,
            format!("invalid params: {}", e),
        )
    })
}

/// Tag a handler failure with the operation that raised it.
fn execution_failure(operation: &str, err: McpError) -> McpError {
    match err {
        e @ (McpError::InvalidArguments(_) | McpError::Execution { .. }) => e,
        McpError::ToolError(message) => McpError::Execution {
            operation: operation.to_string(),
            message,
        },
        other => McpError::Execution {
            operation: operation.to_string(),
            message: other.to_string(),
        },
    }
}

/// Builder for constructing an MCP Server.
#[derive(Default)]
pub struct ServerBuilder {
    tools: Vec<Tool>,
    resources: Vec<Resource>,
    server_name: Option<String>,
    server_version: Option<String>,
    errors: Vec<McpError>,
}

impl ServerBuilder {
    /// Load tool definitions from a JSON file.
    pub fn tools_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        match loader::load_tools(path) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => {
                tracing::error!("load tools file: {}", e);
                self.errors.push(e);
            }
        }
        self
    }

    /// Add tool definitions directly.
    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Parse tool definitions from raw JSON bytes.
    pub fn tools_json(mut self, data: &[u8]) -> Self {
        match loader::parse_tools(data) {
            Ok(tools) => self.tools.extend(tools),
            Err(e) => {
                tracing::error!("parse tools json: {}", e);
                self.errors.push(e);
            }
        }
        self
    }

    /// Load resource definitions from a JSON file.
    pub fn resources_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        match loader::load_resources(path) {
            Ok(resources) => self.resources.extend(resources),
            Err(e) => {
                tracing::error!("load resources file: {}", e);
                self.errors.push(e);
            }
        }
        self
    }

    /// Add resource definitions directly.
    pub fn resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Parse resource definitions from raw JSON bytes.
    pub fn resources_json(mut self, data: &[u8]) -> Self {
        match loader::parse_resources(data) {
            Ok(resources) => self.resources.extend(resources),
            Err(e) => {
                tracing::error!("parse resources json: {}", e);
                self.errors.push(e);
            }
        }
        self
    }

    /// Set server name and version.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self.server_version = Some(version.into());
        self
    }

    /// Like [`build`](Self::build), but fails with the first catalogue that
    /// could not be loaded or parsed.
    pub fn try_build(mut self) -> Result<Server, McpError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        Ok(self.build())
    }

    /// Build the server. Catalogues that failed to load are skipped; later
    /// definitions reusing a tool name or resource name/URI are dropped.
    pub fn build(self) -> Server {
        let mut tool_map = HashMap::new();
        let mut tool_list = Vec::with_capacity(self.tools.len());
        for tool in self.tools {
            if tool_map.contains_key(&tool.name) {
                tracing::warn!(tool = %tool.name, "duplicate tool definition ignored");
                continue;
            }
            tool_map.insert(tool.name.clone(), tool.clone());
            tool_list.push(tool);
        }

        let mut res_map: HashMap<String, Resource> = HashMap::new();
        let mut resource_list: Vec<Resource> = Vec::with_capacity(self.resources.len());
        for res in self.resources {
            if res_map.contains_key(&res.name) || resource_list.iter().any(|r| r.uri == res.uri) {
                tracing::warn!(resource = %res.name, uri = %res.uri, "duplicate resource definition ignored");
                continue;
            }
            res_map.insert(res.name.clone(), res.clone());
            resource_list.push(res);
        }

        Server {
            server_name: self.server_name.unwrap_or_else(|| "mcp-scaffold".into()),
            server_version: self.server_version.unwrap_or_else(|| "1.0.0".into()),
            tools: tool_map,
            tool_list,
            resources: res_map,
            resource_list,
            tool_handlers: HashMap::new(),
            resource_handlers: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value) -> Result<ToolResult, McpError> {
            let msg = args.get("msg").and_then(|v| v.as_str()).unwrap_or("no msg");
            Ok(text_result(format!("echo: {}", msg)))
        }
    }

    /// Counts invocations so tests can prove a handler never ran.
    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for CountingHandler {
        async fn call(&self, _args: Value) -> Result<ToolResult, McpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text_result("counted"))
        }
    }

    #[derive(Deserialize)]
    struct DivideArgs {
        a: f64,
        b: f64,
    }

    const TOOLS_JSON: &str = r#"[
        {"name":"echo","description":"echoes","inputSchema":{"type":"object","properties":{"msg":{"type":"string"}},"required":["msg"]}},
        {"name":"count","description":"counts","inputSchema":{"type":"object","properties":{"mode":{"type":"string","enum":["fast","slow"]}},"required":["mode"]}},
        {"name":"divide","description":"divides","inputSchema":{"type":"object","properties":{"a":{"type":"number"},"b":{"type":"number"}},"required":["a","b"]}},
        {"name":"strict","description":"typed","inputSchema":{"type":"object","properties":{}}},
        {"name":"guarded","description":"rejects","inputSchema":{"type":"object","properties":{}}}
    ]"#;

    fn test_server() -> (Server, Arc<AtomicUsize>) {
        let resources_json = r#"[
            {"name":"test","description":"test resource","uri":"file:///test.csv","mimeType":"text/csv"},
            {"name":"config","description":"config","uri":"config://app","mimeType":"application/json"}
        ]"#;

        let mut srv = Server::builder()
            .tools_json(TOOLS_JSON.as_bytes())
            .resources_json(resources_json.as_bytes())
            .server_info("test-server", "0.1.0")
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        srv.handle_tool("echo", Arc::new(EchoHandler));
        srv.handle_tool(
            "count",
            Arc::new(CountingHandler {
                calls: calls.clone(),
            }),
        );
        srv.handle_tool(
            "divide",
            TypedToolHandler::new(|args: DivideArgs| async move {
                if args.b == 0.0 {
                    return Err(McpError::ToolError("division by zero".into()));
                }
                Ok(text_result((args.a / args.b).to_string()))
            }),
        );
        srv.handle_tool(
            "strict",
            TypedToolHandler::new(|_args: DivideArgs| async move { Ok(text_result("ran")) }),
        );
        srv.handle_tool(
            "guarded",
            FnToolHandler::new(|_args: Value| async move {
                Err(McpError::InvalidArguments("confirm must be true".into()))
            }),
        );
        srv.handle_resource(
            "config",
            FnResourceHandler::new(|| async { Ok(r#"{"debug":false}"#.to_string()) }),
        );
        (srv, calls)
    }

    fn make_req(method: &str, id: Option<Value>, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn test_bad_jsonrpc_version() {
        let (srv, _) = test_server();
        let req = JsonRpcRequest {
            jsonrpc: "1.0".into(),
            id: Some(json!(1)),
            method: "ping".into(),
            params: None,
        };
        let resp = srv.handle(req).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_INVALID_REQ);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("unknown/method", Some(json!(1)), None)).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_NO_METHOD);
    }

    #[tokio::test]
    async fn test_initialize() {
        let (srv, _) = test_server();
        let params = json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "0.1"}
        });
        let resp = srv.handle(make_req("initialize", Some(json!(1)), Some(params))).await;
        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
    }

    #[tokio::test]
    async fn test_ping() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("ping", Some(json!(1)), None)).await;
        assert_eq!(resp.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_notifications_return_sentinel() {
        let (srv, _) = test_server();
        let resp = srv
            .handle(make_req("notifications/initialized", None, None))
            .await;
        assert!(resp.is_notification());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("tools/list", Some(json!(1)), None)).await;
        let result = resp.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0]["name"], "echo");
        assert!(tools[0].get("inputSchema").is_some());
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let (srv, _) = test_server();
        let params = json!({"name": "echo", "arguments": {"msg": "hello"}});
        let resp = srv.handle(make_req("tools/call", Some(json!(1)), Some(params))).await;
        assert!(resp.error.is_none());
        let result: ToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.first_text(), Some("echo: hello"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_tools_call_missing_required() {
        let (srv, _) = test_server();
        let params = json!({"name": "echo", "arguments": {}});
        let resp = srv.handle(make_req("tools/call", Some(json!(1)), Some(params))).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, ERR_CODE_BAD_PARAMS);
        assert_eq!(err.data.unwrap()["kind"], "invalid_arguments");
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("tools/call", Some(json!(1)), None)).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_BAD_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let (srv, _) = test_server();
        let params = json!({"name": "nonexistent", "arguments": {}});
        let resp = srv.handle(make_req("tools/call", Some(json!(1)), Some(params))).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, ERR_CODE_NO_METHOD);
        assert!(err.message.contains("nonexistent"));
    }

    #[tokio::test]
    async fn test_unknown_tool_never_invokes_handler() {
        let (srv, calls) = test_server();
        let err = srv.call_tool("counter", json!({"mode": "fast"})).await.unwrap_err();
        assert!(matches!(err, McpError::MethodNotFound(ref n) if n == "counter"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_invoke_handler() {
        let (srv, calls) = test_server();
        let err = srv.call_tool("count", json!({"mode": "medium"})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(_)));
        let err = srv.call_tool("count", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        srv.call_tool("count", json!({"mode": "fast"})).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_null_arguments_treated_as_empty_object() {
        let (srv, calls) = test_server();
        let err = srv.call_tool("count", Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("missing required field \"mode\""));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let (srv, _) = test_server();
        let result = srv.call_tool("divide", json!({"a": 9, "b": 3})).await.unwrap();
        assert_eq!(result.first_text(), Some("3"));
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_unrepresentable_arguments() {
        let (srv, _) = test_server();
        // The schema of "strict" accepts anything; the struct does not.
        let err = srv.call_tool("strict", json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_handler_failure_wrapped_as_execution_error() {
        let (srv, _) = test_server();
        let err = srv.call_tool("divide", json!({"a": 1, "b": 0})).await.unwrap_err();
        assert_eq!(err.kind(), "execution_error");
        assert_eq!(err.to_string(), "error executing divide: division by zero");

        let params = json!({"name": "divide", "arguments": {"a": 1, "b": 0}});
        let resp = srv.handle(make_req("tools/call", Some(json!(7)), Some(params))).await;
        assert_eq!(resp.id, Some(json!(7)));
        assert_eq!(resp.error.unwrap().code, ERR_CODE_INTERNAL);
    }

    #[tokio::test]
    async fn test_handler_invalid_arguments_pass_through() {
        let (srv, _) = test_server();
        let err = srv.call_tool("guarded", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments(ref m) if m.contains("confirm")));
    }

    #[tokio::test]
    async fn test_tools_call_no_handler() {
        let srv = Server::builder()
            .tools_json(
                r#"[{"name":"no-handler","description":"test","inputSchema":{"type":"object","properties":{}}}]"#.as_bytes(),
            )
            .build();
        let params = json!({"name": "no-handler", "arguments": {}});
        let resp = srv.handle(make_req("tools/call", Some(json!(1)), Some(params))).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_INTERNAL);
    }

    #[tokio::test]
    async fn test_duplicate_tool_definitions_keep_first() {
        let srv = Server::builder()
            .tools_json(br#"[{"name":"a","description":"first","inputSchema":{"type":"object"}}]"#)
            .tools_json(br#"[{"name":"a","description":"second","inputSchema":{"type":"object"}}]"#)
            .build();
        assert_eq!(srv.tools().len(), 1);
        assert_eq!(srv.tools()[0].description, "first");
    }

    #[test]
    fn test_try_build_fails_on_bad_catalogue() {
        let dup = br#"[
            {"name":"a","description":"one","inputSchema":{"type":"object"}},
            {"name":"a","description":"two","inputSchema":{"type":"object"}}
        ]"#;
        let err = Server::builder()
            .tools_json(dup)
            .resources_json(b"not json")
            .try_build()
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Catalog(ref m) if m == "duplicate tool name: a"));

        // build() keeps going without the rejected catalogue
        let srv = Server::builder().tools_json(dup).build();
        assert!(srv.tools().is_empty());
    }

    #[test]
    fn test_try_build_accepts_valid_catalogues() {
        let srv = Server::builder()
            .tools_json(TOOLS_JSON.as_bytes())
            .server_info("ok", "2.0.0")
            .try_build()
            .unwrap();
        assert_eq!(srv.tools().len(), 5);
        assert_eq!(srv.name(), "ok");
        assert_eq!(srv.version(), "2.0.0");
    }

    #[tokio::test]
    async fn test_resources_list() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("resources/list", Some(json!(1)), None)).await;
        let result = resp.result.unwrap();
        let resources = result["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0]["name"], "test");
    }

    #[tokio::test]
    async fn test_resources_read_by_name() {
        let (srv, _) = test_server();
        let params = json!({"name": "test"});
        let resp = srv.handle(make_req("resources/read", Some(json!(1)), Some(params))).await;
        let result = resp.result.unwrap();
        let contents = result["contents"].as_array().unwrap();
        assert_eq!(contents[0]["uri"], "file:///test.csv");
        assert_eq!(contents[0]["mimeType"], "text/csv");
    }

    #[tokio::test]
    async fn test_resources_read_by_uri_with_producer() {
        let (srv, _) = test_server();
        let params = json!({"uri": "config://app"});
        let resp = srv.handle(make_req("resources/read", Some(json!(1)), Some(params))).await;
        let result = resp.result.unwrap();
        assert_eq!(result["contents"][0]["text"], r#"{"debug":false}"#);
        assert_eq!(result["contents"][0]["mimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_resources_read_not_found() {
        let (srv, _) = test_server();
        let params = json!({"name": "nonexistent"});
        let resp = srv.handle(make_req("resources/read", Some(json!(1)), Some(params))).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, ERR_CODE_RESOURCE_NOT_FOUND);
        assert_eq!(err.data.unwrap()["kind"], "resource_not_found");
    }

    #[tokio::test]
    async fn test_resources_read_missing_params() {
        let (srv, _) = test_server();
        let resp = srv.handle(make_req("resources/read", Some(json!(1)), Some(json!({})))).await;
        assert_eq!(resp.error.unwrap().code, ERR_CODE_BAD_PARAMS);
    }

    #[tokio::test]
    async fn test_info_lists_catalogue() {
        let (srv, _) = test_server();
        let info = srv.info();
        assert_eq!(info["name"], "test-server");
        assert_eq!(info["tools"].as_array().unwrap().len(), 5);
        assert_eq!(info["resources"][1]["uri"], "config://app");
    }
}
