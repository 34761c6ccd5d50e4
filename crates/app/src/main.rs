//! Example MCP server: calculator, mock weather and a REST-backed resources API.
//!
//! - `scaffold-app` (or `--transport stdio`): newline-delimited JSON-RPC on stdin/stdout
//! - `scaffold-app --transport http`: axum server on `PORT` (default 3000)
//!
//! Settings come from the environment; `--env KEY=VALUE` overrides it.

mod config;
mod logging;
mod resource_api;
mod resources;
mod tools;

use std::sync::Arc;

use clap::Parser;
use mcp_scaffold::ApiClient;

use config::{Args, Config, Transport};
use resource_api::{HttpResourceApi, ResourceApi};
use resources::ApiBinding;
use tools::Deps;

fn build_deps(config: &Config) -> Result<Arc<Deps>, Box<dyn std::error::Error>> {
    if config.api_key.is_none() {
        tracing::warn!("API_KEY is not set; upstream requests are sent without authorization");
    }

    let client = Arc::new(ApiClient::new(config.client_config())?);
    let api_binding = ApiBinding {
        base_url: client.base_url().to_string(),
        authenticated: client.has_api_key(),
        cache_ttl_seconds: config.cache_ttl.as_secs(),
        cache_max_entries: config.cache_max_entries,
        rate_limit: config.rate_limit,
    };

    Ok(Arc::new(Deps {
        resources: Arc::new(HttpResourceApi::new(client)) as Arc<dyn ResourceApi>,
        api_binding,
    }))
}

fn build_server(deps: Arc<Deps>) -> Result<mcp_scaffold::Server, mcp_scaffold::McpError> {
    let mut srv = mcp_scaffold::Server::builder()
        .tools_json(include_bytes!("../tools.json"))
        .resources_json(include_bytes!("../resources.json"))
        .server_info("scaffold-app", env!("CARGO_PKG_VERSION"))
        .try_build()?;

    tools::register_all(&mut srv, deps.clone());
    resources::register(&mut srv, deps);
    Ok(srv)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("scaffold-app error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = Config::load(&args)?;
    let _log_guard = logging::init(&config.log_level, config.log_dir.as_deref())?;

    let deps = build_deps(&config)?;
    let srv = build_server(deps)?;

    tracing::info!(
        transport = ?config.transport,
        base_url = %config.api_base_url,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "starting MCP server"
    );

    match config.transport {
        Transport::Stdio => mcp_scaffold::serve_stdio(&srv).await?,
        Transport::Http => {
            let addr = format!("0.0.0.0:{}", config.port);
            tracing::info!(addr = %addr, "listening");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, mcp_scaffold::http_router(srv)).await?;
        }
    }

    Ok(())
}
