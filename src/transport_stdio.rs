//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Stdout carries protocol messages only; logging must go to stderr.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::server::Server;
use crate::types::{new_error_response, JsonRpcRequest, JsonRpcResponse, McpError, ERR_CODE_PARSE};

/// Serve `server` on the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(server: &Server) -> Result<(), McpError> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve_lines(server, reader, writer).await
}

/// Serve one JSON-RPC message per line from `reader`, writing one response
/// per line to `writer`. Notifications are answered with nothing.
pub async fn serve_lines<R, W>(server: &Server, reader: R, mut writer: W) -> Result<(), McpError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    tracing::info!(server = server.name(), "serving MCP over stdio");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let req: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable stdio message");
                let resp = new_error_response(None, ERR_CODE_PARSE, format!("parse error: {}", e));
                write_message(&mut writer, &resp).await?;
                continue;
            }
        };

        let resp = server.handle(req).await;
        if resp.is_notification() {
            continue;
        }
        write_message(&mut writer, &resp).await?;
    }

    tracing::info!("stdin closed, stopping stdio transport");
    Ok(())
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    resp: &JsonRpcResponse,
) -> Result<(), McpError> {
    let mut buf = serde_json::to_vec(resp)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}
