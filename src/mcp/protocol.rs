use super::types::*;
use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Line-delimited JSON-RPC transport
///
/// One message per line. Stdio in production, in-memory buffers in tests.
pub struct Protocol<R, W> {
    reader: R,
    writer: W,
}

impl Protocol<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Protocol<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next request; `None` once the peer closes the stream
    ///
    /// A line that is not valid UTF-8 or not valid JSON is an error; the
    /// line is consumed so the next call reads the following message.
    pub async fn read_request(&mut self) -> Result<Option<JsonRpcRequest>> {
        loop {
            let mut line = Vec::new();
            match self.reader.read_until(b'\n', &mut line).await {
                Ok(0) => return Ok(None), // EOF
                Ok(_) => {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue; // Skip empty lines
                    }
                    let request: JsonRpcRequest = serde_json::from_slice(&line)?;
                    return Ok(Some(request));
                }
                Err(e) => {
                    tracing::warn!("Failed to read from client, closing: {}", e);
                    return Ok(None);
                }
            }
        }
    }

    pub async fn send_response<T: Serialize>(&mut self, response: JsonRpcResponse<T>) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Create success response
pub fn success_response<T: Serialize>(id: serde_json::Value, result: T) -> JsonRpcResponse<T> {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

/// Create error response
pub fn error_response(id: serde_json::Value, error: JsonRpcError) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(error),
    }
}
