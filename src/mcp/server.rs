use super::protocol::{error_response, success_response, Protocol};
use super::types::*;
use crate::config::Config;
use crate::extractor::registry::ExtractorRegistry;
use crate::handlers::tool_handlers::ToolHandlers;
use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "code-snippet-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main MCP Server
pub struct McpServer<R, W> {
    protocol: Protocol<R, W>,
    tool_handlers: ToolHandlers,
}

impl McpServer<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn new(config: Config) -> Self {
        Self::with_protocol(Protocol::stdio(), config)
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn with_protocol(protocol: Protocol<R, W>, config: Config) -> Self {
        let registry = ExtractorRegistry::new();
        tracing::debug!("Server configuration: {:?}", config);
        tracing::debug!("Registered languages: {:?}", registry.language_ids());
        Self {
            protocol,
            tool_handlers: ToolHandlers::new(registry, config),
        }
    }

    /// Serve requests until the client disconnects, then hand back the writer
    pub async fn start(mut self) -> Result<W> {
        tracing::info!("MCP server started, waiting for requests...");

        // Main request loop
        loop {
            match self.protocol.read_request().await {
                Ok(Some(request)) => {
                    let response = match self.handle_request(request).await {
                        Some(response) => response,
                        None => continue,
                    };
                    if let Err(e) = self.protocol.send_response(response).await {
                        tracing::error!("Failed to send response: {}", e);
                    }
                }
                Ok(None) => {
                    tracing::info!("Client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to read request: {}", e);
                    let error_response = error_response(json!(null), JsonRpcError::parse_error());
                    let _ = self.protocol.send_response(error_response).await;
                }
            }
        }

        Ok(self.protocol.into_writer())
    }

    /// Dispatch one request; notifications get no response
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!("Received request: method={}, id={:?}", request.method, request.id);

        if request.method.starts_with("notifications/") {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, request.params),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => error_response(request.id, JsonRpcError::method_not_found()),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: serde_json::Value, params: serde_json::Value) -> JsonRpcResponse {
        match serde_json::from_value::<InitializeRequest>(params) {
            Ok(req) => {
                tracing::info!(
                    "Client connected: {} v{} (protocol {})",
                    req.clientInfo.name,
                    req.clientInfo.version,
                    req.protocolVersion
                );
            }
            Err(e) => {
                tracing::warn!("Failed to parse initialize request: {}", e);
                return error_response(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)),
                );
            }
        }

        let response = InitializeResponse {
            protocolVersion: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    listChanged: Some(false),
                },
            },
            serverInfo: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        success_response(id, json!(response))
    }

    fn handle_tools_list(&self, id: serde_json::Value) -> JsonRpcResponse {
        let tools = vec![
            Tool {
                name: "index_names".to_string(),
                description: r#"List the qualified class and method names declared in one source file.

Methods are reported as `package.Class#method`. A class without methods is reported as `package.Class`."#.to_string(),
                inputSchema: json!({
                    "type": "object",
                    "properties": {
                        "source": {
                            "type": "string",
                            "description": "Full text of the source file."
                        },
                        "language": {
                            "type": "string",
                            "description": "Language identifier, defaults to the server's DEFAULT_LANGUAGE."
                        }
                    },
                    "required": ["source"]
                }),
            },
            Tool {
                name: "extract_members".to_string(),
                description: r#"Reduce a source file to the requested methods.

Kept lines are returned exactly as written. Methods called on `this` by a requested method are kept as well; fields, constructors and nested types are always kept. Unknown method names are ignored."#.to_string(),
                inputSchema: json!({
                    "type": "object",
                    "properties": {
                        "source": {
                            "type": "string",
                            "description": "Full text of the source file."
                        },
                        "methods": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Simple method names to keep."
                        },
                        "language": {
                            "type": "string",
                            "description": "Language identifier, defaults to the server's DEFAULT_LANGUAGE."
                        }
                    },
                    "required": ["source", "methods"]
                }),
            },
            Tool {
                name: "index_project".to_string(),
                description: "Map every qualified class and method name of a project to the file declaring it.".to_string(),
                inputSchema: project_schema(json!({})),
            },
            Tool {
                name: "read_project".to_string(),
                description: "Render every text file of a project as markdown.".to_string(),
                inputSchema: project_schema(json!({})),
            },
            Tool {
                name: "build_snippets".to_string(),
                description: r#"Build reduced snippets for selected classes and methods of a project.

Files with selected methods are reduced to those methods; files selected by class name are returned whole. Names that are not in the project index are skipped."#.to_string(),
                inputSchema: project_schema(json!({
                    "classes": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Qualified class names (package.Class)."
                    },
                    "methods": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Qualified method names (package.Class#method)."
                    }
                })),
            },
        ];

        let response = ListToolsResponse { tools };
        success_response(id, json!(response))
    }

    async fn handle_tools_call(&self, id: serde_json::Value, params: serde_json::Value) -> JsonRpcResponse {
        let call_request: CallToolRequest = match serde_json::from_value(params) {
            Ok(req) => req,
            Err(e) => {
                return error_response(id, JsonRpcError::invalid_params(format!("Invalid params: {}", e)));
            }
        };

        let handlers = &self.tool_handlers;
        let args = &call_request.arguments;
        let result = match call_request.name.as_str() {
            "index_names" => handlers.handle_index_names(args).await,
            "extract_members" => handlers.handle_extract_members(args).await,
            "index_project" => handlers.handle_index_project(args).await,
            "read_project" => handlers.handle_read_project(args).await,
            "build_snippets" => handlers.handle_build_snippets(args).await,
            _ => {
                return error_response(
                    id,
                    JsonRpcError::invalid_params(format!("Unknown tool: {}", call_request.name)),
                );
            }
        };

        let response = match result {
            Ok(content) => CallToolResponse {
                content,
                isError: None,
            },
            Err(e) => {
                tracing::warn!("Tool {} failed: {:#}", call_request.name, e);
                CallToolResponse {
                    content: vec![Content::Text {
                        text: format!("Error: {:#}", e),
                    }],
                    isError: Some(true),
                }
            }
        };
        success_response(id, json!(response))
    }
}

/// Input schema with a required `project` plus tool-specific properties
fn project_schema(extra: serde_json::Value) -> serde_json::Value {
    let mut properties = json!({
        "project": {
            "type": "string",
            "description": "Project name, resolved under PROJECTS_DIR (lower-cased, spaces become dashes)."
        }
    });
    if let (Some(properties), Some(extra)) = (properties.as_object_mut(), extra.as_object()) {
        properties.extend(extra.clone());
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["project"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn run(lines: &[Value]) -> Vec<Value> {
        let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        let protocol = Protocol::new(input.as_bytes(), Vec::new());
        let server = McpServer::with_protocol(protocol, Config::default());

        let written = server.start().await.unwrap();
        String::from_utf8(written)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_session() {
        let responses = run(&[
            json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "test", "version": "1.0" }
                }
            }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {
                    "name": "extract_members",
                    "arguments": {
                        "source": "class A {\n  void a() {}\n\n  void b() {}\n}\n",
                        "methods": ["b"]
                    }
                }
            }),
            json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" }),
        ])
        .await;

        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "code-snippet-mcp");

        let tools: Vec<&str> = responses[1]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            tools,
            vec!["index_names", "extract_members", "index_project", "read_project", "build_snippets"]
        );

        assert_eq!(
            responses[2]["result"]["content"][0]["text"],
            "class A {\n\n  void b() {}\n}\n"
        );
        assert_eq!(responses[3]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_in_content() {
        let responses = run(&[json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": { "name": "index_names", "arguments": { "source": "class {" } }
        })])
        .await;

        assert_eq!(responses[0]["result"]["isError"], true);
        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: Parse failure"), "{}", text);
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let protocol = Protocol::new("{oops\n".as_bytes(), Vec::new());
        let server = McpServer::with_protocol(protocol, Config::default());
        let written = String::from_utf8(server.start().await.unwrap()).unwrap();
        let response: Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_the_session() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n");
        let protocol = Protocol::new(input.as_slice(), Vec::new());
        let server = McpServer::with_protocol(protocol, Config::default());

        let written = String::from_utf8(server.start().await.unwrap()).unwrap();
        let responses: Vec<Value> = written.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 1);
    }
}
