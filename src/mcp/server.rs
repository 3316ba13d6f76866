//! MCP Server Implementation
//!
//! Tool and resource registries, JSON-RPC dispatch and the stdio transport.
//! The HTTP transports in [`crate::mcp::http`] feed the same
//! [`McpServer::handle_value`] entry point.

use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::*;
use crate::mcp::validation::{McpValidator, compile_schema};
use anyhow::Result;
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

/// Resource handler trait for implementing resource access
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn handle(&self, uri: &str) -> Result<ResourceContents>;
}

struct RegisteredTool {
    tool: Tool,
    handler: Arc<dyn ToolHandler>,
    schema: Arc<JSONSchema>,
}

struct RegisteredResource {
    resource: Resource,
    handler: Arc<dyn ResourceHandler>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    /// Whether a client has sent `initialize`
    pub client_initialized: bool,
    pub tools: usize,
}

/// MCP Server state and configuration
pub struct McpServer {
    pub server_info: Implementation,
    pub capabilities: ServerCapabilities,
    pub instructions: Option<String>,
    // Vecs keep registration order for tools/list and resources/list
    tools: RwLock<Vec<RegisteredTool>>,
    resources: RwLock<Vec<RegisteredResource>>,
    connection_state: RwLock<ConnectionState>,
    validator: McpValidator,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    Ok(serde_json::from_value(params.unwrap_or_else(|| json!({})))?)
}

fn to_result<T: Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError {
        message: e.to_string(),
    })
}

fn request_id_of(value: &Value) -> Option<RequestId> {
    value
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

/// Write one newline-delimited message
async fn write_message<W>(writer: &mut W, message: &JsonRpcMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

impl McpServer {
    /// Create a new MCP server
    #[inline]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let server_info = Implementation {
            name: name.into(),
            version: version.into(),
        };

        let capabilities = ServerCapabilities {
            logging: Some(Map::new()),
            resources: Some(ResourcesCapability {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Ok(Self {
            server_info,
            capabilities,
            instructions: None,
            tools: RwLock::new(Vec::new()),
            resources: RwLock::new(Vec::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
            validator: McpValidator::new()?,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool; a tool with the same name is replaced
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        let schema = compile_schema(&tool.name, &tool.input_schema)?;
        let name = tool.name.clone();
        let entry = RegisteredTool {
            tool,
            handler: Arc::new(handler),
            schema: Arc::new(schema),
        };

        {
            let mut tools = self.tools.write().await;
            tools.retain(|t| t.tool.name != name);
            tools.push(entry);
        }

        debug!("Registered tool: {}", name);
        Ok(())
    }

    /// Register a resource; a resource with the same URI is replaced
    #[inline]
    pub async fn register_resource<H>(&self, resource: Resource, handler: H) -> Result<()>
    where
        H: ResourceHandler + 'static,
    {
        let uri = resource.uri.clone();
        let entry = RegisteredResource {
            resource,
            handler: Arc::new(handler),
        };

        {
            let mut resources = self.resources.write().await;
            resources.retain(|r| r.resource.uri != uri);
            resources.push(entry);
        }

        debug!("Registered resource: {}", uri);
        Ok(())
    }

    #[inline]
    pub async fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        tools.iter().map(|t| t.tool.name.clone()).collect()
    }

    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    async fn set_state(&self, state: ConnectionState) {
        let mut current = self.connection_state.write().await;
        *current = state;
    }

    #[inline]
    pub async fn health(&self) -> HealthStatus {
        let client_initialized = matches!(
            self.connection_state().await,
            ConnectionState::Initializing | ConnectionState::Ready
        );

        HealthStatus {
            status: "healthy",
            service: self.server_info.name.clone(),
            client_initialized,
            tools: self.tools.read().await.len(),
        }
    }

    /// Transport-neutral entry point. Notifications and stray responses
    /// produce no reply.
    #[inline]
    pub async fn handle_value(&self, value: &Value) -> Option<JsonRpcMessage> {
        let message = match self.validator.validate_raw_message(value) {
            Ok(message) => message,
            Err(e) => {
                let error = McpError::InvalidRequest {
                    message: e.to_string(),
                };
                error.log();
                return Some(error.to_error_response(request_id_of(value)));
            }
        };

        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    /// Entry point for raw text; malformed JSON yields a parse error reply
    #[inline]
    pub async fn handle_text(&self, text: &str) -> Option<JsonRpcMessage> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_value(&value).await,
            Err(e) => {
                let error = McpError::ParseError {
                    message: e.to_string(),
                };
                error.log();
                Some(error.to_error_response(None))
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        match self.dispatch(&method, params).await {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, id)),
            Err(e) => {
                e.log();
                e.to_error_response(Some(id))
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        self.validator.validate_params(method, params.as_ref())?;

        match method {
            "initialize" => self.handle_initialize(parse_params(params)?).await,
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(parse_params(params)?).await,
            "resources/list" => self.handle_list_resources().await,
            "resources/read" => self.handle_read_resource(parse_params(params)?).await,
            "resources/templates/list" => to_result(&ListResourceTemplatesResult {
                resource_templates: Vec::new(),
            }),
            _ => Err(McpError::MethodNotFound {
                method: method.to_string(),
            }),
        }
    }

    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.set_state(ConnectionState::Ready).await;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => {
                debug!("Received cancellation notification");
            }
            other => {
                warn!("Unknown notification method: {}", other);
            }
        }
    }

    async fn handle_initialize(&self, params: InitializeParams) -> McpResult<Value> {
        let protocol_version = self
            .validator
            .negotiate_protocol_version(&params.protocol_version);
        if protocol_version != params.protocol_version {
            warn!(
                "Client requested unsupported protocol version {}, answering with {}",
                params.protocol_version, protocol_version
            );
        }

        self.set_state(ConnectionState::Initializing).await;

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };

        info!(
            "Client initialized: {} {}",
            params.client_info.name, params.client_info.version
        );
        to_result(&result)
    }

    async fn handle_list_tools(&self) -> McpResult<Value> {
        let tools: Vec<Tool> = {
            let tools = self.tools.read().await;
            tools.iter().map(|t| t.tool.clone()).collect()
        };

        to_result(&ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, params: CallToolParams) -> McpResult<Value> {
        let found = {
            let tools = self.tools.read().await;
            tools
                .iter()
                .find(|t| t.tool.name == params.name)
                .map(|t| (Arc::clone(&t.handler), Arc::clone(&t.schema)))
        };
        let (handler, schema) = found.ok_or_else(|| McpError::ToolNotFound {
            name: params.name.clone(),
        })?;

        let arguments = Value::Object(
            params
                .arguments
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect(),
        );
        self.validator
            .validate_tool_arguments(&params.name, &schema, &arguments)?;

        debug!("Calling tool: {}", params.name);
        let tool = params.name.clone();
        let result = handler
            .handle(params)
            .await
            .map_err(|e| McpError::ToolExecutionFailed {
                tool,
                message: format!("{:#}", e),
            })?;

        to_result(&result)
    }

    async fn handle_list_resources(&self) -> McpResult<Value> {
        let resources: Vec<Resource> = {
            let resources = self.resources.read().await;
            resources.iter().map(|r| r.resource.clone()).collect()
        };

        to_result(&ListResourcesResult { resources })
    }

    async fn handle_read_resource(&self, params: ReadResourceParams) -> McpResult<Value> {
        let handler = {
            let resources = self.resources.read().await;
            resources
                .iter()
                .find(|r| r.resource.uri == params.uri)
                .map(|r| Arc::clone(&r.handler))
        };
        let handler = handler.ok_or_else(|| McpError::ResourceNotFound {
            uri: params.uri.clone(),
        })?;

        let contents = handler.handle(&params.uri).await?;
        to_result(&ReadResourceResult {
            contents: vec![contents],
        })
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve_io(BufReader::new(io::stdin()), io::stdout())
            .await
    }

    /// Newline-delimited JSON-RPC over any reader/writer pair
    #[inline]
    pub async fn serve_io<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Err(e) => {
                    error!("Error reading from stdin: {}", e);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(reply) = self.handle_text(line).await {
                write_message(&mut writer, &reply).await?;
            }
        }

        self.set_state(ConnectionState::Closed).await;
        info!("MCP server stopped");
        Ok(())
    }
}
