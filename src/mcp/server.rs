/// MCP server: reads JSON-RPC requests from a transport and answers them.
///
/// `tools/call` requests are dispatched on their own tasks so a slow Jira
/// call never holds up `tools/list` or other calls; responses go out as
/// they complete.
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::mcp::{
    errors::{JsonRpcError, MCPError, MCPResult, ProtocolError},
    gateway::Gateway,
    protocol::{
        CallToolParams, InitializeParams, InitializeResult, ListToolsResult, MCPMessage, MCPRequest,
        ServerCapabilities, ServerInfo, ToolsCapability,
    },
    tools::ToolCall,
    transport::{MCPTransport, MessageSender},
    MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};

pub struct MCPServer {
    gateway: Arc<Gateway>,
}

impl MCPServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Serve one connection until the peer closes its input, then wait for
    /// in-flight calls and flush their responses.
    pub async fn serve<T: MCPTransport>(&self, mut transport: T) -> MCPResult<()> {
        info!("Serving {} tools", self.gateway.registry().len());
        let sender = transport.sender();
        let mut calls = JoinSet::new();

        loop {
            tokio::select! {
                incoming = transport.receive() => match incoming {
                    None => break,
                    Some(Ok(message)) => self.handle_message(message, &sender, &mut calls),
                    Some(Err(e)) => {
                        send(&sender, MCPMessage::error_response(Value::Null, e.into()));
                    }
                },
                Some(joined) = calls.join_next(), if !calls.is_empty() => {
                    if let Err(e) = joined {
                        error!("Tool call task failed: {}", e);
                    }
                }
            }
        }

        debug!("Input closed, waiting for {} in-flight call(s)", calls.len());
        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                error!("Tool call task failed: {}", e);
            }
        }

        drop(sender);
        transport.close().await?;
        info!("Connection closed");
        Ok(())
    }

    fn handle_message(&self, message: MCPMessage, sender: &MessageSender, calls: &mut JoinSet<()>) {
        if message.is_notification() {
            debug!("Ignoring notification {:?}", message.method);
            return;
        }
        let request = match message.as_request() {
            Ok(request) => request,
            Err(_) => {
                warn!("Ignoring unexpected non-request message");
                return;
            }
        };

        debug!("Request {}: {}", request.id, request.method);
        let id = request.id.clone();
        let method = request.method.clone();
        let outcome = match method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => match self.spawn_tool_call(request, sender, calls) {
                Ok(()) => return,
                Err(e) => Err(e),
            },
            other => Err(MCPError::Protocol(ProtocolError::MethodNotFound(other.to_string()))),
        };

        let response = match outcome {
            Ok(result) => MCPMessage::response(id, result),
            Err(e) => {
                warn!("Request failed: {}", e);
                MCPMessage::error_response(id, JsonRpcError::from(e))
            }
        };
        send(sender, response);
    }

    fn handle_initialize(&self, params: Option<Value>) -> MCPResult<Value> {
        if let Some(params) = params {
            let params: InitializeParams = serde_json::from_value(params)
                .map_err(|e| MCPError::Protocol(ProtocolError::InvalidParams(e.to_string())))?;
            if let Some(client) = params.client_info {
                info!("Client connected: {} {}", client.name, client.version);
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            instructions: Some("Jira operations exposed as tools; every call returns text plus an isError flag".to_string()),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> MCPResult<Value> {
        let result = ListToolsResult {
            tools: self.gateway.registry().tool_infos(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Validate the call envelope and run the dispatch on its own task.
    fn spawn_tool_call(&self, request: MCPRequest, sender: &MessageSender, calls: &mut JoinSet<()>) -> MCPResult<()> {
        let params = request
            .params
            .ok_or_else(|| MCPError::Protocol(ProtocolError::InvalidParams("Missing parameters".to_string())))?;
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| MCPError::Protocol(ProtocolError::InvalidParams(format!("Missing tool name: {}", e))))?;

        let call = ToolCall {
            name: params.name,
            arguments: params.arguments.unwrap_or_default(),
        };
        let gateway = self.gateway.clone();
        let sender = sender.clone();
        let id = request.id;

        calls.spawn(async move {
            let envelope = gateway.dispatch(call).await;
            let response = match serde_json::to_value(envelope.to_call_result()) {
                Ok(result) => MCPMessage::response(id, result),
                Err(e) => MCPMessage::error_response(id, JsonRpcError::from(MCPError::Serialization(e))),
            };
            send(&sender, response);
        });
        Ok(())
    }
}

fn send(sender: &MessageSender, message: MCPMessage) {
    if let Err(e) = sender.send(message) {
        error!("Failed to send response: {}", e);
    }
}
