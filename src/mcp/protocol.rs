use crate::mcp::errors::{JsonRpcError, MCPError, MCPResult, ProtocolError};
use crate::mcp::tools::registry::ToolInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC 2.0 message structure for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Request message structure
#[derive(Debug, Clone)]
pub struct MCPRequest {
    pub id: Value,
    pub method: String,
    pub params: Option<Value>,
}

impl MCPMessage {
    const JSONRPC_VERSION: &'static str = "2.0";

    /// Create a new response message
    pub fn response(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Create a new error response message; `Value::Null` when the id is unknown
    pub fn error_response(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Self::JSONRPC_VERSION.to_string(),
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some() && self.id.is_some()
    }

    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }

    pub fn is_notification(&self) -> bool {
        self.method.is_some() && self.id.is_none()
    }

    /// Validate the message structure
    pub fn validate(&self) -> MCPResult<()> {
        let invalid = |msg: &str| Err(MCPError::Protocol(ProtocolError::InvalidMessage(msg.to_string())));

        if self.jsonrpc != Self::JSONRPC_VERSION {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(format!(
                "Invalid JSON-RPC version: {}",
                self.jsonrpc
            ))));
        }

        if self.is_request() || self.is_notification() {
            if self.result.is_some() || self.error.is_some() {
                return invalid("Request message cannot have result or error fields");
            }
        } else if self.is_response() {
            if self.params.is_some() {
                return invalid("Response message cannot have params");
            }
            if self.result.is_some() && self.error.is_some() {
                return invalid("Response cannot have both result and error");
            }
        } else {
            return invalid("Message does not match any valid type (request, response, notification)");
        }

        Ok(())
    }

    /// Convert to typed request
    pub fn as_request(&self) -> MCPResult<MCPRequest> {
        match (&self.id, &self.method) {
            (Some(id), Some(method)) => Ok(MCPRequest {
                id: id.clone(),
                method: method.clone(),
                params: self.params.clone(),
            }),
            _ => Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Message is not a request".to_string(),
            ))),
        }
    }
}

/// MCP protocol initialization parameters; unknown fields are tolerated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: Option<String>,
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `tools/list` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolInfo>,
}

/// `tools/call` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// One content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        ToolContent::Text { text: text.into() }
    }
}

/// `tools/call` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

/// Protocol message parser
pub struct MessageParser;

impl MessageParser {
    /// Parse one message. Malformed JSON is a `ParseError`; well-formed JSON
    /// that is not a JSON-RPC message is an `InvalidMessage`, and so is a
    /// request carrying `"id": null`.
    pub fn parse_message(data: &[u8]) -> MCPResult<MCPMessage> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|e| MCPError::Protocol(ProtocolError::ParseError(e.to_string())))?;
        if value.get("method").is_some() && value.get("id").is_some_and(Value::is_null) {
            return Err(MCPError::Protocol(ProtocolError::InvalidMessage(
                "Request id must not be null".to_string(),
            )));
        }
        let message: MCPMessage = serde_json::from_value(value)
            .map_err(|e| MCPError::Protocol(ProtocolError::InvalidMessage(e.to_string())))?;

        message.validate()?;
        Ok(message)
    }

    /// Serialize a message to one JSON line (without the newline)
    pub fn serialize_message(message: &MCPMessage) -> MCPResult<Vec<u8>> {
        message.validate()?;
        Ok(serde_json::to_vec(message)?)
    }
}
