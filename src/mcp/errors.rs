use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigError;

/// Error handling for the gateway's protocol side
pub type MCPResult<T> = Result<T, MCPError>;

/// Main error type for everything outside a single dispatch.
///
/// Failures *inside* a dispatch never surface as `MCPError`; they are turned
/// into an error envelope by the normalizer. These variants cover the
/// transport, protocol framing, startup registration and configuration.
#[derive(Debug, thiserror::Error)]
pub enum MCPError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Protocol-level errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Errors raised while building the tool catalog at startup
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("Invalid descriptor for tool '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// Dispatch taxonomy. Every variant is recoverable: the gateway renders it
/// into an error envelope and the server keeps running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid argument '{parameter}': {reason}")]
    Validation { parameter: String, reason: String },

    #[error("missing configuration: {0}")]
    Configuration(String),

    #[error("timeout after {timeout_ms}ms")]
    BackendTimeout { timeout_ms: u64 },

    #[error("{0}")]
    BackendFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn validation(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::Validation {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for ToolError {
    fn from(error: ConfigError) -> Self {
        ToolError::Configuration(error.to_string())
    }
}

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy)]
pub enum JsonRpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

/// JSON-RPC error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }
}

impl From<MCPError> for JsonRpcError {
    fn from(error: MCPError) -> Self {
        match error {
            MCPError::Protocol(ProtocolError::MethodNotFound(method)) => {
                JsonRpcError::new(JsonRpcErrorCode::MethodNotFound, format!("Method not found: {}", method))
            }
            MCPError::Protocol(ProtocolError::InvalidParams(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidParams, msg)
            }
            MCPError::Protocol(ProtocolError::ParseError(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::ParseError, msg)
            }
            MCPError::Protocol(ProtocolError::InvalidMessage(msg)) => {
                JsonRpcError::new(JsonRpcErrorCode::InvalidRequest, msg)
            }
            _ => JsonRpcError::new(JsonRpcErrorCode::InternalError, error.to_string()),
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(error: ProtocolError) -> Self {
        MCPError::Protocol(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_map_to_json_rpc_codes() {
        let err: JsonRpcError = ProtocolError::MethodNotFound("tools/frobnicate".to_string()).into();
        assert_eq!(err.code, -32601);
        assert!(err.message.contains("tools/frobnicate"));

        let err: JsonRpcError = ProtocolError::InvalidParams("Missing tool name".to_string()).into();
        assert_eq!(err.code, -32602);

        let err: JsonRpcError = ProtocolError::ParseError("eof".to_string()).into();
        assert_eq!(err.code, -32700);
    }

    #[test]
    fn test_validation_error_names_the_parameter() {
        let err = ToolError::validation("issue_key", "required parameter is missing");
        assert_eq!(
            err.to_string(),
            "invalid argument 'issue_key': required parameter is missing"
        );
    }
}
