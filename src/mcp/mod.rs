/// Model Context Protocol (MCP) side of the gateway.
///
/// JSON-RPC framing and transport, the tool catalog, and the dispatch path
/// from a `tools/call` request to a normalized result.
pub mod errors;
pub mod gateway;
pub mod normalize;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use self::{gateway::Gateway, server::MCPServer, transport::StdioTransport};

/// MCP Protocol version implemented by this server
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server information
pub const SERVER_NAME: &str = "jira-gateway";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
