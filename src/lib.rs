// Jira tool-dispatch gateway exposed over MCP

pub mod backend;
pub mod config;
pub mod logging;
pub mod mcp;
