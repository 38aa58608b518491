use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::mcp::errors::{RegistryError, ToolError};
use crate::mcp::tools::{JiraTool, ToolDescriptor};

/// A tool together with the descriptor captured at registration
struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn JiraTool>,
}

/// Tool information for MCP client discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Ordered tool catalog.
///
/// Filled once during startup and shared read-only (behind an `Arc`)
/// afterwards, so lookups need no locking.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the full Jira catalog
    pub fn with_jira_tools() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tool in crate::mcp::tools::jira::catalog() {
            registry.register(tool)?;
        }
        info!("Registered {} tools", registry.len());
        Ok(registry)
    }

    /// Register a tool; its descriptor is read exactly once, here.
    pub fn register(&mut self, tool: Arc<dyn JiraTool>) -> Result<(), RegistryError> {
        let descriptor = tool.descriptor();
        validate_descriptor(&descriptor)?;

        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName(descriptor.name));
        }

        debug!("Registering tool: {}", descriptor.name);
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { descriptor, tool });
        Ok(())
    }

    /// All descriptors in registration order
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor).collect()
    }

    /// Look a tool up by name
    pub fn resolve(&self, name: &str) -> Result<(&ToolDescriptor, Arc<dyn JiraTool>), ToolError> {
        self.index
            .get(name)
            .and_then(|&idx| self.tools.get(idx))
            .map(|t| (&t.descriptor, t.tool.clone()))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Catalog as advertised through `tools/list`
    pub fn tool_infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.descriptor.name.clone(),
                description: t.descriptor.description.clone(),
                input_schema: t.descriptor.input_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate_descriptor(descriptor: &ToolDescriptor) -> Result<(), RegistryError> {
    let invalid = |reason: &str| RegistryError::InvalidDescriptor {
        name: descriptor.name.clone(),
        reason: reason.to_string(),
    };

    if descriptor.name.trim().is_empty() {
        return Err(invalid("tool name cannot be empty"));
    }
    if descriptor.description.trim().is_empty() {
        return Err(invalid("description cannot be empty"));
    }

    let mut seen = HashSet::new();
    for param in &descriptor.parameters {
        if param.name.trim().is_empty() {
            return Err(invalid("parameter name cannot be empty"));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(RegistryError::InvalidDescriptor {
                name: descriptor.name.clone(),
                reason: format!("parameter '{}' declared twice", param.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::mcp::tools::{ParamType, ToolArgs, ToolPlan};

    struct TestTool {
        name: &'static str,
    }

    impl JiraTool for TestTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "A test tool").required("message", ParamType::String, "Message")
        }

        fn plan(&self, _args: &ToolArgs<'_>, _config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
            Err(ToolError::Internal("not executable".to_string()))
        }
    }

    struct BrokenTool;

    impl JiraTool for BrokenTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("broken", "Declares a parameter twice")
                .required("key", ParamType::String, "first")
                .optional("key", ParamType::Number, "second")
        }

        fn plan(&self, _args: &ToolArgs<'_>, _config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
            Err(ToolError::Internal("not executable".to_string()))
        }
    }

    #[test]
    fn test_tool_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool { name: "first" })).unwrap();
        registry.register(Arc::new(TestTool { name: "second" })).unwrap();

        let names: Vec<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.tool_infos()[1].name, "second");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool { name: "dup" })).unwrap();

        let err = registry.register(Arc::new(TestTool { name: "dup" })).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "dup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_malformed_descriptor_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Arc::new(BrokenTool)).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool { name: "echo" })).unwrap();

        let (first, _) = registry.resolve("echo").unwrap();
        let first = first.clone();
        let (second, _) = registry.resolve("echo").unwrap();
        assert_eq!(&first, second);

        let err = registry.resolve("does_not_exist").err().unwrap();
        assert_eq!(err, ToolError::UnknownTool("does_not_exist".to_string()));
    }

    #[test]
    fn test_jira_catalog_registers_cleanly() {
        let registry = ToolRegistry::with_jira_tools().unwrap();
        let names: HashSet<&str> = registry.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), registry.len());

        for expected in [
            "jira_issue_view",
            "jira_issue_watch",
            "jira_label_add",
            "jira_issue_update_workflow",
            "jira_worklog_add",
            "jira_sprint_add",
            "jira_issue_search",
            "jira_report_worklog",
        ] {
            assert!(names.contains(expected), "missing {}", expected);
        }

        for info in registry.tool_infos() {
            assert!(info.name.starts_with("jira_"));
            assert!(info.input_schema["properties"].is_object());
        }
    }
}
