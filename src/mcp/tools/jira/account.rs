use super::{cli, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ToolArgs, ToolDescriptor, ToolPlan};

pub struct MeTool;

impl JiraTool for MeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_me", "Show the account the Jira CLI is logged in as")
    }

    fn plan(&self, _args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        Ok(ToolPlan::raw(cli(config, Argv::new(["me"]))))
    }
}

pub struct ProjectListTool;

impl JiraTool for ProjectListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_project_list", "List the projects visible to the account")
    }

    fn plan(&self, _args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        Ok(ToolPlan::raw(cli(config, Argv::new(["project", "list"]))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::testing::{config, plan, single_argv};
    use serde_json::json;

    #[test]
    fn test_parameterless_tools() {
        let me = plan(&MeTool, &config(), json!({})).unwrap();
        assert_eq!(single_argv(&me), vec!["me"]);

        let projects = plan(&ProjectListTool, &config(), json!({})).unwrap();
        assert_eq!(single_argv(&projects), vec!["project", "list"]);

        let err = plan(&MeTool, &config(), json!({"verbose": true})).unwrap_err();
        assert_eq!(err, ToolError::validation("verbose", "unknown parameter"));
    }
}
