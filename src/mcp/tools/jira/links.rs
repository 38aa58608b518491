use super::{cli, issue_key, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ToolArgs, ToolDescriptor, ToolPlan};

pub struct IssueLinkTool;

impl JiraTool for IssueLinkTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_link", "Link two issues")
            .required("inward_key", ParamType::String, "Inward issue key")
            .required("outward_key", ParamType::String, "Outward issue key")
            .required("link_type", ParamType::String, "Link type, e.g. Blocks or Relates")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let inward = issue_key(args, "inward_key")?;
        let outward = issue_key(args, "outward_key")?;
        let link_type = args.str("link_type")?;

        let argv = Argv::new(["issue", "link"]).positionals([inward.as_str(), outward.as_str(), link_type]);
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Linked {} -> {} ({})", inward, outward, link_type),
        ))
    }
}

pub struct IssueUnlinkTool;

impl JiraTool for IssueUnlinkTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_unlink", "Remove the link between two issues")
            .required("inward_key", ParamType::String, "Inward issue key")
            .required("outward_key", ParamType::String, "Outward issue key")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let inward = issue_key(args, "inward_key")?;
        let outward = issue_key(args, "outward_key")?;

        let argv = Argv::new(["issue", "unlink"]).positionals([inward.as_str(), outward.as_str()]);
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Unlinked {} and {}", inward, outward),
        ))
    }
}

pub struct IssueLinkRemoteTool;

impl JiraTool for IssueLinkRemoteTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_link_remote", "Attach a web link to an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .required("url", ParamType::String, "http(s) URL")
            .required("title", ParamType::String, "Link title")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let url = args.str("url")?;
        match reqwest::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ToolError::validation("url", "expected an http(s) URL")),
        }
        let title = args.text("title")?;

        let argv = Argv::new(["issue", "link", "remote"]).positionals([key.as_str(), url, title]);
        Ok(ToolPlan::message(cli(config, argv), format!("Linked {} to {}", key, url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::testing::{config, plan, single_argv};
    use serde_json::json;

    #[test]
    fn test_link_argv() {
        let plan = plan(
            &IssueLinkTool,
            &config(),
            json!({"inward_key": "PROJ-1", "outward_key": "PROJ-2", "link_type": "Blocks"}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "link", "--", "PROJ-1", "PROJ-2", "Blocks"]
        );
    }

    #[test]
    fn test_remote_link_requires_http_url() {
        let err = plan(
            &IssueLinkRemoteTool,
            &config(),
            json!({"issue_key": "PROJ-1", "url": "file:///etc/passwd", "title": "x"}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "url"));

        let plan = plan(
            &IssueLinkRemoteTool,
            &config(),
            json!({"issue_key": "PROJ-1", "url": "https://ci.example.com/run/1", "title": "CI run \"#1\""}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "link", "remote", "--", "PROJ-1", "https://ci.example.com/run/1", "CI run \"#1\""]
        );
    }
}
