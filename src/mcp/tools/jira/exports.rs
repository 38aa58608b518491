use serde_json::json;

use super::{cli, issue_key, rest, Argv};
use crate::backend::HttpMethod;
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ReplyFormat, ToolArgs, ToolDescriptor, ToolPlan};

const DEFAULT_MAX_RESULTS: u64 = 50;
const MAX_RESULTS_CEILING: u64 = 1_000;

/// Fields the issue table and detail renderers read
pub const SEARCH_FIELDS: &[&str] = &["summary", "status", "assignee", "issuetype", "priority"];
pub const DETAIL_FIELDS: &[&str] = &[
    "summary",
    "status",
    "assignee",
    "reporter",
    "issuetype",
    "priority",
    "labels",
    "created",
    "updated",
    "description",
];

pub struct IssuesExportCsvTool;

impl JiraTool for IssuesExportCsvTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issues_export_csv", "Export the issues matching a JQL query as CSV")
            .required("jql", ParamType::String, "JQL query")
            .optional("limit", ParamType::Number, "Maximum number of issues")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let paginate = match args.opt_u64("limit")? {
            Some(0) => return Err(ToolError::validation("limit", "must be at least 1")),
            Some(n) => Some(format!("0:{}", n)),
            None => None,
        };

        let argv = Argv::new(["issue", "list", "--csv"])
            .opt("--jql", Some(args.text("jql")?))
            .opt("--paginate", paginate.as_deref());
        Ok(ToolPlan::raw(cli(config, argv)))
    }
}

pub struct IssueSearchTool;

impl JiraTool for IssueSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_search", "Search issues with JQL through the REST API")
            .required("jql", ParamType::String, "JQL query")
            .optional("max_results", ParamType::Number, "Maximum number of issues (default 50)")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let jql = args.text("jql")?;
        let max_results = args.opt_u64("max_results")?.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 || max_results > MAX_RESULTS_CEILING {
            return Err(ToolError::validation(
                "max_results",
                format!("must be between 1 and {}", MAX_RESULTS_CEILING),
            ));
        }

        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": SEARCH_FIELDS,
        });
        let request = rest(config, HttpMethod::Post, &["search"], &[], Some(body))?;
        Ok(ToolPlan::structured(request, ReplyFormat::IssueTable))
    }
}

pub struct IssueGetTool;

impl JiraTool for IssueGetTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_get", "Fetch one issue through the REST API")
            .required("issue_key", ParamType::String, "Issue key")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let request = rest(
            config,
            HttpMethod::Get,
            &["issue", key.as_str()],
            &[("fields", DETAIL_FIELDS.join(","))],
            None,
        )?;
        Ok(ToolPlan::structured(request, ReplyFormat::IssueDetail))
    }
}
