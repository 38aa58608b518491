/// Jira tool catalog.
///
/// Each tool maps its arguments onto one of three collaborators: the external
/// Jira CLI, a reporting script, or the Jira REST API. Argument values always
/// travel as separate argv tokens (or inside a serde-built JSON body), so no
/// value can be re-read as a command or break request syntax.
pub mod account;
pub mod exports;
pub mod issues;
pub mod labels;
pub mod links;
pub mod reports;
pub mod sprints;
pub mod workflow;
pub mod worklogs;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::http::basic_auth_header;
use crate::backend::{HttpInvocation, HttpMethod, InvocationRequest, ProcessInvocation};
use crate::config::{GatewayConfig, ENV_API_TOKEN, ENV_SERVER_URL, ENV_USER};
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ToolArgs};

lazy_static! {
    static ref ISSUE_KEY: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-[0-9]+$").unwrap();
}

/// Every tool the gateway exposes, in advertised order
pub fn catalog() -> Vec<Arc<dyn JiraTool>> {
    vec![
        Arc::new(issues::IssueViewTool),
        Arc::new(issues::IssueListTool),
        Arc::new(issues::IssueCreateTool),
        Arc::new(issues::IssueEditTool),
        Arc::new(issues::IssueDeleteTool),
        Arc::new(issues::IssueAssignTool),
        Arc::new(issues::IssueTransitionTool),
        Arc::new(issues::IssueCommentTool),
        Arc::new(issues::IssueWatchTool),
        Arc::new(issues::IssueCloneTool),
        Arc::new(workflow::IssueUpdateWorkflowTool),
        Arc::new(worklogs::WorklogAddTool),
        Arc::new(worklogs::WorklogListTool),
        Arc::new(sprints::SprintListTool),
        Arc::new(sprints::SprintIssuesTool),
        Arc::new(sprints::SprintAddTool),
        Arc::new(labels::LabelAddTool),
        Arc::new(labels::LabelRemoveTool),
        Arc::new(links::IssueLinkTool),
        Arc::new(links::IssueUnlinkTool),
        Arc::new(links::IssueLinkRemoteTool),
        Arc::new(exports::IssuesExportCsvTool),
        Arc::new(exports::IssueSearchTool),
        Arc::new(exports::IssueGetTool),
        Arc::new(reports::WorklogReportTool),
        Arc::new(reports::SprintReportTool),
        Arc::new(reports::VelocityReportTool),
        Arc::new(account::MeTool),
        Arc::new(account::ProjectListTool),
    ]
}

/// Validated, upper-cased issue key
pub fn issue_key(args: &ToolArgs<'_>, name: &str) -> Result<String, ToolError> {
    let raw = args.str(name)?;
    parse_issue_key(name, raw)
}

pub fn parse_issue_key(name: &str, raw: &str) -> Result<String, ToolError> {
    let key = raw.trim();
    if !ISSUE_KEY.is_match(key) {
        return Err(ToolError::validation(
            name,
            format!("'{}' is not an issue key (expected e.g. PROJ-123)", key),
        ));
    }
    Ok(key.to_ascii_uppercase())
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Argument vector builder for the Jira CLI
#[derive(Debug, Default)]
pub struct Argv(Vec<String>);

impl Argv {
    pub fn new<I, S>(head: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(head.into_iter().map(Into::into).collect())
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.0.push(value.into());
        self
    }

    /// `--flag=value` as one token, skipped when absent
    pub fn opt(mut self, flag: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.0.push(format!("{}={}", flag, value));
        }
        self
    }

    pub fn switch(mut self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.0.push(flag.to_string());
        }
        self
    }

    /// Positional values after an end-of-options marker
    pub fn positionals<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push("--".to_string());
        self.0.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Invocation of the external Jira CLI
pub fn cli(config: &GatewayConfig, argv: Argv) -> InvocationRequest {
    let mut working_env = BTreeMap::new();
    if let Some(token) = &config.api_token {
        working_env.insert(ENV_API_TOKEN.to_string(), token.clone());
    }

    InvocationRequest::Process(ProcessInvocation {
        program: config.jira_cli.clone(),
        arguments: argv.into_vec(),
        working_env,
        working_dir: Some(config.working_directory.clone()),
        timeout_ms: config.call_timeout.as_millis() as u64,
        max_output_bytes: config.max_output_bytes,
    })
}

/// Invocation of a reporting script. Parameters bind as single `-Name:value`
/// tokens so a value starting with `-` is never read as a parameter name.
pub fn script(config: &GatewayConfig, script_name: &str, params: &[(&str, String)]) -> Result<InvocationRequest, ToolError> {
    let script_path = config.reports_dir()?.join(script_name);

    let mut arguments = vec![
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-File".to_string(),
        script_path.display().to_string(),
    ];
    for (name, value) in params {
        arguments.push(format!("-{}:{}", name, value));
    }

    let mut working_env = BTreeMap::new();
    for (var, value) in [
        (ENV_SERVER_URL, &config.server_url),
        (ENV_USER, &config.username),
        (ENV_API_TOKEN, &config.api_token),
    ] {
        if let Some(value) = value {
            working_env.insert(var.to_string(), value.clone());
        }
    }

    Ok(InvocationRequest::Process(ProcessInvocation {
        program: config.script_shell.clone(),
        arguments,
        working_env,
        working_dir: Some(config.working_directory.clone()),
        timeout_ms: config.report_timeout.as_millis() as u64,
        max_output_bytes: config.max_output_bytes,
    }))
}

/// Invocation of `/rest/api/2/<segments>` with basic auth.
/// Segments are percent-encoded individually.
pub fn rest(
    config: &GatewayConfig,
    method: HttpMethod,
    segments: &[&str],
    query: &[(&str, String)],
    body: Option<Value>,
) -> Result<InvocationRequest, ToolError> {
    let (base, credentials) = config.rest_access()?;

    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ToolError::Configuration(format!("{} is invalid: {}", ENV_SERVER_URL, e)))?;
    url.path_segments_mut()
        .map_err(|_| ToolError::Configuration(format!("{} cannot be used as a base URL", ENV_SERVER_URL)))?
        .pop_if_empty()
        .extend(["rest", "api", "2"])
        .extend(segments);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), basic_auth_header(&credentials));
    headers.insert("Accept".to_string(), "application/json".to_string());

    let body = match body {
        Some(body) => {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
            Some(serde_json::to_string(&body).map_err(|e| ToolError::Internal(e.to_string()))?)
        }
        None => None,
    };

    Ok(InvocationRequest::Http(HttpInvocation {
        method,
        url: url.to_string(),
        headers,
        body,
        timeout_ms: config.call_timeout.as_millis() as u64,
    }))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::mcp::tools::{validate_arguments, ToolPlan};
    use serde_json::Map;
    use std::path::PathBuf;
    use std::time::Duration;

    pub fn config() -> GatewayConfig {
        GatewayConfig {
            server_url: Some("https://jira.example.com".to_string()),
            username: Some("dev@example.com".to_string()),
            api_token: Some("token".to_string()),
            jira_cli: PathBuf::from("/usr/local/bin/jira"),
            working_directory: PathBuf::from("/tmp"),
            reports_dir: Some(PathBuf::from("/opt/reports")),
            call_timeout: Duration::from_secs(30),
            report_timeout: Duration::from_secs(120),
            ..GatewayConfig::default()
        }
    }

    /// Validate and plan in one go, like the gateway does
    pub fn plan(tool: &dyn JiraTool, config: &GatewayConfig, args: Value) -> Result<ToolPlan, ToolError> {
        let map: Map<String, Value> = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        validate_arguments(&tool.descriptor(), &map)?;
        tool.plan(&ToolArgs::new(&map), config)
    }

    pub fn single_argv(plan: &ToolPlan) -> Vec<String> {
        match plan {
            ToolPlan::Single { request, .. } => request
                .as_process()
                .map(|p| p.arguments.clone())
                .unwrap_or_default(),
            ToolPlan::Steps(_) => Vec::new(),
        }
    }
}
