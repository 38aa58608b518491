/// Result normalizer: turns backend outcomes into the `{text, isError}`
/// envelope returned for every dispatch.
use serde::Deserialize;

use crate::backend::{BackendError, InvocationResult};
use crate::mcp::errors::ToolError;
use crate::mcp::protocol::{CallToolResult, ToolContent};
use crate::mcp::tools::ReplyFormat;

/// Uniform dispatch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub text: String,
    pub is_error: bool,
}

impl Envelope {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// MCP `tools/call` result payload
    pub fn to_call_result(&self) -> CallToolResult {
        CallToolResult {
            content: vec![ToolContent::text(self.text.clone())],
            is_error: self.is_error,
        }
    }
}

const PARTIAL_COMPLETION_NOTE: &str = "(the operation may have partially completed on the Jira side)";

/// Error text, with a partial-completion note for timeouts
fn describe_failure(error: &ToolError) -> String {
    match error {
        ToolError::BackendTimeout { .. } => format!("{} {}", error, PARTIAL_COMPLETION_NOTE),
        other => other.to_string(),
    }
}

/// Error envelope for a dispatch that failed before or during execution
pub fn error_envelope(tool: &str, error: &ToolError) -> Envelope {
    Envelope::failure(format!("Error [{}]: {}", tool, describe_failure(error)))
}

/// Map a backend failure onto the dispatch taxonomy
pub fn backend_error(error: &BackendError) -> ToolError {
    match error {
        BackendError::Timeout { timeout_ms } => ToolError::BackendTimeout {
            timeout_ms: *timeout_ms,
        },
        other => ToolError::BackendFailure(other.to_string()),
    }
}

fn failure_of(result: &InvocationResult) -> ToolError {
    match &result.error {
        Some(error) => backend_error(error),
        None => ToolError::BackendFailure("backend reported failure without a diagnostic".to_string()),
    }
}

/// Normalize a single backend result.
pub fn normalize(tool: &str, result: InvocationResult, reply: &ReplyFormat) -> Envelope {
    if !result.succeeded {
        return error_envelope(tool, &failure_of(&result));
    }

    let output = result.output.trim();
    let rendered = match reply {
        ReplyFormat::Raw if output.is_empty() => Ok(format!("{} completed successfully", tool)),
        ReplyFormat::Raw => Ok(output.to_string()),
        ReplyFormat::Message(message) if output.is_empty() => Ok(message.clone()),
        ReplyFormat::Message(message) => Ok(format!("{}\n\n{}", message, output)),
        ReplyFormat::IssueTable => render_issue_table(output),
        ReplyFormat::IssueDetail => render_issue_detail(output),
        ReplyFormat::WorklogTable => render_worklog_table(output),
    };

    match rendered {
        Ok(text) => Envelope::success(text),
        Err(e) => error_envelope(
            tool,
            &ToolError::BackendFailure(format!("unexpected response format: {}", e)),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    Failed(String),
    Skipped(String),
}

/// Outcome of one labelled step of a multi-step tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub label: String,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn from_result(label: impl Into<String>, result: &InvocationResult) -> Self {
        let status = if result.succeeded {
            StepStatus::Ok
        } else {
            StepStatus::Failed(describe_failure(&failure_of(result)))
        };
        Self {
            label: label.into(),
            status,
        }
    }

    pub fn skipped(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: StepStatus::Skipped(reason.into()),
        }
    }
}

/// Per-step summary; an error if any step did not succeed.
pub fn normalize_steps(tool: &str, outcomes: &[StepOutcome]) -> Envelope {
    let succeeded = outcomes.iter().filter(|o| o.status == StepStatus::Ok).count();

    let mut lines = vec![format!(
        "{}: {} of {} step(s) succeeded",
        tool,
        succeeded,
        outcomes.len()
    )];
    for outcome in outcomes {
        lines.push(match &outcome.status {
            StepStatus::Ok => format!("[ok] {}", outcome.label),
            StepStatus::Failed(reason) => format!("[failed] {}: {}", outcome.label, reason),
            StepStatus::Skipped(reason) => format!("[skipped] {}: {}", outcome.label, reason),
        });
    }

    Envelope {
        text: lines.join("\n"),
        is_error: succeeded != outcomes.len(),
    }
}

// Jira REST v2 response shapes; only the fields that get rendered.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    issues: Vec<IssueResponse>,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<Named>,
    #[serde(default)]
    issuetype: Option<Named>,
    #[serde(default)]
    priority: Option<Named>,
    #[serde(default)]
    assignee: Option<Person>,
    #[serde(default)]
    reporter: Option<Person>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct WorklogResponse {
    worklogs: Vec<Worklog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Worklog {
    #[serde(default)]
    author: Option<Person>,
    #[serde(default)]
    started: Option<String>,
    #[serde(default)]
    time_spent: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

fn cell(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.replace(['\n', '\r'], " "),
        None => "-".to_string(),
    }
}

fn name_of(named: &Option<Named>) -> String {
    cell(named.as_ref().map(|n| n.name.as_str()))
}

fn person_of(person: &Option<Person>) -> String {
    match person {
        Some(p) => cell(Some(&p.display_name)),
        None => "Unassigned".to_string(),
    }
}

fn render_issue_table(body: &str) -> Result<String, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let shown = response.issues.len() as u64;
    let total = response.total.unwrap_or(shown);

    let mut lines = Vec::with_capacity(response.issues.len() + 2);
    if total > shown {
        lines.push(format!("Found {} issue(s), showing {}", total, shown));
    } else {
        lines.push(format!("Found {} issue(s)", shown));
    }
    if response.issues.is_empty() {
        return Ok(lines.join("\n"));
    }

    lines.push("KEY | TYPE | STATUS | PRIORITY | ASSIGNEE | SUMMARY".to_string());
    for issue in &response.issues {
        let f = &issue.fields;
        lines.push(format!(
            "{} | {} | {} | {} | {} | {}",
            issue.key,
            name_of(&f.issuetype),
            name_of(&f.status),
            name_of(&f.priority),
            person_of(&f.assignee),
            cell(f.summary.as_deref()),
        ));
    }
    Ok(lines.join("\n"))
}

fn render_issue_detail(body: &str) -> Result<String, serde_json::Error> {
    let issue: IssueResponse = serde_json::from_str(body)?;
    let f = &issue.fields;

    let labels = if f.labels.is_empty() {
        "-".to_string()
    } else {
        f.labels.join(", ")
    };
    let mut lines = vec![
        format!("Key: {}", issue.key),
        format!("Summary: {}", cell(f.summary.as_deref())),
        format!("Type: {}", name_of(&f.issuetype)),
        format!("Status: {}", name_of(&f.status)),
        format!("Priority: {}", name_of(&f.priority)),
        format!("Assignee: {}", person_of(&f.assignee)),
        format!("Reporter: {}", person_of(&f.reporter)),
        format!("Labels: {}", labels),
        format!("Created: {}", cell(f.created.as_deref())),
        format!("Updated: {}", cell(f.updated.as_deref())),
    ];
    match f.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => lines.push(format!("Description:\n{}", description)),
        None => lines.push("Description: -".to_string()),
    }
    Ok(lines.join("\n"))
}

fn render_worklog_table(body: &str) -> Result<String, serde_json::Error> {
    let response: WorklogResponse = serde_json::from_str(body)?;
    if response.worklogs.is_empty() {
        return Ok("No worklogs recorded".to_string());
    }

    let mut lines = vec![
        format!("{} worklog(s)", response.worklogs.len()),
        "STARTED | AUTHOR | TIME SPENT | COMMENT".to_string(),
    ];
    for log in &response.worklogs {
        lines.push(format!(
            "{} | {} | {} | {}",
            cell(log.started.as_deref()),
            cell(log.author.as_ref().map(|a| a.display_name.as_str())),
            cell(log.time_spent.as_deref()),
            cell(log.comment.as_deref()),
        ));
    }
    Ok(lines.join("\n"))
}
