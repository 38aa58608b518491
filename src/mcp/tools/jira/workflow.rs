use super::issues::{comment_argv, transition_argv};
use super::{cli, issue_key, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, PlanStep, ToolArgs, ToolDescriptor, ToolPlan};

/// Transition, reassign and comment in one call.
///
/// Each requested change is its own CLI call; later steps still run when an
/// earlier one fails and the reply lists every step.
pub struct IssueUpdateWorkflowTool;

impl JiraTool for IssueUpdateWorkflowTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "jira_issue_update_workflow",
            "Update status, assignee and/or add a comment in one call; reports each step",
        )
        .required("issue_key", ParamType::String, "Issue key")
        .optional("status", ParamType::String, "Target status")
        .optional("assignee", ParamType::String, "New assignee")
        .optional("comment", ParamType::String, "Comment to add")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let mut steps = Vec::new();

        if let Some(status) = args.opt_str("status") {
            steps.push(PlanStep {
                label: format!("status -> {}", status),
                request: cli(config, transition_argv(&key, status, None, None)),
            });
        }
        if let Some(assignee) = args.opt_str("assignee") {
            steps.push(PlanStep {
                label: format!("assign -> {}", assignee),
                request: cli(config, Argv::new(["issue", "assign"]).positionals([key.as_str(), assignee])),
            });
        }
        if let Some(comment) = args.opt_text("comment") {
            steps.push(PlanStep {
                label: "comment".to_string(),
                request: cli(config, comment_argv(&key, comment, false)),
            });
        }

        if steps.is_empty() {
            return Err(ToolError::validation(
                "status",
                "at least one of status, assignee or comment is required",
            ));
        }
        Ok(ToolPlan::Steps(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::testing::{config, plan};
    use serde_json::json;

    #[test]
    fn test_steps_follow_fixed_order() {
        let plan = plan(
            &IssueUpdateWorkflowTool,
            &config(),
            json!({"issue_key": "PROJ-1", "comment": "done", "assignee": "bob", "status": "Done"}),
        )
        .unwrap();

        let ToolPlan::Steps(steps) = plan else {
            panic!("expected a multi-step plan");
        };
        let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["status -> Done", "assign -> bob", "comment"]);
        assert_eq!(
            steps[1].request.as_process().unwrap().arguments,
            vec!["issue", "assign", "--", "PROJ-1", "bob"]
        );
    }

    #[test]
    fn test_requires_at_least_one_change() {
        let err = plan(&IssueUpdateWorkflowTool, &config(), json!({"issue_key": "PROJ-1"})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));
    }
}
