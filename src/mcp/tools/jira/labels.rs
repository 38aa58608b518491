use super::{cli, issue_key, split_list, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ToolArgs, ToolDescriptor, ToolPlan};

/// Split and check a comma-separated label list.
///
/// Labels cannot contain whitespace in Jira, and a leading `-` is how the CLI
/// spells removal, so both are rejected up front.
pub fn parse_labels(raw: &str) -> Result<Vec<String>, ToolError> {
    let labels = split_list(raw);
    if labels.is_empty() {
        return Err(ToolError::validation("labels", "no labels given"));
    }
    for label in &labels {
        if label.chars().any(char::is_whitespace) {
            return Err(ToolError::validation(
                "labels",
                format!("label '{}' contains whitespace", label),
            ));
        }
        if label.starts_with('-') {
            return Err(ToolError::validation(
                "labels",
                format!("label '{}' must not start with '-'", label),
            ));
        }
    }
    Ok(labels)
}

pub struct LabelAddTool;

impl JiraTool for LabelAddTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_label_add", "Add labels to an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .required("labels", ParamType::String, "Comma-separated labels to add")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let labels = parse_labels(args.str("labels")?)?;

        let mut argv = Argv::new(["issue", "edit"]).arg(key.as_str()).arg("--no-input");
        for label in &labels {
            argv = argv.arg("--label").arg(label.as_str());
        }
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Added label(s) {} to {}", labels.join(", "), key),
        ))
    }
}

pub struct LabelRemoveTool;

impl JiraTool for LabelRemoveTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_label_remove", "Remove labels from an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .required("labels", ParamType::String, "Comma-separated labels to remove")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let labels = parse_labels(args.str("labels")?)?;

        let mut argv = Argv::new(["issue", "edit"]).arg(key.as_str()).arg("--no-input");
        for label in &labels {
            argv = argv.arg(format!("--label=-{}", label));
        }
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Removed label(s) {} from {}", labels.join(", "), key),
        ))
    }
}
