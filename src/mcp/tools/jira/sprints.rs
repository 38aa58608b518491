use super::{cli, parse_issue_key, split_list, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ToolArgs, ToolDescriptor, ToolPlan};

const SPRINT_STATES: &[&str] = &["active", "closed", "future"];

pub struct SprintListTool;

impl JiraTool for SprintListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_sprint_list", "List sprints of the configured board")
            .optional("state", ParamType::String, "One of active, closed, future")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let state = args.opt_str("state");
        if let Some(state) = state {
            if !SPRINT_STATES.contains(&state) {
                return Err(ToolError::validation(
                    "state",
                    format!("expected one of {}", SPRINT_STATES.join(", ")),
                ));
            }
        }

        let argv = Argv::new(["sprint", "list", "--table", "--plain"]).opt("--state", state);
        Ok(ToolPlan::raw(cli(config, argv)))
    }
}

pub struct SprintIssuesTool;

impl JiraTool for SprintIssuesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_sprint_issues", "List the issues in a sprint")
            .required("sprint_id", ParamType::Number, "Sprint id")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let sprint_id = args.u64("sprint_id")?;
        let argv = Argv::new(["sprint", "list"])
            .arg(sprint_id.to_string())
            .arg("--plain");
        Ok(ToolPlan::raw(cli(config, argv)))
    }
}

pub struct SprintAddTool;

impl JiraTool for SprintAddTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_sprint_add", "Move issues into a sprint")
            .required("sprint_id", ParamType::Number, "Sprint id")
            .required("issue_keys", ParamType::String, "Comma-separated issue keys")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let sprint_id = args.u64("sprint_id")?;
        let keys = split_list(args.str("issue_keys")?)
            .iter()
            .map(|raw| parse_issue_key("issue_keys", raw))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(ToolError::validation("issue_keys", "no issue keys given"));
        }

        let message = format!("Added {} to sprint {}", keys.join(", "), sprint_id);
        let argv = Argv::new(["sprint", "add"])
            .arg(sprint_id.to_string())
            .positionals(keys);
        Ok(ToolPlan::message(cli(config, argv), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::testing::{config, plan, single_argv};
    use serde_json::json;

    #[test]
    fn test_sprint_add_splits_keys() {
        let plan = plan(
            &SprintAddTool,
            &config(),
            json!({"sprint_id": 42, "issue_keys": "PROJ-1, proj-2 ,"}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["sprint", "add", "42", "--", "PROJ-1", "PROJ-2"]
        );
    }

    #[test]
    fn test_sprint_add_rejects_bad_key() {
        let err = plan(
            &SprintAddTool,
            &config(),
            json!({"sprint_id": 42, "issue_keys": "PROJ-1,$(id)"}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "issue_keys"));
    }

    #[test]
    fn test_sprint_id_must_be_integer() {
        let err = plan(&SprintIssuesTool, &config(), json!({"sprint_id": -3})).unwrap_err();
        assert_eq!(err, ToolError::validation("sprint_id", "must be a non-negative integer"));
    }

    #[test]
    fn test_sprint_list_state() {
        let ok = plan(&SprintListTool, &config(), json!({"state": "active"})).unwrap();
        assert_eq!(single_argv(&ok), vec!["sprint", "list", "--table", "--plain", "--state=active"]);
        assert!(plan(&SprintListTool, &config(), json!({"state": "open; ls"})).is_err());
    }
}
