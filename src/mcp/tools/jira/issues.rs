use super::{cli, issue_key, Argv};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ToolArgs, ToolDescriptor, ToolPlan};

pub struct IssueViewTool;

impl JiraTool for IssueViewTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_view", "Show the details of a Jira issue")
            .required("issue_key", ParamType::String, "Issue key, e.g. PROJ-123")
            .optional("comments", ParamType::Number, "Number of recent comments to include")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let comments = args.opt_u64("comments")?.map(|n| n.to_string());

        let argv = Argv::new(["issue", "view"])
            .arg(key)
            .arg("--plain")
            .opt("--comments", comments.as_deref());
        Ok(ToolPlan::raw(cli(config, argv)))
    }
}

pub struct IssueListTool;

impl JiraTool for IssueListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_list", "List issues, optionally filtered by JQL, project, status or assignee")
            .optional("jql", ParamType::String, "Raw JQL filter")
            .optional("project", ParamType::String, "Project key")
            .optional("status", ParamType::String, "Status name")
            .optional("assignee", ParamType::String, "Assignee name or e-mail")
            .optional("limit", ParamType::Number, "Maximum number of issues")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let limit = match args.opt_u64("limit")? {
            Some(0) => return Err(ToolError::validation("limit", "must be at least 1")),
            Some(n) => Some(format!("0:{}", n)),
            None => None,
        };

        let argv = Argv::new(["issue", "list", "--plain", "--no-truncate"])
            .opt("--jql", args.opt_text("jql"))
            .opt("--project", args.opt_str("project"))
            .opt("--status", args.opt_str("status"))
            .opt("--assignee", args.opt_str("assignee"))
            .opt("--paginate", limit.as_deref());
        Ok(ToolPlan::raw(cli(config, argv)))
    }
}

pub struct IssueCreateTool;

impl JiraTool for IssueCreateTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_create", "Create a new issue")
            .required("project", ParamType::String, "Project key")
            .required("issue_type", ParamType::String, "Issue type, e.g. Task or Bug")
            .required("summary", ParamType::String, "One-line summary")
            .optional("description", ParamType::String, "Issue body")
            .optional("priority", ParamType::String, "Priority name")
            .optional("assignee", ParamType::String, "Assignee name or e-mail")
            .optional("labels", ParamType::String, "Comma-separated labels")
            .optional("parent", ParamType::String, "Parent issue or epic key")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let project = args.str("project")?;
        let parent = match args.opt_str("parent") {
            Some(raw) => Some(super::parse_issue_key("parent", raw)?),
            None => None,
        };

        let mut argv = Argv::new(["issue", "create", "--no-input"])
            .opt("--project", Some(project))
            .opt("--type", Some(args.str("issue_type")?))
            .opt("--summary", Some(args.text("summary")?))
            .opt("--body", args.opt_text("description"))
            .opt("--priority", args.opt_str("priority"))
            .opt("--assignee", args.opt_str("assignee"))
            .opt("--parent", parent.as_deref());
        if let Some(raw) = args.opt_str("labels") {
            for label in super::labels::parse_labels(raw)? {
                argv = argv.opt("--label", Some(label.as_str()));
            }
        }

        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Created issue in project {}", project),
        ))
    }
}

pub struct IssueEditTool;

impl JiraTool for IssueEditTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_edit", "Edit the summary, description or priority of an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .optional("summary", ParamType::String, "New summary")
            .optional("description", ParamType::String, "New description")
            .optional("priority", ParamType::String, "New priority")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let summary = args.opt_text("summary");
        let description = args.opt_text("description");
        let priority = args.opt_str("priority");
        if summary.is_none() && description.is_none() && priority.is_none() {
            return Err(ToolError::validation(
                "summary",
                "at least one of summary, description or priority is required",
            ));
        }

        let argv = Argv::new(["issue", "edit", "--no-input"])
            .opt("--summary", summary)
            .opt("--body", description)
            .opt("--priority", priority)
            .positionals([key.as_str()]);
        Ok(ToolPlan::message(cli(config, argv), format!("Updated {}", key)))
    }
}

pub struct IssueDeleteTool;

impl JiraTool for IssueDeleteTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_delete", "Delete an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .optional("cascade", ParamType::Boolean, "Also delete sub-tasks")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let argv = Argv::new(["issue", "delete"])
            .arg(key.as_str())
            .switch("--cascade", args.flag("cascade"));
        Ok(ToolPlan::message(cli(config, argv), format!("Deleted {}", key)))
    }
}

pub struct IssueAssignTool;

impl JiraTool for IssueAssignTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_assign", "Assign an issue to a user")
            .required("issue_key", ParamType::String, "Issue key")
            .required("assignee", ParamType::String, "Assignee name or e-mail; 'x' unassigns")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let assignee = args.str("assignee")?;
        let argv = Argv::new(["issue", "assign"]).positionals([key.as_str(), assignee]);
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Assigned {} to {}", key, assignee),
        ))
    }
}

pub struct IssueTransitionTool;

impl JiraTool for IssueTransitionTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_transition", "Move an issue to another workflow status")
            .required("issue_key", ParamType::String, "Issue key")
            .required("status", ParamType::String, "Target status, e.g. In Progress")
            .optional("comment", ParamType::String, "Comment added with the transition")
            .optional("resolution", ParamType::String, "Resolution name")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let status = args.str("status")?;
        let argv = transition_argv(&key, status, args.opt_text("comment"), args.opt_str("resolution"));
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Moved {} to {}", key, status),
        ))
    }
}

pub(super) fn transition_argv(key: &str, status: &str, comment: Option<&str>, resolution: Option<&str>) -> Argv {
    Argv::new(["issue", "move"])
        .opt("--comment", comment)
        .opt("--resolution", resolution)
        .positionals([key, status])
}

pub struct IssueCommentTool;

impl JiraTool for IssueCommentTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_comment", "Add a comment to an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .required("body", ParamType::String, "Comment text")
            .optional("internal", ParamType::Boolean, "Restrict the comment to internal users")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let argv = comment_argv(&key, args.text("body")?, args.flag("internal"));
        Ok(ToolPlan::message(cli(config, argv), format!("Commented on {}", key)))
    }
}

pub(super) fn comment_argv(key: &str, body: &str, internal: bool) -> Argv {
    Argv::new(["issue", "comment", "add", "--no-input"])
        .switch("--internal", internal)
        .positionals([key, body])
}

pub struct IssueWatchTool;

impl JiraTool for IssueWatchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_watch", "Add a watcher to an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .optional("watcher", ParamType::String, "Watcher name or e-mail; defaults to JIRA_USER")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let watcher = match args.opt_str("watcher") {
            Some(watcher) => watcher,
            None => config.username()?,
        };
        let argv = Argv::new(["issue", "watch"]).positionals([key.as_str(), watcher]);
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("{} is now watching {}", watcher, key),
        ))
    }
}

pub struct IssueCloneTool;

impl JiraTool for IssueCloneTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_clone", "Clone an issue")
            .required("issue_key", ParamType::String, "Issue key to clone")
            .optional("summary", ParamType::String, "Summary for the clone")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let argv = Argv::new(["issue", "clone"])
            .opt("--summary", args.opt_text("summary"))
            .positionals([key.as_str()]);
        Ok(ToolPlan::message(cli(config, argv), format!("Cloned {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::jira::testing::{config, plan, single_argv};
    use crate::mcp::tools::ReplyFormat;
    use serde_json::json;

    #[test]
    fn test_view_builds_plain_view() {
        let plan = plan(&IssueViewTool, &config(), json!({"issue_key": "proj-7", "comments": 3})).unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "view", "PROJ-7", "--plain", "--comments=3"]
        );
    }

    #[test]
    fn test_view_rejects_malformed_key() {
        let err = plan(&IssueViewTool, &config(), json!({"issue_key": "PROJ-1 && reboot"})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "issue_key"));
    }

    #[test]
    fn test_list_filters_are_single_tokens() {
        let plan = plan(
            &IssueListTool,
            &config(),
            json!({"jql": "summary ~ \"a; b\"", "project": "PROJ", "limit": 20}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec![
                "issue",
                "list",
                "--plain",
                "--no-truncate",
                "--jql=summary ~ \"a; b\"",
                "--project=PROJ",
                "--paginate=0:20"
            ]
        );
    }

    #[test]
    fn test_create_passes_labels_separately() {
        let plan = plan(
            &IssueCreateTool,
            &config(),
            json!({
                "project": "PROJ",
                "issue_type": "Bug",
                "summary": "Crash on `save`; really",
                "labels": "ui, backend",
            }),
        )
        .unwrap();
        let argv = single_argv(&plan);
        assert!(argv.contains(&"--summary=Crash on `save`; really".to_string()));
        assert!(argv.contains(&"--label=ui".to_string()));
        assert!(argv.contains(&"--label=backend".to_string()));
        assert!(matches!(plan, ToolPlan::Single { reply: ReplyFormat::Message(_), .. }));
    }

    #[test]
    fn test_edit_requires_a_change() {
        let err = plan(&IssueEditTool, &config(), json!({"issue_key": "PROJ-1"})).unwrap_err();
        assert!(err.to_string().contains("at least one of"));

        let plan = plan(&IssueEditTool, &config(), json!({"issue_key": "PROJ-1", "priority": "High"})).unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "edit", "--no-input", "--priority=High", "--", "PROJ-1"]
        );
    }

    #[test]
    fn test_comment_starting_with_dash_stays_positional() {
        let plan = plan(
            &IssueCommentTool,
            &config(),
            json!({"issue_key": "PROJ-1", "body": "--help me; `rm -rf /`"}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "comment", "add", "--no-input", "--", "PROJ-1", "--help me; `rm -rf /`"]
        );
    }

    #[test]
    fn test_watch_defaults_to_configured_user() {
        let plan = plan(&IssueWatchTool, &config(), json!({"issue_key": "PROJ-1"})).unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "watch", "--", "PROJ-1", "dev@example.com"]
        );

        let mut bare = config();
        bare.username = None;
        let err = super::super::testing::plan(&IssueWatchTool, &bare, json!({"issue_key": "PROJ-1"})).unwrap_err();
        assert!(matches!(err, ToolError::Configuration(msg) if msg.contains("JIRA_USER")));
    }

    #[test]
    fn test_transition_with_comment() {
        let plan = plan(
            &IssueTransitionTool,
            &config(),
            json!({"issue_key": "PROJ-1", "status": "In Progress", "comment": "picked up"}),
        )
        .unwrap();
        assert_eq!(
            single_argv(&plan),
            vec!["issue", "move", "--comment=picked up", "--", "PROJ-1", "In Progress"]
        );
    }

    #[test]
    fn test_delete_cascade_switch() {
        let plan = plan(&IssueDeleteTool, &config(), json!({"issue_key": "PROJ-1", "cascade": true})).unwrap();
        assert_eq!(single_argv(&plan), vec!["issue", "delete", "PROJ-1", "--cascade"]);
    }
}
