use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

use super::{cli, issue_key, rest, Argv};
use crate::backend::HttpMethod;
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ReplyFormat, ToolArgs, ToolDescriptor, ToolPlan};

lazy_static! {
    // Jira duration syntax: "1h 30m", "2d", "0.5h"
    static ref TIME_SPENT: Regex = Regex::new(r"^\d+(\.\d+)?[wdhm](\s+\d+(\.\d+)?[wdhm])*$").unwrap();
}

const STARTED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct WorklogAddTool;

impl JiraTool for WorklogAddTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_worklog_add", "Log time spent on an issue")
            .required("issue_key", ParamType::String, "Issue key")
            .required("time_spent", ParamType::String, "Duration, e.g. '1h 30m' or '2d'")
            .optional("comment", ParamType::String, "Worklog comment")
            .optional("started", ParamType::String, "Start time, 'YYYY-MM-DD HH:MM:SS'")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let time_spent = args.str("time_spent")?;
        if !TIME_SPENT.is_match(time_spent) {
            return Err(ToolError::validation(
                "time_spent",
                format!("'{}' is not a Jira duration (e.g. 1h 30m)", time_spent),
            ));
        }
        let started = args.opt_str("started");
        if let Some(started) = started {
            NaiveDateTime::parse_from_str(started, STARTED_FORMAT).map_err(|_| {
                ToolError::validation("started", "expected 'YYYY-MM-DD HH:MM:SS'")
            })?;
        }

        let argv = Argv::new(["issue", "worklog", "add", "--no-input"])
            .opt("--comment", args.opt_text("comment"))
            .opt("--started", started)
            .positionals([key.as_str(), time_spent]);
        Ok(ToolPlan::message(
            cli(config, argv),
            format!("Logged {} on {}", time_spent, key),
        ))
    }
}

pub struct WorklogListTool;

impl JiraTool for WorklogListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_worklog_list", "List the worklogs recorded on an issue")
            .required("issue_key", ParamType::String, "Issue key")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let key = issue_key(args, "issue_key")?;
        let request = rest(config, HttpMethod::Get, &["issue", key.as_str(), "worklog"], &[], None)?;
        Ok(ToolPlan::structured(request, ReplyFormat::WorklogTable))
    }
}
