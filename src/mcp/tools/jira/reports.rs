use chrono::NaiveDate;

use super::script;
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::tools::{JiraTool, ParamType, ToolArgs, ToolDescriptor, ToolPlan};

pub const WORKLOG_REPORT_SCRIPT: &str = "Get-WorklogReport.ps1";
pub const SPRINT_REPORT_SCRIPT: &str = "Get-SprintReport.ps1";
pub const VELOCITY_REPORT_SCRIPT: &str = "Get-VelocityReport.ps1";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_SPRINT_COUNT: u64 = 5;
const MAX_SPRINT_COUNT: u64 = 50;

fn parse_date(args: &ToolArgs<'_>, name: &str) -> Result<NaiveDate, ToolError> {
    let raw = args.str(name)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ToolError::validation(name, format!("'{}' is not a YYYY-MM-DD date", raw)))
}

pub struct WorklogReportTool;

impl JiraTool for WorklogReportTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_report_worklog", "Worklog report for a date range")
            .required("from", ParamType::String, "First day, YYYY-MM-DD")
            .required("to", ParamType::String, "Last day, YYYY-MM-DD")
            .optional("user", ParamType::String, "Restrict to one user")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let from = parse_date(args, "from")?;
        let to = parse_date(args, "to")?;
        if from > to {
            return Err(ToolError::validation("to", "must not be earlier than 'from'"));
        }

        let mut params = vec![
            ("From", from.format(DATE_FORMAT).to_string()),
            ("To", to.format(DATE_FORMAT).to_string()),
        ];
        if let Some(user) = args.opt_str("user") {
            params.push(("User", user.to_string()));
        }
        Ok(ToolPlan::raw(script(config, WORKLOG_REPORT_SCRIPT, &params)?))
    }
}

pub struct SprintReportTool;

impl JiraTool for SprintReportTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_report_sprint", "Summary report for one sprint")
            .required("sprint_id", ParamType::Number, "Sprint id")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let sprint_id = args.u64("sprint_id")?;
        let params = [("SprintId", sprint_id.to_string())];
        Ok(ToolPlan::raw(script(config, SPRINT_REPORT_SCRIPT, &params)?))
    }
}

pub struct VelocityReportTool;

impl JiraTool for VelocityReportTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("jira_report_velocity", "Velocity across the most recent sprints of a board")
            .required("board_id", ParamType::Number, "Board id")
            .optional("sprint_count", ParamType::Number, "Number of sprints (default 5)")
    }

    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError> {
        let board_id = args.u64("board_id")?;
        let sprint_count = args.opt_u64("sprint_count")?.unwrap_or(DEFAULT_SPRINT_COUNT);
        if sprint_count == 0 || sprint_count > MAX_SPRINT_COUNT {
            return Err(ToolError::validation(
                "sprint_count",
                format!("must be between 1 and {}", MAX_SPRINT_COUNT),
            ));
        }

        let params = [
            ("BoardId", board_id.to_string()),
            ("SprintCount", sprint_count.to_string()),
        ];
        Ok(ToolPlan::raw(script(config, VELOCITY_REPORT_SCRIPT, &params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::mcp::tools::jira::testing::{config, plan, single_argv};
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_worklog_report_invocation() {
        let config = config();
        let plan = plan(
            &WorklogReportTool,
            &config,
            json!({"from": "2024-03-01", "to": "2024-03-31", "user": "bob"}),
        )
        .unwrap();

        let process = plan.requests()[0].as_process().unwrap().clone();
        assert_eq!(process.program, PathBuf::from("pwsh"));
        assert_eq!(process.timeout_ms, 120_000);
        assert_eq!(
            single_argv(&plan),
            vec![
                "-NoProfile",
                "-NonInteractive",
                "-File",
                "/opt/reports/Get-WorklogReport.ps1",
                "-From:2024-03-01",
                "-To:2024-03-31",
                "-User:bob"
            ]
        );
        assert_eq!(process.working_env.get("JIRA_USER").map(String::as_str), Some("dev@example.com"));
    }

    #[test]
    fn test_dash_leading_user_stays_a_value() {
        let plan = plan(
            &WorklogReportTool,
            &config(),
            json!({"from": "2024-01-01", "to": "2024-01-31", "user": "-From"}),
        )
        .unwrap();

        let argv = single_argv(&plan);
        assert_eq!(argv.last().map(String::as_str), Some("-User:-From"));
        assert_eq!(argv.iter().filter(|a| a.starts_with("-From")).count(), 1);
    }

    #[test]
    fn test_worklog_report_date_checks() {
        let err = plan(&WorklogReportTool, &config(), json!({"from": "2024-13-01", "to": "2024-03-31"})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "from"));

        let err = plan(&WorklogReportTool, &config(), json!({"from": "2024-03-31", "to": "2024-03-01"})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "to"));
    }

    #[test]
    fn test_velocity_defaults_and_bounds() {
        let ok = plan(&VelocityReportTool, &config(), json!({"board_id": 7})).unwrap();
        assert!(single_argv(&ok).ends_with(&["-BoardId:7".to_string(), "-SprintCount:5".to_string()]));

        let err = plan(&VelocityReportTool, &config(), json!({"board_id": 7, "sprint_count": 500})).unwrap_err();
        assert!(matches!(err, ToolError::Validation { parameter, .. } if parameter == "sprint_count"));
    }

    #[test]
    fn test_reports_need_reports_dir() {
        let bare = GatewayConfig::default();
        let err = plan(&SprintReportTool, &bare, json!({"sprint_id": 3})).unwrap_err();
        assert!(matches!(err, ToolError::Configuration(_)));
    }
}
