/// Tool layer: descriptors, argument validation and the mapping trait.
///
/// Every tool is one value implementing [`JiraTool`]: it describes itself
/// once and translates validated arguments into a [`ToolPlan`]. The registry
/// keeps those values; the gateway validates calls against the cached
/// descriptor before asking a tool for its plan.
pub mod jira;
pub mod registry;

pub use self::registry::ToolRegistry;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::backend::InvocationRequest;
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

/// Immutable description of one tool, built once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn required(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(name, param_type, true, description)
    }

    pub fn optional(self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.param(name, param_type, false, description)
    }

    fn param(mut self, name: &str, param_type: ParamType, required: bool, description: &str) -> Self {
        self.parameters.push(ParamSpec {
            name: name.to_string(),
            param_type,
            required,
            description: description.to_string(),
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON schema advertised through `tools/list`
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Inbound request: a tool name and its argument bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Check an argument bag against a descriptor, stopping at the first
/// violation. Values are never coerced.
pub fn validate_arguments(descriptor: &ToolDescriptor, arguments: &Map<String, Value>) -> Result<(), ToolError> {
    for param in &descriptor.parameters {
        match arguments.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ToolError::validation(&param.name, "required parameter is missing"));
                }
            }
            Some(value) => {
                if !param.param_type.matches(value) {
                    return Err(ToolError::validation(
                        &param.name,
                        format!("expected {}, got {}", param.param_type.as_str(), json_type_name(value)),
                    ));
                }
                if param.required && param.param_type == ParamType::String {
                    if value.as_str().map(|s| s.trim().is_empty()).unwrap_or(false) {
                        return Err(ToolError::validation(&param.name, "must not be empty"));
                    }
                }
            }
        }
    }

    // Deterministic order for the error message
    let mut unknown: Vec<&String> = arguments
        .keys()
        .filter(|key| descriptor.parameter(key).is_none())
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        return Err(ToolError::validation(key.as_str(), "unknown parameter"));
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed read access to a validated argument bag
#[derive(Debug, Clone, Copy)]
pub struct ToolArgs<'a> {
    values: &'a Map<String, Value>,
}

impl<'a> ToolArgs<'a> {
    pub fn new(values: &'a Map<String, Value>) -> Self {
        Self { values }
    }

    fn present(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Result<&'a str, ToolError> {
        self.opt_str(name)
            .ok_or_else(|| ToolError::validation(name, "required parameter is missing"))
    }

    /// Optional string, trimmed; blank strings count as absent
    pub fn opt_str(&self, name: &str) -> Option<&'a str> {
        self.present(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Free text kept exactly as sent (comments, descriptions)
    pub fn opt_text(&self, name: &str) -> Option<&'a str> {
        self.present(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn text(&self, name: &str) -> Result<&'a str, ToolError> {
        self.opt_text(name)
            .ok_or_else(|| ToolError::validation(name, "required parameter is missing"))
    }

    pub fn u64(&self, name: &str) -> Result<u64, ToolError> {
        self.opt_u64(name)?
            .ok_or_else(|| ToolError::validation(name, "required parameter is missing"))
    }

    /// Optional non-negative integer; fractional or negative numbers are rejected
    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>, ToolError> {
        match self.present(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| ToolError::validation(name, "must be a non-negative integer")),
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.present(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// How a successful backend output is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFormat {
    /// Output as-is
    Raw,
    /// A confirmation line, followed by any output
    Message(String),
    /// REST search response rendered one issue per line
    IssueTable,
    /// REST issue response rendered as fixed `field: value` lines
    IssueDetail,
    /// REST worklog response rendered one entry per line
    WorklogTable,
}

/// One labelled sub-operation of a multi-step tool
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub label: String,
    pub request: InvocationRequest,
}

/// What a mapping function asks the gateway to execute
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPlan {
    Single {
        request: InvocationRequest,
        reply: ReplyFormat,
    },
    Steps(Vec<PlanStep>),
}

impl ToolPlan {
    pub fn raw(request: InvocationRequest) -> Self {
        ToolPlan::Single {
            request,
            reply: ReplyFormat::Raw,
        }
    }

    pub fn message(request: InvocationRequest, message: impl Into<String>) -> Self {
        ToolPlan::Single {
            request,
            reply: ReplyFormat::Message(message.into()),
        }
    }

    pub fn structured(request: InvocationRequest, reply: ReplyFormat) -> Self {
        ToolPlan::Single { request, reply }
    }

    /// Time budget for the whole dispatch
    pub fn budget(&self) -> Duration {
        match self {
            ToolPlan::Single { request, .. } => request.timeout(),
            ToolPlan::Steps(steps) => steps
                .iter()
                .map(|s| s.request.timeout())
                .max()
                .unwrap_or_default(),
        }
    }

    pub fn requests(&self) -> Vec<&InvocationRequest> {
        match self {
            ToolPlan::Single { request, .. } => vec![request],
            ToolPlan::Steps(steps) => steps.iter().map(|s| &s.request).collect(),
        }
    }
}

/// Core trait that every gateway tool implements
pub trait JiraTool: Send + Sync {
    /// Static description; called once at registration
    fn descriptor(&self) -> ToolDescriptor;

    /// Translate validated arguments into backend invocations
    fn plan(&self, args: &ToolArgs<'_>, config: &GatewayConfig) -> Result<ToolPlan, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new("jira_issue_comment", "Add a comment")
            .required("issue_key", ParamType::String, "Issue key")
            .required("body", ParamType::String, "Comment text")
            .optional("internal", ParamType::Boolean, "Internal comment")
            .optional("limit", ParamType::Number, "Limit")
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_input_schema_lists_required_parameters() {
        let schema = descriptor().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["issue_key", "body"]));
        assert_eq!(schema["properties"]["internal"]["type"], "boolean");
        assert_eq!(schema["properties"]["limit"]["type"], "number");
    }

    #[test]
    fn test_missing_required_parameter_is_named() {
        let err = validate_arguments(&descriptor(), &args(json!({"issue_key": "PROJ-1"}))).unwrap_err();
        assert_eq!(err, ToolError::validation("body", "required parameter is missing"));

        let err = validate_arguments(&descriptor(), &args(json!({"issue_key": "PROJ-1", "body": null})))
            .unwrap_err();
        assert_eq!(err, ToolError::validation("body", "required parameter is missing"));
    }

    #[test]
    fn test_first_violation_wins() {
        let err = validate_arguments(&descriptor(), &args(json!({}))).unwrap_err();
        assert_eq!(err, ToolError::validation("issue_key", "required parameter is missing"));
    }

    #[test]
    fn test_types_are_not_coerced() {
        let err = validate_arguments(&descriptor(), &args(json!({"issue_key": 42, "body": "x"}))).unwrap_err();
        assert_eq!(err, ToolError::validation("issue_key", "expected string, got number"));

        let err = validate_arguments(
            &descriptor(),
            &args(json!({"issue_key": "PROJ-1", "body": "x", "internal": "true"})),
        )
        .unwrap_err();
        assert_eq!(err, ToolError::validation("internal", "expected boolean, got string"));
    }

    #[test]
    fn test_blank_required_string_rejected() {
        let err = validate_arguments(&descriptor(), &args(json!({"issue_key": "  ", "body": "x"}))).unwrap_err();
        assert_eq!(err, ToolError::validation("issue_key", "must not be empty"));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = validate_arguments(
            &descriptor(),
            &args(json!({"issue_key": "PROJ-1", "body": "x", "zeta": 1, "alpha": 2})),
        )
        .unwrap_err();
        assert_eq!(err, ToolError::validation("alpha", "unknown parameter"));
    }

    #[test]
    fn test_valid_arguments_pass() {
        let bag = args(json!({"issue_key": "PROJ-1", "body": "looks good", "internal": true, "limit": 5}));
        assert!(validate_arguments(&descriptor(), &bag).is_ok());

        let view = ToolArgs::new(&bag);
        assert_eq!(view.str("issue_key").unwrap(), "PROJ-1");
        assert!(view.flag("internal"));
        assert_eq!(view.opt_u64("limit").unwrap(), Some(5));
        assert_eq!(view.opt_str("missing"), None);
    }

    #[test]
    fn test_fractional_number_rejected_by_integer_accessor() {
        let bag = args(json!({"limit": 2.5}));
        let err = ToolArgs::new(&bag).opt_u64("limit").unwrap_err();
        assert_eq!(err, ToolError::validation("limit", "must be a non-negative integer"));
    }
}
