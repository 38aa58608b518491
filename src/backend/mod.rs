/// Invocation backends: the two ways the gateway reaches an external system.
///
/// A mapping function produces an [`InvocationRequest`]; the gateway hands it
/// to the matching backend, which always answers with an [`InvocationResult`]
/// and never fails past its own boundary.
pub mod http;
pub mod process;

pub use self::http::ReqwestHttpBackend;
pub use self::process::TokioProcessBackend;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Longest diagnostic carried inside a failed result
pub const MAX_DIAGNOSTIC_CHARS: usize = 2_000;

/// External process invocation, built as an argument vector and never as a
/// shell string.
#[derive(Clone, PartialEq)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub arguments: Vec<String>,
    /// Environment overlay on top of the gateway's own environment
    pub working_env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl fmt::Debug for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Overlay values carry credentials.
        let env_keys: Vec<&String> = self.working_env.keys().collect();
        f.debug_struct("ProcessInvocation")
            .field("program", &self.program)
            .field("arguments", &self.arguments)
            .field("working_env", &env_keys)
            .field("working_dir", &self.working_dir)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_output_bytes", &self.max_output_bytes)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// External HTTP invocation
#[derive(Clone, PartialEq)]
pub struct HttpInvocation {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl fmt::Debug for HttpInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpInvocation")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body_len", &self.body.as_ref().map(|b| b.len()))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// One concrete external call
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationRequest {
    Process(ProcessInvocation),
    Http(HttpInvocation),
}

impl InvocationRequest {
    pub fn timeout(&self) -> Duration {
        match self {
            InvocationRequest::Process(p) => Duration::from_millis(p.timeout_ms),
            InvocationRequest::Http(h) => Duration::from_millis(h.timeout_ms),
        }
    }

    pub fn as_process(&self) -> Option<&ProcessInvocation> {
        match self {
            InvocationRequest::Process(p) => Some(p),
            InvocationRequest::Http(_) => None,
        }
    }

    pub fn as_http(&self) -> Option<&HttpInvocation> {
        match self {
            InvocationRequest::Http(h) => Some(h),
            InvocationRequest::Process(_) => None,
        }
    }
}

/// Why a backend call did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("timeout")]
    Timeout { timeout_ms: u64 },

    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("exited with {status}: {diagnostic}")]
    ExitStatus { status: String, diagnostic: String },

    #[error("reported errors on stderr: {0}")]
    Stderr(String),

    #[error("HTTP {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    #[error("request failed: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout { .. })
    }
}

/// Raw outcome of one backend call, consumed immediately by the normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub succeeded: bool,
    pub output: String,
    pub error: Option<BackendError>,
}

impl InvocationResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(error: BackendError) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            error: Some(error),
        }
    }

    pub fn timed_out(timeout: Duration) -> Self {
        Self::failure(BackendError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

/// Executes external programs
#[async_trait]
pub trait ProcessBackend: Send + Sync {
    async fn run(&self, invocation: ProcessInvocation) -> InvocationResult;
}

/// Executes HTTP requests
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn call(&self, invocation: HttpInvocation) -> InvocationResult;
}

/// Cut a diagnostic down to [`MAX_DIAGNOSTIC_CHARS`] on a char boundary.
pub fn truncate_diagnostic(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_DIAGNOSTIC_CHARS) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_diagnostic_respects_char_boundaries() {
        let long = "é".repeat(MAX_DIAGNOSTIC_CHARS + 10);
        let cut = truncate_diagnostic(&long);
        assert!(cut.ends_with("... [truncated]"));
        assert_eq!(cut.chars().filter(|c| *c == 'é').count(), MAX_DIAGNOSTIC_CHARS);

        assert_eq!(truncate_diagnostic("  short  "), "short");
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Basic c2VjcmV0".to_string());
        let http = HttpInvocation {
            method: HttpMethod::Get,
            url: "https://jira.example.com/rest/api/2/myself".to_string(),
            headers,
            body: None,
            timeout_ms: 1_000,
        };
        assert!(!format!("{:?}", http).contains("c2VjcmV0"));

        let mut env = BTreeMap::new();
        env.insert("JIRA_API_TOKEN".to_string(), "tok-123".to_string());
        let process = ProcessInvocation {
            program: PathBuf::from("jira"),
            arguments: vec!["me".to_string()],
            working_env: env,
            working_dir: None,
            timeout_ms: 1_000,
            max_output_bytes: 1_024,
        };
        let rendered = format!("{:?}", process);
        assert!(rendered.contains("JIRA_API_TOKEN"));
        assert!(!rendered.contains("tok-123"));
    }

    #[test]
    fn test_timeout_error_displays_as_timeout() {
        let result = InvocationResult::timed_out(Duration::from_millis(250));
        assert!(!result.succeeded);
        assert_eq!(result.error.as_ref().map(|e| e.to_string()), Some("timeout".to_string()));
        assert!(result.error.unwrap().is_timeout());
    }
}
