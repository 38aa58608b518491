use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_SERVER_URL: &str = "JIRA_SERVER_URL";
pub const ENV_USER: &str = "JIRA_USER";
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";
pub const ENV_CLI_PATH: &str = "JIRA_CLI_PATH";
pub const ENV_WORKDIR: &str = "JIRA_WORKDIR";
pub const ENV_REPORTS_DIR: &str = "JIRA_REPORTS_DIR";
pub const ENV_SCRIPT_SHELL: &str = "JIRA_SCRIPT_SHELL";
pub const ENV_TIMEOUT_MS: &str = "JIRA_GATEWAY_TIMEOUT_MS";
pub const ENV_REPORT_TIMEOUT_MS: &str = "JIRA_GATEWAY_REPORT_TIMEOUT_MS";
pub const ENV_MAX_OUTPUT_BYTES: &str = "JIRA_GATEWAY_MAX_OUTPUT_BYTES";
pub const ENV_MAX_CONCURRENT: &str = "JIRA_GATEWAY_MAX_CONCURRENT";
pub const ENV_LOG_DIR: &str = "JIRA_GATEWAY_LOG_DIR";

pub const DEFAULT_CLI_PATH: &str = "jira";
pub const DEFAULT_SCRIPT_SHELL: &str = "pwsh";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_REPORT_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Stderr lines starting with one of these do not turn a zero exit into a failure.
pub const DEFAULT_INFORMATIONAL_PREFIXES: &[&str] = &["WARNING:", "VERBOSE:", "INFO:", "✓"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not set ({purpose})")]
    Missing { var: &'static str, purpose: &'static str },

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Basic-auth pair for the REST collaborator.
#[derive(Clone)]
pub struct JiraCredentials {
    pub username: String,
    pub api_token: String,
}

impl fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Gateway configuration, read once at startup and shared read-only.
#[derive(Clone)]
pub struct GatewayConfig {
    /// REST base URL, e.g. `https://example.atlassian.net`
    pub server_url: Option<String>,

    /// Jira username or account e-mail
    pub username: Option<String>,

    /// API token used for basic auth and forwarded to child processes
    pub api_token: Option<String>,

    /// External Jira CLI program
    pub jira_cli: PathBuf,

    /// Working directory for child processes
    pub working_directory: PathBuf,

    /// Directory holding the reporting scripts
    pub reports_dir: Option<PathBuf>,

    /// Interpreter used to run reporting scripts
    pub script_shell: PathBuf,

    /// Budget for one CLI or REST dispatch
    pub call_timeout: Duration,

    /// Budget for one report-script dispatch
    pub report_timeout: Duration,

    /// Capture ceiling per output stream
    pub max_output_bytes: usize,

    /// System-wide cap on concurrent backend invocations
    pub max_concurrent_calls: usize,

    /// Stderr prefixes treated as informational
    pub informational_prefixes: Vec<String>,

    /// Optional directory for a rolling log file
    pub log_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            username: None,
            api_token: None,
            jira_cli: PathBuf::from(DEFAULT_CLI_PATH),
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            reports_dir: None,
            script_shell: PathBuf::from(DEFAULT_SCRIPT_SHELL),
            call_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            report_timeout: Duration::from_millis(DEFAULT_REPORT_TIMEOUT_MS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT,
            informational_prefixes: DEFAULT_INFORMATIONAL_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            log_dir: None,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("jira_cli", &self.jira_cli)
            .field("working_directory", &self.working_directory)
            .field("reports_dir", &self.reports_dir)
            .field("script_shell", &self.script_shell)
            .field("call_timeout", &self.call_timeout)
            .field("report_timeout", &self.report_timeout)
            .field("max_output_bytes", &self.max_output_bytes)
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl GatewayConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Missing collaborators are left as `None` and reported when a tool
    /// first needs them; malformed values fail here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let server_url = match get(ENV_SERVER_URL) {
            Some(url) => Some(validate_server_url(&url)?),
            None => None,
        };

        Ok(Self {
            server_url,
            username: get(ENV_USER),
            api_token: get(ENV_API_TOKEN),
            jira_cli: get(ENV_CLI_PATH).map(PathBuf::from).unwrap_or(defaults.jira_cli),
            working_directory: get(ENV_WORKDIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.working_directory),
            reports_dir: get(ENV_REPORTS_DIR).map(PathBuf::from),
            script_shell: get(ENV_SCRIPT_SHELL)
                .map(PathBuf::from)
                .unwrap_or(defaults.script_shell),
            call_timeout: parse_millis(ENV_TIMEOUT_MS, get(ENV_TIMEOUT_MS))?
                .unwrap_or(defaults.call_timeout),
            report_timeout: parse_millis(ENV_REPORT_TIMEOUT_MS, get(ENV_REPORT_TIMEOUT_MS))?
                .unwrap_or(defaults.report_timeout),
            max_output_bytes: parse_positive(ENV_MAX_OUTPUT_BYTES, get(ENV_MAX_OUTPUT_BYTES))?
                .unwrap_or(defaults.max_output_bytes),
            max_concurrent_calls: parse_positive(ENV_MAX_CONCURRENT, get(ENV_MAX_CONCURRENT))?
                .unwrap_or(defaults.max_concurrent_calls),
            informational_prefixes: defaults.informational_prefixes,
            log_dir: get(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// REST base URL and credentials, or the first missing variable.
    pub fn rest_access(&self) -> Result<(&str, JiraCredentials), ConfigError> {
        let server_url = self.server_url.as_deref().ok_or(ConfigError::Missing {
            var: ENV_SERVER_URL,
            purpose: "required for REST-backed tools",
        })?;
        let username = self.username.clone().ok_or(ConfigError::Missing {
            var: ENV_USER,
            purpose: "required for REST-backed tools",
        })?;
        let api_token = self.api_token.clone().ok_or(ConfigError::Missing {
            var: ENV_API_TOKEN,
            purpose: "required for REST-backed tools",
        })?;
        Ok((server_url, JiraCredentials { username, api_token }))
    }

    pub fn reports_dir(&self) -> Result<&PathBuf, ConfigError> {
        self.reports_dir.as_ref().ok_or(ConfigError::Missing {
            var: ENV_REPORTS_DIR,
            purpose: "required for reporting tools",
        })
    }

    pub fn username(&self) -> Result<&str, ConfigError> {
        self.username.as_deref().ok_or(ConfigError::Missing {
            var: ENV_USER,
            purpose: "used as the default user",
        })
    }
}

fn validate_server_url(raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::Invalid {
        var: ENV_SERVER_URL,
        reason: e.to_string(),
    })?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Invalid {
            var: ENV_SERVER_URL,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_millis(var: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_positive::<u64>(var, raw)?.map(Duration::from_millis))
}

fn parse_positive<T>(var: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("'{}': {}", raw, e),
    })?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.jira_cli, PathBuf::from("jira"));
        assert_eq!(config.call_timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.max_concurrent_calls, DEFAULT_MAX_CONCURRENT);
        assert!(config.server_url.is_none());
    }

    #[test]
    fn test_missing_rest_settings_reported_at_first_use() {
        let config = GatewayConfig::from_lookup(lookup(&[(ENV_SERVER_URL, "https://jira.example.com/")]))
            .unwrap();
        assert_eq!(config.server_url.as_deref(), Some("https://jira.example.com"));

        let err = config.rest_access().unwrap_err();
        assert!(err.to_string().contains(ENV_USER));
    }

    #[test]
    fn test_invalid_numbers_are_fatal() {
        let err = GatewayConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_TIMEOUT_MS, .. }));

        let err = GatewayConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENT, "0")])).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_rejects_non_http_server_url() {
        let err = GatewayConfig::from_lookup(lookup(&[(ENV_SERVER_URL, "ftp://jira.example.com")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (ENV_USER, "dev@example.com"),
            (ENV_API_TOKEN, "s3cr3t-token"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cr3t-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
