use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, warn};

use super::{truncate_diagnostic, BackendError, HttpBackend, HttpInvocation, HttpMethod, InvocationResult};
use crate::config::JiraCredentials;

/// HTTP backend on top of `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpBackend {
    client: reqwest::Client,
}

impl ReqwestHttpBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

/// `Authorization` header value for HTTP basic auth
pub fn basic_auth_header(credentials: &JiraCredentials) -> String {
    let pair = format!("{}:{}", credentials.username, credentials.api_token);
    format!("Basic {}", STANDARD.encode(pair))
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpBackend for ReqwestHttpBackend {
    async fn call(&self, invocation: HttpInvocation) -> InvocationResult {
        debug!("{} {}", invocation.method.as_str(), invocation.url);

        let mut request = self
            .client
            .request(to_reqwest_method(invocation.method), &invocation.url)
            .timeout(Duration::from_millis(invocation.timeout_ms));
        for (name, value) in &invocation.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = invocation.body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("{} {} timed out", invocation.method.as_str(), invocation.url);
                return InvocationResult::failure(BackendError::Timeout {
                    timeout_ms: invocation.timeout_ms,
                });
            }
            Err(e) => {
                warn!("{} {} failed: {}", invocation.method.as_str(), invocation.url, e);
                return InvocationResult::failure(BackendError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return InvocationResult::failure(BackendError::Timeout {
                    timeout_ms: invocation.timeout_ms,
                });
            }
            Err(e) => {
                return InvocationResult::failure(BackendError::Transport(format!(
                    "failed to read response body: {}",
                    e
                )));
            }
        };

        if status.is_success() {
            InvocationResult::success(body)
        } else {
            warn!("{} {} returned {}", invocation.method.as_str(), invocation.url, status);
            InvocationResult::failure(BackendError::HttpStatus {
                status: status.as_u16(),
                snippet: truncate_diagnostic(&body),
            })
        }
    }
}
