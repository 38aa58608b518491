use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{truncate_diagnostic, BackendError, InvocationResult, ProcessBackend, ProcessInvocation};

const READ_CHUNK: usize = 8 * 1024;

/// Process backend on top of `tokio::process`
#[derive(Debug, Clone)]
pub struct TokioProcessBackend {
    informational_prefixes: Vec<String>,
}

/// Bytes kept from one output stream
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl TokioProcessBackend {
    pub fn new(informational_prefixes: Vec<String>) -> Self {
        Self {
            informational_prefixes,
        }
    }

    /// Stderr that is not made only of informational lines
    fn significant_stderr(&self, stderr: &str) -> Option<String> {
        let significant: Vec<&str> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                !self
                    .informational_prefixes
                    .iter()
                    .any(|prefix| line.starts_with(prefix.as_str()))
            })
            .collect();

        if significant.is_empty() {
            None
        } else {
            Some(significant.join("\n"))
        }
    }
}

#[async_trait]
impl ProcessBackend for TokioProcessBackend {
    async fn run(&self, invocation: ProcessInvocation) -> InvocationResult {
        let program = invocation.program.display().to_string();
        debug!("Running {} with {} argument(s)", program, invocation.arguments.len());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.arguments)
            .envs(&invocation.working_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to launch {}: {}", program, e);
                return InvocationResult::failure(BackendError::Launch {
                    program,
                    reason: describe_spawn_error(&e),
                });
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = invocation.max_output_bytes;
        let timeout = Duration::from_millis(invocation.timeout_ms);

        let outcome = tokio::time::timeout(timeout, async {
            tokio::join!(
                child.wait(),
                capture_bounded(stdout, limit),
                capture_bounded(stderr, limit)
            )
        })
        .await;

        let (status, stdout, stderr) = match outcome {
            Ok((Ok(status), stdout, stderr)) => (status, stdout.unwrap_or_default(), stderr.unwrap_or_default()),
            Ok((Err(e), _, _)) => {
                let _ = child.start_kill();
                return InvocationResult::failure(BackendError::Launch {
                    program,
                    reason: format!("failed while waiting for exit: {}", e),
                });
            }
            Err(_) => {
                warn!("{} exceeded {}ms, terminating", program, invocation.timeout_ms);
                if let Err(e) = child.start_kill() {
                    debug!("Kill after timeout failed (process likely gone): {}", e);
                }
                let _ = child.wait().await;
                return InvocationResult::failure(BackendError::Timeout {
                    timeout_ms: invocation.timeout_ms,
                });
            }
        };

        let stdout_text = stdout.text();
        let stderr_text = stderr.text();

        if !status.success() {
            let status = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "a signal".to_string(),
            };
            let diagnostic = if stderr_text.trim().is_empty() {
                stdout_text.as_str()
            } else {
                stderr_text.as_str()
            };
            return InvocationResult::failure(BackendError::ExitStatus {
                status,
                diagnostic: truncate_diagnostic(diagnostic),
            });
        }

        if let Some(stderr) = self.significant_stderr(&stderr_text) {
            return InvocationResult::failure(BackendError::Stderr(truncate_diagnostic(&stderr)));
        }

        let mut output = stdout_text;
        if stdout.truncated {
            output.push_str(&format!("\n[output truncated at {} bytes]", limit));
        }
        InvocationResult::success(output)
    }
}

/// Read a stream to its end, keeping at most `limit` bytes and discarding the
/// rest so a chatty child never blocks on a full pipe.
async fn capture_bounded<R>(reader: Option<R>, limit: usize) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut reader) = reader else {
        return Ok(captured);
    };

    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(captured.bytes.len());
        if n > room {
            captured.truncated = true;
        }
        captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok(captured)
}

fn describe_spawn_error(error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => "program not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::Instant;

    fn backend() -> TokioProcessBackend {
        TokioProcessBackend::new(vec!["WARNING:".to_string()])
    }

    fn invocation(program: &str, arguments: &[&str]) -> ProcessInvocation {
        ProcessInvocation {
            program: PathBuf::from(program),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            working_env: BTreeMap::new(),
            working_dir: None,
            timeout_ms: 5_000,
            max_output_bytes: 64 * 1024,
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_failed_result() {
        let result = backend()
            .run(invocation("/definitely/not/a/real/jira-binary", &["me"]))
            .await;
        assert!(!result.succeeded);
        match result.error {
            Some(BackendError::Launch { reason, .. }) => assert_eq!(reason, "program not found"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arguments_reach_the_program_verbatim() {
        let hostile = ["it's \"quoted\"", "a; rm -rf /", "`whoami`", "$(id)", "--flag"];
        let mut args = vec!["-c", "printf '%s\\n' \"$@\"", "sh"];
        args.extend(hostile.iter());

        let result = backend().run(invocation("sh", &args)).await;
        assert!(result.succeeded, "{:?}", result.error);
        let lines: Vec<&str> = result.output.lines().collect();
        assert_eq!(lines, hostile.to_vec());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_overlay_and_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut inv = invocation("sh", &["-c", "printf '%s|%s' \"$JIRA_API_TOKEN\" \"$(pwd)\""]);
        inv.working_env.insert("JIRA_API_TOKEN".to_string(), "tok".to_string());
        inv.working_dir = Some(dir.path().to_path_buf());

        let result = backend().run(inv).await;
        assert!(result.succeeded);
        let (token, cwd) = result.output.split_once('|').unwrap();
        assert_eq!(token, "tok");
        assert_eq!(
            PathBuf::from(cwd).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_terminates_the_process() {
        let mut inv = invocation("sleep", &["10"]);
        inv.timeout_ms = 200;

        let started = Instant::now();
        let result = backend().run(inv).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!result.succeeded);
        assert_eq!(result.error, Some(BackendError::Timeout { timeout_ms: 200 }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr_diagnostic() {
        let result = backend()
            .run(invocation("sh", &["-c", "echo 'issue does not exist' >&2; exit 3"]))
            .await;
        assert!(!result.succeeded);
        match result.error {
            Some(BackendError::ExitStatus { status, diagnostic }) => {
                assert_eq!(status, "exit code 3");
                assert_eq!(diagnostic, "issue does not exist");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_with_zero_exit() {
        let result = backend()
            .run(invocation("sh", &["-c", "echo ok; echo 'WARNING: slow server' >&2"]))
            .await;
        assert!(result.succeeded);
        assert_eq!(result.output.trim(), "ok");

        let result = backend()
            .run(invocation("sh", &["-c", "echo ok; echo 'field not editable' >&2"]))
            .await;
        assert!(!result.succeeded);
        assert_eq!(
            result.error,
            Some(BackendError::Stderr("field not editable".to_string()))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runaway_output_is_bounded() {
        let mut inv = invocation("sh", &["-c", "head -c 200000 /dev/zero | tr '\\0' 'a'"]);
        inv.max_output_bytes = 1_000;

        let result = backend().run(inv).await;
        assert!(result.succeeded);
        assert!(result.output.starts_with(&"a".repeat(1_000)));
        assert!(result.output.ends_with("[output truncated at 1000 bytes]"));
    }
}
