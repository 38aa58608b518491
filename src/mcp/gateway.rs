/// Dispatch gateway: the single path every tool call takes.
///
/// resolve -> validate -> plan -> execute (bounded, under one deadline) ->
/// normalize. Whatever happens along the way, the caller gets an
/// [`Envelope`] back.
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{
    BackendError, HttpBackend, InvocationRequest, InvocationResult, ProcessBackend, ReqwestHttpBackend,
    TokioProcessBackend,
};
use crate::config::GatewayConfig;
use crate::mcp::errors::ToolError;
use crate::mcp::normalize::{error_envelope, normalize, normalize_steps, Envelope, StepOutcome};
use crate::mcp::tools::{validate_arguments, ToolArgs, ToolCall, ToolPlan, ToolRegistry};

pub struct Gateway {
    registry: Arc<ToolRegistry>,
    config: Arc<GatewayConfig>,
    process: Arc<dyn ProcessBackend>,
    http: Arc<dyn HttpBackend>,
    /// System-wide cap on concurrent backend invocations
    permits: Arc<Semaphore>,
}

impl Gateway {
    pub fn new(
        registry: Arc<ToolRegistry>,
        config: Arc<GatewayConfig>,
        process: Arc<dyn ProcessBackend>,
        http: Arc<dyn HttpBackend>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_calls.max(1)));
        Self {
            registry,
            config,
            process,
            http,
            permits,
        }
    }

    /// Gateway wired to the real process and HTTP backends
    pub fn with_default_backends(registry: Arc<ToolRegistry>, config: Arc<GatewayConfig>) -> Self {
        let process = Arc::new(TokioProcessBackend::new(config.informational_prefixes.clone()));
        let http = Arc::new(ReqwestHttpBackend::new());
        Self::new(registry, config, process, http)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one tool call to completion. Never panics and never fails.
    pub async fn dispatch(&self, call: ToolCall) -> Envelope {
        let execution_id = Uuid::new_v4();
        let span = info_span!("dispatch", tool = %call.name, %execution_id);
        let tool_name = call.name.clone();

        let outcome = AssertUnwindSafe(self.dispatch_inner(call).instrument(span.clone()))
            .catch_unwind()
            .await;

        match outcome {
            Ok(envelope) => envelope,
            Err(panic) => {
                span.in_scope(|| error!("Tool call panicked: {}", panic_message(panic.as_ref())));
                error_envelope(
                    &tool_name,
                    &ToolError::Internal("unexpected failure while handling the call".to_string()),
                )
            }
        }
    }

    async fn dispatch_inner(&self, call: ToolCall) -> Envelope {
        let started = Instant::now();

        let (descriptor, tool) = match self.registry.resolve(&call.name) {
            Ok(found) => found,
            Err(e) => {
                warn!("Rejected call: {}", e);
                return error_envelope(&call.name, &e);
            }
        };

        if let Err(e) = validate_arguments(descriptor, &call.arguments) {
            warn!("Rejected call: {}", e);
            return error_envelope(&call.name, &e);
        }

        let plan = match tool.plan(&ToolArgs::new(&call.arguments), &self.config) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Rejected call: {}", e);
                return error_envelope(&call.name, &e);
            }
        };

        let budget = plan.budget();
        let deadline = started + budget;
        debug!("Executing {} request(s) within {:?}", plan.requests().len(), budget);

        let envelope = match plan {
            ToolPlan::Single { request, reply } => {
                let result = self.execute(request, deadline).await;
                normalize(&call.name, result, &reply)
            }
            ToolPlan::Steps(steps) => {
                let mut outcomes = Vec::with_capacity(steps.len());
                for step in steps {
                    if Instant::now() >= deadline {
                        outcomes.push(StepOutcome::skipped(step.label, "call deadline exceeded"));
                        continue;
                    }
                    let result = self.execute(step.request, deadline).await;
                    outcomes.push(StepOutcome::from_result(step.label, &result));
                }
                normalize_steps(&call.name, &outcomes)
            }
        };

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            is_error = envelope.is_error,
            "Dispatch finished"
        );
        envelope
    }

    /// Run one request through its backend. Waiting for a permit counts
    /// against the same deadline.
    async fn execute(&self, request: InvocationRequest, deadline: Instant) -> InvocationResult {
        let timeout = request.timeout();
        let work = async {
            let _permit = match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    return InvocationResult::failure(BackendError::Transport(
                        "gateway is shutting down".to_string(),
                    ));
                }
            };
            match request {
                InvocationRequest::Process(invocation) => self.process.run(invocation).await,
                InvocationRequest::Http(invocation) => self.http.call(invocation).await,
            }
        };

        match tokio::time::timeout_at(deadline, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Backend call exceeded the call deadline");
                InvocationResult::timed_out(timeout)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
