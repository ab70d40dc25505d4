//! The request execution pipeline.
//!
//! `execute` runs validate → call → normalize for one tool invocation and
//! always returns an envelope; no error ever propagates to the caller.
//! Retry bookkeeping lives in the per-invocation [`RequestContext`], so
//! cancellation (the caller dropping the future) and tracing stay local.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, AuthProvider};
use crate::catalog::{self, Operation, OperationSpec};
use crate::config::Settings;
use crate::context::RequestContext;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::schema;
use crate::transport::{classify, HttpTransport, Outcome, RawResponse, TransportError};

/// Executes tool operations against the upstream API.
///
/// All shared resources (HTTP client, auth provider, rate limiter,
/// settings) are constructed here once and live for the process lifetime.
pub struct Orchestrator {
    settings: Arc<Settings>,
    transport: HttpTransport,
    auth: AuthProvider,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl Orchestrator {
    /// Builds the orchestrator and every shared resource from settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(settings: Settings) -> Result<Self> {
        let transport = HttpTransport::new(&settings)?;
        let auth = AuthProvider::from_settings(&settings, transport.client());
        let limiter = RateLimiter::new(settings.rate_limit.max_requests, settings.rate_limit.window);
        let policy = RetryPolicy::new(&settings.retry);
        Ok(Self { settings: Arc::new(settings), transport, auth, limiter, policy })
    }

    /// The settings this orchestrator was built from.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Releases per-process auth state. Called during graceful shutdown;
    /// in-flight invocations are unaffected.
    pub fn shutdown(&self) {
        self.auth.clear();
    }

    /// Executes one tool invocation and returns its envelope.
    ///
    /// Unknown operations, invalid arguments, upstream failures and
    /// transport failures all surface as `ok: false` envelopes carrying
    /// the trace id.
    pub async fn execute(
        &self,
        operation: &str,
        arguments: Value,
        trace_id: Option<String>,
    ) -> Envelope {
        let Some(op) = Operation::parse(operation) else {
            let trace_id = trace_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            warn!(trace_id = %trace_id, operation, "unknown operation");
            return Envelope::internal(
                trace_id,
                format!("unknown_operation: no tool named `{operation}`"),
            );
        };

        let mut ctx = RequestContext::new(op, trace_id);
        let envelope = self.run(&mut ctx, arguments).await;
        info!(
            trace_id = ctx.trace_id(),
            operation = op.as_str(),
            attempts = ctx.attempt(),
            latency_ms = ctx.elapsed_ms(),
            outcome = envelope.kind(),
            "tool invocation finished"
        );
        envelope
    }

    async fn run(&self, ctx: &mut RequestContext, arguments: Value) -> Envelope {
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Envelope::validation(
                    ctx.trace_id(),
                    vec![schema::Issue {
                        path: String::new(),
                        message: "arguments must be an object".to_string(),
                        code: "type",
                    }],
                )
            }
        };

        let issues = schema::validate(ctx.operation(), &args);
        if !issues.is_empty() {
            debug!(trace_id = ctx.trace_id(), count = issues.len(), "validation failed");
            return Envelope::validation(ctx.trace_id(), issues);
        }

        let spec = catalog::spec_for(ctx.operation());
        let path = catalog::render_path(spec, &args);
        self.call_with_retries(ctx, spec, &path, &args).await
    }

    /// The retry loop: acquire a rate-limit token, fetch auth, send, and
    /// classify, until success, a terminal failure, or budget exhaustion.
    async fn call_with_retries(
        &self,
        ctx: &mut RequestContext,
        spec: &'static OperationSpec,
        path: &str,
        args: &Map<String, Value>,
    ) -> Envelope {
        // Soft upper bound on the whole invocation.
        let deadline = Instant::now()
            + self.settings.request_timeout * self.policy.max_attempts().max(1);
        let mut auth_stale_used = false;

        loop {
            let attempt = ctx.begin_attempt();

            if Instant::now() >= deadline {
                return Envelope::transport(
                    ctx.trace_id(),
                    "invocation deadline exceeded",
                    "deadline",
                    attempt,
                );
            }

            if !self.limiter.acquire(self.settings.request_timeout).await {
                let err = TransportError::RateLimitLocal;
                if self.policy.attempts_remaining(attempt) {
                    warn!(trace_id = ctx.trace_id(), attempt, "local rate limit exhausted, retrying");
                    tokio::time::sleep(self.policy.backoff_delay(attempt)).await;
                    continue;
                }
                return Envelope::transport(ctx.trace_id(), err.to_string(), err.cause(), attempt);
            }

            let auth_value = match self.auth.header_for().await {
                Ok((_, value)) => value,
                Err(AuthError::Unconfigured) => {
                    return Envelope::internal(
                        ctx.trace_id(),
                        "auth_unconfigured: no credentials available for this environment",
                    );
                }
                Err(AuthError::RefreshFailed { status, message }) => {
                    return Envelope::upstream(
                        ctx.trace_id(),
                        status,
                        Some("auth_refresh_failed".to_string()),
                        message,
                        None,
                        None,
                    );
                }
            };

            let raw = match self
                .transport
                .send(spec, path, args, &auth_value, ctx.trace_id())
                .await
            {
                Ok(raw) => raw,
                Err(err) => {
                    if self.policy.attempts_remaining(attempt) {
                        let delay = self.policy.backoff_delay(attempt);
                        warn!(
                            trace_id = ctx.trace_id(),
                            attempt,
                            cause = err.cause(),
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Envelope::transport(
                        ctx.trace_id(),
                        err.to_string(),
                        err.cause(),
                        attempt,
                    );
                }
            };

            match classify(&raw) {
                Outcome::Success => {
                    let data = schema::shape_response(&raw, spec);
                    return Envelope::success(
                        ctx.operation().as_str(),
                        ctx.trace_id(),
                        data,
                        raw.status,
                        ctx.elapsed_ms(),
                    );
                }
                Outcome::AuthStale => {
                    // One invalidate-and-retry per invocation, without a
                    // backoff delay; the attempt still counts.
                    if !auth_stale_used && self.policy.attempts_remaining(attempt) {
                        auth_stale_used = true;
                        debug!(trace_id = ctx.trace_id(), attempt, "401 received, refreshing auth");
                        self.auth.invalidate();
                        continue;
                    }
                    return upstream_envelope(ctx, &raw, None);
                }
                Outcome::RateLimited { retry_after } => {
                    if self.policy.attempts_remaining(attempt) {
                        let delay = match retry_after {
                            Some(d) => self.policy.server_delay(d),
                            None => self.policy.backoff_delay(attempt),
                        };
                        warn!(
                            trace_id = ctx.trace_id(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "upstream rate limited, waiting"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return upstream_envelope(ctx, &raw, retry_after);
                }
                Outcome::Transient => {
                    if self.policy.attempts_remaining(attempt) {
                        let delay = self.policy.backoff_delay(attempt);
                        warn!(
                            trace_id = ctx.trace_id(),
                            attempt,
                            status = raw.status,
                            delay_ms = delay.as_millis() as u64,
                            "transient upstream failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return upstream_envelope(ctx, &raw, None);
                }
                Outcome::ClientError | Outcome::ServerError => {
                    return upstream_envelope(ctx, &raw, None);
                }
            }
        }
    }
}

/// Builds an upstream error envelope, extracting `code`, `message` and
/// `details` from a JSON body when present.
fn upstream_envelope(
    ctx: &RequestContext,
    raw: &RawResponse,
    retry_after: Option<std::time::Duration>,
) -> Envelope {
    let body = raw.json().and_then(Value::as_object);
    let code = body
        .and_then(|map| map.get("code").or_else(|| map.get("error_code")))
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = body
        .and_then(|map| map.get("message").or_else(|| map.get("error")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", raw.status));
    let details = body.and_then(|map| map.get("details")).cloned();

    Envelope::upstream(
        ctx.trace_id(),
        raw.status,
        code,
        message,
        details,
        retry_after.map(|d| d.as_millis() as u64),
    )
}
