//! Per-invocation request context.

use tokio::time::Instant;
use uuid::Uuid;

use crate::catalog::Operation;

/// Correlation state for a single tool invocation.
///
/// Carries the trace id that appears in the `X-Request-Id` header, in every
/// log line, and in the returned envelope. The attempt counter is the only
/// mutable field.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    operation: Operation,
    attempt: u32,
    started: Instant,
}

impl RequestContext {
    /// Creates a context, generating a fresh trace id when none is given.
    #[must_use]
    pub fn new(operation: Operation, trace_id: Option<String>) -> Self {
        let trace_id = trace_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { trace_id, operation, attempt: 0, started: Instant::now() }
    }

    /// The trace id for this invocation.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The operation being executed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The number of attempts started so far.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Starts a new attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Milliseconds elapsed since the invocation started.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
