//! The uniform response envelope returned from every invocation.
//!
//! Every orchestrator call yields exactly one of the five envelope shapes;
//! callers never see an error type. The untagged serde representation
//! keeps the serialized form the flat map the tool protocol expects.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::Issue;

/// Successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    /// Always `true`.
    pub ok: bool,
    /// Tool operation name.
    pub operation: String,
    /// Trace id for this invocation.
    pub trace_id: String,
    /// Normalized upstream response body.
    pub data: Map<String, Value>,
    /// Upstream HTTP status.
    pub status: u16,
    /// End-to-end latency in milliseconds.
    pub latency_ms: u64,
}

/// Input rejected before any network call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationEnvelope {
    /// Always `false`.
    pub ok: bool,
    /// Always `"validation"`.
    pub kind: &'static str,
    /// Trace id for this invocation.
    pub trace_id: String,
    /// The validation problems found.
    pub issues: Vec<Issue>,
}

/// Upstream reported a failure.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamEnvelope {
    /// Always `false`.
    pub ok: bool,
    /// Always `"upstream"`.
    pub kind: &'static str,
    /// Trace id for this invocation.
    pub trace_id: String,
    /// Upstream HTTP status (0 when the endpoint was unreachable).
    pub status: u16,
    /// Machine-readable error code extracted from the body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Additional detail extracted from the body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Server-directed retry delay, if one was advertised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

/// The request never produced an upstream response.
#[derive(Debug, Clone, Serialize)]
pub struct TransportEnvelope {
    /// Always `false`.
    pub ok: bool,
    /// Always `"transport"`.
    pub kind: &'static str,
    /// Trace id for this invocation.
    pub trace_id: String,
    /// Human-readable message.
    pub message: String,
    /// Failure cause class (`timeout`, `connect`, `rate_limit_local`, ...).
    pub cause: String,
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Unexpected fault inside the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct InternalEnvelope {
    /// Always `false`.
    pub ok: bool,
    /// Always `"internal"`.
    pub kind: &'static str,
    /// Trace id for this invocation.
    pub trace_id: String,
    /// Scrubbed message (no secrets, no backtraces).
    pub message: String,
}

/// The envelope returned to the tool caller.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Successful invocation.
    Success(SuccessEnvelope),
    /// Validation failure.
    Validation(ValidationEnvelope),
    /// Upstream failure.
    Upstream(UpstreamEnvelope),
    /// Transport failure.
    Transport(TransportEnvelope),
    /// Internal fault.
    Internal(InternalEnvelope),
}

impl Envelope {
    /// Builds a success envelope.
    #[must_use]
    pub fn success(
        operation: &str,
        trace_id: impl Into<String>,
        data: Map<String, Value>,
        status: u16,
        latency_ms: u64,
    ) -> Self {
        Self::Success(SuccessEnvelope {
            ok: true,
            operation: operation.to_string(),
            trace_id: trace_id.into(),
            data,
            status,
            latency_ms,
        })
    }

    /// Builds a validation-failure envelope.
    #[must_use]
    pub fn validation(trace_id: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self::Validation(ValidationEnvelope {
            ok: false,
            kind: "validation",
            trace_id: trace_id.into(),
            issues,
        })
    }

    /// Builds an upstream-failure envelope.
    #[must_use]
    pub fn upstream(
        trace_id: impl Into<String>,
        status: u16,
        code: Option<String>,
        message: impl Into<String>,
        details: Option<Value>,
        retry_after_ms: Option<u64>,
    ) -> Self {
        Self::Upstream(UpstreamEnvelope {
            ok: false,
            kind: "upstream",
            trace_id: trace_id.into(),
            status,
            code,
            message: message.into(),
            details,
            retry_after_ms,
        })
    }

    /// Builds a transport-failure envelope.
    #[must_use]
    pub fn transport(
        trace_id: impl Into<String>,
        message: impl Into<String>,
        cause: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::Transport(TransportEnvelope {
            ok: false,
            kind: "transport",
            trace_id: trace_id.into(),
            message: message.into(),
            cause: cause.into(),
            attempts,
        })
    }

    /// Builds an internal-fault envelope.
    #[must_use]
    pub fn internal(trace_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal(InternalEnvelope {
            ok: false,
            kind: "internal",
            trace_id: trace_id.into(),
            message: message.into(),
        })
    }

    /// True for the success shape.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The envelope kind as a stable string (`success` for the ok shape).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Validation(e) => e.kind,
            Self::Upstream(e) => e.kind,
            Self::Transport(e) => e.kind,
            Self::Internal(e) => e.kind,
        }
    }

    /// The trace id carried by any envelope shape.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        match self {
            Self::Success(e) => &e.trace_id,
            Self::Validation(e) => &e.trace_id,
            Self::Upstream(e) => &e.trace_id,
            Self::Transport(e) => &e.trace_id,
            Self::Internal(e) => &e.trace_id,
        }
    }

    /// Serializes the envelope to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("envelopes are always serializable")
    }
}
