//! Error types for the Lumen bridge core.

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::transport::TransportError;

/// Core error type for bridge construction and plumbing.
///
/// Tool invocations never see this type; the orchestrator converts every
/// failure into an `ok: false` envelope.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Authentication errors.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP transport errors.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Unexpected internal faults.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
