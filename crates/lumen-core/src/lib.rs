//! Lumen bridge core - the request execution pipeline.
//!
//! This crate implements the pieces behind every tool invocation:
//! - Immutable, validated [`config::Settings`]
//! - Dual-mode authentication with OAuth token lifecycle ([`auth`])
//! - A shared HTTP transport with response classification ([`transport`])
//! - Retry/backoff policy and a client-side rate limiter
//! - Declarative per-operation input schemas ([`schema`])
//! - The [`orchestrator::Orchestrator`] tying them together into a single
//!   envelope-producing `execute` call
//!
//! # Example
//!
//! ```rust,no_run
//! use lumen_core::{Orchestrator, Settings};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let settings = Settings::builder().api_key("sk-test").build()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     let envelope = orchestrator
//!         .execute("text_to_image", json!({"prompt": "a red cube"}), None)
//!         .await;
//!     println!("{}", envelope.to_value());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod limiter;
pub mod orchestrator;
pub mod retry;
pub mod schema;
pub mod transport;

pub use catalog::Operation;
pub use config::{AuthMode, Environment, Settings, SettingsBuilder};
pub use envelope::Envelope;
pub use error::{BridgeError, Result};
pub use orchestrator::Orchestrator;
