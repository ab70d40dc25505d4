//! Lumen MCP bridge server - entry point.
//!
//! Exit codes: 0 normal shutdown, 2 configuration error, 3 fatal startup
//! failure. Code 1 is reserved for unhandled panics.

mod env;
mod rpc;
mod tools;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumen_core::Orchestrator;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_server=info,lumen_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match env::load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    info!(config = %settings.redacted(), "starting Lumen MCP bridge");

    let orchestrator = match Orchestrator::new(settings) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            error!(error = %e, "failed to start the bridge");
            std::process::exit(3);
        }
    };

    if let Err(e) = rpc::serve(orchestrator.clone()).await {
        error!(error = %e, "transport failure");
        orchestrator.shutdown();
        std::process::exit(3);
    }

    orchestrator.shutdown();
    info!("shutdown complete");
}
