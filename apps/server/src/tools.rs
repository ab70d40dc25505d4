//! The tool surface registered with the MCP transport.
//!
//! Each operation gets a thin adapter that forwards the decoded argument
//! map to the orchestrator and returns the envelope unchanged. Two
//! synthetic tools (`server_health`, `list_models`) answer locally
//! without contacting the upstream.

use serde_json::{json, Value};
use tokio::time::Instant;

use lumen_core::{schema, Operation, Orchestrator};

/// Name of the synthetic health tool.
pub const SERVER_HEALTH: &str = "server_health";
/// Name of the synthetic model-catalog tool.
pub const LIST_MODELS: &str = "list_models";

/// A tool declaration for the transport's `tools/list` answer.
#[derive(Debug, Clone)]
pub struct ToolDef {
    /// Tool name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Published JSON schema for the tool's arguments.
    pub input_schema: Value,
}

fn describe(operation: Operation) -> &'static str {
    match operation {
        Operation::TextToImage => "Generate an image from a text prompt",
        Operation::ImageToImage => "Transform an image guided by a text prompt",
        Operation::Inpainting => "Repaint the masked region of an image",
        Operation::ReplaceBackground => "Replace the background of an image",
        Operation::TextToSpeech => "Synthesize speech from text",
        Operation::Chat => "Chat completion",
        Operation::StreamChat => "Streaming chat completion, returned as one aggregated reply",
        Operation::StoreVectorDb => "Store a file in the vector database",
        Operation::TaskStatus => "Look up the status of an asynchronous task",
        Operation::Pricing => "Fetch the current pricing table",
    }
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}, "additionalProperties": false})
}

/// Every tool this server announces.
#[must_use]
pub fn tool_defs() -> Vec<ToolDef> {
    let mut defs: Vec<ToolDef> = Operation::all()
        .iter()
        .map(|op| ToolDef {
            name: op.as_str(),
            description: describe(*op),
            input_schema: schema::json_schema(*op),
        })
        .collect();
    defs.push(ToolDef {
        name: SERVER_HEALTH,
        description: "Report bridge health without contacting the upstream",
        input_schema: empty_schema(),
    });
    defs.push(ToolDef {
        name: LIST_MODELS,
        description: "List the models and voices available per capability",
        input_schema: empty_schema(),
    });
    defs
}

/// Dispatches one decoded tool call and returns its result map.
pub async fn dispatch(
    orchestrator: &Orchestrator,
    started_at: Instant,
    name: &str,
    arguments: Value,
) -> Value {
    match name {
        SERVER_HEALTH => server_health(orchestrator, started_at),
        LIST_MODELS => list_models(),
        _ => orchestrator.execute(name, arguments, None).await.to_value(),
    }
}

fn server_health(orchestrator: &Orchestrator, started_at: Instant) -> Value {
    let settings = orchestrator.settings();
    json!({
        "ok": true,
        "status": "healthy",
        "auth_mode": settings.auth_mode().as_str(),
        "env": settings.env.as_str(),
        "uptime_s": started_at.elapsed().as_secs(),
    })
}

fn list_models() -> Value {
    json!({
        "ok": true,
        "models": {
            "text_to_image": ["flux", "stable-diffusion-xl", "stable-diffusion-v2"],
            "image_to_image": ["flux", "stable-diffusion-xl", "stable-diffusion-v2"],
            "inpainting": ["flux", "stable-diffusion-xl"],
            "replace_background": ["flux", "stable-diffusion-xl"],
            "text_to_speech": ["tts-1", "tts-1-hd"],
            "chat": ["gpt-4", "gpt-3.5-turbo", "claude-3", "claude-2"],
        },
        "voices": {
            "text_to_speech": ["alloy", "echo", "fable", "onyx", "nova", "shimmer"],
        },
    })
}
