//! Upstream response shaping.
//!
//! Successful upstream bodies are normalized into the map placed under the
//! envelope's `data` field: JSON objects pass through, other JSON values
//! are wrapped, and binary bodies are base64-encoded with their content
//! type. Streaming chat responses are aggregated into a single map.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::catalog::OperationSpec;
use crate::transport::{RawBody, RawResponse};

/// Normalizes a successful upstream response into the envelope `data` map.
#[must_use]
pub fn shape_response(raw: &RawResponse, spec: &OperationSpec) -> Map<String, Value> {
    if spec.aggregate_stream {
        if let Some(aggregated) = aggregate_stream(&raw.body) {
            return aggregated;
        }
    }
    match &raw.body {
        RawBody::Json(Value::Object(map)) => map.clone(),
        RawBody::Json(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
        RawBody::Binary { content_type, bytes } => {
            let mut map = Map::new();
            map.insert("data".to_string(), json!(BASE64.encode(bytes)));
            map.insert("content_type".to_string(), json!(content_type));
            map
        }
    }
}

/// Merges an SSE-framed chat stream into one reply map.
///
/// Recognizes `data:` lines carrying OpenAI-style chunks and concatenates
/// `choices[0].delta.content` (or `message.content`). Returns `None` when
/// the body is not SSE-framed so the caller falls back to plain shaping.
fn aggregate_stream(body: &RawBody) -> Option<Map<String, Value>> {
    let text = match body {
        RawBody::Binary { bytes, .. } => String::from_utf8_lossy(bytes).into_owned(),
        RawBody::Json(_) => return None,
    };

    let mut content = String::new();
    let mut chunks = 0u64;
    let mut model = None;
    let mut finish_reason = None;

    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        let Ok(chunk) = serde_json::from_str::<Value>(payload) else {
            continue;
        };
        chunks += 1;
        if let Some(piece) = chunk_content(&chunk) {
            content.push_str(piece);
        }
        if model.is_none() {
            model = chunk.get("model").and_then(Value::as_str).map(str::to_string);
        }
        if let Some(reason) = chunk
            .pointer("/choices/0/finish_reason")
            .and_then(Value::as_str)
        {
            finish_reason = Some(reason.to_string());
        }
    }

    if chunks == 0 {
        return None;
    }

    let mut map = Map::new();
    map.insert("content".to_string(), json!(content));
    map.insert("chunks".to_string(), json!(chunks));
    if let Some(model) = model {
        map.insert("model".to_string(), json!(model));
    }
    if let Some(reason) = finish_reason {
        map.insert("finish_reason".to_string(), json!(reason));
    }
    Some(map)
}

fn chunk_content(chunk: &Value) -> Option<&str> {
    chunk
        .pointer("/choices/0/delta/content")
        .or_else(|| chunk.pointer("/choices/0/message/content"))
        .or_else(|| chunk.get("content"))
        .and_then(Value::as_str)
}
