//! Declarative per-operation input schemas.
//!
//! Each operation's accepted fields are described by a static table of
//! [`FieldRule`]s. The same table drives strict validation of incoming
//! argument maps and generation of the JSON schema each tool publishes.
//! Unknown fields are rejected and types are never coerced (no implicit
//! string-to-number conversion).

mod response;

pub use response::shape_response;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::catalog::Operation;

/// A single validation problem.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Issue {
    /// Path of the offending field (empty for whole-input problems).
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

impl Issue {
    fn new(path: impl Into<String>, message: impl Into<String>, code: &'static str) -> Self {
        Self { path: path.into(), message: message.into(), code }
    }
}

/// Value kind accepted for a field.
#[derive(Debug, Clone, Copy)]
enum FieldKind {
    /// UTF-8 text with character-count bounds.
    Text { min: usize, max: Option<usize> },
    /// Integer with optional inclusive bounds. Fractional numbers are
    /// rejected, not truncated.
    Int { min: Option<i64>, max: Option<i64> },
    /// Number with optional inclusive bounds.
    Float { min: Option<f64>, max: Option<f64> },
    /// Binary content: a base64 string (optionally a data URI) or an
    /// array of byte values.
    Bytes,
    /// Arbitrary JSON object.
    Map,
    /// Chat message list.
    Messages,
    /// UUID-shaped string.
    Uuid,
    /// Identifier restricted to `[A-Za-z0-9_-]`.
    Ident,
}

/// Declarative rule for one field of an operation.
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    required: bool,
    kind: FieldKind,
    description: &'static str,
}

const PROMPT: FieldKind = FieldKind::Text { min: 1, max: Some(4000) };
const GUIDANCE: FieldKind = FieldKind::Float { min: Some(0.0), max: Some(50.0) };
const STEPS: FieldKind = FieldKind::Int { min: Some(1), max: Some(150) };
const SEED: FieldKind = FieldKind::Int { min: Some(0), max: None };
const DIMENSION: FieldKind = FieldKind::Int { min: Some(64), max: Some(4096) };
const UNIT: FieldKind = FieldKind::Float { min: Some(0.0), max: Some(1.0) };
const NAME: FieldKind = FieldKind::Text { min: 1, max: None };

/// Maximum number of chat messages accepted per request.
pub const MAX_CHAT_MESSAGES: usize = 50;
/// Chat roles accepted by the upstream.
pub const CHAT_ROLES: &[&str] = &["system", "user", "assistant"];
/// Default text chunk size applied upstream when none is given.
pub const DEFAULT_CHUNK_SIZE: i64 = 1000;

const TEXT_TO_IMAGE: &[FieldRule] = &[
    FieldRule { name: "prompt", required: true, kind: PROMPT, description: "Text description of the image to generate" },
    FieldRule { name: "model", required: false, kind: NAME, description: "Model to use for generation" },
    FieldRule { name: "width", required: false, kind: DIMENSION, description: "Image width in pixels" },
    FieldRule { name: "height", required: false, kind: DIMENSION, description: "Image height in pixels" },
    FieldRule { name: "steps", required: false, kind: STEPS, description: "Number of inference steps" },
    FieldRule { name: "guidance_scale", required: false, kind: GUIDANCE, description: "Guidance scale" },
    FieldRule { name: "seed", required: false, kind: SEED, description: "Random seed for reproducibility" },
    FieldRule { name: "negative_prompt", required: false, kind: NAME, description: "What to avoid in the image" },
];

const IMAGE_TO_IMAGE: &[FieldRule] = &[
    FieldRule { name: "image", required: true, kind: FieldKind::Bytes, description: "Source image as base64 or byte array" },
    FieldRule { name: "prompt", required: true, kind: PROMPT, description: "Text description of the desired transformation" },
    FieldRule { name: "strength", required: false, kind: UNIT, description: "Transformation strength" },
    FieldRule { name: "guidance_scale", required: false, kind: GUIDANCE, description: "Guidance scale" },
    FieldRule { name: "steps", required: false, kind: STEPS, description: "Number of inference steps" },
    FieldRule { name: "seed", required: false, kind: SEED, description: "Random seed for reproducibility" },
];

const INPAINTING: &[FieldRule] = &[
    FieldRule { name: "image", required: true, kind: FieldKind::Bytes, description: "Source image as base64 or byte array" },
    FieldRule { name: "mask", required: true, kind: FieldKind::Bytes, description: "Mask image as base64 or byte array" },
    FieldRule { name: "prompt", required: true, kind: PROMPT, description: "Text description of what to paint" },
    FieldRule { name: "guidance_scale", required: false, kind: GUIDANCE, description: "Guidance scale" },
    FieldRule { name: "steps", required: false, kind: STEPS, description: "Number of inference steps" },
    FieldRule { name: "seed", required: false, kind: SEED, description: "Random seed for reproducibility" },
];

const REPLACE_BACKGROUND: &[FieldRule] = &[
    FieldRule { name: "image", required: true, kind: FieldKind::Bytes, description: "Source image as base64 or byte array" },
    FieldRule { name: "background_prompt", required: false, kind: NAME, description: "Text description of the new background" },
    FieldRule { name: "background_image", required: false, kind: FieldKind::Bytes, description: "Replacement background image" },
    FieldRule { name: "mask_threshold", required: false, kind: UNIT, description: "Foreground mask threshold" },
];

const TEXT_TO_SPEECH: &[FieldRule] = &[
    FieldRule { name: "text", required: true, kind: FieldKind::Text { min: 1, max: Some(10_000) }, description: "Text to convert to speech" },
    FieldRule { name: "voice", required: false, kind: NAME, description: "Voice to use" },
    FieldRule { name: "language", required: false, kind: NAME, description: "Language tag" },
    FieldRule { name: "speed", required: false, kind: FieldKind::Float { min: Some(0.25), max: Some(4.0) }, description: "Speech speed" },
    FieldRule { name: "pitch", required: false, kind: FieldKind::Float { min: None, max: None }, description: "Pitch adjustment" },
];

const CHAT: &[FieldRule] = &[
    FieldRule { name: "messages", required: true, kind: FieldKind::Messages, description: "Chat messages" },
    FieldRule { name: "model", required: false, kind: NAME, description: "Chat model to use" },
    FieldRule { name: "temperature", required: false, kind: FieldKind::Float { min: Some(0.0), max: Some(2.0) }, description: "Sampling temperature" },
    FieldRule { name: "max_tokens", required: false, kind: FieldKind::Int { min: Some(1), max: None }, description: "Maximum response tokens" },
];

const STORE_VECTOR_DB: &[FieldRule] = &[
    FieldRule { name: "file", required: true, kind: FieldKind::Bytes, description: "File content as base64 or byte array" },
    FieldRule { name: "collection_name", required: true, kind: FieldKind::Ident, description: "Vector collection name" },
    FieldRule { name: "metadata", required: false, kind: FieldKind::Map, description: "File metadata" },
    FieldRule { name: "chunk_size", required: false, kind: FieldKind::Int { min: Some(1), max: None }, description: "Text chunk size" },
    FieldRule { name: "overlap", required: false, kind: FieldKind::Int { min: Some(0), max: None }, description: "Chunk overlap, less than chunk_size" },
];

const TASK_STATUS: &[FieldRule] = &[FieldRule {
    name: "task_id",
    required: true,
    kind: FieldKind::Uuid,
    description: "Task identifier",
}];

const PRICING: &[FieldRule] = &[];

fn rules_for(operation: Operation) -> &'static [FieldRule] {
    match operation {
        Operation::TextToImage => TEXT_TO_IMAGE,
        Operation::ImageToImage => IMAGE_TO_IMAGE,
        Operation::Inpainting => INPAINTING,
        Operation::ReplaceBackground => REPLACE_BACKGROUND,
        Operation::TextToSpeech => TEXT_TO_SPEECH,
        Operation::Chat | Operation::StreamChat => CHAT,
        Operation::StoreVectorDb => STORE_VECTOR_DB,
        Operation::TaskStatus => TASK_STATUS,
        Operation::Pricing => PRICING,
    }
}

/// True when the named field carries binary content for the operation and
/// must be sent as a multipart file part.
#[must_use]
pub fn is_file_field(operation: Operation, name: &str) -> bool {
    rules_for(operation)
        .iter()
        .any(|rule| rule.name == name && matches!(rule.kind, FieldKind::Bytes))
}

/// Validates an argument map against the operation's schema.
///
/// Returns the empty vector when the input is accepted. Validation never
/// mutates the arguments, so an accepted map re-validates identically.
#[must_use]
pub fn validate(operation: Operation, args: &Map<String, Value>) -> Vec<Issue> {
    let rules = rules_for(operation);
    let mut issues = Vec::new();

    for key in args.keys() {
        if !rules.iter().any(|rule| rule.name == key) {
            issues.push(Issue::new(key, format!("unknown field `{key}`"), "unknown_field"));
        }
    }

    for rule in rules {
        match args.get(rule.name) {
            None => {
                if rule.required {
                    issues.push(Issue::new(
                        rule.name,
                        format!("`{}` is required", rule.name),
                        "required",
                    ));
                }
            }
            Some(value) => check_value(rule, value, &mut issues),
        }
    }

    if operation == Operation::StoreVectorDb {
        check_overlap(args, &mut issues);
    }

    issues
}

fn check_value(rule: &FieldRule, value: &Value, issues: &mut Vec<Issue>) {
    let path = rule.name;
    match rule.kind {
        FieldKind::Text { min, max } => {
            let Some(s) = value.as_str() else {
                issues.push(Issue::new(path, "expected a string", "type"));
                return;
            };
            let len = s.chars().count();
            if len < min {
                issues.push(Issue::new(
                    path,
                    format!("must be at least {min} character{}", plural(min)),
                    "min_length",
                ));
            }
            if let Some(max) = max {
                if len > max {
                    issues.push(Issue::new(
                        path,
                        format!("must be at most {max} characters"),
                        "max_length",
                    ));
                }
            }
        }
        FieldKind::Int { min, max } => {
            let Some(n) = value.as_i64() else {
                issues.push(Issue::new(path, "expected an integer", "type"));
                return;
            };
            if let Some(min) = min {
                if n < min {
                    issues.push(Issue::new(path, format!("must be at least {min}"), "min"));
                }
            }
            if let Some(max) = max {
                if n > max {
                    issues.push(Issue::new(path, format!("must be at most {max}"), "max"));
                }
            }
        }
        FieldKind::Float { min, max } => {
            let Some(n) = value.as_f64() else {
                issues.push(Issue::new(path, "expected a number", "type"));
                return;
            };
            if let Some(min) = min {
                if n < min {
                    issues.push(Issue::new(path, format!("must be at least {min}"), "min"));
                }
            }
            if let Some(max) = max {
                if n > max {
                    issues.push(Issue::new(path, format!("must be at most {max}"), "max"));
                }
            }
        }
        FieldKind::Bytes => {
            if let Err(message) = decode_bytes(value) {
                issues.push(Issue::new(path, message, "invalid_base64"));
            }
        }
        FieldKind::Map => {
            if !value.is_object() {
                issues.push(Issue::new(path, "expected an object", "type"));
            }
        }
        FieldKind::Messages => check_messages(value, issues),
        FieldKind::Uuid => {
            let ok = value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok());
            if !ok {
                issues.push(Issue::new(path, "expected a UUID string", "format"));
            }
        }
        FieldKind::Ident => {
            let Some(s) = value.as_str() else {
                issues.push(Issue::new(path, "expected a string", "type"));
                return;
            };
            if s.is_empty() {
                issues.push(Issue::new(path, "must not be empty", "min_length"));
            } else if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                issues.push(Issue::new(
                    path,
                    "may only contain letters, digits, underscores and hyphens",
                    "pattern",
                ));
            }
        }
    }
}

fn check_messages(value: &Value, issues: &mut Vec<Issue>) {
    let Some(items) = value.as_array() else {
        issues.push(Issue::new("messages", "expected an array", "type"));
        return;
    };
    if items.is_empty() {
        issues.push(Issue::new("messages", "must contain at least 1 message", "min_length"));
        return;
    }
    if items.len() > MAX_CHAT_MESSAGES {
        issues.push(Issue::new(
            "messages",
            format!("must contain at most {MAX_CHAT_MESSAGES} messages"),
            "max_length",
        ));
    }
    for (i, item) in items.iter().enumerate() {
        let Some(message) = item.as_object() else {
            issues.push(Issue::new(format!("messages[{i}]"), "expected an object", "type"));
            continue;
        };
        for key in message.keys() {
            if key != "role" && key != "content" {
                issues.push(Issue::new(
                    format!("messages[{i}].{key}"),
                    format!("unknown field `{key}`"),
                    "unknown_field",
                ));
            }
        }
        match message.get("role").and_then(Value::as_str) {
            Some(role) if CHAT_ROLES.contains(&role) => {}
            Some(_) => issues.push(Issue::new(
                format!("messages[{i}].role"),
                format!("must be one of: {}", CHAT_ROLES.join(", ")),
                "enum",
            )),
            None => issues.push(Issue::new(
                format!("messages[{i}].role"),
                "`role` is required",
                "required",
            )),
        }
        if !message.get("content").is_some_and(Value::is_string) {
            issues.push(Issue::new(
                format!("messages[{i}].content"),
                "`content` is required and must be a string",
                "required",
            ));
        }
    }
}

fn check_overlap(args: &Map<String, Value>, issues: &mut Vec<Issue>) {
    let Some(overlap) = args.get("overlap").and_then(Value::as_i64) else {
        return;
    };
    let chunk_size = args
        .get("chunk_size")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_CHUNK_SIZE);
    if overlap >= chunk_size {
        issues.push(Issue::new(
            "overlap",
            format!("must be less than chunk_size ({chunk_size})"),
            "max",
        ));
    }
}

/// Decodes a binary field value into raw bytes.
///
/// Accepts a base64 string (optionally prefixed with a `data:` URI header)
/// or an array of byte values.
///
/// # Errors
///
/// Returns a description of the problem when the value is neither.
pub fn decode_bytes(value: &Value) -> Result<Vec<u8>, String> {
    match value {
        Value::String(s) => {
            let payload = match s.find(";base64,") {
                Some(idx) if s.starts_with("data:") => &s[idx + ";base64,".len()..],
                _ => s.as_str(),
            };
            BASE64
                .decode(payload.trim())
                .map_err(|e| format!("invalid base64 data: {e}"))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .filter(|b| *b <= u8::MAX as u64)
                    .map(|b| b as u8)
                    .ok_or_else(|| "byte arrays may only contain integers 0..=255".to_string())
            })
            .collect(),
        _ => Err("expected a base64 string or an array of bytes".to_string()),
    }
}

/// Builds the JSON schema a tool publishes for an operation.
#[must_use]
pub fn json_schema(operation: Operation) -> Value {
    let rules = rules_for(operation);
    let mut properties = Map::new();
    let mut required = Vec::new();
    for rule in rules {
        properties.insert(rule.name.to_string(), field_schema(rule));
        if rule.required {
            required.push(Value::String(rule.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(rule: &FieldRule) -> Value {
    let mut schema = match rule.kind {
        FieldKind::Text { min, max } => {
            let mut s = json!({"type": "string", "minLength": min});
            if let Some(max) = max {
                s["maxLength"] = json!(max);
            }
            s
        }
        FieldKind::Int { min, max } => bounded(json!({"type": "integer"}), min, max),
        FieldKind::Float { min, max } => bounded(json!({"type": "number"}), min, max),
        FieldKind::Bytes => json!({"type": "string", "contentEncoding": "base64"}),
        FieldKind::Map => json!({"type": "object"}),
        FieldKind::Messages => json!({
            "type": "array",
            "minItems": 1,
            "maxItems": MAX_CHAT_MESSAGES,
            "items": {
                "type": "object",
                "properties": {
                    "role": {"type": "string", "enum": CHAT_ROLES},
                    "content": {"type": "string"},
                },
                "required": ["role", "content"],
                "additionalProperties": false,
            },
        }),
        FieldKind::Uuid => json!({"type": "string", "format": "uuid"}),
        FieldKind::Ident => json!({"type": "string", "pattern": "^[A-Za-z0-9_-]+$"}),
    };
    schema["description"] = json!(rule.description);
    schema
}

fn bounded<T: Serialize>(mut schema: Value, min: Option<T>, max: Option<T>) -> Value {
    if let Some(min) = min {
        schema["minimum"] = json!(min);
    }
    if let Some(max) = max {
        schema["maximum"] = json!(max);
    }
    schema
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("test arguments must be an object")
    }

    fn codes(issues: &[Issue]) -> Vec<&'static str> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_text_to_image_minimal_accepted() {
        let issues = validate(Operation::TextToImage, &args(json!({"prompt": "a red cube"})));
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn test_missing_required_prompt() {
        let issues = validate(Operation::TextToImage, &args(json!({})));
        assert_eq!(codes(&issues), vec!["required"]);
        assert_eq!(issues[0].path, "prompt");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let issues =
            validate(Operation::TextToImage, &args(json!({"prompt": "x", "quality": "hd"})));
        assert_eq!(codes(&issues), vec!["unknown_field"]);
        assert_eq!(issues[0].path, "quality");
    }

    #[test]
    fn test_no_string_to_number_coercion() {
        let issues =
            validate(Operation::TextToImage, &args(json!({"prompt": "x", "width": "512"})));
        assert_eq!(codes(&issues), vec!["type"]);
    }

    #[test]
    fn test_fractional_integer_rejected() {
        let issues =
            validate(Operation::TextToImage, &args(json!({"prompt": "x", "steps": 20.5})));
        assert_eq!(codes(&issues), vec!["type"]);
    }

    #[test]
    fn test_dimension_boundaries() {
        for ok in [64, 4096] {
            let issues = validate(
                Operation::TextToImage,
                &args(json!({"prompt": "x", "width": ok, "height": ok})),
            );
            assert!(issues.is_empty(), "{ok} should be accepted: {issues:?}");
        }
        for bad in [63, 4097] {
            let issues =
                validate(Operation::TextToImage, &args(json!({"prompt": "x", "width": bad})));
            assert_eq!(issues.len(), 1, "{bad} should be rejected");
            assert_eq!(issues[0].path, "width");
        }
    }

    #[test]
    fn test_prompt_length_bounds() {
        let long = "x".repeat(4000);
        assert!(validate(Operation::TextToImage, &args(json!({"prompt": long}))).is_empty());
        let too_long = "x".repeat(4001);
        let issues = validate(Operation::TextToImage, &args(json!({"prompt": too_long})));
        assert_eq!(codes(&issues), vec!["max_length"]);
        let issues = validate(Operation::TextToImage, &args(json!({"prompt": ""})));
        assert_eq!(codes(&issues), vec!["min_length"]);
    }

    #[test]
    fn test_temperature_boundaries() {
        for ok in [0.0, 2.0] {
            let issues = validate(
                Operation::Chat,
                &args(json!({
                    "messages": [{"role": "user", "content": "hi"}],
                    "temperature": ok,
                })),
            );
            assert!(issues.is_empty(), "{ok} should be accepted: {issues:?}");
        }
        for bad in [-0.001, 2.001] {
            let issues = validate(
                Operation::Chat,
                &args(json!({
                    "messages": [{"role": "user", "content": "hi"}],
                    "temperature": bad,
                })),
            );
            assert_eq!(issues.len(), 1, "{bad} should be rejected");
            assert_eq!(issues[0].path, "temperature");
        }
    }

    #[test]
    fn test_empty_messages_rejected() {
        let issues = validate(Operation::Chat, &args(json!({"messages": []})));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "messages");
        assert_eq!(issues[0].code, "min_length");
    }

    #[test]
    fn test_invalid_chat_role() {
        let issues = validate(
            Operation::Chat,
            &args(json!({"messages": [{"role": "bot", "content": "hi"}]})),
        );
        assert_eq!(codes(&issues), vec!["enum"]);
        assert_eq!(issues[0].path, "messages[0].role");
    }

    #[test]
    fn test_message_missing_content() {
        let issues = validate(Operation::Chat, &args(json!({"messages": [{"role": "user"}]})));
        assert_eq!(codes(&issues), vec!["required"]);
        assert_eq!(issues[0].path, "messages[0].content");
    }

    #[test]
    fn test_overlap_boundaries() {
        let base = json!({"file": "aGVsbG8=", "collection_name": "docs"});
        let mut equal = args(base.clone());
        equal.insert("chunk_size".to_string(), json!(100));
        equal.insert("overlap".to_string(), json!(100));
        let issues = validate(Operation::StoreVectorDb, &equal);
        assert_eq!(codes(&issues), vec!["max"]);
        assert_eq!(issues[0].path, "overlap");

        let mut below = args(base);
        below.insert("chunk_size".to_string(), json!(100));
        below.insert("overlap".to_string(), json!(99));
        assert!(validate(Operation::StoreVectorDb, &below).is_empty());
    }

    #[test]
    fn test_overlap_uses_default_chunk_size() {
        let issues = validate(
            Operation::StoreVectorDb,
            &args(json!({
                "file": "aGVsbG8=",
                "collection_name": "docs",
                "overlap": DEFAULT_CHUNK_SIZE,
            })),
        );
        assert_eq!(codes(&issues), vec!["max"]);
    }

    #[test]
    fn test_collection_name_pattern() {
        let issues = validate(
            Operation::StoreVectorDb,
            &args(json!({"file": "aGVsbG8=", "collection_name": "my docs!"})),
        );
        assert_eq!(codes(&issues), vec!["pattern"]);
    }

    #[test]
    fn test_bytes_accepts_base64_and_arrays() {
        for image in [json!("3q2+7w=="), json!([222, 173, 190, 239])] {
            let issues = validate(
                Operation::ImageToImage,
                &args(json!({"image": image, "prompt": "x"})),
            );
            assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        }
    }

    #[test]
    fn test_bytes_rejects_bad_base64() {
        let issues = validate(
            Operation::ImageToImage,
            &args(json!({"image": "not base64!!!", "prompt": "x"})),
        );
        assert_eq!(codes(&issues), vec!["invalid_base64"]);
    }

    #[test]
    fn test_bytes_rejects_out_of_range_array() {
        let issues = validate(
            Operation::ImageToImage,
            &args(json!({"image": [0, 256], "prompt": "x"})),
        );
        assert_eq!(codes(&issues), vec!["invalid_base64"]);
    }

    #[test]
    fn test_decode_bytes_data_uri() {
        let decoded = decode_bytes(&json!("data:image/png;base64,3q2+7w==")).unwrap();
        assert_eq!(decoded, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_task_id_must_be_uuid() {
        let issues = validate(Operation::TaskStatus, &args(json!({"task_id": "not-a-uuid"})));
        assert_eq!(codes(&issues), vec!["format"]);
        let issues = validate(
            Operation::TaskStatus,
            &args(json!({"task_id": "11111111-1111-1111-1111-111111111111"})),
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_pricing_takes_no_arguments() {
        assert!(validate(Operation::Pricing, &args(json!({}))).is_empty());
        let issues = validate(Operation::Pricing, &args(json!({"tier": "pro"})));
        assert_eq!(codes(&issues), vec!["unknown_field"]);
    }

    #[test]
    fn test_speed_boundaries() {
        for ok in [0.25, 4.0] {
            let issues =
                validate(Operation::TextToSpeech, &args(json!({"text": "hi", "speed": ok})));
            assert!(issues.is_empty(), "{ok} should be accepted: {issues:?}");
        }
        let issues =
            validate(Operation::TextToSpeech, &args(json!({"text": "hi", "speed": 4.01})));
        assert_eq!(codes(&issues), vec!["max"]);
    }

    #[test]
    fn test_accepted_input_revalidates_identically() {
        let input = args(json!({
            "prompt": "a red cube",
            "width": 1024,
            "guidance_scale": 7.5,
            "seed": 42,
        }));
        assert!(validate(Operation::TextToImage, &input).is_empty());
        let round_tripped: Map<String, Value> =
            serde_json::from_str(&serde_json::to_string(&input).unwrap()).unwrap();
        assert_eq!(round_tripped, input);
        assert!(validate(Operation::TextToImage, &round_tripped).is_empty());
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = json_schema(Operation::TextToImage);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["prompt"]));
        assert_eq!(schema["properties"]["width"]["minimum"], 64);
        assert_eq!(schema["properties"]["width"]["maximum"], 4096);
    }

    #[test]
    fn test_json_schema_for_every_operation() {
        for op in Operation::all() {
            let schema = json_schema(*op);
            assert_eq!(schema["type"], "object", "{}", op.as_str());
        }
    }

    #[test]
    fn test_file_fields() {
        assert!(is_file_field(Operation::ImageToImage, "image"));
        assert!(is_file_field(Operation::Inpainting, "mask"));
        assert!(is_file_field(Operation::StoreVectorDb, "file"));
        assert!(!is_file_field(Operation::ImageToImage, "prompt"));
        assert!(!is_file_field(Operation::Chat, "messages"));
    }
}
