//! Static catalog of tool operations and their upstream dispatch data.
//!
//! The catalog is the single source of truth mapping an operation to its
//! upstream endpoint, HTTP method, body encoding and response kind. New
//! operations are added as data here and as a field table in the schema
//! module; no dispatch code changes.

use serde_json::{Map, Value};

/// A named tool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Generate an image from a text prompt.
    TextToImage,
    /// Transform an input image guided by a prompt.
    ImageToImage,
    /// Inpaint the masked region of an image.
    Inpainting,
    /// Replace the background of an image.
    ReplaceBackground,
    /// Synthesize speech from text.
    TextToSpeech,
    /// Chat completion.
    Chat,
    /// Streaming chat completion, aggregated into one reply.
    StreamChat,
    /// Store a file in the vector database.
    StoreVectorDb,
    /// Look up the status of an asynchronous task.
    TaskStatus,
    /// Fetch the pricing table.
    Pricing,
}

impl Operation {
    /// Returns the tool name for this operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToImage => "text_to_image",
            Self::ImageToImage => "image_to_image",
            Self::Inpainting => "inpainting",
            Self::ReplaceBackground => "replace_background",
            Self::TextToSpeech => "text_to_speech",
            Self::Chat => "chat",
            Self::StreamChat => "stream_chat",
            Self::StoreVectorDb => "store_vector_db",
            Self::TaskStatus => "task_status",
            Self::Pricing => "pricing",
        }
    }

    /// Parses a tool name into an operation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.as_str() == name)
    }

    /// All supported operations, in tool-listing order.
    #[must_use]
    pub fn all() -> &'static [Operation] {
        &[
            Self::TextToImage,
            Self::ImageToImage,
            Self::Inpainting,
            Self::ReplaceBackground,
            Self::TextToSpeech,
            Self::Chat,
            Self::StreamChat,
            Self::StoreVectorDb,
            Self::TaskStatus,
            Self::Pricing,
        ]
    }
}

/// HTTP method used for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

/// Request body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// JSON object body.
    Json,
    /// Multipart form body with file parts.
    Multipart,
    /// No body (GET endpoints).
    None,
}

/// Shape of the upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Immediate result payload.
    SyncResult,
    /// Task handle (`{task_id, status, ...}`) for asynchronous work.
    AsyncTask,
    /// Opaque JSON passed through unchanged.
    ArbitraryJson,
}

/// Static dispatch record for one operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    /// The operation this record describes.
    pub operation: Operation,
    /// Upstream path template, relative to the base URL.
    pub path: &'static str,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request body encoding.
    pub body: BodyKind,
    /// Response kind.
    pub response: ResponseKind,
    /// Whether the response is an incremental stream to aggregate.
    pub aggregate_stream: bool,
}

const CATALOG: &[OperationSpec] = &[
    OperationSpec {
        operation: Operation::TextToImage,
        path: "text-to-image",
        method: HttpMethod::Post,
        body: BodyKind::Json,
        response: ResponseKind::AsyncTask,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::ImageToImage,
        path: "image-to-image",
        method: HttpMethod::Post,
        body: BodyKind::Multipart,
        response: ResponseKind::AsyncTask,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::Inpainting,
        path: "inpainting",
        method: HttpMethod::Post,
        body: BodyKind::Multipart,
        response: ResponseKind::AsyncTask,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::ReplaceBackground,
        path: "replace-background",
        method: HttpMethod::Post,
        body: BodyKind::Multipart,
        response: ResponseKind::AsyncTask,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::TextToSpeech,
        path: "text-to-speech",
        method: HttpMethod::Post,
        body: BodyKind::Json,
        response: ResponseKind::AsyncTask,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::Chat,
        path: "chat",
        method: HttpMethod::Post,
        body: BodyKind::Json,
        response: ResponseKind::SyncResult,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::StreamChat,
        path: "streamchat",
        method: HttpMethod::Post,
        body: BodyKind::Json,
        response: ResponseKind::SyncResult,
        aggregate_stream: true,
    },
    OperationSpec {
        operation: Operation::StoreVectorDb,
        path: "store-file-in-vector-database",
        method: HttpMethod::Post,
        body: BodyKind::Multipart,
        response: ResponseKind::SyncResult,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::TaskStatus,
        path: "task-status/{task_id}",
        method: HttpMethod::Get,
        body: BodyKind::None,
        response: ResponseKind::SyncResult,
        aggregate_stream: false,
    },
    OperationSpec {
        operation: Operation::Pricing,
        path: "pricing",
        method: HttpMethod::Get,
        body: BodyKind::None,
        response: ResponseKind::SyncResult,
        aggregate_stream: false,
    },
];

/// Looks up the dispatch record for an operation.
#[must_use]
pub fn spec_for(operation: Operation) -> &'static OperationSpec {
    CATALOG
        .iter()
        .find(|spec| spec.operation == operation)
        .expect("every operation has a catalog entry")
}

/// Fields substituted into path templates rather than sent in the body.
pub const PATH_FIELDS: &[&str] = &["task_id"];

/// Renders the upstream path for an operation, substituting path
/// parameters from the validated arguments.
#[must_use]
pub fn render_path(spec: &OperationSpec, args: &Map<String, Value>) -> String {
    let mut path = spec.path.to_string();
    for field in PATH_FIELDS {
        let placeholder = format!("{{{field}}}");
        if path.contains(&placeholder) {
            let value = args.get(*field).and_then(Value::as_str).unwrap_or_default();
            path = path.replace(&placeholder, value);
        }
    }
    path
}
