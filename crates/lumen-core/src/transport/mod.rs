//! HTTP transport to the upstream API.
//!
//! One long-lived `reqwest::Client` is shared by every invocation (and by
//! the OAuth token client). The transport builds requests from the
//! operation catalog and validated arguments, attaches the auth and
//! tracing headers, and captures responses into [`RawResponse`] without
//! interpreting them; classification lives in [`classify`].

mod classify;

pub use classify::{classify, parse_retry_after, Outcome};

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{BodyKind, HttpMethod, OperationSpec, PATH_FIELDS};
use crate::config::Settings;
use crate::schema;

/// Maximum connect timeout, regardless of the request timeout.
const CONNECT_TIMEOUT_CAP: Duration = Duration::from_secs(5);

/// Transport errors.
///
/// `Clone` so the retry loop can keep the last observed failure while
/// continuing to attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The request never produced an upstream response.
    #[error("request failed: {message}")]
    Network {
        /// Scrubbed description of the failure.
        message: String,
        /// Failure cause class: `timeout`, `connect`, `body` or `network`.
        cause: &'static str,
    },

    /// No local rate-limit slot became available within the timeout.
    #[error("timed out waiting for a local rate-limit slot")]
    RateLimitLocal,
}

impl TransportError {
    /// The failure cause class for envelope reporting.
    #[must_use]
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Build(_) => "client",
            Self::Network { cause, .. } => cause,
            Self::RateLimitLocal => "rate_limit_local",
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Parsed response body.
#[derive(Debug, Clone)]
pub enum RawBody {
    /// JSON body (`Content-Type: application/json`).
    Json(Value),
    /// Anything else, kept as raw bytes.
    Binary {
        /// The response content type.
        content_type: String,
        /// The raw body bytes.
        bytes: Vec<u8>,
    },
}

/// An upstream response before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercased names.
    pub headers: HashMap<String, String>,
    /// Parsed body.
    pub body: RawBody,
}

impl RawResponse {
    /// Looks up a response header by (case-insensitive) name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The JSON body, when there is one.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RawBody::Json(value) => Some(value),
            RawBody::Binary { .. } => None,
        }
    }
}

/// Shared HTTP transport.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Builds the transport and its shared client from the settings.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Build` when the client cannot be
    /// constructed (e.g. an unusable proxy URL).
    pub fn new(settings: &Settings) -> Result<Self> {
        let connect_timeout = settings.request_timeout.min(CONNECT_TIMEOUT_CAP);
        let mut builder = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .user_agent(concat!("lumen-bridge/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &settings.http_proxy {
            builder = builder.proxy(
                reqwest::Proxy::http(proxy.as_str())
                    .map_err(|e| TransportError::Build(e.to_string()))?,
            );
        }
        if let Some(proxy) = &settings.https_proxy {
            builder = builder.proxy(
                reqwest::Proxy::https(proxy.as_str())
                    .map_err(|e| TransportError::Build(e.to_string()))?,
            );
        }

        let client = builder.build().map_err(|e| TransportError::Build(e.to_string()))?;

        // A trailing slash keeps Url::join from eating the last path
        // segment of bases like https://host/v1.
        let mut base_url = settings.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// A handle to the shared client, for the OAuth token flow.
    #[must_use]
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }

    /// Sends one attempt for an operation and captures the response.
    ///
    /// The `Authorization` value must be fetched from the auth provider
    /// immediately before each call so a refreshed token is picked up.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` for connection, timeout and
    /// body-read failures. HTTP error statuses are not errors here; they
    /// are classified by the caller.
    pub async fn send(
        &self,
        spec: &OperationSpec,
        path: &str,
        args: &Map<String, Value>,
        auth_header: &str,
        trace_id: &str,
    ) -> Result<RawResponse> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::Network { message: e.to_string(), cause: "network" })?;

        let mut request = match spec.method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
        };
        request = request
            .header("Authorization", auth_header)
            .header("X-Request-Id", trace_id)
            .header("Accept", "application/json");

        request = match spec.body {
            BodyKind::Json => request.json(&Value::Object(args.clone())),
            BodyKind::Multipart => request.multipart(build_form(spec, args)?),
            BodyKind::None => request,
        };

        debug!(method = ?spec.method, url = %url, trace_id, "sending upstream request");

        let response = request.send().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
            cause: error_cause(&e),
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_lowercase(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let content_type = headers.get(CONTENT_TYPE.as_str()).cloned().unwrap_or_default();

        let bytes = response.bytes().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
            cause: "body",
        })?;

        let body = if content_type.to_lowercase().contains("application/json") {
            match serde_json::from_slice(&bytes) {
                Ok(value) => RawBody::Json(value),
                Err(e) => {
                    warn!(trace_id, error = %e, "upstream sent unparsable JSON");
                    RawBody::Binary { content_type, bytes: bytes.to_vec() }
                }
            }
        } else {
            RawBody::Binary { content_type, bytes: bytes.to_vec() }
        };

        let raw = RawResponse { status, headers, body };
        log_rate_limit_headers(&raw, trace_id);
        debug!(status, trace_id, "upstream response received");
        Ok(raw)
    }
}

/// Builds the multipart form for a file-bearing operation.
///
/// Fields the schema marks as binary become file parts (filename = field
/// name, base64 strings decoded, byte arrays passed through); every other
/// field becomes a text part, JSON-encoded when it is not a plain string.
/// Path parameters never appear in the body.
fn build_form(spec: &OperationSpec, args: &Map<String, Value>) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in args {
        if PATH_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if schema::is_file_field(spec.operation, name) {
            let bytes = schema::decode_bytes(value).map_err(|message| {
                // Validation already checked this; a failure here is a bug.
                TransportError::Network { message, cause: "body" }
            })?;
            form = form.part(
                name.clone(),
                Part::bytes(bytes)
                    .file_name(name.clone())
                    .mime_str("application/octet-stream")
                    .map_err(|e| TransportError::Network {
                        message: e.to_string(),
                        cause: "body",
                    })?,
            );
        } else {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(name.clone(), text);
        }
    }
    Ok(form)
}

fn error_cause(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else {
        "network"
    }
}

fn log_rate_limit_headers(raw: &RawResponse, trace_id: &str) {
    if let Some(remaining) = raw.header("x-ratelimit-remaining") {
        debug!(
            trace_id,
            limit = raw.header("x-ratelimit-limit").unwrap_or("-"),
            remaining,
            reset = raw.header("x-ratelimit-reset").unwrap_or("-"),
            "upstream rate limit state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{spec_for, Operation};
    use crate::config::Settings;
    use serde_json::json;

    fn transport_for(base_url: &str) -> HttpTransport {
        let settings = Settings::builder()
            .base_url(base_url)
            .api_key("sk-test")
            .build()
            .unwrap();
        HttpTransport::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_json_post_with_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", "Bearer sk-test")
            .match_header("x-request-id", "trace-42")
            .match_header("accept", "application/json")
            .match_body(mockito::Matcher::Json(json!({
                "messages": [{"role": "user", "content": "hi"}],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"reply": "hello"}"#)
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let args = json!({"messages": [{"role": "user", "content": "hi"}]})
            .as_object()
            .cloned()
            .unwrap();
        let raw = transport
            .send(spec_for(Operation::Chat), "chat", &args, "Bearer sk-test", "trace-42")
            .await
            .unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.json().unwrap()["reply"], "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pricing")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 1}"#)
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let raw = transport
            .send(spec_for(Operation::Pricing), "pricing", &Map::new(), "Bearer sk-test", "t")
            .await
            .unwrap();
        assert_eq!(raw.json().unwrap()["price"], 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_binary_response_captured() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pricing")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body([0x25, 0x50, 0x44, 0x46])
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let raw = transport
            .send(spec_for(Operation::Pricing), "pricing", &Map::new(), "Bearer sk-test", "t")
            .await
            .unwrap();
        match raw.body {
            RawBody::Binary { content_type, bytes } => {
                assert_eq!(content_type, "application/pdf");
                assert_eq!(bytes, vec![0x25, 0x50, 0x44, 0x46]);
            }
            RawBody::Json(_) => panic!("expected a binary body"),
        }
    }

    #[tokio::test]
    async fn test_unparsable_json_kept_as_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pricing")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{truncated")
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let raw = transport
            .send(spec_for(Operation::Pricing), "pricing", &Map::new(), "Bearer sk-test", "t")
            .await
            .unwrap();
        assert!(raw.json().is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let transport = transport_for("http://127.0.0.1:1");
        let err = transport
            .send(spec_for(Operation::Pricing), "pricing", &Map::new(), "Bearer sk-test", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network { .. }));
        assert_ne!(err.cause(), "rate_limit_local");
    }

    #[tokio::test]
    async fn test_multipart_text_parts_from_scalars() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/image-to-image")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(202)
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id": "t", "status": "pending"}"#)
            .create_async()
            .await;

        let transport = transport_for(&server.url());
        let args = json!({"image": "3q2+7w==", "prompt": "x", "steps": 20})
            .as_object()
            .cloned()
            .unwrap();
        let raw = transport
            .send(
                spec_for(Operation::ImageToImage),
                "image-to-image",
                &args,
                "Bearer sk-test",
                "t",
            )
            .await
            .unwrap();
        assert_eq!(raw.status, 202);
        mock.assert_async().await;
    }
}
