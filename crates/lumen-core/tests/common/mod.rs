//! Scripted HTTP responder for end-to-end scenarios.
//!
//! mockito covers single-response matching well, but the retry scenarios
//! need a server that answers a sequence of requests with different
//! responses and exposes the raw bytes it received (for byte-exact
//! multipart assertions). This helper serves one scripted response per
//! connection and records every captured request.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// One response in the script.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ScriptedResponse {
    /// A JSON response with the given status.
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A request captured by the responder.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Looks up a request header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Serves a fixed script of responses, one per incoming request.
pub struct ScriptedServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl ScriptedServer {
    /// Binds a local listener and starts serving the script.
    pub async fn start(script: Vec<ScriptedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = requests.clone();
        tokio::spawn(async move {
            for response in script {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                if let Ok(request) = serve_one(stream, &response).await {
                    captured.lock().await.push(request);
                }
            }
        });

        Self { addr, requests }
    }

    /// Base URL of the responder.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Snapshot of every captured request, in arrival order.
    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of requests served so far.
    pub async fn hits(&self) -> usize {
        self.requests.lock().await.len()
    }
}

async fn serve_one(
    stream: TcpStream,
    response: &ScriptedResponse,
) -> std::io::Result<CapturedRequest> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    let mut raw = format!("HTTP/1.1 {} OK\r\n", response.status);
    for (name, value) in &response.headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    raw.push_str("Connection: close\r\n\r\n");
    write_half.write_all(raw.as_bytes()).await?;
    write_half.write_all(&response.body).await?;
    write_half.shutdown().await?;

    Ok(CapturedRequest { method, path, headers, body })
}

/// Finds a byte sequence inside a larger slice.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
