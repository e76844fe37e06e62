//! Dev-time request handling.
//!
//! Requests pass through a chain of [`Middleware`]. Each one either answers
//! the request or hands it to the next; the chain's owner decides what a
//! request nobody handled gets.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::delivery::gate::ReadinessGate;
use crate::delivery::table::ServeTable;
use crate::host::{Host, OpenFile};

/// Cache policy for grammar artifacts; they change whenever a grammar is rebuilt.
pub const ARTIFACT_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// MIME type of WebAssembly modules.
pub const WASM_CONTENT_TYPE: &str = "application/wasm";

/// HTTP method of a dev request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            other => Method::Other(other.to_string()),
        }
    }

    /// GET or HEAD.
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

/// The parts of a request the middleware look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevRequest {
    pub method: Method,
    /// Request target as sent: path plus optional query
    pub url: String,
}

impl DevRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        DevRequest {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        DevRequest::new(Method::Get, url)
    }

    /// The path component, without query or fragment.
    pub fn path(&self) -> String {
        match url::Url::parse(&format!("http://localhost{}", self.url)) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Response body.
pub enum Body {
    File(OpenFile),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::File(file) => file.len,
            Body::Bytes(bytes) => bytes.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the whole body.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            Body::File(mut file) => {
                let mut bytes = Vec::with_capacity(file.len as usize);
                std::io::Read::read_to_end(&mut file.reader, &mut bytes)?;
                Ok(bytes)
            }
            Body::Bytes(bytes) => Ok(bytes),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::File(file) => write!(f, "Body::File({} bytes)", file.len),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
        }
    }
}

/// A response produced by a middleware.
#[derive(Debug)]
pub struct DevResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl DevResponse {
    pub fn new(status: u16, body: Body) -> Self {
        DevResponse {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Plain-text 404.
    pub fn not_found() -> Self {
        DevResponse::new(404, Body::Bytes(b"Not Found".to_vec()))
            .with_header("Content-Type", "text/plain; charset=utf-8")
    }

    /// Plain-text 500.
    pub fn internal_error(message: &str) -> Self {
        DevResponse::new(500, Body::Bytes(message.as_bytes().to_vec()))
            .with_header("Content-Type", "text/plain; charset=utf-8")
    }
}

/// Result of offering a request to a middleware.
#[derive(Debug)]
pub enum Outcome {
    Handled(DevResponse),
    /// Pass to the next handler.
    Next,
}

/// One link of the dev server's handler chain.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, request: &DevRequest) -> Result<Outcome>;
}

/// Serves grammar artifacts from the serve table.
///
/// Only GET and HEAD are considered. The final path segment is looked up,
/// so artifacts resolve under any prefix. Misses are always passed on.
pub struct ArtifactMiddleware {
    table: ServeTable,
    gate: ReadinessGate,
    host: Arc<dyn Host>,
}

impl ArtifactMiddleware {
    pub fn new(table: ServeTable, gate: ReadinessGate, host: Arc<dyn Host>) -> Self {
        ArtifactMiddleware { table, gate, host }
    }
}

impl Middleware for ArtifactMiddleware {
    fn name(&self) -> &'static str {
        "grammar-artifacts"
    }

    fn handle(&self, request: &DevRequest) -> Result<Outcome> {
        if !request.method.is_read() {
            return Ok(Outcome::Next);
        }

        // Never answer from a half-built table.
        self.gate.wait();

        let path = request.path();
        let Some(entry) = self.table.lookup_path(&path) else {
            return Ok(Outcome::Next);
        };

        let file = match self.host.open(&entry.disk_path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(
                    public_name = %entry.public_name,
                    path = %entry.disk_path.display(),
                    "registered artifact is unreadable: {}",
                    err
                );
                return Ok(Outcome::Next);
            }
        };

        tracing::debug!(url = %request.url, path = %entry.disk_path.display(), "serving artifact");
        Ok(Outcome::Handled(
            DevResponse::new(200, Body::File(file))
                .with_header("Cache-Control", ARTIFACT_CACHE_CONTROL)
                .with_header("Content-Type", WASM_CONTENT_TYPE),
        ))
    }
}

/// Serves files below a directory, with `index.html` for directories.
pub struct StaticFiles {
    root: PathBuf,
    host: Arc<dyn Host>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, host: Arc<dyn Host>) -> Self {
        StaticFiles {
            root: root.into(),
            host,
        }
    }

    /// Map a URL path below the root, refusing anything that climbs out.
    fn file_for(&self, url_path: &str) -> Option<PathBuf> {
        let relative = Path::new(url_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        let candidate = self.root.join(relative);
        if self.host.is_file(&candidate) {
            return Some(candidate);
        }

        let index = candidate.join("index.html");
        self.host.is_file(&index).then_some(index)
    }
}

impl Middleware for StaticFiles {
    fn name(&self) -> &'static str {
        "static-files"
    }

    fn handle(&self, request: &DevRequest) -> Result<Outcome> {
        if !request.method.is_read() {
            return Ok(Outcome::Next);
        }

        let Some(path) = self.file_for(&request.path()) else {
            return Ok(Outcome::Next);
        };

        let file = self.host.open(&path)?;
        Ok(Outcome::Handled(
            DevResponse::new(200, Body::File(file))
                .with_header("Content-Type", content_type(&path))
                .with_header("Cache-Control", "no-cache"),
        ))
    }
}

/// MIME type for a static file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("wasm") => WASM_CONTENT_TYPE,
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Offer `request` to each middleware in order.
///
/// Returns `None` when every middleware passed.
pub fn dispatch(chain: &[Box<dyn Middleware>], request: &DevRequest) -> Result<Option<DevResponse>> {
    for middleware in chain {
        match middleware.handle(request)? {
            Outcome::Handled(response) => {
                tracing::trace!(middleware = middleware.name(), url = %request.url, "handled");
                return Ok(Some(response));
            }
            Outcome::Next => {}
        }
    }
    Ok(None)
}
