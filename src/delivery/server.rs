//! A small HTTP server for local development.
//!
//! Requests are offered to a middleware chain; anything the chain passes on
//! gets a 404.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::delivery::serve::{dispatch, Body, DevRequest, DevResponse, Method, Middleware};

/// Dev server bound to a local address.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    chain: Arc<Vec<Box<dyn Middleware>>>,
}

impl DevServer {
    /// Bind to `addr`. Port 0 picks a free port.
    pub fn bind(addr: SocketAddr, chain: Vec<Box<dyn Middleware>>) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
        let addr = server
            .server_addr()
            .to_ip()
            .context("dev server is not listening on an IP address")?;

        Ok(DevServer {
            server: Arc::new(server),
            addr,
            chain: Arc::new(chain),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Serve on a background thread.
    pub fn spawn(self) -> RunningServer {
        let server = Arc::clone(&self.server);
        let addr = self.addr;
        let handle = thread::spawn(move || self.run());
        RunningServer {
            server,
            addr,
            handle,
        }
    }

    /// Serve until the server is unblocked.
    pub fn run(self) {
        tracing::debug!(addr = %self.addr, "dev server listening");
        while let Ok(request) = self.server.recv() {
            let chain = Arc::clone(&self.chain);
            // Artifact requests may block on a running build; keep others moving.
            thread::spawn(move || handle_request(&chain, request));
        }
        tracing::debug!(addr = %self.addr, "dev server stopped");
    }
}

/// Handle to a server started with [`DevServer::spawn`].
pub struct RunningServer {
    server: Arc<Server>,
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the accept loop to exit.
    pub fn shutdown(self) {
        self.server.unblock();
        if self.handle.join().is_err() {
            tracing::warn!("dev server thread panicked");
        }
    }

    /// Block for as long as the server runs.
    pub fn wait(self) {
        if self.handle.join().is_err() {
            tracing::warn!("dev server thread panicked");
        }
    }
}

fn handle_request(chain: &[Box<dyn Middleware>], request: Request) {
    let dev_request = DevRequest::new(
        Method::parse(&request.method().to_string()),
        request.url().to_string(),
    );

    let response = match dispatch(chain, &dev_request) {
        Ok(Some(response)) => response,
        Ok(None) => DevResponse::not_found(),
        Err(err) => {
            tracing::warn!(url = %dev_request.url, "request failed: {:#}", err);
            DevResponse::internal_error("Internal Server Error")
        }
    };

    tracing::trace!(url = %dev_request.url, status = response.status, "response");
    if let Err(err) = respond(request, response) {
        tracing::debug!(url = %dev_request.url, "failed to send response: {}", err);
    }
}

fn respond(request: Request, response: DevResponse) -> std::io::Result<()> {
    let headers: Vec<Header> = response
        .headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();
    let status = StatusCode(response.status);
    let len = usize::try_from(response.body.len()).ok();

    match response.body {
        Body::File(file) => {
            request.respond(Response::new(status, headers, file.reader, len, None))
        }
        Body::Bytes(bytes) => {
            request.respond(Response::new(status, headers, Cursor::new(bytes), len, None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::path::Path;

    use crate::delivery::gate::ReadinessGate;
    use crate::delivery::serve::ArtifactMiddleware;
    use crate::delivery::table::ServeTable;
    use crate::host::Host;
    use crate::test_support::{MockHost, WASM_BYTES};

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        )
        .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        String::from_utf8_lossy(&raw).into_owned()
    }

    #[test]
    fn test_serves_artifacts_and_404s_the_rest() {
        let host = Arc::new(MockHost::new("/project"));
        host.add_file(".grammar/tree-sitter-sql.wasm", WASM_BYTES);
        let table = ServeTable::new();
        table.register(
            host.as_ref(),
            "/tree-sitter-sql.wasm",
            Path::new("/project/.grammar/tree-sitter-sql.wasm"),
        );
        let host: Arc<dyn Host> = host;

        let chain: Vec<Box<dyn Middleware>> = vec![Box::new(ArtifactMiddleware::new(
            table,
            ReadinessGate::new(),
            host,
        ))];
        let running = DevServer::bind("127.0.0.1:0".parse().unwrap(), chain)
            .unwrap()
            .spawn();

        let hit = get(running.addr(), "/tree-sitter-sql.wasm");
        assert!(hit.starts_with("HTTP/1.1 200"), "{}", hit);
        assert!(hit.to_ascii_lowercase().contains("content-type: application/wasm"));
        assert!(hit
            .to_ascii_lowercase()
            .contains("cache-control: no-cache, no-store, must-revalidate"));

        let miss = get(running.addr(), "/tree-sitter-nix.wasm");
        assert!(miss.starts_with("HTTP/1.1 404"), "{}", miss);

        running.shutdown();
    }
}
