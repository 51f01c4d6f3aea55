//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wms_pipeline::config::PipelineConfig;
use wms_pipeline::http::{PreparedRequest, ResponseEnvelope, Transport, TransportError};
use wms_pipeline::{Pipeline, TokenStore};

/// What the scripted transport does for one attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(ResponseEnvelope),
    Fail(TransportError),
    /// Never answer; only a deadline or cancellation ends the attempt.
    Hang,
}

impl Step {
    pub fn json(status: u16, body: &str) -> Self {
        Step::Respond(ResponseEnvelope::with_content_type(status, "application/json", body))
    }

    pub fn binary(content_type: &str, body: Vec<u8>) -> Self {
        Step::Respond(ResponseEnvelope::with_content_type(200, content_type, body))
    }

    pub fn refused() -> Self {
        Step::Fail(TransportError::connect("connection refused"))
    }
}

/// In-memory transport that plays back a script and records every request.
///
/// Requests whose URL contains a route key take steps from that route's
/// script, everything else from the shared one. Once a script runs out every
/// attempt fails with a refused connection.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    routes: Mutex<Vec<(String, VecDeque<Step>)>>,
    sent: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn routed(routes: Vec<(&str, Vec<Step>)>) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(
                routes
                    .into_iter()
                    .map(|(key, steps)| (key.to_string(), steps.into_iter().collect()))
                    .collect(),
            ),
            ..Self::default()
        })
    }

    fn next_step(&self, url: &str) -> Step {
        let mut routes = self.routes.lock().unwrap();
        let step = match routes.iter_mut().find(|(key, _)| url.contains(key.as_str())) {
            Some((_, steps)) => steps.pop_front(),
            None => self.script.lock().unwrap().pop_front(),
        };
        step.unwrap_or_else(Step::refused)
    }

    pub fn sent(&self) -> Vec<PreparedRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(
        &'a self,
        request: &'a PreparedRequest,
    ) -> BoxFuture<'a, Result<ResponseEnvelope, TransportError>> {
        self.sent.lock().unwrap().push(request.clone());
        let step = self.next_step(&request.url);
        Box::pin(async move {
            match step {
                Step::Respond(envelope) => Ok(envelope),
                Step::Fail(error) => Err(error),
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

/// Pipeline whose every attempt fails with a refused connection.
pub fn failing_pipeline() -> (Arc<Pipeline>, Arc<ScriptedTransport>) {
    scripted_pipeline(Vec::<Step>::new())
}

/// Pipeline over a scripted transport with default config.
pub fn scripted_pipeline(steps: impl IntoIterator<Item = Step>) -> (Arc<Pipeline>, Arc<ScriptedTransport>) {
    scripted_pipeline_with(PipelineConfig::default(), Arc::new(TokenStore::new()), steps)
}

pub fn scripted_pipeline_with(
    config: PipelineConfig,
    session: Arc<TokenStore>,
    steps: impl IntoIterator<Item = Step>,
) -> (Arc<Pipeline>, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new(steps);
    let pipeline = Pipeline::new(config, transport.clone(), session);
    (Arc::new(pipeline), transport)
}

/// A canned HTTP response from the mock backend.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some(content_type),
            body: body.into(),
        }
    }
}

/// Request heads received by the mock backend, in arrival order.
pub type Captured = Arc<Mutex<Vec<String>>>;

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Captured)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = captured.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let head = read_request(&mut socket).await;
                        seen.lock().unwrap().push(head);

                        let response = f().await;
                        let mut raw = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                            response.status,
                            reason(response.status),
                            response.body.len()
                        );
                        if let Some(content_type) = response.content_type {
                            raw.push_str(&format!("Content-Type: {}\r\n", content_type));
                        }
                        raw.push_str("\r\n");

                        let _ = socket.write_all(raw.as_bytes()).await;
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Read the request head and any declared body; returns the head.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let body_len = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut have = buf.len() - head_end;
    while have < body_len {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => have += n,
        }
    }
    head
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Value of a header in a captured request head, case-insensitively.
pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// A local address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
