//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use resilient_client::config::ClientConfig;
use resilient_client::http::{ApiResponse, PreparedRequest, Transport, TransportError};
use resilient_client::resilience::NoBackoff;
use resilient_client::ResilientClient;

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Refused,
    /// Never answers.
    Hang,
}

/// In-memory transport that replays a script and counts invocations.
///
/// Once the script runs out the fallback reply is repeated.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Mutex::new(fallback),
            calls: AtomicU32::new(0),
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Change the reply used once the script is exhausted.
    pub fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = reply;
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn issue(
        &self,
        _request: &PreparedRequest,
        _timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        match reply {
            Reply::Status(code) => Ok(ApiResponse::new(
                StatusCode::from_u16(code).unwrap(),
                format!(r#"{{"code": {}}}"#, code),
            )),
            Reply::Refused => Err(TransportError::Connect("connection refused".into())),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Config for tests: the given breaker settings, everything else default.
pub fn test_config(max_retries: u32, threshold: u32, reset_secs: f64) -> ClientConfig {
    let mut config = ClientConfig::new("http://upstream.test");
    config.resilience.max_retries = max_retries;
    config.resilience.circuit_breaker_threshold = threshold;
    config.resilience.circuit_breaker_reset_secs = reset_secs;
    config
}

/// Client over `transport` that retries without waiting.
pub fn scripted_client(config: ClientConfig, transport: Arc<ScriptedTransport>) -> ResilientClient {
    ResilientClient::with_transport(config, transport)
        .unwrap()
        .with_backoff(Arc::new(NoBackoff))
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` is called once per request and returns the status code and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        if read_request(&mut socket).await.is_err() {
                            return;
                        }

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request: the head, then `Content-Length` bytes of body.
/// Returns the body.
pub async fn read_request(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]);
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(buf[head_end..head_end + content_length].to_vec())
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
