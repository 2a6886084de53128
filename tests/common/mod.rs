//! Shared utilities for integration tests: mock upstreams and a relay runner.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::{stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sse_relay::config::RelayConfig;
use sse_relay::relay::{RelayObserver, TelemetryObserver};
use sse_relay::{HttpServer, Listener, Shutdown};

pub const API_KEY: &str = "test-key";

/// What the SSE mock answers with.
#[derive(Clone)]
pub enum Script {
    /// Fixed raw chunks, written in order with `delay` before each.
    Chunks {
        status: StatusCode,
        chunks: Vec<String>,
        delay: Duration,
    },
    /// `data: <request body>` repeated `times`, with `delay` before each.
    Echo { times: usize, delay: Duration },
}

impl Script {
    pub fn chunks(chunks: &[&str]) -> Self {
        Script::Chunks {
            status: StatusCode::OK,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_status(self, status: StatusCode) -> Self {
        match self {
            Script::Chunks { chunks, delay, .. } => Script::Chunks {
                status,
                chunks,
                delay,
            },
            echo => echo,
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        match self {
            Script::Chunks { status, chunks, .. } => Script::Chunks {
                status,
                chunks,
                delay,
            },
            Script::Echo { times, .. } => Script::Echo { times, delay },
        }
    }
}

/// A request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

struct UpstreamState {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Handle on a running mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<UpstreamState>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}/v1/stream", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn upstream_handler(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(RecordedRequest {
        headers,
        body: body.clone(),
    });

    let (status, chunks, delay) = match &state.script {
        Script::Chunks {
            status,
            chunks,
            delay,
        } => (*status, chunks.clone(), *delay),
        Script::Echo { times, delay } => {
            let line = format!("data: {}\n\n", String::from_utf8_lossy(&body));
            (StatusCode::OK, vec![line; *times], *delay)
        }
    };

    let frames = stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    });

    (
        status,
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(frames),
    )
        .into_response()
}

/// Start an axum SSE upstream that records every request and plays `script`.
pub async fn start_sse_upstream(script: Script) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(UpstreamState {
        script,
        calls: AtomicUsize::new(0),
        requests: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .fallback(upstream_handler)
        .with_state(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockUpstream { addr, state }
}

/// Raw TCP upstream that answers with a chunked 200, writes `frames`, and then
/// drops the socket without the final chunk.
pub async fn start_aborting_upstream(frames: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        read_request(&mut socket).await;
                        let head = "HTTP/1.1 200 OK\r\n\
                                    Content-Type: text/event-stream\r\n\
                                    Transfer-Encoding: chunked\r\n\r\n";
                        let chunk = format!("{:x}\r\n{}\r\n", frames.len(), frames);
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(chunk.as_bytes()).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        // Dropped here: the body never terminates.
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, calls)
}

/// Consume one request head plus its Content-Length body.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            return;
        }
    }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Relay configuration pointed at `endpoint`, bound to an ephemeral port.
pub fn relay_config(endpoint: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.endpoint = endpoint.to_string();
    config.upstream.api_key = API_KEY.to_string();
    config.upstream.use_system_proxy = false;
    config.upstream.first_byte_timeout_secs = 5;
    config
}

/// A relay served on a real socket.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl RunningRelay {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    start_relay_with_observer(config, Arc::new(TelemetryObserver)).await
}

pub async fn start_relay_with_observer(
    config: RelayConfig,
    observer: Arc<dyn RelayObserver>,
) -> RunningRelay {
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::with_observer(config, observer).unwrap();

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningRelay {
        addr,
        shutdown,
        handle,
    }
}

/// Client that bypasses env proxies and never pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
