//! Shared utilities for integration testing.
//!
//! Everything binds to ephemeral ports on 127.0.0.1, so tests can run in
//! parallel.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use vhost_proxy::config::ProxyConfig;
use vhost_proxy::lifecycle::Shutdown;
use vhost_proxy::net::SessionTracker;
use vhost_proxy::{HttpServer, ReloadController};

static NEXT_FILE: AtomicUsize = AtomicUsize::new(0);

/// A unique routing file path for this test process.
pub fn temp_routes_path(tag: &str) -> PathBuf {
    let n = NEXT_FILE.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "vhost-proxy-it-{}-{}-{}.toml",
        tag,
        std::process::id(),
        n
    ))
}

/// Routing file content mapping each virtual host to a backend address.
pub fn routes(entries: &[(&str, SocketAddr)]) -> String {
    entries
        .iter()
        .map(|(vhost, addr)| format!("[\"{}\"]\nhost = \"{}\"\n\n", vhost, addr))
        .collect()
}

/// An HTTP backend that answers every request with its name followed by the
/// request head it received.
pub struct HttpBackend {
    pub addr: SocketAddr,
    pub accepts: Arc<AtomicUsize>,
}

pub async fn start_http_backend(name: &'static str) -> HttpBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let body = format!("{}\n{}", name, String::from_utf8_lossy(&head));
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    HttpBackend { addr, accepts }
}

/// What a WebSocket backend saw during the handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub path_and_query: String,
    pub headers: Vec<(String, String)>,
}

impl Handshake {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A WebSocket backend that records handshakes and data frames and echoes
/// every data frame back prefixed with its name. A text frame `bye` makes
/// it close the connection with a normal close.
pub struct WsBackend {
    pub addr: SocketAddr,
    pub accepts: Arc<AtomicUsize>,
    pub handshakes: mpsc::UnboundedReceiver<Handshake>,
    pub frames: mpsc::UnboundedReceiver<Message>,
}

pub async fn start_ws_backend(name: &'static str) -> WsBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();
    let (handshake_tx, handshakes) = mpsc::unbounded_channel();
    let (frame_tx, frames) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let handshake_tx = handshake_tx.clone();
            let frame_tx = frame_tx.clone();

            tokio::spawn(async move {
                let record = |req: &Request, resp: Response| {
                    let handshake = Handshake {
                        path_and_query: req
                            .uri()
                            .path_and_query()
                            .map(|pq| pq.as_str().to_string())
                            .unwrap_or_default(),
                        headers: req
                            .headers()
                            .iter()
                            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
                            .collect(),
                    };
                    let _ = handshake_tx.send(handshake);
                    Ok::<_, ErrorResponse>(resp)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, record).await else {
                    return;
                };

                while let Some(Ok(message)) = ws.next().await {
                    match &message {
                        Message::Text(text) if text.as_str() == "bye" => {
                            let _ = frame_tx.send(message.clone());
                            let _ = ws
                                .close(Some(CloseFrame {
                                    code: CloseCode::Normal,
                                    reason: "bye".into(),
                                }))
                                .await;
                            break;
                        }
                        Message::Text(text) => {
                            let reply = Message::text(format!("{}:{}", name, text.as_str()));
                            let _ = frame_tx.send(message.clone());
                            if ws.send(reply).await.is_err() {
                                break;
                            }
                        }
                        Message::Binary(payload) => {
                            let mut reply = name.as_bytes().to_vec();
                            reply.push(b':');
                            reply.extend_from_slice(payload);
                            let _ = frame_tx.send(message.clone());
                            if ws.send(Message::binary(reply)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });

    WsBackend {
        addr,
        accepts,
        handshakes,
        frames,
    }
}

/// A running proxy with its moving parts exposed.
pub struct Proxy {
    pub addr: SocketAddr,
    pub routes_path: PathBuf,
    pub controller: Arc<ReloadController>,
    pub shutdown: Arc<Shutdown>,
    pub sessions: SessionTracker,
    pub server: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl Proxy {
    /// Overwrite the routing file. Does not reload.
    pub fn write_routes(&self, content: &str) {
        std::fs::write(&self.routes_path, content).unwrap();
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
        let _ = std::fs::remove_file(&self.routes_path);
    }
}

/// Start a plaintext proxy serving the given routing file content.
pub async fn boot_proxy(routes_content: &str) -> Proxy {
    let routes_path = temp_routes_path("routes");
    std::fs::write(&routes_path, routes_content).unwrap();

    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.routes.path = routes_path.clone();
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config.timeouts.close_secs = 1;
    config.timeouts.shutdown_grace_secs = 1;

    let controller = Arc::new(ReloadController::load(&routes_path).unwrap());
    let shutdown = Arc::new(Shutdown::new());

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(&config, controller.clone(), shutdown.clone());
    let sessions = server.sessions();
    let server = tokio::spawn(server.run(listener, None));

    Proxy {
        addr,
        routes_path,
        controller,
        shutdown,
        sessions,
        server,
    }
}

/// HTTP client that never goes through a system proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Wait for a condition to become true, polling every 20ms.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
