//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules: a mock annotation
//! service, a listener that never reads, and fixture images.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use starmark_client::UiEvent;
use starmark_client::config::Config;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How the mock service answers an upload
#[derive(Debug, Clone)]
pub enum Reply {
    /// Read the form, then answer with this status and body
    Fixed { status: u16, body: String },
    /// Hold the request open without answering
    Stall(Duration),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Fixed {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Fixed {
            status,
            body: body.into(),
        }
    }
}

/// One multipart field as the service received it
#[derive(Debug, Clone)]
pub struct ReceivedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    received: Arc<Mutex<Vec<ReceivedField>>>,
}

async fn upload(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    let (status, body) = match &state.reply {
        Reply::Stall(duration) => {
            tokio::time::sleep(*duration).await;
            return StatusCode::OK.into_response();
        }
        Reply::Fixed { status, body } => (*status, body.clone()),
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        state.received.lock().unwrap().push(ReceivedField {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body).into_response()
}

/// Mock annotation service bound to an ephemeral local port
pub struct MockService {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedField>>>,
    server: JoinHandle<()>,
}

impl MockService {
    pub async fn start(reply: Reply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            received: received.clone(),
        };
        let app = Router::new()
            .route("/upload", post(upload))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            received,
            server,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/upload", self.addr)
    }

    pub fn received(&self) -> Vec<ReceivedField> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Accepts connections and never reads from them
pub struct SilentListener {
    addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl SilentListener {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Self { addr, acceptor }
    }

    pub fn url(&self) -> String {
        format!("http://{}/upload", self.addr)
    }
}

impl Drop for SilentListener {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

/// Reads each request body in fixed slices with a pause between them, then answers 200
///
/// The receive buffer is kept small so the client cannot park much of the
/// upload in kernel buffers ahead of the reader.
pub struct ThrottledReader {
    addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

impl ThrottledReader {
    pub async fn start(slice: usize, pause: Duration, reply: &str) -> Self {
        let socket = TcpSocket::new_v4().unwrap();
        socket.set_recv_buffer_size(64 * 1024).unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(16).unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = reply.to_string();

        let acceptor = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let reply = reply.clone();
                tokio::spawn(async move {
                    let _ = serve_throttled(stream, slice, pause, &reply).await;
                });
            }
        });
        Self { addr, acceptor }
    }

    pub fn url(&self) -> String {
        format!("http://{}/upload", self.addr)
    }
}

impl Drop for ThrottledReader {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

async fn serve_throttled(
    mut stream: TcpStream,
    slice: usize,
    pause: Duration,
    reply: &str,
) -> std::io::Result<()> {
    // Request head
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await?;
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);

    let mut buffer = vec![0u8; slice];
    let mut remaining = length;
    while remaining > 0 {
        let take = remaining.min(slice);
        stream.read_exact(&mut buffer[..take]).await?;
        remaining -= take;
        tokio::time::sleep(pause).await;
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Endpoint on a local port with nothing listening
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/upload", addr)
}

/// Configuration pointing at `endpoint` with test-sized timeouts
pub fn test_config(endpoint: &str, temp_dir: &Path) -> Config {
    let mut config = Config::default();
    config.upload.endpoint = endpoint.to_string();
    config.upload.connect_timeout = Duration::from_secs(5);
    config.upload.write_timeout = Duration::from_secs(5);
    config.upload.read_timeout = Duration::from_secs(10);
    config.source.temp_dir = temp_dir.to_path_buf();
    config
}

/// Write a gradient JPEG of the given size
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    })
    .save_with_format(path, image::ImageFormat::Jpeg)
    .unwrap();
}

/// Drain queued UI events as short tags
pub fn drain_ui(receiver: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<String> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(match event {
            UiEvent::Busy(busy) => format!("busy:{busy}"),
            UiEvent::ControlsEnabled(enabled) => format!("controls:{enabled}"),
            UiEvent::DisplayImage(_) => "image".to_string(),
            UiEvent::DisplayError(_) => "error".to_string(),
        });
    }
    events
}

/// Files currently in a directory, empty if it does not exist
pub fn dir_entries(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Initialize test logging for detailed output
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "starmark=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
