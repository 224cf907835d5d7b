//! Integration tests for the relay HTTP API
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`; the bitrate
//! probe is replaced by a stub so no external tool is needed.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tower::ServiceExt;

use audio_relay::probe::{ProbeTool, ToolOutput};
use audio_relay::registry::ClientRegistry;
use audio_relay::server::{create_router, AppState};
use audio_relay::{RelayConfig, RelayServer, SessionController, SessionPhase};

/// Reports 8 kbps, so the test track plays at 1000 bytes per second
struct StubTool;

impl ProbeTool for StubTool {
    async fn run(&self, _track: &Path) -> io::Result<ToolOutput> {
        Ok(ToolOutput::stdout("8k\n"))
    }
}

struct TestServer {
    app: Router,
    controller: Arc<SessionController<StubTool>>,
    _public: tempfile::TempDir,
}

fn setup() -> TestServer {
    let public = tempfile::tempdir().unwrap();
    std::fs::create_dir(public.path().join("home")).unwrap();
    std::fs::create_dir(public.path().join("controller")).unwrap();
    std::fs::write(public.path().join("home/index.html"), "<h1>home</h1>").unwrap();
    std::fs::write(public.path().join("controller/index.html"), "<h1>controller</h1>").unwrap();
    std::fs::write(public.path().join("app.css"), "body {}").unwrap();
    std::fs::write(public.path().join("track.mp3"), vec![0x42u8; 64 * 1024]).unwrap();

    let config = RelayConfig::default()
        .public_root(public.path())
        .default_track(public.path().join("track.mp3"));
    let controller = Arc::new(SessionController::new(
        config,
        StubTool,
        Arc::new(ClientRegistry::new()),
    ));
    let app = create_router(AppState::new(Arc::clone(&controller)));

    TestServer {
        app,
        controller,
        _public: public,
    }
}

async fn get(app: &Router, path: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_command(app: &Router, command: &str) -> (StatusCode, Value) {
    let request = Request::post("/controller")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "command": command }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_root_redirects_home() {
    let server = setup();

    let response = get(&server.app, "/").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/home");
}

#[tokio::test]
async fn test_pages_are_served() {
    let server = setup();

    let response = get(&server.app, "/home").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(body_text(response).await, "<h1>home</h1>");

    let response = get(&server.app, "/controller").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<h1>controller</h1>");
}

#[tokio::test]
async fn test_static_files() {
    let server = setup();

    let response = get(&server.app, "/app.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    let response = get(&server.app, "/missing.js").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_and_stop_commands() {
    let server = setup();

    let (status, body) = post_command(&server.app, "please START playback").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": "ok" }));
    assert_eq!(server.controller.phase(), SessionPhase::Streaming);

    let (status, body) = post_command(&server.app, "STOP now").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": "ok" }));
    assert_eq!(server.controller.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_status_reports_session() {
    let server = setup();

    let response = get(&server.app, "/status").await;
    let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["listeners"], 0);

    server.controller.start().await.unwrap();

    let response = get(&server.app, "/status").await;
    let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(status["phase"], "streaming");
    assert_eq!(status["bitrate"], 8_000);
    assert_eq!(status["bytes_per_second"], 1_000);
    assert!(status["observed_bitrate"].is_u64());

    server.controller.stop().await;
}

#[tokio::test]
async fn test_stream_delivers_audio_and_detaches_on_close() {
    let server = setup();

    let response = get(&server.app, "/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(server.controller.registry().len().await, 1);

    server.controller.start().await.unwrap();

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("first chunk")
        .expect("body ended early")
        .unwrap();
    let chunk = frame.into_data().unwrap();
    assert!(!chunk.is_empty());
    assert!(chunk.iter().all(|&b| b == 0x42));

    // Client goes away
    drop(body);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !server.controller.registry().is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener should be unregistered");

    server.controller.stop().await;
}

fn header_end(response: &[u8]) -> Option<usize> {
    response
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

#[tokio::test]
async fn test_graceful_shutdown_stops_session_and_ends_streams() {
    let server = setup();
    let controller = Arc::clone(&server.controller);
    let relay = RelayServer::with_controller(Arc::clone(&controller));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let serving = tokio::spawn(async move {
        relay
            .serve(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /stream HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.registry().is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener should register");

    controller.start().await.unwrap();
    assert_eq!(controller.phase(), SessionPhase::Streaming);

    // Read the response head and the first audio bytes
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before audio arrived");
            response.extend_from_slice(&buf[..n]);

            if header_end(&response).is_some_and(|end| response.len() > end) {
                break;
            }
        }
    })
    .await
    .expect("first audio bytes");
    assert!(response.starts_with(b"HTTP/1.1 200 OK"));

    shutdown_tx.send(()).unwrap();

    // The stream body ends and the connection closes
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut response))
        .await
        .expect("stream should end on shutdown")
        .unwrap();
    assert!(response.ends_with(b"0\r\n\r\n"));

    let result = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("server should stop")
        .unwrap();
    assert!(result.is_ok());

    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(controller.registry().is_empty().await);
}
