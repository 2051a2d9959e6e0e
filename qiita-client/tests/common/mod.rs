//! Mock Qiita servers for integration tests
//!
//! [`MockServer`] answers `/authenticate/` with sequential tokens (`token-1`,
//! `token-2`, ...) and every other request through a test-provided responder.
//! All requests, including authentication, are recorded.
//!
//! [`RawServer`] speaks HTTP over a bare socket so a test can close a
//! connection without answering, as a restarting server does.

#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const EXPIRED_BODY: &str =
    r#"{"error": "invalid_grant", "error_description": "Oauth2 error: token has timed out"}"#;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

type Responder = dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    tokens_issued: Arc<AtomicUsize>,
    auth_allowed: Arc<AtomicBool>,
    responder: Arc<Responder>,
}

pub struct MockServer {
    pub base_url: String,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            tokens_issued: Arc::new(AtomicUsize::new(0)),
            auth_allowed: Arc::new(AtomicBool::new(true)),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("read test listener addr");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            task,
        }
    }

    /// Makes `/authenticate/` answer 401 from now on
    pub fn reject_authentication(&self) {
        self.state.auth_allowed.store(false, Ordering::SeqCst);
    }

    pub fn tokens_issued(&self) -> usize {
        self.state.tokens_issued.load(Ordering::SeqCst)
    }

    /// Every recorded request except authentication
    pub fn api_requests(&self) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path != "/authenticate/")
            .cloned()
            .collect()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.api_requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn auth_requests(&self) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == "/authenticate/")
            .cloned()
            .collect()
    }

    /// Stops listening; later connections are refused
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    };
    state.requests.lock().unwrap().push(recorded.clone());

    if recorded.path == "/authenticate/" {
        if !state.auth_allowed.load(Ordering::SeqCst) {
            return (StatusCode::UNAUTHORIZED, "invalid client".to_string());
        }
        let issued = state.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        return (
            StatusCode::OK,
            json!({"access_token": format!("token-{issued}")}).to_string(),
        );
    }

    (state.responder)(&recorded)
}

/// Answer of a [`RawServer`]: `Some((status, body))`, or `None` to close the
/// connection without answering
type RawAnswer = dyn Fn(&str) -> Option<(u16, String)> + Send + Sync;

pub struct RawServer {
    pub base_url: String,
    request_lines: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl RawServer {
    /// Starts the server; `answer` receives the request line
    /// (e.g. `POST /authenticate/ HTTP/1.1`)
    pub async fn start<F>(answer: F) -> Self
    where
        F: Fn(&str) -> Option<(u16, String)> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("read test listener addr");
        let request_lines = Arc::new(Mutex::new(Vec::new()));
        let answer: Arc<RawAnswer> = Arc::new(answer);

        let lines = Arc::clone(&request_lines);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let lines = Arc::clone(&lines);
                let answer = Arc::clone(&answer);
                tokio::spawn(serve_raw(stream, lines, answer));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            request_lines,
            task,
        }
    }

    /// Request lines received so far, in arrival order
    pub fn request_lines(&self) -> Vec<String> {
        self.request_lines.lock().unwrap().clone()
    }

    /// Number of requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.request_lines()
            .iter()
            .filter(|line| line.split(' ').nth(1) == Some(path))
            .count()
    }
}

impl Drop for RawServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serves one request per connection, then closes it
async fn serve_raw(
    mut stream: TcpStream,
    lines: Arc<Mutex<Vec<String>>>,
    answer: Arc<RawAnswer>,
) {
    let Some(request_line) = read_request(&mut stream).await else {
        return;
    };
    lines.lock().unwrap().push(request_line.clone());

    if let Some((status, body)) = (*answer)(&request_line) {
        let response = format!(
            "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

/// Reads a full request (head and `content-length` body), returning its
/// request line
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    head.lines().next().map(str::to_string)
}
