//! Mock Qiita server for plugin runs
//!
//! Authentication always succeeds; every other request is recorded and
//! answered by the test's responder.

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

type Responder = dyn Fn(&Recorded) -> (StatusCode, String) + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    responder: Arc<Responder>,
}

pub struct MockServer {
    pub base_url: String,
    state: MockState,
}

impl MockServer {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        };
        let app = Router::new()
            .fallback(handle)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("read test listener addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Recorded API requests in arrival order
    pub fn api_requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.api_requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, String) {
    if uri.path() == "/authenticate/" {
        return (
            StatusCode::OK,
            json!({"access_token": "plugin-token"}).to_string(),
        );
    }

    let recorded = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        body,
    };
    state.requests.lock().unwrap().push(recorded.clone());
    (state.responder)(&recorded)
}
