//! Fake carrier for tests: an axum server on a loopback port that records
//! every form-encoded request and answers with a canned response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};

/// One request received by the fake carrier.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub form: HashMap<String, String>,
}

struct CarrierState {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Clone)]
pub struct FakeCarrier {
    base_url: String,
    state: Arc<CarrierState>,
}

impl FakeCarrier {
    /// Start a carrier answering every request with `status` and `body`.
    pub async fn start(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        let state = Arc::new(CarrierState {
            status: StatusCode::from_u16(status).expect("valid status code"),
            content_type,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(record).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake carrier");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Carrier answering `200 OK` with a plain-text body.
    pub async fn ok(body: impl Into<String>) -> Self {
        Self::start(200, "text/plain", body).await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` on this carrier.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    /// The only request received; panics unless exactly one arrived.
    pub fn single_request(&self) -> RecordedRequest {
        let mut requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.remove(0)
    }
}

async fn record(
    State(state): State<Arc<CarrierState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            headers,
            form,
        });
    (
        state.status,
        [(header::CONTENT_TYPE, state.content_type)],
        state.body.clone(),
    )
}
