// In-process stand-in for the MetaMapa API.
// Serves canned responses for the fact and import endpoints and records every
// request (query, headers, multipart parts) so tests can assert on the wire.
use anyhow::{Context, Result};
use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl RecordedPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    pub parts: Vec<RecordedPart>,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&RecordedPart> {
        self.parts.iter().find(|part| part.name == name)
    }

    pub fn parts_named(&self, name: &str) -> Vec<&RecordedPart> {
        self.parts.iter().filter(|part| part.name == name).collect()
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: Value,
}

impl CannedResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for CannedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            // Plain-text bodies mirror the API's ad-hoc error strings.
            Value::String(text) => (status, text).into_response(),
            body => (status, Json(body)).into_response(),
        }
    }
}

struct StubState {
    facts: Mutex<CannedResponse>,
    fact_delay: Mutex<Duration>,
    create: Mutex<CannedResponse>,
    import: Mutex<CannedResponse>,
    imports: Mutex<CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            facts: Mutex::new(CannedResponse::ok(json!([]))),
            fact_delay: Mutex::new(Duration::ZERO),
            create: Mutex::new(CannedResponse::ok(json!({ "id": 1 }))),
            import: Mutex::new(CannedResponse::ok(json!({
                "exitoso": true,
                "mensaje": "Archivo procesado",
                "procesadas": 0,
                "insertadas": 0,
                "reemplazadas": 0,
                "salteadas": 0,
                "errores": []
            }))),
            imports: Mutex::new(CannedResponse::ok(json!([]))),
            requests: Mutex::new(Vec::new()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running stub API; the server stops when this handle is dropped.
pub struct StubApi {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubApi {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_on("127.0.0.1:0".parse().context("parse stub bind")?).await
    }

    pub async fn spawn_on(addr: SocketAddr) -> Result<Self> {
        let state = Arc::new(StubState::default());
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind stub api on {addr}"))?;
        let addr = listener.local_addr().context("stub api local addr")?;
        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                tracing::warn!(error = %err, "stub api stopped");
            }
        });
        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL including the `/api` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn set_facts(&self, facts: Value) {
        *lock(&self.state.facts) = CannedResponse::ok(facts);
    }

    pub fn fail_facts(&self, status: u16, body: Value) {
        *lock(&self.state.facts) = CannedResponse::error(status, body);
    }

    pub fn set_fact_delay(&self, delay: Duration) {
        *lock(&self.state.fact_delay) = delay;
    }

    pub fn set_create_response(&self, response: CannedResponse) {
        *lock(&self.state.create) = response;
    }

    pub fn set_import_response(&self, response: CannedResponse) {
        *lock(&self.state.import) = response;
    }

    pub fn set_imports(&self, runs: Value) {
        *lock(&self.state.imports) = CannedResponse::ok(runs);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method && request.path == path)
            .collect()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/interna/hechos", get(list_facts).post(create_fact))
        .route(
            "/api/admin/importar-dataset",
            axum::routing::post(import_dataset),
        )
        .route("/api/admin/importaciones", get(list_imports))
        .with_state(state)
}

fn record(
    state: &StubState,
    method: Method,
    uri: &Uri,
    query: Vec<(String, String)>,
    headers: &HeaderMap,
    parts: Vec<RecordedPart>,
) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    lock(&state.requests).push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        parts,
    });
}

async fn collect_parts(mut multipart: Multipart) -> Result<Vec<RecordedPart>> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.context("next multipart field")? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.context("multipart field body")?.to_vec();
        parts.push(RecordedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(parts)
}

async fn list_facts(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, query, &headers, Vec::new());
    let delay = *lock(&state.fact_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let response = lock(&state.facts).clone();
    response.into_response()
}

async fn create_fact(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let parts = match collect_parts(multipart).await {
        Ok(parts) => parts,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };
    record(&state, method, &uri, Vec::new(), &headers, parts);
    let response = lock(&state.create).clone();
    response.into_response()
}

async fn import_dataset(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let parts = match collect_parts(multipart).await {
        Ok(parts) => parts,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };
    record(&state, method, &uri, Vec::new(), &headers, parts);
    let response = lock(&state.import).clone();
    response.into_response()
}

async fn list_imports(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, Vec::new(), &headers, Vec::new());
    let response = lock(&state.imports).clone();
    response.into_response()
}
