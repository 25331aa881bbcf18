//! In-memory stand-in for the Automoy backend.
//!
//! Serves the same endpoints the dashboard consumes, keeps counters of what
//! was requested, and can be told to misbehave. Used by the `stub-backend`
//! binary and by the integration tests.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use image::{ImageBuffer, ImageFormat, Rgba};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};

use crate::api::{CONFIG_PATH, GOAL_PATH, PROBE_PATH, STATE_PATH, STREAM_PATH, TOGGLE_PAUSE_PATH};
use crate::state::ScreenshotKind;
use crate::types::{GoalRequest, OperatorState};

/// Failure to inject into `/set_goal`.
#[derive(Debug, Clone)]
pub struct GoalFailure {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug)]
struct StubState {
    snapshot: OperatorState,
    paused: bool,
    omniparser_port: u16,
    hits: HashMap<&'static str, usize>,
    goals: Vec<String>,
    raw_png: Option<Vec<u8>>,
    processed_png: Option<Vec<u8>>,
    screenshot_delays: HashMap<ScreenshotKind, Duration>,
    goal_failure: Option<GoalFailure>,
    probe_status: StatusCode,
    state_delay: Duration,
    toggle_delays: Vec<Duration>,
    /// Close each push connection after this many messages.
    stream_limit: Option<usize>,
}

/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct StubBackend {
    inner: Arc<Mutex<StubState>>,
    updates: broadcast::Sender<OperatorState>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        let png = solid_png(8, 6, [40, 120, 200, 255]);
        Self {
            inner: Arc::new(Mutex::new(StubState {
                snapshot: OperatorState::default(),
                paused: false,
                omniparser_port: 8111,
                hits: HashMap::new(),
                goals: Vec::new(),
                raw_png: Some(png.clone()),
                processed_png: Some(png),
                screenshot_delays: HashMap::new(),
                goal_failure: None,
                probe_status: StatusCode::OK,
                state_delay: Duration::ZERO,
                toggle_delays: Vec::new(),
                stream_limit: None,
            })),
            updates,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(CONFIG_PATH, get(config_handler))
            .route(STATE_PATH, get(state_handler))
            .route(GOAL_PATH, post(goal_handler))
            .route(TOGGLE_PAUSE_PATH, post(toggle_handler))
            .route(STREAM_PATH, get(stream_handler))
            .route(ScreenshotKind::Raw.path(), get(raw_screenshot_handler))
            .route(ScreenshotKind::Processed.path(), get(processed_screenshot_handler))
            .route(PROBE_PATH, get(probe_handler))
            .with_state(self.clone())
    }

    /// Serves on an already bound listener in a background task.
    pub fn serve(&self, listener: TcpListener) -> std::io::Result<SocketAddr> {
        let addr = listener.local_addr()?;
        let app = self.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "stub backend stopped");
            }
        });
        info!(%addr, "stub backend listening");
        Ok(addr)
    }

    /// Replaces the snapshot and pushes it to every open stream.
    pub fn publish(&self, snapshot: OperatorState) {
        self.inner.lock().snapshot = snapshot.clone();
        let _ = self.updates.send(snapshot);
    }

    pub fn update(&self, edit: impl FnOnce(&mut OperatorState)) {
        let snapshot = {
            let mut inner = self.inner.lock();
            edit(&mut inner.snapshot);
            inner.snapshot.clone()
        };
        let _ = self.updates.send(snapshot);
    }

    pub fn snapshot(&self) -> OperatorState {
        self.inner.lock().snapshot.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.inner.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn goals(&self) -> Vec<String> {
        self.inner.lock().goals.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn set_omniparser_port(&self, port: u16) {
        self.inner.lock().omniparser_port = port;
    }

    pub fn set_screenshot(&self, kind: ScreenshotKind, png: Option<Vec<u8>>) {
        let mut inner = self.inner.lock();
        match kind {
            ScreenshotKind::Raw => inner.raw_png = png,
            ScreenshotKind::Processed => inner.processed_png = png,
        }
    }

    pub fn set_screenshot_delay(&self, kind: ScreenshotKind, delay: Duration) {
        self.inner.lock().screenshot_delays.insert(kind, delay);
    }

    pub fn fail_goals(&self, failure: Option<GoalFailure>) {
        self.inner.lock().goal_failure = failure;
    }

    pub fn set_probe_status(&self, status: StatusCode) {
        self.inner.lock().probe_status = status;
    }

    pub fn set_state_delay(&self, delay: Duration) {
        self.inner.lock().state_delay = delay;
    }

    /// Delays for the next toggle requests, consumed in arrival order.
    pub fn set_toggle_delays(&self, delays: Vec<Duration>) {
        self.inner.lock().toggle_delays = delays;
    }

    pub fn set_stream_limit(&self, limit: Option<usize>) {
        self.inner.lock().stream_limit = limit;
    }

    fn hit(&self, path: &'static str) {
        debug!(path, "stub request");
        *self.inner.lock().hits.entry(path).or_default() += 1;
    }
}

pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    // writing a small in-memory PNG cannot fail
    let _ = image.write_to(&mut bytes, ImageFormat::Png);
    bytes.into_inner()
}

async fn config_handler(State(stub): State<StubBackend>) -> Json<serde_json::Value> {
    stub.hit(CONFIG_PATH);
    let port = stub.inner.lock().omniparser_port;
    Json(json!({ "OMNIPARSER_PORT": port }))
}

async fn state_handler(State(stub): State<StubBackend>) -> Json<OperatorState> {
    stub.hit(STATE_PATH);
    let delay = stub.inner.lock().state_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Json(stub.snapshot())
}

async fn goal_handler(State(stub): State<StubBackend>, Json(request): Json<GoalRequest>) -> Response {
    stub.hit(GOAL_PATH);
    let failure = stub.inner.lock().goal_failure.clone();
    if let Some(failure) = failure {
        return (failure.status, failure.body).into_response();
    }

    let objective = format!("Accomplish: {}", request.goal);
    stub.update(|snapshot| {
        snapshot.user_goal = Some(request.goal.clone());
        snapshot.formulated_objective = Some(objective.clone());
    });
    stub.inner.lock().goals.push(request.goal.clone());
    Json(json!({ "goal": request.goal, "formulated_objective": objective })).into_response()
}

async fn toggle_handler(State(stub): State<StubBackend>) -> Json<serde_json::Value> {
    stub.hit(TOGGLE_PAUSE_PATH);
    // flip on arrival so the server order is the request order
    let (paused, delay) = {
        let mut inner = stub.inner.lock();
        inner.paused = !inner.paused;
        let delay = if inner.toggle_delays.is_empty() {
            Duration::ZERO
        } else {
            inner.toggle_delays.remove(0)
        };
        (inner.paused, delay)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Json(json!({ "status": "success", "is_paused": paused }))
}

async fn stream_handler(
    State(stub): State<StubBackend>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    stub.hit(STREAM_PATH);
    let (current, limit) = {
        let inner = stub.inner.lock();
        (inner.snapshot.clone(), inner.stream_limit)
    };
    let rx = stub.updates.subscribe();
    let updates = BroadcastStream::new(rx).filter_map(|result| result.ok());
    let stream = tokio_stream::once(current)
        .chain(updates)
        .take(limit.unwrap_or(usize::MAX))
        .map(|snapshot| Ok::<_, Infallible>(to_sse_event(&snapshot)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse_event(snapshot: &OperatorState) -> Event {
    match serde_json::to_string(snapshot) {
        Ok(data) => Event::default().data(data),
        Err(_) => Event::default().comment("unserializable snapshot"),
    }
}

async fn raw_screenshot_handler(State(stub): State<StubBackend>) -> Response {
    screenshot_response(&stub, ScreenshotKind::Raw).await
}

async fn processed_screenshot_handler(State(stub): State<StubBackend>) -> Response {
    screenshot_response(&stub, ScreenshotKind::Processed).await
}

async fn screenshot_response(stub: &StubBackend, kind: ScreenshotKind) -> Response {
    stub.hit(kind.path());
    let (png, delay) = {
        let inner = stub.inner.lock();
        let png = match kind {
            ScreenshotKind::Raw => inner.raw_png.clone(),
            ScreenshotKind::Processed => inner.processed_png.clone(),
        };
        let delay = inner.screenshot_delays.get(&kind).copied();
        (png, delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    match png {
        Some(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn probe_handler(State(stub): State<StubBackend>) -> StatusCode {
    stub.hit(PROBE_PATH);
    stub.inner.lock().probe_status
}
