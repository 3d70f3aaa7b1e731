#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime};

use taleweave::clock::{Clock, FixedClock};
use taleweave::config::GenerationParams;
use taleweave::memory::backup::BackupService;
use taleweave::memory::MemoryStore;
use taleweave::oracle::{Oracle, OracleError, OracleRequest};
use taleweave::store::{InMemoryRecordStore, RecordStore};
use taleweave::Error;

/// 2026-10-18 21:30, the start time of every test clock.
pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 18)
        .unwrap()
        .and_hms_opt(21, 30, 0)
        .unwrap()
}

/// An in-memory memory store with handles on each backing record area.
pub struct TestStore {
    pub characters: Arc<FailingStore>,
    pub story: Arc<InMemoryRecordStore>,
    pub backups: Arc<InMemoryRecordStore>,
    pub clock: Arc<FixedClock>,
    pub memory: MemoryStore,
}

pub fn test_store() -> TestStore {
    let characters = Arc::new(FailingStore::new());
    let story = Arc::new(InMemoryRecordStore::new());
    let backups = Arc::new(InMemoryRecordStore::new());
    let clock = Arc::new(FixedClock::new(start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let memory = MemoryStore::new(
        Box::new(characters.clone()),
        Box::new(story.clone()),
        BackupService::new(Box::new(backups.clone()), dyn_clock.clone()),
        dyn_clock,
        "story_recent",
    );
    TestStore {
        characters,
        story,
        backups,
        clock,
        memory,
    }
}

/// Record store that fails writes to one chosen record on demand.
#[derive(Default)]
pub struct FailingStore {
    pub inner: InMemoryRecordStore,
    fail_writes_to: Mutex<Option<String>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to(&self, record: &str) {
        *self.fail_writes_to.lock().unwrap() = Some(record.to_string());
    }

    pub fn heal(&self) {
        *self.fail_writes_to.lock().unwrap() = None;
    }
}

impl RecordStore for FailingStore {
    fn read(&self, name: &str) -> taleweave::Result<Option<String>> {
        self.inner.read(name)
    }

    fn write(&self, name: &str, content: &str) -> taleweave::Result<()> {
        if self.fail_writes_to.lock().unwrap().as_deref() == Some(name) {
            return Err(Error::storage(
                name,
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.write(name, content)
    }

    fn remove(&self, name: &str) -> taleweave::Result<bool> {
        self.inner.remove(name)
    }

    fn list(&self) -> taleweave::Result<Vec<String>> {
        self.inner.list()
    }
}

/// Oracle answering from a queue of canned results.
///
/// Once the queue is empty it keeps returning the last fallback (an empty
/// response unless set).
pub struct StubOracle {
    responses: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StubOracle {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let oracle = Self::new();
        for text in texts {
            oracle.push(Ok(text.into()));
        }
        oracle
    }

    pub fn failing(times: usize) -> Self {
        let oracle = Self::new();
        for _ in 0..times {
            oracle.push(Err(OracleError::Request("connection refused".into())));
        }
        oracle
    }

    pub fn push(&self, response: Result<String, OracleError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OracleError::Empty))
    }
}

/// Generation params with a short timeout for HTTP tests.
pub fn quick_params() -> GenerationParams {
    GenerationParams {
        timeout_secs: 5,
        ..GenerationParams::default()
    }
}

// ── Stub HTTP oracle ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn respond(
    State(state): State<StubState>,
    Json(request): Json<serde_json::Value>,
) -> (StatusCode, String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(request);
    (state.status, state.body.clone())
}

/// A running stub of an OpenAI-compatible server.
pub struct StubServer {
    /// Base URL including `/v1`.
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl StubServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve `body` with `status` on both completion endpoints of 127.0.0.1:0.
pub async fn spawn_stub_server(status: StatusCode, body: impl Into<String>) -> StubServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status,
        body: body.into(),
        hits: hits.clone(),
        requests: requests.clone(),
    };
    let router = Router::new()
        .route("/v1/completions", post(respond))
        .route("/v1/chat/completions", post(respond))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    StubServer {
        base_url: format!("http://{addr}/v1"),
        hits,
        requests,
    }
}
