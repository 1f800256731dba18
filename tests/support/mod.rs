//! Purpose: In-process fake of a path-addressed JSON document store for integration tests.
//! Exports: `FakeStore`.
//! Role: Serves `GET/POST /books/.json` and `DELETE /books/{id}.json` like the real store,
//! both at the root and under a `/tenant` path prefix.
//! Invariants: Binds loopback port 0; shuts down and joins its thread on drop.
//! Invariants: Keys are assigned server-side as `-k0001`, `-k0002`, ... and listed in key order.
#![allow(dead_code)]

use axum::extract::{OriginalUri, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tower_http::trace::TraceLayer;

#[derive(Default)]
pub struct FakeState {
    pub books: Vec<(String, Value)>,
    pub next_key: u64,
    pub fail_list: Option<u16>,
    pub fail_create: Option<u16>,
    pub fail_delete: Option<u16>,
    pub raw_list_body: Option<String>,
    pub requests: Vec<String>,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeStore {
    pub base_url: String,
    state: Shared,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeStore {
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("addr");
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let app = router(Arc::clone(&state));
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve");
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    /// Insert a book directly, as if another client had created it; returns its key.
    pub fn seed(&self, book: Value) -> String {
        insert(&mut self.state(), book)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state().books.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    pub fn count_requests(&self, prefix: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|request| request.starts_with(prefix))
            .count()
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn insert(state: &mut FakeState, book: Value) -> String {
    state.next_key += 1;
    let key = format!("-k{:04}", state.next_key);
    state.books.push((key.clone(), book));
    key
}

fn books_routes() -> Router<Shared> {
    Router::new()
        .route("/books/.json", get(list_books).post(create_book))
        .route("/books/:file", delete(delete_book))
}

fn router(state: Shared) -> Router {
    Router::new()
        .merge(books_routes())
        .nest("/tenant", books_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": "injected failure" }))).into_response()
}

async fn list_books(State(state): State<Shared>, OriginalUri(uri): OriginalUri) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!("GET {}", uri.path()));
    if let Some(status) = state.fail_list {
        return error_response(status);
    }
    if let Some(body) = &state.raw_list_body {
        return (StatusCode::OK, body.clone()).into_response();
    }
    if state.books.is_empty() {
        return Json(Value::Null).into_response();
    }
    let mut collection = Map::new();
    for (key, book) in &state.books {
        collection.insert(key.clone(), book.clone());
    }
    Json(Value::Object(collection)).into_response()
}

async fn create_book(
    State(state): State<Shared>,
    OriginalUri(uri): OriginalUri,
    Json(book): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!("POST {}", uri.path()));
    if let Some(status) = state.fail_create {
        return error_response(status);
    }
    let key = insert(&mut state, book);
    Json(json!({ "name": key })).into_response()
}

async fn delete_book(
    State(state): State<Shared>,
    OriginalUri(uri): OriginalUri,
    AxumPath(file): AxumPath<String>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!("DELETE {}", uri.path()));
    if let Some(status) = state.fail_delete {
        return error_response(status);
    }
    let Some(key) = file.strip_suffix(".json") else {
        return error_response(400);
    };
    let key = key.to_string();
    state.books.retain(|(existing, _)| existing != &key);
    Json(Value::Null).into_response()
}
