//! Purpose: Provide the HTTP client for a path-addressed JSON document store.
//! Exports: `RemoteClient` (blocking), `HttpBookStore` (async `BookStore`).
//! Role: Maps list/create/delete onto `{base}/books/.json` and `{base}/books/{id}.json`.
//! Invariants: Any status outside 2xx, transport failure, or non-JSON body is `Network`.
//! Invariants: Keys are pushed as single percent-encoded path segments.
#![allow(clippy::result_large_err)]

use super::{BookStore, StoreResult};
use crate::book::{Book, BookKey};
use crate::config::StoreConfig;
use crate::error::{Error, ErrorKind};
use crate::reconcile::StoreSnapshot;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const COLLECTION: &str = "books";

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: String,
}

impl RemoteClient {
    pub fn new(config: &StoreConfig) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self {
            inner: Arc::new(RemoteClientInner {
                base_url: config.base_url().clone(),
                agent,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn list_books(&self) -> StoreResult<StoreSnapshot> {
        let url = self.collection_url()?;
        debug!(url = %url, "listing books");
        let response = self.send("GET", &url, None)?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|err| {
                Error::new(ErrorKind::Network)
                    .with_message("failed to read store response")
                    .with_source(err)
            })?;
        if body.trim().is_empty() {
            return Ok(StoreSnapshot::default());
        }
        serde_json::from_str(&body).map_err(|err| {
            warn!(url = %url, "store returned a body that is not a book collection");
            Error::new(ErrorKind::Network)
                .with_message("invalid store response json")
                .with_source(err)
        })
    }

    pub fn create_book(&self, book: &Book) -> StoreResult<()> {
        let url = self.collection_url()?;
        let payload = serde_json::to_string(book).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode book json")
                .with_source(err)
        })?;
        debug!(url = %url, title = %book.title, "creating book");
        self.send("POST", &url, Some(&payload))?;
        Ok(())
    }

    pub fn delete_book(&self, key: &BookKey) -> StoreResult<()> {
        let url = self.document_url(key)?;
        debug!(url = %url, id = %key, "deleting book");
        self.send("DELETE", &url, None)
            .map_err(|err| err.with_key(key))?;
        Ok(())
    }

    fn collection_url(&self) -> StoreResult<Url> {
        build_url(&self.inner.base_url, &[COLLECTION, ".json"])
    }

    fn document_url(&self, key: &BookKey) -> StoreResult<Url> {
        if key.is_blank() {
            return Err(Error::new(ErrorKind::Usage).with_message("book id must not be blank"));
        }
        build_url(
            &self.inner.base_url,
            &[COLLECTION, &format!("{}.json", key.as_str())],
        )
    }

    fn send(&self, method: &str, url: &Url, body: Option<&str>) -> StoreResult<ureq::Response> {
        let request = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        let response = match body {
            Some(payload) => request
                .set("Content-Type", "application/json")
                .send_string(payload),
            None => request.call(),
        };

        match response {
            Ok(resp) if (200..300).contains(&resp.status()) => Ok(resp),
            Ok(resp) => Err(parse_error_response(method, resp.status(), resp)),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(method, code, resp)),
            Err(ureq::Error::Transport(err)) => {
                warn!(method, url = %url, "store request failed: {err}");
                Err(Error::new(ErrorKind::Network)
                    .with_message("store request failed")
                    .with_hint("Check the store url and network connectivity.")
                    .with_source(err))
            }
        }
    }
}

/// Async adapter running the blocking client on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpBookStore {
    client: RemoteClient,
}

impl HttpBookStore {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(RemoteClient::new(config))
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }
}

impl BookStore for HttpBookStore {
    async fn list_books(&self) -> StoreResult<StoreSnapshot> {
        let client = self.client.clone();
        run_blocking(move || client.list_books()).await
    }

    async fn create_book(&self, book: &Book) -> StoreResult<()> {
        let client = self.client.clone();
        let book = book.clone();
        run_blocking(move || client.create_book(&book)).await
    }

    async fn delete_book(&self, key: &BookKey) -> StoreResult<()> {
        let client = self.client.clone();
        let key = key.clone();
        run_blocking(move || client.delete_book(&key)).await
    }
}

async fn run_blocking<T, F>(task: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("store task did not complete")
            .with_source(err)
    })?
}

fn build_url(base_url: &Url, segments: &[&str]) -> StoreResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("document store url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn parse_error_response(method: &str, status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    warn!(method, status, "store rejected request");
    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error)
        .ok();
    let message = match detail {
        Some(detail) => format!("store error status {status}: {detail}"),
        None => format!("store error status {status}"),
    };
    let err = Error::new(ErrorKind::Network)
        .with_message(message)
        .with_status(status);
    match status {
        401 | 403 => err.with_hint("The store rejected the request; check its access rules."),
        404 => err.with_hint("Check that the store url points at the database root."),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::{RemoteClient, build_url};
    use crate::book::{Book, BookKey};
    use crate::config::StoreConfig;
    use crate::error::ErrorKind;
    use url::Url;

    #[test]
    fn collection_url_appends_dot_json_segment() {
        let base = Url::parse("https://books.example.com/").expect("url");
        let url = build_url(&base, &["books", ".json"]).expect("url");
        assert_eq!(url.as_str(), "https://books.example.com/books/.json");
    }

    #[test]
    fn collection_url_keeps_path_prefix() {
        let base = Url::parse("http://localhost:9000/tenant/").expect("url");
        let url = build_url(&base, &["books", ".json"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9000/tenant/books/.json");
    }

    #[test]
    fn document_url_encodes_key() {
        let config = StoreConfig::new("https://books.example.com").expect("config");
        let client = RemoteClient::new(&config);
        let url = client
            .document_url(&BookKey::new("-Nx y?z"))
            .expect("url");
        assert_eq!(url.as_str(), "https://books.example.com/books/-Nx%20y%3Fz.json");
    }

    #[test]
    fn blank_key_is_rejected_before_any_request() {
        let config = StoreConfig::new("http://127.0.0.1:1").expect("config");
        let client = RemoteClient::new(&config);
        let err = client.delete_book(&BookKey::new("")).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn unreachable_store_is_a_network_error() {
        let config = StoreConfig::new("http://127.0.0.1:1").expect("config");
        let client = RemoteClient::new(&config);
        let err = client
            .create_book(&Book::new("Dune", "Herbert", 1965, "X", 10.0))
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
