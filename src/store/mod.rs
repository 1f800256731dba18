//! Purpose: Define the async boundary to the remote book collection.
//! Exports: `BookStore`, `StoreResult`, `RemoteClient`, `HttpBookStore`.
//! Role: Seam between the controller and the wire; tests substitute in-memory stores.
//! Invariants: Every failure is returned as an `Error`; nothing is cached locally.
//! Invariants: `create_book` does not report the new key; callers re-list to learn it.
use crate::book::{Book, BookKey};
use crate::error::Error;
use crate::reconcile::StoreSnapshot;
use std::future::Future;

mod remote;

pub use remote::{HttpBookStore, RemoteClient};

pub type StoreResult<T> = Result<T, Error>;

/// Operations on the `books` collection of a document store.
pub trait BookStore {
    /// Read the whole collection; an absent collection is an empty snapshot.
    fn list_books(&self) -> impl Future<Output = StoreResult<StoreSnapshot>> + Send;

    fn create_book(&self, book: &Book) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove one document. Non-success statuses are errors, not silent no-ops.
    fn delete_book(&self, key: &BookKey) -> impl Future<Output = StoreResult<()>> + Send;
}
