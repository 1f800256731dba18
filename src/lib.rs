//! Purpose: Library crate backing the `booklist` CLI and its tests.
//! Exports: data model, store client, reconciler, controller, grid, form, notices, config.
//! Role: Keeps the fetch -> reconcile -> render and mutate -> patch-or-refresh pipelines
//! testable without a terminal.
//! Invariants: Modules prefer explicit inputs/outputs over ambient state.
pub mod book;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod grid;
pub mod notice;
pub mod reconcile;
pub mod store;

pub use book::{Book, BookKey, Row};
pub use config::{PAGE_SIZE, STORE_URL_ENV, StoreConfig};
pub use controller::{BookList, DeleteOutcome};
pub use error::{Error, ErrorKind, to_exit_code};
pub use form::AddBookForm;
pub use grid::{Grid, GridHandle, RenderedPage, RenderedRow};
pub use notice::{Notice, NoticeKind, notice_json};
pub use reconcile::{StoreSnapshot, reconcile};
pub use store::{BookStore, HttpBookStore, RemoteClient, StoreResult};
