//! Purpose: Own the book list state and keep it consistent with the remote store.
//! Exports: `BookList`, `DeleteOutcome`.
//! Role: Orchestrates fetch-on-mount, add (create then refresh), and delete
//! (incremental removal when the grid still holds the row, full refresh otherwise).
//! Invariants: `refresh` is the only path that adds or reorders rows.
//! Invariants: A failed store call leaves rows and the grid untouched and yields a notice.
//! Invariants: The grid handle is bound at most once, after the grid's first render.
use crate::book::{Book, BookKey, Row};
use crate::error::{Error, ErrorKind};
use crate::grid::GridHandle;
use crate::notice::{Notice, NoticeKind};
use crate::reconcile::reconcile;
use crate::store::BookStore;
use tracing::{debug, error, info, warn};

/// How a successful delete reached the display.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteOutcome {
    /// The row was removed from the grid without refetching.
    Removed,
    /// The grid did not hold the row, so the whole list was refetched instead.
    Refreshed,
}

pub struct BookList<S> {
    store: S,
    rows: Vec<Row>,
    grid: Option<GridHandle>,
    mounted: bool,
    notices: Vec<Notice>,
}

impl<S: BookStore> BookList<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rows: Vec::new(),
            grid: None,
            mounted: false,
            notices: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_grid_bound(&self) -> bool {
        self.grid.is_some()
    }

    /// Capture the grid's handle. A second handle is ignored; returns whether it was bound.
    pub fn bind_grid(&mut self, handle: GridHandle) -> bool {
        if self.grid.is_some() {
            debug!("grid handle already bound; ignoring");
            return false;
        }
        self.grid = Some(handle);
        true
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// First load of the view. Later calls on the same controller do nothing.
    pub async fn mount(&mut self) -> Result<(), Error> {
        if self.mounted {
            return Ok(());
        }
        self.mounted = true;
        self.refresh().await.map(|_| ())
    }

    /// Replace all rows with a fresh reconciliation of the store; returns the row count.
    pub async fn refresh(&mut self) -> Result<usize, Error> {
        let snapshot = match self.store.list_books().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("failed to list books: {err}");
                self.notices
                    .push(Notice::from_error(NoticeKind::StoreError, "refresh", &err));
                return Err(err);
            }
        };
        for rejected in snapshot.rejected() {
            warn!(id = %rejected.key, "skipping undecodable book: {}", rejected.reason);
            self.notices.push(
                Notice::new(
                    NoticeKind::MalformedRow,
                    "refresh",
                    "stored value is not a book; skipped",
                )
                .with_detail("id", rejected.key.as_str())
                .with_detail("reason", rejected.reason.clone()),
            );
        }
        self.rows = reconcile(snapshot);
        info!(rows = self.rows.len(), "book list refreshed");
        Ok(self.rows.len())
    }

    /// Create `candidate` remotely, then refetch to learn its key.
    pub async fn add_book(&mut self, candidate: Book) -> Result<(), Error> {
        if let Err(err) = self.store.create_book(&candidate).await {
            error!(title = %candidate.title, "failed to add book: {err}");
            self.notices
                .push(Notice::from_error(NoticeKind::StoreError, "add", &err));
            return Err(err);
        }
        self.refresh().await.map(|_| ())
    }

    pub async fn delete_book(&mut self, id: &BookKey) -> Result<DeleteOutcome, Error> {
        let Some(grid) = self.grid.clone() else {
            let err = Error::new(ErrorKind::Precondition)
                .with_message("grid is not ready; delete ignored")
                .with_key(id);
            warn!(id = %id, "delete requested before the grid was ready");
            self.notices
                .push(Notice::from_error(NoticeKind::Precondition, "delete", &err));
            return Err(err);
        };

        if grid.row_by_id(id).is_none() {
            info!(id = %id, "row not in grid; refreshing instead of removing");
            self.notices.push(
                Notice::new(
                    NoticeKind::Fallback,
                    "delete",
                    "row not found in the grid; reloaded the list",
                )
                .with_detail("id", id.as_str()),
            );
            self.refresh().await?;
            return Ok(DeleteOutcome::Refreshed);
        }

        if let Err(err) = self.store.delete_book(id).await {
            error!(id = %id, "failed to delete book: {err}");
            self.notices
                .push(Notice::from_error(NoticeKind::StoreError, "delete", &err));
            return Err(err);
        }

        grid.remove_rows_async(vec![id.clone()]);
        if let Some(pos) = self.rows.iter().position(|row| &row.id == id) {
            self.rows.remove(pos);
        }
        debug!(id = %id, "row removed incrementally");
        Ok(DeleteOutcome::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{BookList, DeleteOutcome};
    use crate::book::{Book, BookKey, Row};
    use crate::error::{Error, ErrorKind};
    use crate::grid::Grid;
    use crate::notice::NoticeKind;
    use crate::reconcile::StoreSnapshot;
    use crate::store::{BookStore, StoreResult};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryState {
        books: Vec<(BookKey, Book)>,
        next_key: u64,
        fail_list: bool,
        fail_create: bool,
        fail_delete: bool,
        lists: usize,
        deletes: Vec<BookKey>,
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        state: Arc<Mutex<MemoryState>>,
    }

    impl MemoryStore {
        fn with_books(books: &[(&str, Book)]) -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().unwrap();
                state.books = books
                    .iter()
                    .map(|(key, book)| (BookKey::new(*key), book.clone()))
                    .collect();
                state.next_key = books.len() as u64 + 1;
            }
            store
        }

        fn set(&self, apply: impl FnOnce(&mut MemoryState)) {
            apply(&mut self.state.lock().unwrap());
        }

        fn lists(&self) -> usize {
            self.state.lock().unwrap().lists
        }

        fn remove_remote(&self, key: &str) {
            self.state
                .lock()
                .unwrap()
                .books
                .retain(|(k, _)| k.as_str() != key);
        }
    }

    fn store_failure() -> Error {
        Error::new(ErrorKind::Network)
            .with_message("store error status 500")
            .with_status(500)
    }

    impl BookStore for MemoryStore {
        async fn list_books(&self) -> StoreResult<StoreSnapshot> {
            let mut state = self.state.lock().unwrap();
            state.lists += 1;
            if state.fail_list {
                return Err(store_failure());
            }
            Ok(StoreSnapshot::from_entries(state.books.clone()))
        }

        async fn create_book(&self, book: &Book) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_create {
                return Err(store_failure());
            }
            let key = BookKey::new(format!("k{}", state.next_key));
            state.next_key += 1;
            state.books.push((key, book.clone()));
            Ok(())
        }

        async fn delete_book(&self, key: &BookKey) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_delete {
                return Err(store_failure().with_key(key));
            }
            state.deletes.push(key.clone());
            state.books.retain(|(k, _)| k != key);
            Ok(())
        }
    }

    fn dune() -> Book {
        Book::new("Dune", "Herbert", 1965, "X", 10.0)
    }

    fn emma() -> Book {
        Book::new("Emma", "Austen", 1815, "E", 4.0)
    }

    async fn mounted_with_grid(store: MemoryStore) -> (BookList<MemoryStore>, Grid) {
        let mut list = BookList::new(store);
        list.mount().await.expect("mount");
        let mut grid = Grid::new();
        grid.set_rows(list.rows());
        grid.render();
        let handle = grid.ready().expect("handle");
        assert!(list.bind_grid(handle));
        (list, grid)
    }

    #[tokio::test]
    async fn mount_loads_rows_once() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let mut list = BookList::new(store.clone());
        list.mount().await.expect("mount");
        list.mount().await.expect("mount");
        assert_eq!(store.lists(), 1);
        assert_eq!(list.rows(), &[Row::new("k1", dune())]);
    }

    #[tokio::test]
    async fn mount_failure_leaves_rows_empty_and_notifies() {
        let store = MemoryStore::default();
        store.set(|state| state.fail_list = true);
        let mut list = BookList::new(store);
        let err = list.mount().await.expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(list.rows().is_empty());
        let notices = list.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::StoreError);
    }

    #[tokio::test]
    async fn refresh_twice_is_idempotent() {
        let store = MemoryStore::with_books(&[("k1", dune()), ("k2", emma())]);
        let mut list = BookList::new(store);
        list.refresh().await.expect("refresh");
        let first = list.rows().to_vec();
        list.refresh().await.expect("refresh");
        assert_eq!(list.rows(), first.as_slice());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_stale_rows() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let mut list = BookList::new(store.clone());
        list.refresh().await.expect("refresh");
        store.set(|state| state.fail_list = true);
        assert!(list.refresh().await.is_err());
        assert_eq!(list.rows().len(), 1);
    }

    #[tokio::test]
    async fn added_book_appears_with_server_key() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let mut list = BookList::new(store);
        list.mount().await.expect("mount");
        list.add_book(emma()).await.expect("add");
        let added = list
            .rows()
            .iter()
            .find(|row| row.id.as_str() == "k2")
            .expect("k2 row");
        assert_eq!(added.book, emma());
    }

    #[tokio::test]
    async fn failed_add_is_not_inserted() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        store.set(|state| state.fail_create = true);
        let mut list = BookList::new(store.clone());
        list.mount().await.expect("mount");
        assert!(list.add_book(emma()).await.is_err());
        assert_eq!(list.rows().len(), 1);
        assert_eq!(store.lists(), 1);
        assert_eq!(list.take_notices()[0].cmd, "add");
    }

    #[tokio::test]
    async fn delete_before_grid_ready_is_a_precondition_error() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let mut list = BookList::new(store.clone());
        list.mount().await.expect("mount");
        let err = list
            .delete_book(&BookKey::new("k1"))
            .await
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(list.rows().len(), 1);
        assert!(store.state.lock().unwrap().deletes.is_empty());
        assert_eq!(list.take_notices()[0].kind, NoticeKind::Precondition);
    }

    #[tokio::test]
    async fn delete_removes_only_that_row_without_refetch() {
        let store = MemoryStore::with_books(&[("k1", dune()), ("k2", emma())]);
        let (mut list, mut grid) = mounted_with_grid(store.clone()).await;
        let lists_before = store.lists();

        let outcome = list.delete_book(&BookKey::new("k1")).await.expect("delete");
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert_eq!(store.lists(), lists_before);
        assert_eq!(list.rows(), &[Row::new("k2", emma())]);

        let page = grid.render();
        assert_eq!(page.total_rows, 1);
        assert_eq!(page.rows[0].id.as_str(), "k2");
    }

    #[tokio::test]
    async fn delete_of_unknown_row_falls_back_to_refresh() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let (mut list, _grid) = mounted_with_grid(store.clone()).await;
        let lists_before = store.lists();

        let outcome = list.delete_book(&BookKey::new("k9")).await.expect("delete");
        assert_eq!(outcome, DeleteOutcome::Refreshed);
        assert_eq!(store.lists(), lists_before + 1);
        assert_eq!(pending_removals(&list), 0);
        assert!(store.state.lock().unwrap().deletes.is_empty());
        assert_eq!(list.take_notices()[0].kind, NoticeKind::Fallback);
    }

    #[tokio::test]
    async fn failed_remote_delete_keeps_the_row() {
        let store = MemoryStore::with_books(&[("k1", dune()), ("k2", emma())]);
        let (mut list, mut grid) = mounted_with_grid(store.clone()).await;
        store.set(|state| state.fail_delete = true);

        let err = list
            .delete_book(&BookKey::new("k1"))
            .await
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(list.rows().iter().any(|row| row.id.as_str() == "k1"));
        assert_eq!(grid.render().total_rows, 2);
        let notice = &list.take_notices()[0];
        assert_eq!(notice.details["id"], "k1");
    }

    #[tokio::test]
    async fn row_deleted_elsewhere_still_removes_when_grid_holds_it() {
        let store = MemoryStore::with_books(&[("k1", dune())]);
        let (mut list, _grid) = mounted_with_grid(store.clone()).await;
        store.remove_remote("k1");
        let outcome = list.delete_book(&BookKey::new("k1")).await.expect("delete");
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(list.rows().is_empty());
    }

    #[tokio::test]
    async fn second_grid_handle_is_ignored() {
        let store = MemoryStore::with_books(&[]);
        let (mut list, _grid) = mounted_with_grid(store).await;
        let mut other = Grid::new();
        assert!(!list.bind_grid(other.ready().expect("handle")));
    }

    fn pending_removals(list: &BookList<MemoryStore>) -> usize {
        list.grid
            .as_ref()
            .map(|handle| handle.pending_transactions())
            .unwrap_or_default()
    }
}
