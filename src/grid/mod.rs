//! Purpose: Bind reconciled rows and the column schema to a paginated, sortable, filterable grid.
//! Exports: `Grid`, `GridHandle`, `RenderedPage`, `RenderedRow`, plus the column/sort/filter models.
//! Role: View projection of the controller's rows; hands a one-time imperative handle upward.
//! Invariants: The grid never mutates domain data; it only edits its own display copy.
//! Invariants: Row identity is `row.id`; blank or duplicate ids are reported and excluded
//! from id-based lookups and delete triggers.
//! Invariants: `ready` yields the handle once per grid; later calls yield nothing.
use crate::book::{Book, BookKey, Row};
use crate::config::PAGE_SIZE;
use crate::notice::{Notice, NoticeKind};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

mod columns;

pub use columns::{
    COLUMNS, Column, ColumnDef, FilterCondition, FilterModel, FilterOp, SortDirection, SortModel,
};

#[derive(Debug, Default)]
struct GridState {
    rows: Vec<GridRow>,
    index: HashMap<BookKey, usize>,
    pending: VecDeque<RowTransaction>,
}

#[derive(Debug, Clone)]
struct GridRow {
    row: Row,
    identifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RowTransaction {
    Remove(Vec<BookKey>),
}

impl GridState {
    fn replace(&mut self, rows: &[Row]) -> Vec<Notice> {
        let mut notices = Vec::new();
        self.rows.clear();
        self.index.clear();
        self.pending.clear();
        for row in rows {
            let identifiable = if row.id.is_blank() {
                warn!(title = %row.book.title, "row has no id");
                notices.push(
                    Notice::new(NoticeKind::MalformedRow, "render", "row has no id; delete disabled")
                        .with_detail("title", row.book.title.clone()),
                );
                false
            } else if self.index.contains_key(&row.id) {
                warn!(id = %row.id, "duplicate row id");
                notices.push(
                    Notice::new(
                        NoticeKind::MalformedRow,
                        "render",
                        "duplicate row id; delete disabled for the repeat",
                    )
                    .with_detail("id", row.id.as_str()),
                );
                false
            } else {
                self.index.insert(row.id.clone(), self.rows.len());
                true
            };
            self.rows.push(GridRow {
                row: row.clone(),
                identifiable,
            });
        }
        notices
    }

    fn is_pending_removal(&self, id: &BookKey) -> bool {
        self.pending.iter().any(|tx| match tx {
            RowTransaction::Remove(ids) => ids.contains(id),
        })
    }

    fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let mut removed = 0;
        while let Some(RowTransaction::Remove(ids)) = self.pending.pop_front() {
            let before = self.rows.len();
            self.rows
                .retain(|entry| !(entry.identifiable && ids.contains(&entry.row.id)));
            removed += before - self.rows.len();
        }
        self.reindex();
        removed
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, entry) in self.rows.iter().enumerate() {
            if entry.identifiable {
                self.index.insert(entry.row.id.clone(), pos);
            }
        }
    }
}

fn lock(shared: &Mutex<GridState>) -> MutexGuard<'_, GridState> {
    shared.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Imperative access to a live grid, captured once when the grid becomes ready.
#[derive(Clone, Debug)]
pub struct GridHandle {
    shared: Arc<Mutex<GridState>>,
}

impl GridHandle {
    /// Find a displayed row by id; rows queued for removal are already gone.
    pub fn row_by_id(&self, id: &BookKey) -> Option<Row> {
        let state = lock(&self.shared);
        if state.is_pending_removal(id) {
            return None;
        }
        let pos = *state.index.get(id)?;
        state.rows.get(pos).map(|entry| entry.row.clone())
    }

    /// Queue removal of `ids`; applied on the grid's next render or flush.
    pub fn remove_rows_async(&self, ids: Vec<BookKey>) {
        if ids.is_empty() {
            return;
        }
        debug!(count = ids.len(), "queued row removal");
        lock(&self.shared)
            .pending
            .push_back(RowTransaction::Remove(ids));
    }

    pub fn pending_transactions(&self) -> usize {
        lock(&self.shared).pending.len()
    }

    pub fn displayed_ids(&self) -> Vec<BookKey> {
        lock(&self.shared)
            .rows
            .iter()
            .map(|entry| entry.row.id.clone())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedRow {
    pub id: BookKey,
    pub book: Book,
    pub cells: Vec<String>,
    delete_enabled: bool,
}

impl RenderedRow {
    /// Id to pass to the controller's delete, if this row's trigger is live.
    pub fn delete_trigger(&self) -> Option<&BookKey> {
        self.delete_enabled.then_some(&self.id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPage {
    pub headers: Vec<&'static str>,
    pub rows: Vec<RenderedRow>,
    pub page: usize,
    pub page_count: usize,
    pub matching_rows: usize,
    pub total_rows: usize,
}

#[derive(Debug)]
pub struct Grid {
    shared: Arc<Mutex<GridState>>,
    sort: Option<SortModel>,
    filter: FilterModel,
    page: usize,
    page_size: usize,
    handle_issued: bool,
    notices: Vec<Notice>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(GridState::default())),
            sort: None,
            filter: FilterModel::new(),
            page: 0,
            page_size: PAGE_SIZE,
            handle_issued: false,
            notices: Vec::new(),
        }
    }

    pub fn columns(&self) -> &'static [ColumnDef] {
        &COLUMNS
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Bind a fresh row sequence; discards any queued transactions.
    pub fn set_rows(&mut self, rows: &[Row]) {
        let notices = lock(&self.shared).replace(rows);
        self.notices.extend(notices);
    }

    /// Hand out the imperative handle; only the first call returns it.
    pub fn ready(&mut self) -> Option<GridHandle> {
        if self.handle_issued {
            return None;
        }
        self.handle_issued = true;
        Some(GridHandle {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn set_sort(&mut self, sort: Option<SortModel>) {
        self.sort = sort;
    }

    pub fn sort(&self) -> Option<SortModel> {
        self.sort
    }

    pub fn add_filter(&mut self, condition: FilterCondition) {
        self.filter.push(condition);
        self.page = 0;
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.page = 0;
    }

    pub fn filter(&self) -> &FilterModel {
        &self.filter
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Zero-based page index, as clamped by the last render.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Apply queued transactions; returns how many rows left the display.
    pub fn flush(&self) -> usize {
        lock(&self.shared).flush()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn render(&mut self) -> RenderedPage {
        self.flush();
        let state = lock(&self.shared);
        let mut visible: Vec<&GridRow> = state
            .rows
            .iter()
            .filter(|entry| self.filter.matches(&entry.row.book))
            .collect();
        if let Some(sort) = &self.sort {
            visible.sort_by(|a, b| sort.compare(&a.row.book, &b.row.book));
        }

        let matching_rows = visible.len();
        let page_count = matching_rows.div_ceil(self.page_size).max(1);
        self.page = self.page.min(page_count - 1);
        let data_columns: Vec<Column> = COLUMNS
            .iter()
            .filter(|def| def.column != Column::Actions)
            .map(|def| def.column)
            .collect();

        let rows = visible
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .map(|entry| RenderedRow {
                id: entry.row.id.clone(),
                book: entry.row.book.clone(),
                cells: data_columns
                    .iter()
                    .map(|column| column.display(&entry.row.book))
                    .collect(),
                delete_enabled: entry.identifiable,
            })
            .collect();

        RenderedPage {
            headers: COLUMNS.iter().map(|def| def.header).collect(),
            rows,
            page: self.page,
            page_count,
            matching_rows,
            total_rows: state.rows.len(),
        }
    }
}
