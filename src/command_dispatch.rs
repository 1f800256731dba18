//! Purpose: Hold top-level CLI command dispatch and the per-process view session.
//! Exports: `dispatch_command`, `Session`.
//! Role: Wires config -> store -> controller -> grid and drives them on a current-thread runtime.
//! Invariants: The grid handle is bound right after the first render of a session.
//! Invariants: One-shot commands report store failures as the exit error, not as notices.

use super::*;
use booklist::grid::{FilterCondition, SortModel};
use booklist::{
    AddBookForm, Book, BookKey, BookList, DeleteOutcome, Grid, HttpBookStore, NoticeKind,
    StoreConfig,
};
use tokio::runtime::Runtime;

pub(super) fn dispatch_command(
    command: Command,
    store_url: Option<String>,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "booklist", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::List { view } => {
            let mut session = Session::open(store_url.as_deref(), color_mode)?;
            session.mount().inspect_err(|_| session.emit_notices(false))?;
            session.apply_view_args(&view)?;
            session.emit_page(view.json);
            session.emit_notices(false);
            Ok(RunOutcome::ok())
        }
        Command::Add { book, view } => {
            let mut form = AddBookForm {
                title: book.title,
                author: book.author,
                year: book.year,
                isbn: book.isbn,
                price: book.price,
            };
            let candidate = form.submit()?;
            let mut session = Session::open(store_url.as_deref(), color_mode)?;
            session.mount().inspect_err(|_| session.emit_notices(false))?;
            session
                .add(candidate)
                .inspect_err(|_| session.emit_notices(false))?;
            session.apply_view_args(&view)?;
            session.emit_page(view.json);
            session.emit_notices(false);
            Ok(RunOutcome::ok())
        }
        Command::Delete { id, view } => {
            let mut session = Session::open(store_url.as_deref(), color_mode)?;
            session.mount().inspect_err(|_| session.emit_notices(false))?;
            session
                .delete(&BookKey::new(id))
                .inspect_err(|_| session.emit_notices(false))?;
            session.apply_view_args(&view)?;
            session.emit_page(view.json);
            session.emit_notices(false);
            Ok(RunOutcome::ok())
        }
        Command::Shell => {
            let mut session = Session::open(store_url.as_deref(), color_mode)?;
            // A failed first load leaves an empty list; the notice explains why.
            let _ = session.mount();
            shell::run_shell(&mut session)
        }
    }
}

/// One mounted book list with its grid, living for the duration of a command.
pub(super) struct Session {
    pub(super) list: BookList<HttpBookStore>,
    pub(super) grid: Grid,
    runtime: Runtime,
    color_mode: ColorMode,
}

impl Session {
    pub(super) fn open(store_url: Option<&str>, color_mode: ColorMode) -> Result<Self, Error> {
        let config = StoreConfig::resolve(store_url)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start async runtime")
                    .with_source(err)
            })?;
        Ok(Self {
            list: BookList::new(HttpBookStore::from_config(&config)),
            grid: Grid::new(),
            runtime,
            color_mode,
        })
    }

    pub(super) fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Load the list, render once, and hand the grid's handle to the controller.
    pub(super) fn mount(&mut self) -> Result<(), Error> {
        let result = self.runtime.block_on(self.list.mount());
        self.rebind();
        if let Some(handle) = self.grid.ready() {
            self.list.bind_grid(handle);
        }
        result
    }

    pub(super) fn refresh(&mut self) -> Result<usize, Error> {
        let count = self.runtime.block_on(self.list.refresh())?;
        self.rebind();
        Ok(count)
    }

    pub(super) fn add(&mut self, book: Book) -> Result<(), Error> {
        let result = self.runtime.block_on(self.list.add_book(book));
        self.rebind();
        result
    }

    pub(super) fn delete(&mut self, id: &BookKey) -> Result<DeleteOutcome, Error> {
        let outcome = self.runtime.block_on(self.list.delete_book(id))?;
        match outcome {
            DeleteOutcome::Removed => {
                self.grid.flush();
            }
            DeleteOutcome::Refreshed => self.rebind(),
        }
        Ok(outcome)
    }

    fn rebind(&mut self) {
        self.grid.set_rows(self.list.rows());
        self.grid.render();
    }

    pub(super) fn apply_view_args(&mut self, view: &ViewArgs) -> Result<(), Error> {
        if let Some(sort) = &view.sort {
            self.grid.set_sort(Some(SortModel::parse(sort)?));
        }
        for expr in &view.filters {
            self.grid.add_filter(FilterCondition::parse(expr)?);
        }
        let page = usize::try_from(view.page.saturating_sub(1)).unwrap_or(usize::MAX);
        self.grid.set_page(page);
        Ok(())
    }

    pub(super) fn emit_page(&mut self, json: bool) {
        let page = self.grid.render();
        if json {
            emit_json(table::page_json(&page));
        } else {
            print!("{}", table::render_page(&page));
        }
    }

    /// Print pending notices; store/precondition failures are skipped unless `include_errors`.
    pub(super) fn emit_notices(&mut self, include_errors: bool) {
        let mut notices = self.list.take_notices();
        notices.extend(self.grid.take_notices());
        let notices = notices
            .into_iter()
            .filter(|notice| {
                include_errors
                    || !matches!(
                        notice.kind,
                        NoticeKind::StoreError | NoticeKind::Precondition
                    )
            })
            .collect();
        emit_notices(notices, self.color_mode);
    }
}
