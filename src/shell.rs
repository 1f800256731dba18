//! Purpose: Interactive line-oriented session over one mounted book list.
//! Exports: `run_shell`.
//! Role: Keeps a single controller/grid pair alive so deletes can patch the grid in place.
//! Invariants: Store failures surface as notices and never end the session.
//! Invariants: Input errors are reported and the session continues.
use super::command_dispatch::Session;
use super::*;
use booklist::grid::{FilterCondition, SortModel};
use booklist::{AddBookForm, BookKey};
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  help, ?              show this list
  list, ls             show the current page
  refresh              reload every book from the store
  add                  add a book (prompts for each field)
  delete, rm <id>|#<n> delete by id, or by row number on this page
  sort <col[:desc]>    sort by a column; `sort off` to clear
  filter <expr>        add a filter, e.g. title~dune, year>1960
  clear                remove all filters
  page <n>|next|prev   move between pages
  next, prev           same as `page next` and `page prev`
  quit, exit           leave the shell";

const FORM_FIELDS: [&str; 5] = ["title", "author", "year", "isbn", "price"];

enum Step {
    Continue { render: bool },
    Quit,
}

pub(super) fn run_shell(session: &mut Session) -> Result<RunOutcome, Error> {
    let interactive = io::stdin().is_terminal();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    session.emit_page(false);
    session.emit_notices(true);

    loop {
        prompt("booklist> ", interactive);
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to read shell input")
                .with_source(err)
        })?;

        match run_line(session, line.trim(), &mut lines, interactive) {
            Ok(Step::Quit) => break,
            Ok(Step::Continue { render }) => {
                if render {
                    session.emit_page(false);
                }
            }
            // Store and precondition failures already produced a notice.
            Err(err) if matches!(err.kind(), ErrorKind::Network | ErrorKind::Precondition) => {}
            Err(err) => emit_error(&err, session.color_mode()),
        }
        session.emit_notices(true);
    }
    Ok(RunOutcome::ok())
}

fn run_line<I>(
    session: &mut Session,
    line: &str,
    lines: &mut I,
    interactive: bool,
) -> Result<Step, Error>
where
    I: Iterator<Item = io::Result<String>>,
{
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "" => Ok(Step::Continue { render: false }),
        "help" | "?" => {
            println!("{HELP}");
            Ok(Step::Continue { render: false })
        }
        "quit" | "exit" => Ok(Step::Quit),
        "list" | "ls" => Ok(Step::Continue { render: true }),
        "refresh" => {
            session.refresh()?;
            Ok(Step::Continue { render: true })
        }
        "add" => {
            let mut form = AddBookForm::new();
            for field in FORM_FIELDS {
                prompt(&format!("  {field}: "), interactive);
                let value = match lines.next() {
                    Some(Ok(value)) => value,
                    Some(Err(err)) => {
                        return Err(Error::new(ErrorKind::Internal)
                            .with_message("failed to read shell input")
                            .with_source(err));
                    }
                    None => {
                        return Err(Error::new(ErrorKind::Usage)
                            .with_message("input ended before the book was complete"));
                    }
                };
                form.set(field, value.trim())?;
            }
            let book = form.submit()?;
            session.add(book)?;
            Ok(Step::Continue { render: true })
        }
        "delete" | "rm" => {
            let id = resolve_delete_target(session, rest)?;
            session.delete(&id)?;
            Ok(Step::Continue { render: true })
        }
        "sort" => {
            if rest.is_empty() || rest == "off" {
                session.grid.set_sort(None);
            } else {
                session.grid.set_sort(Some(SortModel::parse(rest)?));
            }
            Ok(Step::Continue { render: true })
        }
        "filter" => {
            session.grid.add_filter(FilterCondition::parse(rest)?);
            Ok(Step::Continue { render: true })
        }
        "clear" => {
            session.grid.clear_filters();
            Ok(Step::Continue { render: true })
        }
        "page" | "next" | "prev" => {
            let current = session.grid.page();
            let target = match (command, rest) {
                ("next", _) | ("page", "next") => current + 1,
                ("prev", _) | ("page", "prev") => current.saturating_sub(1),
                (_, number) => match number.parse::<usize>() {
                    Ok(number) if number >= 1 => number - 1,
                    _ => {
                        return Err(Error::new(ErrorKind::Usage)
                            .with_message(format!("invalid page {number:?}"))
                            .with_hint("Pages start at 1."));
                    }
                },
            };
            session.grid.set_page(target);
            Ok(Step::Continue { render: true })
        }
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unknown command {other:?}"))
            .with_hint("Type `help` for the command list.")),
    }
}

/// `#n` picks the n-th row of the visible page; anything else is taken as an id.
fn resolve_delete_target(session: &mut Session, target: &str) -> Result<BookKey, Error> {
    if target.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("delete needs an id or #row")
            .with_hint("Use `delete <id>` or `delete #1`."));
    }
    let Some(number) = target.strip_prefix('#') else {
        return Ok(BookKey::new(target));
    };
    let index = number
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("invalid row number {target:?}"))
        })?;
    let page = session.grid.render();
    let row = page.rows.get(index - 1).ok_or_else(|| {
        Error::new(ErrorKind::Usage).with_message(format!("no row {index} on this page"))
    })?;
    row.delete_trigger().cloned().ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("row {index} has no usable id"))
            .with_hint("Refresh the list; the row cannot be deleted as shown.")
    })
}

fn prompt(text: &str, interactive: bool) {
    if !interactive {
        return;
    }
    let mut stdout = io::stdout();
    let _ = write!(stdout, "{text}");
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::HELP;

    #[test]
    fn help_names_every_accepted_command() {
        let words: Vec<&str> = HELP
            .split(|c: char| c.is_whitespace() || c == ',')
            .collect();
        for command in [
            "help", "?", "list", "ls", "refresh", "add", "delete", "rm", "sort", "filter",
            "clear", "page", "next", "prev", "quit", "exit",
        ] {
            assert!(words.contains(&command), "help is missing {command:?}");
        }
    }
}
