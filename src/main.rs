//! Purpose: `booklist` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, renders the book grid.
//! Invariants: Tables and JSON go to stdout; errors and notices go to stderr.
//! Invariants: Non-interactive errors/notices are emitted as one JSON object per line.
//! Invariants: Process exit code is derived from `booklist::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal};

use booklist::{Error, ErrorKind, Notice, notice_json, to_exit_code};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod shell;
mod table;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ClapErrorKind::DisplayHelp
                    | ClapErrorKind::DisplayVersion
                    | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            let exit_code = err.exit_code();
            err.print().map_err(|io_err| {
                (
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err),
                    ColorMode::Auto,
                )
            })?;
            return Ok(RunOutcome::with_code(exit_code));
        }
        Err(err) => {
            return Err((
                Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `booklist --help`."),
                ColorMode::Auto,
            ));
        }
    };

    init_tracing();
    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, cli.store_url, color_mode)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "booklist",
    version,
    about = "List, add, and delete books in a JSON document store",
    after_help = r#"EXAMPLES
  $ booklist --store-url https://example.firebaseio.com list
  $ booklist list --sort year:desc --filter 'author~herbert'
  $ booklist add --title Dune --author Herbert --year 1965 --isbn X --price 10
  $ booklist delete -Nabc123
  $ booklist shell

NOTES
  - The store url may also come from BOOKLIST_STORE_URL.
  - Set RUST_LOG=debug to trace store requests."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "BOOKLIST_STORE_URL",
        help = "Base url of the document store (books live under /books)"
    )]
    store_url: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show the book table")]
    List {
        #[command(flatten)]
        view: ViewArgs,
    },
    #[command(about = "Add a book, then show the refreshed table")]
    Add {
        #[command(flatten)]
        book: AddArgs,
        #[command(flatten)]
        view: ViewArgs,
    },
    #[command(about = "Delete a book by id, then show the table")]
    Delete {
        #[arg(help = "Book id (the store key shown in the table)", allow_hyphen_values = true)]
        id: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    #[command(about = "Interactive session over one loaded book list")]
    Shell,
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Clone, Debug)]
struct ViewArgs {
    #[arg(long, help = "Sort by column, e.g. `year` or `price:desc`")]
    sort: Option<String>,
    #[arg(
        long = "filter",
        help = "Filter rows, e.g. `title~dune`, `year>1960` (repeatable)"
    )]
    filters: Vec<String>,
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Page number (1-based)"
    )]
    page: u64,
    #[arg(long, help = "Emit JSON instead of a table")]
    json: bool,
}

#[derive(Args, Clone, Debug)]
struct AddArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    author: String,
    #[arg(long, allow_hyphen_values = true)]
    year: String,
    #[arg(long)]
    isbn: String,
    #[arg(long, allow_hyphen_values = true)]
    price: String,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// Text for a terminal, one compact JSON line for anything else.
fn emit_diagnostic(text: impl FnOnce(bool) -> String, value: Value, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", text(color_mode.use_color(is_tty)));
    } else {
        eprintln!("{value}");
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    emit_diagnostic(|color| error_text(err, color), error_json(err), color_mode);
}

fn emit_notices(notices: Vec<Notice>, color_mode: ColorMode) {
    for notice in &notices {
        let text = |color| {
            let label = paint("notice:", color, YELLOW);
            match notice.details.get("id").and_then(Value::as_str) {
                Some(id) => format!("{label} {} (id: {id})", notice.message),
                None => format!("{label} {}", notice.message),
            }
        };
        emit_diagnostic(text, notice_json(notice), color_mode);
    }
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::Network => "document store request failed",
        ErrorKind::Precondition => "operation not ready",
    }
    .to_string()
}

/// Optional facts attached to an error, in display order.
fn error_details(err: &Error) -> Vec<(&'static str, Value)> {
    let mut details = Vec::new();
    if let Some(hint) = err.hint() {
        details.push(("hint", json!(hint)));
    }
    if let Some(key) = err.key() {
        details.push(("id", json!(key.as_str())));
    }
    if let Some(status) = err.status() {
        details.push(("status", json!(status)));
    }
    if let Some(cause) = err.source() {
        details.push(("cause", json!(cause.to_string())));
    }
    details
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    for (name, value) in error_details(err) {
        inner.insert(name.to_string(), value);
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        paint("error:", use_color, RED),
        error_message(err)
    )];
    for (name, value) in error_details(err) {
        let value = match value {
            Value::String(text) => text,
            other => other.to_string(),
        };
        lines.push(format!("  {} {value}", paint(&format!("{name}:"), use_color, YELLOW)));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

const RED: &str = "31";
const YELLOW: &str = "33";

fn paint(label: &str, enabled: bool, ansi_code: &str) -> String {
    if enabled {
        format!("\u{1b}[{ansi_code}m{label}\u{1b}[0m")
    } else {
        label.to_string()
    }
}
