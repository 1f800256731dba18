//! Purpose: Column schema, sort model, and filter model for the book grid.
//! Exports: `Column`, `ColumnDef`, `COLUMNS`, `SortModel`, `SortDirection`, `FilterModel`,
//! `FilterCondition`, `FilterOp`.
//! Role: Pure view logic; knows how to read, compare, and match cells of a `Book`.
//! Invariants: Only data columns are sortable/filterable; the action column is neither.
//! Invariants: Text matching is case-insensitive; `<`/`>` apply to numeric columns only.
use crate::book::Book;
use crate::error::{Error, ErrorKind};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Column {
    Title,
    Author,
    Year,
    Isbn,
    Price,
    Actions,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnDef {
    pub column: Column,
    pub header: &'static str,
    pub sortable: bool,
    pub filterable: bool,
    pub width: Option<usize>,
}

pub const COLUMNS: [ColumnDef; 6] = [
    ColumnDef::data(Column::Title, "Title"),
    ColumnDef::data(Column::Author, "Author"),
    ColumnDef::data(Column::Year, "Year"),
    ColumnDef::data(Column::Isbn, "Isbn"),
    ColumnDef::data(Column::Price, "Price"),
    ColumnDef {
        column: Column::Actions,
        header: "",
        sortable: false,
        filterable: false,
        width: Some(9),
    },
];

impl ColumnDef {
    const fn data(column: Column, header: &'static str) -> Self {
        Self {
            column,
            header,
            sortable: true,
            filterable: true,
            width: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Cell<'a> {
    Text(&'a str),
    Integer(i64),
    Number(f64),
}

impl Column {
    pub fn field(self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Author => "author",
            Column::Year => "year",
            Column::Isbn => "isbn",
            Column::Price => "price",
            Column::Actions => "id",
        }
    }

    pub fn parse(name: &str) -> Result<Self, Error> {
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Column::Title),
            "author" => Ok(Column::Author),
            "year" => Ok(Column::Year),
            "isbn" => Ok(Column::Isbn),
            "price" => Ok(Column::Price),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown column {other:?}"))
                .with_hint("Columns are title, author, year, isbn, and price.")),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Column::Year | Column::Price)
    }

    /// Display text of this column for `book`; the action column has none.
    pub fn display(self, book: &Book) -> String {
        match self.cell(book) {
            Some(Cell::Text(text)) => text.to_string(),
            Some(Cell::Integer(value)) => value.to_string(),
            Some(Cell::Number(value)) => value.to_string(),
            None => String::new(),
        }
    }

    fn cell(self, book: &Book) -> Option<Cell<'_>> {
        match self {
            Column::Title => Some(Cell::Text(&book.title)),
            Column::Author => Some(Cell::Text(&book.author)),
            Column::Year => Some(Cell::Integer(book.year)),
            Column::Isbn => Some(Cell::Text(&book.isbn)),
            Column::Price => Some(Cell::Number(book.price)),
            Column::Actions => None,
        }
    }

    fn number(self, book: &Book) -> Option<f64> {
        match self.cell(book)? {
            Cell::Integer(value) => Some(value as f64),
            Cell::Number(value) => Some(value),
            Cell::Text(_) => None,
        }
    }

    fn compare(self, left: &Book, right: &Book) -> Ordering {
        match (self.cell(left), self.cell(right)) {
            (Some(Cell::Text(a)), Some(Cell::Text(b))) => a.cmp(b),
            (Some(Cell::Integer(a)), Some(Cell::Integer(b))) => a.cmp(&b),
            (Some(Cell::Number(a)), Some(Cell::Number(b))) => a.total_cmp(&b),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SortModel {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortModel {
    pub fn new(column: Column, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Parse `column` or `column:asc|desc`.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let (name, direction) = match input.split_once(':') {
            Some((name, direction)) => (name, direction.trim().to_ascii_lowercase()),
            None => (input, "asc".to_string()),
        };
        let direction = match direction.as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown sort direction {other:?}"))
                    .with_hint("Use `column:asc` or `column:desc`."));
            }
        };
        Ok(Self::new(Column::parse(name)?, direction))
    }

    pub fn compare(&self, left: &Book, right: &Book) -> Ordering {
        let ordering = self.column.compare(left, right);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterOp {
    Contains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    LessThan,
    GreaterThan,
}

// Two-character operators come first so `!=` is not read as `=`.
const OPERATORS: [(&str, FilterOp); 7] = [
    ("!=", FilterOp::NotEquals),
    ("~", FilterOp::Contains),
    ("=", FilterOp::Equals),
    ("^", FilterOp::StartsWith),
    ("$", FilterOp::EndsWith),
    ("<", FilterOp::LessThan),
    (">", FilterOp::GreaterThan),
];

#[derive(Clone, Debug, PartialEq)]
pub struct FilterCondition {
    pub column: Column,
    pub op: FilterOp,
    pub value: String,
}

impl FilterCondition {
    pub fn new(column: Column, op: FilterOp, value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if column == Column::Actions {
            return Err(Error::new(ErrorKind::Usage).with_message("the action column is not filterable"));
        }
        if matches!(op, FilterOp::LessThan | FilterOp::GreaterThan) {
            if !column.is_numeric() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("`<` and `>` need a numeric column, not {}", column.field()))
                    .with_hint("Numeric columns are year and price."));
            }
            if value.trim().parse::<f64>().is_err() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("expected a number to compare against, found {value:?}")));
            }
        }
        Ok(Self { column, op, value })
    }

    /// Parse expressions like `title~dune`, `year>1960`, or `author!=Austen`.
    pub fn parse(expr: &str) -> Result<Self, Error> {
        let found = OPERATORS
            .iter()
            .filter_map(|(token, op)| expr.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, usize::MAX - token.len()));
        let Some((pos, token, op)) = found else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("filter {expr:?} has no operator"))
                .with_hint("Use one of col~text, col=text, col!=text, col^text, col$text, col<n, col>n."));
        };
        let column = Column::parse(&expr[..pos])?;
        let value = expr[pos + token.len()..].trim();
        Self::new(column, op, value)
    }

    pub fn matches(&self, book: &Book) -> bool {
        match self.op {
            FilterOp::LessThan | FilterOp::GreaterThan => {
                let (Some(cell), Ok(target)) =
                    (self.column.number(book), self.value.trim().parse::<f64>())
                else {
                    return false;
                };
                if self.op == FilterOp::LessThan {
                    cell < target
                } else {
                    cell > target
                }
            }
            FilterOp::Equals | FilterOp::NotEquals => {
                let equal = match (self.column.number(book), self.value.trim().parse::<f64>()) {
                    (Some(cell), Ok(target)) => cell == target,
                    _ => self.column.display(book).to_lowercase() == self.value.to_lowercase(),
                };
                equal == (self.op == FilterOp::Equals)
            }
            FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
                let cell = self.column.display(book).to_lowercase();
                let needle = self.value.to_lowercase();
                match self.op {
                    FilterOp::Contains => cell.contains(&needle),
                    FilterOp::StartsWith => cell.starts_with(&needle),
                    _ => cell.ends_with(&needle),
                }
            }
        }
    }
}

/// Conjunction of per-column conditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterModel {
    conditions: Vec<FilterCondition>,
}

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: FilterCondition) {
        self.conditions.push(condition);
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.conditions.iter().all(|condition| condition.matches(book))
    }
}
