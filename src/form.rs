//! Purpose: Collect a candidate book from raw text inputs.
//! Exports: `AddBookForm`.
//! Role: Input-control layer in front of `BookList::add_book`.
//! Invariants: Every field is required; year must be an integer and price a finite number.
//! Invariants: A successful submit clears the inputs; a failed one keeps them for correction.
use crate::book::Book;
use crate::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddBookForm {
    pub title: String,
    pub author: String,
    pub year: String,
    pub isbn: String,
    pub price: String,
}

impl AddBookForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field by its column name (`title`, `author`, `year`, `isbn`, `price`).
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), Error> {
        let slot = match field.trim().to_ascii_lowercase().as_str() {
            "title" => &mut self.title,
            "author" => &mut self.author,
            "year" => &mut self.year,
            "isbn" => &mut self.isbn,
            "price" => &mut self.price,
            other => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("unknown form field {other:?}"))
                    .with_hint("Fields are title, author, year, isbn, and price."));
            }
        };
        *slot = value.into();
        Ok(())
    }

    pub fn validate(&self) -> Result<Book, Error> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("author", &self.author),
            ("year", &self.year),
            ("isbn", &self.isbn),
            ("price", &self.price),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("missing required fields: {}", missing.join(", "))));
        }

        let year = self.year.trim().parse::<i64>().map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("year must be a whole number, found {:?}", self.year))
                .with_source(err)
        })?;
        let price = match self.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() => price,
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("price must be a number, found {:?}", self.price)));
            }
        };

        Ok(Book::new(
            self.title.trim(),
            self.author.trim(),
            year,
            self.isbn.trim(),
            price,
        ))
    }

    /// Validate and reset the inputs, yielding the book to hand to the controller.
    pub fn submit(&mut self) -> Result<Book, Error> {
        let book = self.validate()?;
        *self = Self::default();
        Ok(book)
    }
}
