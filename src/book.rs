//! Purpose: Define the book domain entity, its store key, and the keyed view row.
//! Exports: `Book`, `BookKey`, `Row`.
//! Role: Shared data model for the store client, reconciler, controller, and grid.
//! Invariants: A `Row` id is the store-assigned key and never changes after reconciliation.
//! Invariants: Decoding tolerates numeric fields written as strings by HTML forms.
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque key assigned by the document store when a book is created.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookKey(String);

impl BookKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank keys cannot address a document, so rows carrying one are unidentifiable.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BookKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&BookKey> for BookKey {
    fn from(value: &BookKey) -> Self {
        value.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, deserialize_with = "text_field")]
    pub title: String,
    #[serde(default, deserialize_with = "text_field")]
    pub author: String,
    #[serde(default, deserialize_with = "integer_field")]
    pub year: i64,
    #[serde(default, deserialize_with = "text_field")]
    pub isbn: String,
    #[serde(default, deserialize_with = "number_field")]
    pub price: f64,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: i64,
        isbn: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year,
            isbn: isbn.into(),
            price,
        }
    }
}

/// A book annotated with the key it is stored under.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub id: BookKey,
    #[serde(flatten)]
    pub book: Book,
}

impl Row {
    pub fn new(id: impl Into<BookKey>, book: Book) -> Self {
        Self {
            id: id.into(),
            book,
        }
    }
}

fn text_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(de::Error::custom(format!(
            "expected text, found {}",
            value_label(&other)
        ))),
    }
}

fn integer_field<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                return Ok(value);
            }
            match number.as_f64() {
                Some(value)
                    if value.fract() == 0.0
                        && value >= i64::MIN as f64
                        && value < i64::MAX as f64 =>
                {
                    Ok(value as i64)
                }
                _ => Err(de::Error::custom(format!("expected integer, found {number}"))),
            }
        }
        Value::String(text) if text.trim().is_empty() => Ok(0),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("expected integer, found {text:?}"))),
        other => Err(de::Error::custom(format!(
            "expected integer, found {}",
            value_label(&other)
        ))),
    }
}

fn number_field<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("expected number, found {number}"))),
        Value::String(text) if text.trim().is_empty() => Ok(0.0),
        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(de::Error::custom(format!("expected number, found {text:?}"))),
        },
        other => Err(de::Error::custom(format!(
            "expected number, found {}",
            value_label(&other)
        ))),
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
