//! Purpose: Decode store snapshots and turn them into keyed rows.
//! Exports: `StoreSnapshot`, `RejectedEntry`, `reconcile`.
//! Role: Pure bridge between the store's keyed object and the ordered row sequence.
//! Invariants: Keys and books are paired during one traversal of the JSON object.
//! Invariants: A `null` collection decodes to an empty snapshot, never an error.
//! Invariants: Row order follows the store's enumeration order.
use crate::book::{Book, BookKey, Row};
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::fmt;

/// Point-in-time read of the `books` collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreSnapshot {
    entries: Vec<(BookKey, Book)>,
    rejected: Vec<RejectedEntry>,
}

/// A keyed value that could not be decoded as a book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedEntry {
    pub key: BookKey,
    pub reason: String,
}

impl StoreSnapshot {
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Book)>,
        K: Into<BookKey>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, book)| (key.into(), book))
                .collect(),
            rejected: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[(BookKey, Book)] {
        &self.entries
    }

    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for StoreSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(SnapshotVisitor)
    }
}

struct SnapshotVisitor;

impl<'de> Visitor<'de> for SnapshotVisitor {
    type Value = StoreSnapshot;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping keys to books, or null")
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(StoreSnapshot::default())
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(StoreSnapshot::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut snapshot = StoreSnapshot::default();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            let key = BookKey::new(key);
            match Book::deserialize(value) {
                Ok(book) => snapshot.entries.push((key, book)),
                Err(err) => snapshot.rejected.push(RejectedEntry {
                    key,
                    reason: err.to_string(),
                }),
            }
        }
        Ok(snapshot)
    }
}

/// Attach each key to its book as the row id.
pub fn reconcile(snapshot: StoreSnapshot) -> Vec<Row> {
    snapshot
        .entries
        .into_iter()
        .map(|(key, book)| Row { id: key, book })
        .collect()
}
