// src/storage/catalog.rs

//! Read-only access to book records.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Point lookups against the book document store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Return the record of `work_id` restricted to `projection`
    /// (all fields when empty), or `None` when the id is unknown.
    async fn find_work_metadata(&self, work_id: u64, projection: &[&str])
    -> Result<Option<Value>>;
}

/// Book records loaded once from a JSON export of the `books` collection.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    books: HashMap<u64, Map<String, Value>>,
}

impl JsonCatalog {
    /// Load a JSON array of book records from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let records: Vec<Value> = serde_json::from_slice(&bytes)?;
        let catalog = Self::from_records(records)?;
        log::info!("Loaded {} books from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Index records by their `book_id` field.
    pub fn from_records(records: Vec<Value>) -> Result<Self> {
        let mut books = HashMap::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let Value::Object(mut fields) = record else {
                return Err(AppError::validation(format!("catalog record {i} is not an object")));
            };
            let book_id = fields
                .get("book_id")
                .and_then(Value::as_u64)
                .ok_or_else(|| {
                    AppError::validation(format!("catalog record {i} has no numeric book_id"))
                })?;
            fields.remove("_id");
            if books.insert(book_id, fields).is_some() {
                log::warn!("Duplicate book_id {} in catalog; keeping the last", book_id);
            }
        }
        Ok(Self { books })
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[async_trait]
impl MetadataStore for JsonCatalog {
    async fn find_work_metadata(
        &self,
        work_id: u64,
        projection: &[&str],
    ) -> Result<Option<Value>> {
        let Some(fields) = self.books.get(&work_id) else {
            return Ok(None);
        };

        if projection.is_empty() {
            return Ok(Some(Value::Object(fields.clone())));
        }

        let projected = projection
            .iter()
            .filter_map(|&name| fields.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        Ok(Some(Value::Object(projected)))
    }
}
