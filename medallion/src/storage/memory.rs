//! In-memory document store.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{DocumentStore, FieldFilter, Query};
use crate::errors::PersistenceError;

/// A stored document with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredDocument {
    pub id: String,
    pub document: Value,
}

/// Collections keyed by name, documents kept in insertion order.
#[derive(Debug, Default, Clone)]
pub(crate) struct Collections {
    inner: HashMap<String, Vec<StoredDocument>>,
}

impl Collections {
    pub fn from_map(inner: HashMap<String, Vec<StoredDocument>>) -> Self {
        Self { inner }
    }

    pub fn documents(&self, collection: &str) -> &[StoredDocument] {
        self.inner.get(collection).map_or(&[], Vec::as_slice)
    }

    pub fn set(&mut self, collection: &str, id: &str, document: Value) {
        let docs = self.inner.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.document = document,
            None => docs.push(StoredDocument {
                id: id.to_string(),
                document,
            }),
        }
    }

    /// Copies a collection's documents so a failed write can be undone.
    pub fn snapshot(&self, collection: &str) -> Option<Vec<StoredDocument>> {
        self.inner.get(collection).cloned()
    }

    /// Puts back a collection captured by [`Collections::snapshot`].
    pub fn restore(&mut self, collection: &str, snapshot: Option<Vec<StoredDocument>>) {
        match snapshot {
            Some(docs) => {
                self.inner.insert(collection.to_string(), docs);
            }
            None => {
                self.inner.remove(collection);
            }
        }
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents(collection)
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.document.clone())
    }

    pub fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        let missing = || PersistenceError::MissingDocument {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let doc = self
            .inner
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(missing)?;

        let Value::Object(target) = &mut doc.document else {
            return Err(PersistenceError::backend(format!(
                "document {collection}/{id} is not an object"
            )));
        };
        target.extend(fields);
        Ok(())
    }

    pub fn query(&self, collection: &str, query: &Query) -> Vec<Value> {
        let matched = self
            .documents(collection)
            .iter()
            .filter(|d| query.matches(&d.document))
            .map(|d| d.document.clone())
            .collect();
        query.finish(matched)
    }

    pub fn delete_where(&mut self, collection: &str, filters: &[FieldFilter]) -> usize {
        let Some(docs) = self.inner.get_mut(collection) else {
            return 0;
        };
        let before = docs.len();
        docs.retain(|d| !filters.iter().all(|f| f.matches(&d.document)));
        before - docs.len()
    }
}

/// Document store that lives for the lifetime of the process.
///
/// Suitable for tests and single-process deployments where job history does
/// not need to survive a restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections.read().documents(collection).len()
    }

    /// Returns true if the collection has no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), PersistenceError> {
        self.collections.write().set(collection, id, document);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.collections.read().get(collection, id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        self.collections.write().update(collection, id, fields)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, PersistenceError> {
        Ok(self.collections.read().query(collection, query))
    }

    async fn delete_where(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, PersistenceError> {
        Ok(self.collections.write().delete_where(collection, filters))
    }
}
