//! JSON-file backed document store.
//!
//! Each collection is persisted as one JSON file under the store directory.
//! Every write rewrites the affected collection file via a temporary file
//! and a rename, so a crash never leaves a half-written collection behind.
//! A write that cannot be persisted is rolled back in memory as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory::{Collections, StoredDocument};
use super::{DocumentStore, FieldFilter, Query};
use crate::errors::PersistenceError;

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    collection: String,
    documents: Vec<StoredDocument>,
}

/// Document store persisted to a local directory.
#[derive(Debug)]
pub struct FileDocumentStore {
    root: PathBuf,
    collections: Mutex<Collections>,
}

impl FileDocumentStore {
    /// Opens (or creates) a store rooted at `root`, loading every collection file.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Io`] if the directory cannot be created or
    /// read, or [`PersistenceError::Serialization`] for a corrupt collection file.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let mut loaded = HashMap::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            let file: CollectionFile = serde_json::from_slice(&raw)?;
            debug!(collection = %file.collection, documents = file.documents.len(), "Loaded collection");
            loaded.insert(file.collection, file.documents);
        }

        info!(root = %root.display(), collections = loaded.len(), "Opened file document store");
        Ok(Self {
            root,
            collections: Mutex::new(Collections::from_map(loaded)),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        let encoded = collection.replace('%', "%25").replace('/', "%2F");
        self.root.join(format!("{encoded}.json"))
    }

    async fn persist(&self, collections: &Collections, collection: &str) -> Result<(), PersistenceError> {
        let file = CollectionFile {
            collection: collection.to_string(),
            documents: collections.documents(collection).to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Persists `collection`, restoring `snapshot` in memory if that fails.
    async fn commit(
        &self,
        collections: &mut Collections,
        collection: &str,
        snapshot: Option<Vec<StoredDocument>>,
    ) -> Result<(), PersistenceError> {
        if let Err(e) = self.persist(collections, collection).await {
            warn!(collection, error = %e, "Write failed, rolling back");
            collections.restore(collection, snapshot);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), PersistenceError> {
        let mut collections = self.collections.lock().await;
        let snapshot = collections.snapshot(collection);
        collections.set(collection, id, document);
        self.commit(&mut collections, collection, snapshot).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.collections.lock().await.get(collection, id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), PersistenceError> {
        let mut collections = self.collections.lock().await;
        let snapshot = collections.snapshot(collection);
        collections.update(collection, id, fields)?;
        self.commit(&mut collections, collection, snapshot).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, PersistenceError> {
        Ok(self.collections.lock().await.query(collection, query))
    }

    async fn delete_where(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<usize, PersistenceError> {
        let mut collections = self.collections.lock().await;
        let snapshot = collections.snapshot(collection);
        let removed = collections.delete_where(collection, filters);
        if removed > 0 {
            self.commit(&mut collections, collection, snapshot).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = FileDocumentStore::open(dir.path()).await.unwrap();
            store.set("jobs", "j1", json!({"status": "pending"})).await.unwrap();
            store
                .set("jobs/j1/tasks", "t1", json!({"status": "running"}))
                .await
                .unwrap();
            let mut fields = Map::new();
            fields.insert("status".into(), json!("success"));
            store.update("jobs", "j1", fields).await.unwrap();
        }

        let reopened = FileDocumentStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("jobs", "j1").await.unwrap(),
            Some(json!({"status": "success"}))
        );
        assert_eq!(
            reopened.get("jobs/j1/tasks", "t1").await.unwrap(),
            Some(json!({"status": "running"}))
        );
    }

    #[tokio::test]
    async fn test_delete_where_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::open(dir.path()).await.unwrap();
        store.set("cp", "1", json!({"p": "a"})).await.unwrap();
        store.set("cp", "2", json!({"p": "b"})).await.unwrap();
        store
            .delete_where("cp", &[FieldFilter::eq("p", "a")])
            .await
            .unwrap();

        let reopened = FileDocumentStore::open(dir.path()).await.unwrap();
        let docs = reopened.query("cp", &Query::new()).await.unwrap();
        assert_eq!(docs, vec![json!({"p": "b"})]);
    }

    #[tokio::test]
    async fn test_failed_writes_leave_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let store = FileDocumentStore::open(&root).await.unwrap();
        store.set("jobs", "j1", json!({"status": "pending"})).await.unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        assert!(store.set("jobs", "j2", json!({"a": 1})).await.is_err());
        assert!(store.set("checkpoints", "c1", json!({"a": 1})).await.is_err());
        let mut fields = Map::new();
        fields.insert("status".into(), json!("success"));
        assert!(store.update("jobs", "j1", fields).await.is_err());
        assert!(store
            .delete_where("jobs", &[FieldFilter::eq("status", "pending")])
            .await
            .is_err());

        assert_eq!(store.get("jobs", "j2").await.unwrap(), None);
        assert!(store.query("checkpoints", &Query::new()).await.unwrap().is_empty());
        assert_eq!(
            store.query("jobs", &Query::new()).await.unwrap(),
            vec![json!({"status": "pending"})]
        );
    }

    #[tokio::test]
    async fn test_corrupt_collection_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jobs.json"), b"not json").unwrap();

        let err = FileDocumentStore::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization(_)));
    }
}
