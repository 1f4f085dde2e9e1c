use crate::database::document_store::{
    BatchWrite, CollectionPath, Document, DocumentPath, DocumentStore, Filter, WriteBatch, WriteFields,
};
use crate::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Map<String, Value>>>;

/// In-process document store.
///
/// Documents live in per-collection ordered maps behind a single `RwLock`, which makes
/// batch commits atomic. Server timestamps are RFC 3339 strings taken from `Utc::now()`.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document at a known path. Used to seed roster data.
    pub async fn put(&self, path: &DocumentPath, data: Value) -> StoreResult<()> {
        let data = match data {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::serialization(
                    path,
                    format!("expected an object, got {}", other),
                ))
            }
        };
        let mut collections = self.collections.write().await;
        collections
            .entry(path.parent().clone())
            .or_default()
            .insert(path.id().to_string(), data);
        Ok(())
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &CollectionPath) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    fn stamp(write: WriteFields) -> Map<String, Value> {
        let WriteFields {
            mut fields,
            server_timestamps,
        } = write;
        let now = Value::String(Utc::now().to_rfc3339());
        for field in server_timestamps {
            fields.insert(field, now.clone());
        }
        fields
    }

    fn apply_insert(collections: &mut Collections, collection: &CollectionPath, write: WriteFields) -> DocumentPath {
        let id = Uuid::new_v4().simple().to_string();
        collections
            .entry(collection.clone())
            .or_default()
            .insert(id.clone(), Self::stamp(write));
        collection.doc(&id)
    }

    fn apply_update(collections: &mut Collections, path: &DocumentPath, write: WriteFields) -> StoreResult<()> {
        let existing = collections
            .get_mut(path.parent())
            .and_then(|docs| docs.get_mut(path.id()))
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        for (field, value) in Self::stamp(write) {
            existing.insert(field, value);
        }
        Ok(())
    }

    fn exists(collections: &Collections, path: &DocumentPath) -> bool {
        collections
            .get(path.parent())
            .map(|docs| docs.contains_key(path.id()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(path.parent())
            .and_then(|docs| docs.get(path.id()))
            .map(|data| Document {
                path: path.clone(),
                data: data.clone(),
            }))
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        path: collection.doc(id),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(&self, collection: &CollectionPath, filter: &Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| filter.matches(data))
                    .map(|(id, data)| Document {
                        path: collection.doc(id),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &CollectionPath, write: WriteFields) -> StoreResult<DocumentPath> {
        let mut collections = self.collections.write().await;
        Ok(Self::apply_insert(&mut collections, collection, write))
    }

    async fn update(&self, path: &DocumentPath, write: WriteFields) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply_update(&mut collections, path, write)
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<Vec<DocumentPath>> {
        let mut collections = self.collections.write().await;

        // Check every precondition before the first write so a failed batch leaves no trace.
        for write in &batch.writes {
            if let BatchWrite::Update { path, .. } = write {
                if !Self::exists(&collections, path) {
                    return Err(StoreError::Transaction(format!(
                        "update target {} does not exist",
                        path
                    )));
                }
            }
        }

        let mut inserted = Vec::new();
        for write in batch.writes {
            match write {
                BatchWrite::Insert { collection, write } => {
                    inserted.push(Self::apply_insert(&mut collections, &collection, write));
                }
                BatchWrite::Update { path, write } => {
                    Self::apply_update(&mut collections, &path, write)?;
                }
            }
        }
        Ok(inserted)
    }
}
