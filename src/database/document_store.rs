use crate::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Path of a collection: an odd number of segments (`Studios`, `Studios/s1/Families`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

/// Path of a single document: a collection path plus the document id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    pub fn root(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.to_string(),
        }
    }

    /// Name of the last segment, e.g. `Fees` for `Studios/s1/Families/f1/Fees`.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl DocumentPath {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn collection(&self, name: &str) -> CollectionPath {
        let mut segments = self.collection.segments.clone();
        segments.push(self.id.clone());
        segments.push(name.to_string());
        CollectionPath { segments }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document: its path and its field map
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Decode the field map into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| StoreError::serialization(&self.path, e))
    }
}

/// The two query primitives the store must support
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    Equals { field: String, value: Value },
    /// `value` is an element of the array stored in `field`
    ArrayContains { field: String, value: Value },
}

impl Filter {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        match self {
            Filter::Equals { field, value } => data.get(field) == Some(value),
            Filter::ArrayContains { field, value } => match data.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}

/// Fields to write, plus the fields the store stamps with its own clock at write time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteFields {
    pub fields: Map<String, Value>,
    pub server_timestamps: Vec<String>,
}

impl WriteFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a serializable record; it must encode to a JSON object.
    pub fn from_record<T: Serialize>(record: &T) -> StoreResult<Self> {
        match serde_json::to_value(record) {
            Ok(Value::Object(fields)) => Ok(Self {
                fields,
                server_timestamps: Vec::new(),
            }),
            Ok(other) => Err(StoreError::serialization(
                std::any::type_name::<T>(),
                format!("expected an object, got {}", other),
            )),
            Err(e) => Err(StoreError::serialization(std::any::type_name::<T>(), e)),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self.server_timestamps.push(field.to_string());
        self
    }
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    Insert {
        collection: CollectionPath,
        write: WriteFields,
    },
    Update {
        path: DocumentPath,
        write: WriteFields,
    },
}

/// Writes committed together, all or none
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: CollectionPath, write: WriteFields) {
        self.writes.push(BatchWrite::Insert { collection, write });
    }

    pub fn update(&mut self, path: DocumentPath, write: WriteFields) {
        self.writes.push(BatchWrite::Update { path, write });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Hierarchical document store consumed by the repositories.
///
/// Implementations guarantee per-document atomicity. Cross-document atomicity is only
/// available through [`DocumentStore::commit`] when [`DocumentStore::supports_transactions`]
/// returns `true`. Timeouts and retries are the implementation's business.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup; `Ok(None)` when the document does not exist.
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Every document of a collection.
    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>>;

    /// Documents of a collection matching the filter.
    async fn query(&self, collection: &CollectionPath, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Insert a new document under a store-generated id.
    async fn insert(&self, collection: &CollectionPath, write: WriteFields) -> StoreResult<DocumentPath>;

    /// Merge fields into an existing document; `StoreError::NotFound` if it is absent.
    async fn update(&self, path: &DocumentPath, write: WriteFields) -> StoreResult<()>;

    fn supports_transactions(&self) -> bool {
        false
    }

    /// Apply every write of the batch atomically. Returns the paths of inserted documents
    /// in batch order.
    async fn commit(&self, _batch: WriteBatch) -> StoreResult<Vec<DocumentPath>> {
        Err(StoreError::TransactionsUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_render_hierarchically() {
        let studio = CollectionPath::root("Studios").doc("s1");
        let fees = studio.collection("Families").doc("f1").collection("Fees");
        assert_eq!(fees.to_string(), "Studios/s1/Families/f1/Fees");
        assert_eq!(fees.name(), "Fees");
        let doc = fees.doc("x");
        assert_eq!(doc.to_string(), "Studios/s1/Families/f1/Fees/x");
        assert_eq!(doc.parent(), &fees);
    }

    #[test]
    fn test_filters() {
        let data = json!({"FamilyId": "f1", "Classes": ["c1", "c2"]});
        let data = data.as_object().unwrap();
        assert!(Filter::equals("FamilyId", "f1").matches(data));
        assert!(!Filter::equals("FamilyId", "f2").matches(data));
        assert!(Filter::array_contains("Classes", "c2").matches(data));
        assert!(!Filter::array_contains("Classes", "c3").matches(data));
        // array-contains on a scalar field never matches
        assert!(!Filter::array_contains("FamilyId", "f1").matches(data));
    }

    #[test]
    fn test_server_timestamp_replaces_client_value() {
        let write = WriteFields::new()
            .set("IsActive", false)
            .set("LastUpdated", "client-clock")
            .server_timestamp("LastUpdated");
        assert!(!write.fields.contains_key("LastUpdated"));
        assert_eq!(write.server_timestamps, vec!["LastUpdated".to_string()]);
    }
}
