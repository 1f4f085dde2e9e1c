use crate::database::{studio_doc, CollectionPath, Document, DocumentStore, Filter};
use crate::domains::roster::types::{Family, Student, StudioClass};
use crate::errors::{DomainResult, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const STUDENTS: &str = "Students";
pub const CLASSES: &str = "Classes";
pub const FAMILIES: &str = "Families";

pub fn students_collection(studio_id: &str) -> CollectionPath {
    studio_doc(studio_id).collection(STUDENTS)
}

pub fn classes_collection(studio_id: &str) -> CollectionPath {
    studio_doc(studio_id).collection(CLASSES)
}

pub fn families_collection(studio_id: &str) -> CollectionPath {
    studio_doc(studio_id).collection(FAMILIES)
}

/// Decode a document and attach its id, which lives in the path rather than the fields.
fn decode_with_id<T, F>(doc: &Document, set_id: F) -> StoreResult<T>
where
    T: DeserializeOwned,
    F: FnOnce(&mut T, String),
{
    let mut entity: T = doc.decode()?;
    set_id(&mut entity, doc.id().to_string());
    Ok(entity)
}

/// Trait defining student lookups
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn find_by_id(&self, studio_id: &str, student_id: &str) -> DomainResult<Option<Student>>;

    /// Students whose `Classes` array contains `class_id`
    async fn find_by_class(&self, studio_id: &str, class_id: &str) -> DomainResult<Vec<Student>>;
}

/// Trait defining class lookups
#[async_trait]
pub trait ClassRepository: Send + Sync {
    async fn find_by_season(&self, studio_id: &str, season_id: &str) -> DomainResult<Vec<StudioClass>>;
}

/// Trait defining family lookups
#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn find_all(&self, studio_id: &str) -> DomainResult<Vec<Family>>;
}

/// Document store implementation for StudentRepository
#[derive(Clone)]
pub struct StoreStudentRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreStudentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn map_doc(doc: &Document) -> StoreResult<Student> {
        decode_with_id(doc, |student: &mut Student, id| student.id = id)
    }
}

#[async_trait]
impl StudentRepository for StoreStudentRepository {
    async fn find_by_id(&self, studio_id: &str, student_id: &str) -> DomainResult<Option<Student>> {
        let path = students_collection(studio_id).doc(student_id);
        match self.store.get(&path).await? {
            Some(doc) => Ok(Some(Self::map_doc(&doc)?)),
            None => Ok(None),
        }
    }

    async fn find_by_class(&self, studio_id: &str, class_id: &str) -> DomainResult<Vec<Student>> {
        let docs = self
            .store
            .query(&students_collection(studio_id), &Filter::array_contains("Classes", class_id))
            .await?;
        docs.iter()
            .map(|doc| Self::map_doc(doc).map_err(Into::into))
            .collect()
    }
}

/// Document store implementation for ClassRepository
#[derive(Clone)]
pub struct StoreClassRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreClassRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ClassRepository for StoreClassRepository {
    async fn find_by_season(&self, studio_id: &str, season_id: &str) -> DomainResult<Vec<StudioClass>> {
        let docs = self
            .store
            .query(&classes_collection(studio_id), &Filter::equals("SeasonId", season_id))
            .await?;
        docs.iter()
            .map(|doc| {
                decode_with_id(doc, |class: &mut StudioClass, id| class.id = id).map_err(Into::into)
            })
            .collect()
    }
}

/// Document store implementation for FamilyRepository
#[derive(Clone)]
pub struct StoreFamilyRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreFamilyRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FamilyRepository for StoreFamilyRepository {
    async fn find_all(&self, studio_id: &str) -> DomainResult<Vec<Family>> {
        let docs = self.store.list(&families_collection(studio_id)).await?;
        docs.iter()
            .map(|doc| decode_with_id(doc, |family: &mut Family, id| family.id = id).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDocumentStore;
    use serde_json::json;

    async fn seeded() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .put(&students_collection("s1").doc("st1"), json!({"FamilyId": "f1", "Classes": ["c1", "c2"]}))
            .await
            .unwrap();
        store
            .put(&students_collection("s1").doc("st2"), json!({"FamilyId": "f2", "Classes": ["c2"]}))
            .await
            .unwrap();
        store
            .put(&classes_collection("s1").doc("c1"), json!({"SeasonId": "fall"}))
            .await
            .unwrap();
        store
            .put(&classes_collection("s1").doc("c2"), json!({"SeasonId": "spring"}))
            .await
            .unwrap();
        store
            .put(&families_collection("s1").doc("f1"), json!({"Name": "Lovelace"}))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_student_lookups_carry_document_ids() {
        let store = seeded().await;
        let repo = StoreStudentRepository::new(store);

        let student = repo.find_by_id("s1", "st2").await.unwrap().unwrap();
        assert_eq!(student.id, "st2");
        assert_eq!(student.family(), Some("f2"));
        assert!(repo.find_by_id("s1", "nobody").await.unwrap().is_none());
        // other studios are isolated
        assert!(repo.find_by_id("s2", "st2").await.unwrap().is_none());

        let mut in_c2: Vec<String> = repo
            .find_by_class("s1", "c2")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        in_c2.sort();
        assert_eq!(in_c2, vec!["st1".to_string(), "st2".to_string()]);
    }

    #[tokio::test]
    async fn test_classes_by_season_and_family_listing() {
        let store = seeded().await;
        let classes = StoreClassRepository::new(store.clone())
            .find_by_season("s1", "fall")
            .await
            .unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].id, "c1");

        let families = StoreFamilyRepository::new(store).find_all("s1").await.unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].id, "f1");
        assert_eq!(families[0].name.as_deref(), Some("Lovelace"));
    }
}
