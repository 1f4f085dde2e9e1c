use crate::domains::fee::types::{AssociationType, FamilyRef};
use crate::domains::roster::repository::{ClassRepository, StudentRepository};
use crate::domains::roster::types::Student;
use crate::errors::{DomainError, DomainResult};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Maps an association to the distinct families it bills.
///
/// Families are collected in a `BTreeSet` keyed by family id, so the same family reached
/// through several students or classes appears once and the output order is stable.
#[derive(Clone)]
pub struct FamilyResolver {
    student_repo: Arc<dyn StudentRepository>,
    class_repo: Arc<dyn ClassRepository>,
}

impl FamilyResolver {
    pub fn new(student_repo: Arc<dyn StudentRepository>, class_repo: Arc<dyn ClassRepository>) -> Self {
        Self {
            student_repo,
            class_repo,
        }
    }

    /// Resolve from the raw association type string, failing `InvalidAssociation` on an
    /// unknown type.
    pub async fn resolve_families(
        &self,
        studio_id: &str,
        association_type: &str,
        association_id: &str,
    ) -> DomainResult<Vec<FamilyRef>> {
        let association_type = AssociationType::parse(association_type)?;
        self.resolve(studio_id, association_type, association_id).await
    }

    pub async fn resolve(
        &self,
        studio_id: &str,
        association_type: AssociationType,
        association_id: &str,
    ) -> DomainResult<Vec<FamilyRef>> {
        let mut families = BTreeSet::new();
        match association_type {
            AssociationType::Family => {
                families.insert(association_id.to_string());
            }
            AssociationType::Student => {
                families.insert(self.family_for_student(studio_id, association_id).await?);
            }
            AssociationType::Class => {
                self.collect_class_families(studio_id, association_id, &mut families)
                    .await?;
            }
            AssociationType::Season => {
                let classes = self.class_repo.find_by_season(studio_id, association_id).await?;
                log::debug!(
                    "Season {} in studio {} has {} classes",
                    association_id,
                    studio_id,
                    classes.len()
                );
                for class in classes {
                    self.collect_class_families(studio_id, &class.id, &mut families)
                        .await?;
                }
            }
        }

        log::debug!(
            "{} {} resolves to {} famil(ies) in studio {}",
            association_type,
            association_id,
            families.len(),
            studio_id
        );
        Ok(families.into_iter().map(FamilyRef::new).collect())
    }

    async fn family_for_student(&self, studio_id: &str, student_id: &str) -> DomainResult<String> {
        let student = self.student_repo.find_by_id(studio_id, student_id).await?;
        student
            .as_ref()
            .and_then(Student::family)
            .map(str::to_string)
            .ok_or_else(|| DomainError::EntityNotFound("Student family".to_string(), student_id.to_string()))
    }

    async fn collect_class_families(
        &self,
        studio_id: &str,
        class_id: &str,
        families: &mut BTreeSet<String>,
    ) -> DomainResult<()> {
        let students = self.student_repo.find_by_class(studio_id, class_id).await?;
        for student in &students {
            match student.family() {
                Some(family_id) => {
                    families.insert(family_id.to_string());
                }
                None => log::debug!("Student {} in class {} has no family; skipped", student.id, class_id),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDocumentStore;
    use crate::domains::roster::repository::{
        classes_collection, students_collection, StoreClassRepository, StoreStudentRepository,
    };
    use serde_json::json;

    fn family_ids(refs: Vec<FamilyRef>) -> Vec<String> {
        refs.into_iter().map(|r| r.family_id).collect()
    }

    async fn resolver() -> FamilyResolver {
        let store = Arc::new(InMemoryDocumentStore::new());
        let students = [
            ("st1", json!({"FamilyId": "fam-a", "Classes": ["ballet", "tap"]})),
            ("st2", json!({"FamilyId": "fam-a", "Classes": ["tap"]})),
            ("st3", json!({"FamilyId": "fam-b", "Classes": ["tap", "jazz"]})),
            ("st4", json!({"Classes": ["jazz"]})),
            ("st5", json!({"FamilyId": "fam-c", "Classes": ["hiphop"]})),
        ];
        for (id, data) in students {
            store.put(&students_collection("s1").doc(id), data).await.unwrap();
        }
        let classes = [
            ("ballet", json!({"SeasonId": "fall"})),
            ("tap", json!({"SeasonId": "fall"})),
            ("jazz", json!({"SeasonId": "spring"})),
            ("hiphop", json!({"SeasonId": "summer"})),
        ];
        for (id, data) in classes {
            store.put(&classes_collection("s1").doc(id), data).await.unwrap();
        }
        FamilyResolver::new(
            Arc::new(StoreStudentRepository::new(store.clone())),
            Arc::new(StoreClassRepository::new(store)),
        )
    }

    #[tokio::test]
    async fn test_family_association_needs_no_lookup() {
        let resolver = resolver().await;
        let families = resolver.resolve_families("s1", "Family", "fam-zzz").await.unwrap();
        assert_eq!(family_ids(families), vec!["fam-zzz".to_string()]);
    }

    #[tokio::test]
    async fn test_student_association() {
        let resolver = resolver().await;
        let families = resolver.resolve_families("s1", "Student", "st3").await.unwrap();
        assert_eq!(family_ids(families), vec!["fam-b".to_string()]);

        let missing = resolver.resolve_families("s1", "Student", "ghost").await;
        assert!(matches!(missing, Err(DomainError::EntityNotFound(_, id)) if id == "ghost"));

        let orphan = resolver.resolve_families("s1", "Student", "st4").await;
        assert!(matches!(orphan, Err(DomainError::EntityNotFound(_, _))));
    }

    #[tokio::test]
    async fn test_class_association_deduplicates_families() {
        let resolver = resolver().await;
        let families = resolver.resolve_families("s1", "Class", "tap").await.unwrap();
        assert_eq!(family_ids(families), vec!["fam-a".to_string(), "fam-b".to_string()]);

        // familyless students are skipped rather than failing the class
        let families = resolver.resolve_families("s1", "Class", "jazz").await.unwrap();
        assert_eq!(family_ids(families), vec!["fam-b".to_string()]);

        assert!(resolver.resolve_families("s1", "Class", "empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_season_reports_shared_family_once() {
        let resolver = resolver().await;
        // fam-a reaches the fall season through both ballet and tap
        let families = resolver.resolve_families("s1", "Season", "fall").await.unwrap();
        assert_eq!(family_ids(families), vec!["fam-a".to_string(), "fam-b".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_association_type() {
        let resolver = resolver().await;
        let result = resolver.resolve_families("s1", "Instructor", "i1").await;
        assert!(matches!(result, Err(DomainError::InvalidAssociation(t)) if t == "Instructor"));
    }
}
