use crate::database::{studio_doc, CollectionPath, Document, DocumentStore, Filter, WriteBatch, WriteFields};
use crate::domains::fee::types::{FamilyFeeRecord, FeeDefinition};
use crate::domains::roster::repository::families_collection;
use crate::errors::{DomainError, DomainResult, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;

pub const FEES: &str = "Fees";

/// `Studios/{studio}/Fees`
pub fn fee_definitions_collection(studio_id: &str) -> CollectionPath {
    studio_doc(studio_id).collection(FEES)
}

/// `Studios/{studio}/Families/{family}/Fees`
pub fn family_fees_collection(studio_id: &str, family_id: &str) -> CollectionPath {
    families_collection(studio_id).doc(family_id).collection(FEES)
}

/// Trait defining fee repository operations
#[async_trait]
pub trait FeeRepository: Send + Sync {
    async fn find_definition(&self, studio_id: &str, fee_id: &str) -> DomainResult<FeeDefinition>;

    /// Set IsActive on the canonical definition and stamp LastUpdated.
    async fn set_definition_active(&self, studio_id: &str, fee_id: &str, is_active: bool) -> DomainResult<()>;

    /// Persist one materialized record; returns its store id.
    async fn insert_family_fee(
        &self,
        studio_id: &str,
        family_id: &str,
        record: &FamilyFeeRecord,
    ) -> DomainResult<String>;

    /// Whether `insert_family_fees_atomic` is available.
    fn supports_atomic_writes(&self) -> bool;

    /// Persist `(family_id, record)` pairs in a single all-or-nothing commit; returns store
    /// ids in input order.
    async fn insert_family_fees_atomic(
        &self,
        studio_id: &str,
        records: &[(String, FamilyFeeRecord)],
    ) -> DomainResult<Vec<String>>;

    async fn find_family_fees(&self, studio_id: &str, family_id: &str) -> DomainResult<Vec<FamilyFeeRecord>>;

    /// Store ids of a family's records materialized from `fee_id`. Record bodies are not decoded.
    async fn find_family_fee_ids_by_fee(
        &self,
        studio_id: &str,
        family_id: &str,
        fee_id: &str,
    ) -> DomainResult<Vec<String>>;

    async fn set_family_fee_active(
        &self,
        studio_id: &str,
        family_id: &str,
        record_id: &str,
        is_active: bool,
    ) -> DomainResult<()>;
}

/// Document store implementation for FeeRepository
#[derive(Clone)]
pub struct StoreFeeRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreFeeRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn map_record(doc: &Document) -> StoreResult<FamilyFeeRecord> {
        let mut record: FamilyFeeRecord = doc.decode()?;
        record.id = Some(doc.id().to_string());
        Ok(record)
    }

    fn record_write(record: &FamilyFeeRecord) -> StoreResult<WriteFields> {
        Ok(WriteFields::from_record(record)?
            .server_timestamp("CreatedAt")
            .server_timestamp("LastUpdated"))
    }

    fn activation_write(is_active: bool) -> WriteFields {
        WriteFields::new()
            .set("IsActive", is_active)
            .server_timestamp("LastUpdated")
    }
}

#[async_trait]
impl FeeRepository for StoreFeeRepository {
    async fn find_definition(&self, studio_id: &str, fee_id: &str) -> DomainResult<FeeDefinition> {
        let path = fee_definitions_collection(studio_id).doc(fee_id);
        let doc = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| DomainError::EntityNotFound("Fee".to_string(), fee_id.to_string()))?;
        let mut fee: FeeDefinition = doc.decode()?;
        fee.id = doc.id().to_string();
        Ok(fee)
    }

    async fn set_definition_active(&self, studio_id: &str, fee_id: &str, is_active: bool) -> DomainResult<()> {
        let path = fee_definitions_collection(studio_id).doc(fee_id);
        match self.store.update(&path, Self::activation_write(is_active)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(DomainError::EntityNotFound("Fee".to_string(), fee_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_family_fee(
        &self,
        studio_id: &str,
        family_id: &str,
        record: &FamilyFeeRecord,
    ) -> DomainResult<String> {
        let collection = family_fees_collection(studio_id, family_id);
        let path = self.store.insert(&collection, Self::record_write(record)?).await?;
        Ok(path.id().to_string())
    }

    fn supports_atomic_writes(&self) -> bool {
        self.store.supports_transactions()
    }

    async fn insert_family_fees_atomic(
        &self,
        studio_id: &str,
        records: &[(String, FamilyFeeRecord)],
    ) -> DomainResult<Vec<String>> {
        let mut batch = WriteBatch::new();
        for (family_id, record) in records {
            batch.insert(family_fees_collection(studio_id, family_id), Self::record_write(record)?);
        }
        let paths = self.store.commit(batch).await?;
        Ok(paths.iter().map(|p| p.id().to_string()).collect())
    }

    async fn find_family_fees(&self, studio_id: &str, family_id: &str) -> DomainResult<Vec<FamilyFeeRecord>> {
        let docs = self.store.list(&family_fees_collection(studio_id, family_id)).await?;
        docs.iter()
            .map(|doc| Self::map_record(doc).map_err(Into::into))
            .collect()
    }

    async fn find_family_fee_ids_by_fee(
        &self,
        studio_id: &str,
        family_id: &str,
        fee_id: &str,
    ) -> DomainResult<Vec<String>> {
        let docs = self
            .store
            .query(&family_fees_collection(studio_id, family_id), &Filter::equals("FeeId", fee_id))
            .await?;
        Ok(docs.iter().map(|doc| doc.id().to_string()).collect())
    }

    async fn set_family_fee_active(
        &self,
        studio_id: &str,
        family_id: &str,
        record_id: &str,
        is_active: bool,
    ) -> DomainResult<()> {
        let path = family_fees_collection(studio_id, family_id).doc(record_id);
        self.store.update(&path, Self::activation_write(is_active)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryDocumentStore;
    use crate::domains::fee::schedule::build_family_fee_record;
    use crate::domains::fee::types::{AssociationType, PaymentStatus};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_record(fee_id: &str) -> FamilyFeeRecord {
        let fee = FeeDefinition {
            id: fee_id.into(),
            name: "Tuition".into(),
            amount: dec!(300),
            fee_type: Some("Recurring".into()),
            duration: Some(3),
            broken_up_count: Some(3),
            ..Default::default()
        };
        let reference = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        build_family_fee_record(&fee, AssociationType::Family, "fam-1", reference).unwrap()
    }

    #[tokio::test]
    async fn test_record_round_trips_with_store_timestamps() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = StoreFeeRepository::new(store.clone());
        let record = sample_record("fee-1");

        let id = repo.insert_family_fee("s1", "fam-1", &record).await.unwrap();
        let stored = repo.find_family_fees("s1", "fam-1").await.unwrap();
        assert_eq!(stored.len(), 1);

        let loaded = &stored[0];
        assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
        assert!(loaded.created_at.is_some());
        assert!(loaded.last_updated.is_some());
        assert_eq!(loaded.schedule, record.schedule);
        assert_eq!(loaded.entire_fee_amount, dec!(300));

        let raw = store.get(&family_fees_collection("s1", "fam-1").doc(&id)).await.unwrap().unwrap();
        assert_eq!(raw.field("Type"), Some(&json!("Recurring")));
        assert_eq!(raw.field("FeeEndDate"), Some(&json!(null)));
        assert_eq!(raw.data["Schedule"][0]["Status"], json!("Unpaid"));
        assert_eq!(raw.data["Schedule"][0]["Month"], json!("September 2025"));
    }

    #[tokio::test]
    async fn test_definition_lookup_and_activation() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .put(
                &fee_definitions_collection("s1").doc("fee-1"),
                json!({"Name": "Registration", "Amount": "25", "Type": "OneTime", "IsActive": true}),
            )
            .await
            .unwrap();
        let repo = StoreFeeRepository::new(store.clone());

        let fee = repo.find_definition("s1", "fee-1").await.unwrap();
        assert_eq!(fee.id, "fee-1");
        assert_eq!(fee.amount, dec!(25));

        repo.set_definition_active("s1", "fee-1", false).await.unwrap();
        assert!(!repo.find_definition("s1", "fee-1").await.unwrap().is_active);

        assert!(matches!(
            repo.find_definition("s1", "nope").await,
            Err(DomainError::EntityNotFound(_, _))
        ));
        assert!(matches!(
            repo.set_definition_active("s1", "nope", true).await,
            Err(DomainError::EntityNotFound(_, _))
        ));
    }

    #[tokio::test]
    async fn test_atomic_insert_and_fee_filter() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = StoreFeeRepository::new(store);
        assert!(repo.supports_atomic_writes());

        let records = vec![
            ("fam-1".to_string(), sample_record("fee-1")),
            ("fam-1".to_string(), sample_record("fee-2")),
            ("fam-2".to_string(), sample_record("fee-1")),
        ];
        let ids = repo.insert_family_fees_atomic("s1", &records).await.unwrap();
        assert_eq!(ids.len(), 3);

        let fee_1 = repo.find_family_fee_ids_by_fee("s1", "fam-1", "fee-1").await.unwrap();
        assert_eq!(fee_1, vec![ids[0].clone()]);

        repo.set_family_fee_active("s1", "fam-1", &ids[0], false).await.unwrap();
        let all = repo.find_family_fees("s1", "fam-1").await.unwrap();
        assert_eq!(all.iter().filter(|r| !r.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_fee_id_lookup_ignores_record_shape() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .put(
                &family_fees_collection("s1", "fam-1").doc("legacy"),
                json!({"FeeId": "fee-1", "IsActive": true, "Schedule": [{"Status": "Partial"}]}),
            )
            .await
            .unwrap();
        store
            .put(
                &family_fees_collection("s1", "fam-1").doc("other"),
                json!({"FeeId": "fee-2", "IsActive": true}),
            )
            .await
            .unwrap();
        let repo = StoreFeeRepository::new(store);

        let ids = repo.find_family_fee_ids_by_fee("s1", "fam-1", "fee-1").await.unwrap();
        assert_eq!(ids, vec!["legacy".to_string()]);
        repo.set_family_fee_active("s1", "fam-1", "legacy", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_paid_installments_decode() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let repo = StoreFeeRepository::new(store.clone());
        let id = repo.insert_family_fee("s1", "fam-1", &sample_record("fee-1")).await.unwrap();
        let path = family_fees_collection("s1", "fam-1").doc(&id);
        let mut doc = store.get(&path).await.unwrap().unwrap();
        doc.data["Schedule"][0]["Status"] = json!("Paid");
        store.put(&path, serde_json::Value::Object(doc.data)).await.unwrap();

        let records = repo.find_family_fees("s1", "fam-1").await.unwrap();
        assert_eq!(records[0].schedule[0].status, PaymentStatus::Paid);
        assert_eq!(records[0].schedule[1].status, PaymentStatus::Unpaid);
    }
}
