use crate::config::FeesConfig;
use crate::database::DocumentStore;
use crate::domains::fee::repository::{FeeRepository, StoreFeeRepository};
use crate::domains::fee::resolver::FamilyResolver;
use crate::domains::fee::schedule::build_family_fee_record_with;
use crate::domains::fee::types::{
    ActivationSummary, AssociationType, DistributionSummary, FamilyFeeRecord, FamilyRef, FeeDefinition,
};
use crate::domains::roster::repository::{
    FamilyRepository, StoreClassRepository, StoreFamilyRepository, StoreStudentRepository,
};
use crate::errors::{DomainError, ServiceError, ServiceResult, ValidationError};
use crate::validation::{validate_document_id, Validate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Trait defining fee service operations
#[async_trait]
pub trait FeeService: Send + Sync {
    /// Distinct families billed by an association.
    async fn resolve_families(
        &self,
        studio_id: &str,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<Vec<FamilyRef>>;

    /// Materialize `fee` for every family of the association, dated now.
    async fn add_fee_to_families(
        &self,
        studio_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<DistributionSummary>;

    /// Same as `add_fee_to_families` with an explicit reference date.
    async fn add_fee_to_families_at(
        &self,
        studio_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
        reference_date: DateTime<Utc>,
    ) -> ServiceResult<DistributionSummary>;

    /// Load the canonical definition `fee_id` and distribute it.
    async fn add_stored_fee_to_families(
        &self,
        studio_id: &str,
        fee_id: &str,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<DistributionSummary>;

    /// Materialize `fee` for a single family.
    async fn add_fee_to_family(
        &self,
        studio_id: &str,
        family_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<FamilyFeeRecord>;

    /// Flip IsActive on the definition and on every record materialized from it.
    async fn update_fee_activation(
        &self,
        studio_id: &str,
        fee_id: &str,
        is_active: bool,
    ) -> ServiceResult<ActivationSummary>;

    async fn list_family_fees(&self, studio_id: &str, family_id: &str) -> ServiceResult<Vec<FamilyFeeRecord>>;
}

/// Implementation of the fee service
#[derive(Clone)]
pub struct FeeServiceImpl {
    fee_repo: Arc<dyn FeeRepository>,
    family_repo: Arc<dyn FamilyRepository>,
    resolver: FamilyResolver,
    config: FeesConfig,
}

impl FeeServiceImpl {
    pub fn new(
        fee_repo: Arc<dyn FeeRepository>,
        family_repo: Arc<dyn FamilyRepository>,
        resolver: FamilyResolver,
        config: FeesConfig,
    ) -> Self {
        Self {
            fee_repo,
            family_repo,
            resolver,
            config,
        }
    }

    /// Wire every repository against one document store.
    pub fn with_store(store: Arc<dyn DocumentStore>, config: FeesConfig) -> Self {
        let resolver = FamilyResolver::new(
            Arc::new(StoreStudentRepository::new(store.clone())),
            Arc::new(StoreClassRepository::new(store.clone())),
        );
        Self::new(
            Arc::new(StoreFeeRepository::new(store.clone())),
            Arc::new(StoreFamilyRepository::new(store)),
            resolver,
            config,
        )
    }

    pub fn config(&self) -> &FeesConfig {
        &self.config
    }

    fn validate_fee(fee: &FeeDefinition) -> ServiceResult<()> {
        if fee.id.trim().is_empty() {
            return Err(DomainError::InvalidFee(ValidationError::required("id")).into());
        }
        fee.validate()?;
        Ok(())
    }

    fn build(
        &self,
        fee: &FeeDefinition,
        association_type: AssociationType,
        association_id: &str,
        reference_date: DateTime<Utc>,
    ) -> ServiceResult<FamilyFeeRecord> {
        Ok(build_family_fee_record_with(
            fee,
            association_type,
            association_id,
            reference_date,
            &self.config.schedule,
        )?)
    }

    /// One insert per family, in order. Nothing already written is undone on failure.
    async fn write_sequentially(
        &self,
        studio_id: &str,
        fee_id: &str,
        records: Vec<(String, FamilyFeeRecord)>,
    ) -> ServiceResult<Vec<String>> {
        let mut billed = Vec::with_capacity(records.len());
        for (family_id, record) in records {
            match self.fee_repo.insert_family_fee(studio_id, &family_id, &record).await {
                Ok(_) => billed.push(family_id),
                Err(source) => {
                    log::warn!(
                        "Fee {} distribution failed at family {} after {} famil(ies): {}",
                        fee_id,
                        family_id,
                        billed.len(),
                        source
                    );
                    if billed.is_empty() {
                        return Err(source.into());
                    }
                    return Err(ServiceError::PartialDistribution {
                        billed_family_ids: billed,
                        failed_family_id: family_id,
                        source,
                    });
                }
            }
        }
        Ok(billed)
    }
}

#[async_trait]
impl FeeService for FeeServiceImpl {
    async fn resolve_families(
        &self,
        studio_id: &str,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<Vec<FamilyRef>> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("association_id", association_id)?;
        Ok(self
            .resolver
            .resolve_families(studio_id, association_type, association_id)
            .await?)
    }

    async fn add_fee_to_families(
        &self,
        studio_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<DistributionSummary> {
        self.add_fee_to_families_at(studio_id, fee, association_type, association_id, Utc::now())
            .await
    }

    async fn add_fee_to_families_at(
        &self,
        studio_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
        reference_date: DateTime<Utc>,
    ) -> ServiceResult<DistributionSummary> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("association_id", association_id)?;
        Self::validate_fee(fee)?;
        let association = AssociationType::parse(association_type)?;

        let families = self.resolver.resolve(studio_id, association, association_id).await?;
        // Family ids read from student documents become path segments too
        for family in &families {
            validate_document_id("FamilyId", &family.family_id)?;
        }

        // Build everything up front so a malformed fee never leaves a partial distribution.
        let records = families
            .into_iter()
            .map(|family| {
                self.build(fee, association, association_id, reference_date)
                    .map(|record| (family.family_id, record))
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let mut summary = DistributionSummary {
            fee_id: fee.id.clone(),
            association_type: association,
            association_id: association_id.to_string(),
            family_ids: Vec::new(),
            atomic: false,
        };

        if records.is_empty() {
            log::info!(
                "Fee {} matched no families for {} {} in studio {}",
                fee.id,
                association,
                association_id,
                studio_id
            );
            return Ok(summary);
        }

        if self.config.atomic_distribution && self.fee_repo.supports_atomic_writes() {
            self.fee_repo.insert_family_fees_atomic(studio_id, &records).await?;
            summary.family_ids = records.into_iter().map(|(family_id, _)| family_id).collect();
            summary.atomic = true;
        } else {
            summary.family_ids = self.write_sequentially(studio_id, &fee.id, records).await?;
        }

        log::info!(
            "Fee {} added to {} famil(ies) for {} {} in studio {} (atomic: {})",
            fee.id,
            summary.family_ids.len(),
            association,
            association_id,
            studio_id,
            summary.atomic
        );
        Ok(summary)
    }

    async fn add_stored_fee_to_families(
        &self,
        studio_id: &str,
        fee_id: &str,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<DistributionSummary> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("fee_id", fee_id)?;
        let fee = self.fee_repo.find_definition(studio_id, fee_id).await?;
        self.add_fee_to_families(studio_id, &fee, association_type, association_id)
            .await
    }

    async fn add_fee_to_family(
        &self,
        studio_id: &str,
        family_id: &str,
        fee: &FeeDefinition,
        association_type: &str,
        association_id: &str,
    ) -> ServiceResult<FamilyFeeRecord> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("family_id", family_id)?;
        validate_document_id("association_id", association_id)?;
        Self::validate_fee(fee)?;
        let association = AssociationType::parse(association_type)?;

        let mut record = self.build(fee, association, association_id, Utc::now())?;
        let id = self.fee_repo.insert_family_fee(studio_id, family_id, &record).await?;
        record.id = Some(id);
        log::info!("Fee {} added to family {} in studio {}", fee.id, family_id, studio_id);
        Ok(record)
    }

    async fn update_fee_activation(
        &self,
        studio_id: &str,
        fee_id: &str,
        is_active: bool,
    ) -> ServiceResult<ActivationSummary> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("fee_id", fee_id)?;

        self.fee_repo.set_definition_active(studio_id, fee_id, is_active).await?;

        let families = self.family_repo.find_all(studio_id).await?;
        let mut summary = ActivationSummary {
            fee_id: fee_id.to_string(),
            is_active,
            families_scanned: families.len(),
            records_updated: 0,
        };

        for family in &families {
            let record_ids = self
                .fee_repo
                .find_family_fee_ids_by_fee(studio_id, &family.id, fee_id)
                .await?;
            for record_id in record_ids {
                self.fee_repo
                    .set_family_fee_active(studio_id, &family.id, &record_id, is_active)
                    .await?;
                summary.records_updated += 1;
            }
        }

        log::info!(
            "Fee {} set active={} on {} record(s) across {} famil(ies) in studio {}",
            fee_id,
            is_active,
            summary.records_updated,
            summary.families_scanned,
            studio_id
        );
        Ok(summary)
    }

    async fn list_family_fees(&self, studio_id: &str, family_id: &str) -> ServiceResult<Vec<FamilyFeeRecord>> {
        validate_document_id("studio_id", studio_id)?;
        validate_document_id("family_id", family_id)?;
        Ok(self.fee_repo.find_family_fees(studio_id, family_id).await?)
    }
}
