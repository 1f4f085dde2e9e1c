use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeType {
    OneTime,
    Recurring,
}

impl FeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::OneTime => "OneTime",
            FeeType::Recurring => "Recurring",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OneTime" => Some(FeeType::OneTime),
            "Recurring" => Some(FeeType::Recurring),
            _ => None,
        }
    }

    pub fn all_variants() -> Vec<&'static str> {
        vec!["OneTime", "Recurring"]
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The entity a fee is attached to, which decides the billed families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationType {
    Season,
    Class,
    Family,
    Student,
}

impl AssociationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationType::Season => "Season",
            AssociationType::Class => "Class",
            AssociationType::Family => "Family",
            AssociationType::Student => "Student",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Season" => Some(AssociationType::Season),
            "Class" => Some(AssociationType::Class),
            "Family" => Some(AssociationType::Family),
            "Student" => Some(AssociationType::Student),
            _ => None,
        }
    }

    /// Parse, failing with `InvalidAssociation` on anything unrecognised.
    pub fn parse(s: &str) -> DomainResult<Self> {
        Self::from_str(s).ok_or_else(|| DomainError::InvalidAssociation(s.to_string()))
    }
}

impl fmt::Display for AssociationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// Canonical fee definition, `Studios/{studio}/Fees/{id}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeeDefinition {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    /// Total per period before it is split into `broken_up_count` installments
    pub amount: Decimal,
    /// Raw type string as stored; `None` means one-time
    #[serde(rename = "Type", default)]
    pub fee_type: Option<String>,
    /// Months to bill a recurring fee for; unset or zero means 12
    #[serde(default)]
    pub duration: Option<u32>,
    /// Installments the amount is divided into; unset or zero means 1
    #[serde(default)]
    pub broken_up_count: Option<u32>,
    #[serde(default)]
    pub has_end_date: bool,
    #[serde(default)]
    pub fee_end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl FeeDefinition {
    // Helper to parse the fee type, defaulting to one-time when absent
    pub fn parsed_type(&self) -> Option<FeeType> {
        match &self.fee_type {
            None => Some(FeeType::OneTime),
            Some(s) => FeeType::from_str(s),
        }
    }

    // End date only counts when the flag is set
    pub fn effective_end_date(&self) -> Option<NaiveDate> {
        if self.has_end_date {
            self.fee_end_date
        } else {
            None
        }
    }
}

impl Validate for FeeDefinition {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("Amount", Some(self.amount))
            .greater_than(Decimal::ZERO)
            .finish()
            .map_err(DomainError::InvalidFee)?;

        if let Some(fee_type) = &self.fee_type {
            let allowed = FeeType::all_variants();
            ValidationBuilder::new("Type", Some(fee_type.clone()))
                .one_of(&allowed, Some("must be OneTime or Recurring"))
                .finish()
                .map_err(DomainError::InvalidFee)?;
        }

        Ok(())
    }
}

/// One installment of a family's payment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScheduleEntry {
    /// "<MonthName> <Year>" of the due date
    pub month: String,
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: PaymentStatus,
}

/// Per-family copy of a fee definition, `Studios/{studio}/Families/{family}/Fees/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FamilyFeeRecord {
    #[serde(skip)]
    pub id: Option<String>,
    pub name: String,
    pub amount: Decimal,
    #[serde(rename = "Type")]
    pub fee_type: FeeType,
    pub is_recurring: bool,
    /// Stamped by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub fee_id: String,
    pub association_type: AssociationType,
    pub association_id: String,
    pub is_active: bool,
    pub has_end_date: bool,
    pub fee_end_date: Option<NaiveDate>,
    pub entire_fee_amount: Decimal,
    /// Effective months; absent for one-time fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub schedule: Vec<ScheduleEntry>,
}

impl FamilyFeeRecord {
    /// Sum of the installments actually scheduled.
    pub fn scheduled_total(&self) -> Decimal {
        self.schedule.iter().map(|entry| entry.amount).sum()
    }

    /// True when end-date clipping left fewer entries than the declared duration.
    pub fn is_schedule_clipped(&self) -> bool {
        match (self.fee_type, self.duration) {
            (FeeType::Recurring, Some(months)) => self.schedule.len() < months as usize,
            _ => false,
        }
    }
}

/// A family affected by an association; transient, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyRef {
    pub family_id: String,
}

impl FamilyRef {
    pub fn new(family_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
        }
    }
}

/// Outcome of a fee distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub fee_id: String,
    pub association_type: AssociationType,
    pub association_id: String,
    /// Families billed, in the order they were written
    pub family_ids: Vec<String>,
    /// Whether all records went out in a single transactional commit
    pub atomic: bool,
}

/// Outcome of an activation change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationSummary {
    pub fee_id: String,
    pub is_active: bool,
    pub families_scanned: usize,
    pub records_updated: usize,
}

/// Validation error for an unknown fee type, shared by the generator
pub(crate) fn unknown_fee_type(raw: &str) -> DomainError {
    DomainError::InvalidFee(ValidationError::invalid_value(
        "Type",
        &format!("unknown fee type '{}'", raw),
    ))
}
