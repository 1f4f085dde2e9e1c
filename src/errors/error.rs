use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Document store errors
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Multi-document transactions are not supported by this store")]
    TransactionsUnsupported,

    #[error("Transaction aborted: {0}")]
    Transaction(String),

    #[error("Failed to encode or decode document {path}: {reason}")]
    Serialization {
        path: String,
        reason: String,
    },
}

impl StoreError {
    pub fn serialization(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Serialization {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl serde::Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let kind = match self {
            StoreError::Unavailable(_) => "Unavailable",
            StoreError::NotFound(_) => "NotFound",
            StoreError::TransactionsUnsupported => "TransactionsUnsupported",
            StoreError::Transaction(_) => "Transaction",
            StoreError::Serialization { .. } => "Serialization",
        };
        let mut state = serializer.serialize_struct("StoreError", 2)?;
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid association type: {0}")]
    InvalidAssociation(String),

    #[error("Entity not found: {0} with ID {1}")]
    EntityNotFound(String, String),

    #[error("Invalid fee: {0}")]
    InvalidFee(ValidationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// True only for transient store failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Store(StoreError::Unavailable(_)))
    }
}

/// Service-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error(
        "Fee distribution stopped at family {failed_family_id} after billing {} famil(ies): {source}",
        .billed_family_ids.len()
    )]
    PartialDistribution {
        billed_family_ids: Vec<String>,
        failed_family_id: String,
        source: DomainError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Domain(err) => err.is_retryable(),
            ServiceError::PartialDistribution { source, .. } => source.is_retryable(),
            ServiceError::Configuration(_) => false,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        ServiceError::Domain(DomainError::Store(error))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        ServiceError::Domain(DomainError::Validation(error))
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
