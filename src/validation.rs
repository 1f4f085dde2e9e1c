use crate::errors::{DomainError, DomainResult, ValidationError};
use regex::Regex;
use std::sync::OnceLock;

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Document ids become path segments, so they may not contain a separator or whitespace
fn document_id_regex() -> &'static Regex {
    static DOCUMENT_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    DOCUMENT_ID_REGEX.get_or_init(|| Regex::new(r"^[^/\s]{1,1500}$").expect("static regex"))
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where T: Default + PartialEq {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    /// Complete validation, returning the first collected error.
    pub fn finish(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        self.finish().map_err(DomainError::Validation)
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn document_id(self) -> Self {
        self.matches_pattern(document_id_regex(), "must be a non-empty id without '/' or whitespace")
    }

    pub fn one_of(mut self, allowed_values: &[&str], message: Option<&str>) -> Self {
        if let Some(value) = &self.value {
            if !allowed_values.contains(&value.as_str()) {
                let reason = message.unwrap_or("must be one of the allowed values");
                self.errors.push(ValidationError::invalid_value(&self.field_name, reason));
            }
        }
        self
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + Clone + std::fmt::Display
{
    /// Strictly greater than `bound`.
    pub fn greater_than(mut self, bound: T) -> Self {
        if let Some(value) = &self.value {
            if value <= &bound {
                self.errors.push(ValidationError::invalid_value(
                    &self.field_name,
                    &format!("must be greater than {}", bound)
                ));
            }
        }
        self
    }
}

/// Checks an identifier that will be used as a store path segment.
pub fn validate_document_id(field: &str, value: &str) -> DomainResult<()> {
    ValidationBuilder::new(field, Some(value.to_string()))
        .required()
        .document_id()
        .validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_validation() {
        assert!(document_id_regex().is_match("studio-42"));
        assert!(document_id_regex().is_match("aZ09_x.y"));
        assert!(!document_id_regex().is_match(""));
        assert!(!document_id_regex().is_match("a/b"));
        assert!(!document_id_regex().is_match("has space"));

        assert!(validate_document_id("studio_id", "s1").is_ok());
        assert!(matches!(
            validate_document_id("studio_id", ""),
            Err(DomainError::Validation(ValidationError::Required { .. }))
        ));
        assert!(matches!(
            validate_document_id("family_id", "Families/f1"),
            Err(DomainError::Validation(ValidationError::Format { .. }))
        ));
    }

    #[test]
    fn test_validation_builder() {
        let result = ValidationBuilder::new("Name", Some("".to_string()))
            .required()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("Type", Some("Weekly".to_string()))
            .one_of(&["OneTime", "Recurring"], Some("unknown fee type"))
            .finish();
        assert!(matches!(result, Err(ValidationError::InvalidValue { .. })));

        assert!(ValidationBuilder::new("Amount", Some(0)).greater_than(0).finish().is_err());
        assert!(ValidationBuilder::new("Amount", Some(5)).greater_than(0).finish().is_ok());
        // Absent optional values are not checked
        assert!(ValidationBuilder::<i32>::new("Duration", None).greater_than(0).finish().is_ok());
    }
}
