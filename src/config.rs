use crate::domains::fee::schedule::{ClippedTotalPolicy, ScheduleOptions};
use crate::errors::{ServiceError, ServiceResult};
use std::env;
use std::str::FromStr;

pub const ENV_DEFAULT_DURATION_MONTHS: &str = "STUDIO_FEES_DEFAULT_DURATION_MONTHS";
pub const ENV_DEFAULT_BROKEN_UP_COUNT: &str = "STUDIO_FEES_DEFAULT_BROKEN_UP_COUNT";
pub const ENV_CLIPPED_TOTAL: &str = "STUDIO_FEES_CLIPPED_TOTAL";
pub const ENV_ATOMIC_DISTRIBUTION: &str = "STUDIO_FEES_ATOMIC_DISTRIBUTION";

/// Runtime settings of the fee services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeesConfig {
    pub schedule: ScheduleOptions,
    /// Write all of a distribution's records in one transactional commit when the store
    /// supports it
    pub atomic_distribution: bool,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleOptions::default(),
            atomic_distribution: true,
        }
    }
}

impl FeesConfig {
    /// Defaults overridden by `STUDIO_FEES_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> ServiceResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(months) = parse_var::<u32>(&lookup, ENV_DEFAULT_DURATION_MONTHS)? {
            config.schedule.default_duration_months = positive(ENV_DEFAULT_DURATION_MONTHS, months)?;
        }
        if let Some(count) = parse_var::<u32>(&lookup, ENV_DEFAULT_BROKEN_UP_COUNT)? {
            config.schedule.default_broken_up_count = positive(ENV_DEFAULT_BROKEN_UP_COUNT, count)?;
        }
        if let Some(raw) = lookup(ENV_CLIPPED_TOTAL) {
            config.schedule.clipped_total = ClippedTotalPolicy::from_str(raw.trim()).ok_or_else(|| {
                ServiceError::Configuration(format!(
                    "{} must be 'declared' or 'scheduled', got '{}'",
                    ENV_CLIPPED_TOTAL, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_ATOMIC_DISTRIBUTION) {
            config.atomic_distribution = parse_flag(ENV_ATOMIC_DISTRIBUTION, &raw)?;
        }

        log::debug!("Loaded fees config: {:?}", config);
        Ok(config)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ServiceResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ServiceError::Configuration(format!("{} has an invalid value '{}'", key, raw))),
    }
}

fn positive(key: &str, value: u32) -> ServiceResult<u32> {
    if value == 0 {
        Err(ServiceError::Configuration(format!("{} must be at least 1", key)))
    } else {
        Ok(value)
    }
}

fn parse_flag(key: &str, raw: &str) -> ServiceResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ServiceError::Configuration(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = FeesConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FeesConfig::default());
        assert_eq!(config.schedule.default_duration_months, 12);
        assert_eq!(config.schedule.default_broken_up_count, 1);
        assert_eq!(config.schedule.clipped_total, ClippedTotalPolicy::Declared);
        assert!(config.atomic_distribution);
    }

    #[test]
    fn test_overrides() {
        let config = FeesConfig::from_lookup(lookup(&[
            (ENV_DEFAULT_DURATION_MONTHS, "10"),
            (ENV_DEFAULT_BROKEN_UP_COUNT, " 2 "),
            (ENV_CLIPPED_TOTAL, "Scheduled"),
            (ENV_ATOMIC_DISTRIBUTION, "off"),
        ]))
        .unwrap();
        assert_eq!(config.schedule.default_duration_months, 10);
        assert_eq!(config.schedule.default_broken_up_count, 2);
        assert_eq!(config.schedule.clipped_total, ClippedTotalPolicy::Scheduled);
        assert!(!config.atomic_distribution);
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for vars in [
            [(ENV_DEFAULT_DURATION_MONTHS, "twelve")],
            [(ENV_DEFAULT_DURATION_MONTHS, "0")],
            [(ENV_CLIPPED_TOTAL, "sometimes")],
            [(ENV_ATOMIC_DISTRIBUTION, "maybe")],
        ] {
            assert!(matches!(
                FeesConfig::from_lookup(lookup(&vars)),
                Err(ServiceError::Configuration(_))
            ));
        }
    }
}
