// Settings validation

use crate::{ConfigError, Result};

/// Semantic checks run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable validation rules.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    pub fn non_empty_list<T>(values: &[T], field: &str) -> Result<()> {
        if values.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} must list at least one entry",
                field
            )));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + std::fmt::Debug>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be one of {:?}, got {:?}",
                field, allowed, value
            )));
        }
        Ok(())
    }

    /// Every entry appears once.
    pub fn unique<T: PartialEq + std::fmt::Debug>(values: &[T], field: &str) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            if values[..i].contains(value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} lists {:?} more than once",
                    field, value
                )));
            }
        }
        Ok(())
    }
}
