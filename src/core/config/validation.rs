//! Validation helper functions for configuration types.

use crate::core::errors::{Result, TrellisError};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(TrellisError::validation(format!(
            "{} must be greater than 0",
            field
        )));
    }
    Ok(())
}

/// Validate that a usize value lies within an inclusive range.
pub fn validate_usize_range(value: usize, min: usize, max: usize, field: &str) -> Result<()> {
    if value < min || value > max {
        return Err(TrellisError::validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}
