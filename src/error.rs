//! Error types for the replenishment engine.

/// Error type for all fallible operations in the engine.
///
/// Every variant carries a human-readable description so that batch drivers
/// can record per-item failures without holding on to the inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplenishError {
    /// Returned when an input value is malformed or out of range.
    #[error("validation failed: {reason}")]
    Validation {
        /// Description of the rejected input.
        reason: String,
    },

    /// Returned when a required service-level or vendor setting is absent.
    #[error("missing configuration: {what}")]
    ConfigurationMissing {
        /// Name of the missing setting.
        what: String,
    },

    /// Returned when a numerically degenerate case cannot be resolved.
    #[error("computation failed: {reason}")]
    Computation {
        /// Description of the degenerate case.
        reason: String,
    },

    /// Returned by repository implementations at the batch boundary.
    #[error("persistence failed: {reason}")]
    Persistence {
        /// Description of the storage failure.
        reason: String,
    },
}

impl ReplenishError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::ConfigurationMissing { what: what.into() }
    }

    pub(crate) fn computation(reason: impl Into<String>) -> Self {
        Self::Computation {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReplenishError>;

/// Rejects NaN and infinite inputs.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ReplenishError::validation(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

/// Rejects non-finite and negative inputs.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    ensure_finite(name, value)?;
    if value < 0.0 {
        return Err(ReplenishError::validation(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    Ok(())
}

/// Rejects non-finite, zero and negative inputs.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<()> {
    ensure_finite(name, value)?;
    if value <= 0.0 {
        return Err(ReplenishError::validation(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(())
}
