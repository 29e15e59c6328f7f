//! Error types for packing operations.
//!
//! This module defines the [`PackingError`] enum shared by every crate in the
//! packing workspace.

use thiserror::Error;

/// Result type for packing operations.
pub type PackingResult<T> = Result<T, PackingError>;

/// Errors that can occur while building or evaluating a packing problem.
///
/// # Example
///
/// ```
/// use packing_types::PackingError;
///
/// let error = PackingError::validation("design vector has 2 entries, expected 3");
/// assert!(error.is_validation());
/// assert!(error.to_string().contains("design vector"));
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackingError {
    /// Malformed input: mismatched shapes, bad radii, unknown tokens.
    ///
    /// Raised immediately at construction or at the evaluation entry point.
    #[error("validation error: {0}")]
    Validation(String),

    /// A geometric degeneracy with no well-defined fallback.
    ///
    /// Recoverable degeneracies (zero-length segments, coincident points) are
    /// handled locally and never surface as this error.
    #[error("geometry degeneracy: {0}")]
    GeometryDegeneracy(String),

    /// Inconsistent mesh, bounds or resolution parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A text record could not be parsed.
    #[error("invalid content at line {line}: {message}")]
    InvalidContent {
        /// 1-based line number of the offending record.
        line: usize,
        /// Description of what was invalid.
        message: String,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackingError {
    /// Create a [`PackingError::Validation`] error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a [`PackingError::GeometryDegeneracy`] error.
    #[must_use]
    pub fn degeneracy(message: impl Into<String>) -> Self {
        Self::GeometryDegeneracy(message.into())
    }

    /// Create a [`PackingError::Configuration`] error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a [`PackingError::InvalidContent`] error.
    #[must_use]
    pub fn invalid_content(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidContent {
            line,
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns `true` if this is a geometry degeneracy error.
    #[must_use]
    pub const fn is_degeneracy(&self) -> bool {
        matches!(self, Self::GeometryDegeneracy(_))
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Returns a degeneracy error if `value` is NaN or infinite.
///
/// # Errors
///
/// Returns [`PackingError::GeometryDegeneracy`] naming `context`.
pub fn ensure_finite(value: f64, context: &str) -> PackingResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PackingError::degeneracy(format!(
            "{context} evaluated to a non-finite value ({value})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(PackingError::validation("x").is_validation());
        assert!(PackingError::degeneracy("x").is_degeneracy());
        assert!(PackingError::configuration("x").is_configuration());
        assert!(!PackingError::configuration("x").is_validation());
    }

    #[test]
    fn test_invalid_content_display() {
        let error = PackingError::invalid_content(7, "expected 4 fields");
        let text = error.to_string();
        assert!(text.contains("line 7"));
        assert!(text.contains("expected 4 fields"));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(1.5, "gap").is_ok());
        let err = ensure_finite(f64::NAN, "gap").unwrap_err();
        assert!(err.is_degeneracy());
        assert!(err.to_string().contains("gap"));
        assert!(ensure_finite(f64::INFINITY, "volume").is_err());
    }
}
