// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Workspace-wide error taxonomy.
///
/// Structural and validation failures are fatal to the requested operation
/// and must leave prior state untouched. Non-convergence of a fit is not an
/// error: it is surfaced as a flagged result by the estimator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EpiError {
    /// A model was given an out-of-range parameter or invalid population.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A phase edit would violate contiguity, ordering, or coverage.
    #[error("registry consistency violation: {0}")]
    RegistryConsistency(String),

    /// Regression was attempted with fewer than two historical phases.
    #[error("insufficient history: {0}")]
    InsufficientHistory(String),

    /// A log-based metric was requested on negative values.
    #[error("metric domain violation: {0}")]
    MetricDomain(String),

    /// Malformed input outside the more specific categories above.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A computation produced a non-finite or otherwise unusable value.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl EpiError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn registry_consistency(msg: impl Into<String>) -> Self {
        Self::RegistryConsistency(msg.into())
    }

    pub fn insufficient_history(msg: impl Into<String>) -> Self {
        Self::InsufficientHistory(msg.into())
    }

    pub fn metric_domain(msg: impl Into<String>) -> Self {
        Self::MetricDomain(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::EpiError;

    #[test]
    fn display_includes_category_and_message() {
        let err = EpiError::invalid_input("n must be >= 1");
        assert_eq!(err.to_string(), "invalid input: n must be >= 1");

        let err = EpiError::registry_consistency("gap between phases 1 and 2");
        assert!(err.to_string().starts_with("registry consistency violation"));
    }

    #[test]
    fn variants_are_comparable_for_atomicity_tests() {
        let a = EpiError::metric_domain("negative value at index 3");
        let b = EpiError::metric_domain("negative value at index 3");
        assert_eq!(a, b);
        assert_ne!(a, EpiError::invalid_input("negative value at index 3"));
    }
}
