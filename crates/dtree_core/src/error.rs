//! Error types for structured error handling.
//!
//! This module provides `ModelError`, raised when a variable declaration is
//! rejected at registration time. Errors from tree expansion and evaluation
//! live in `dtree_engine`, next to the code that raises them.

use thiserror::Error;

use crate::registry::Kind;

/// Registration-time model errors.
///
/// Every variant is raised synchronously by the [`crate::registry::Registry`]
/// mutators, before any tree is built from the declarations.
///
/// # Examples
/// ```
/// use dtree_core::error::ModelError;
///
/// let err = ModelError::EmptyBranches {
///     variable: "bid".to_string(),
/// };
/// assert_eq!(
///     format!("{}", err),
///     "Variable bid has an empty branch list"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A decision or chance variable was declared without branches.
    #[error("Variable {variable} has an empty branch list")]
    EmptyBranches {
        /// Name of the offending variable.
        variable: String,
    },

    /// A chance branch was declared without a probability.
    #[error("Branch #{index} of variable {variable} has no probability")]
    MissingProbability {
        /// Name of the offending variable.
        variable: String,
        /// Zero-based position of the branch.
        index: usize,
    },

    /// Chance probabilities do not sum to one under strict mode.
    #[error("Probabilities of variable {variable} sum to {sum}, expected 1")]
    ProbabilitySum {
        /// Name of the offending variable.
        variable: String,
        /// Actual probability sum.
        sum: f64,
    },

    /// Chance probabilities sum to zero, so normalisation is impossible.
    #[error("Probabilities of variable {variable} sum to zero and cannot be normalised")]
    ZeroProbabilityMass {
        /// Name of the offending variable.
        variable: String,
    },

    /// A variable name was not found in the registry.
    #[error("Variable {variable} is not registered")]
    UnknownVariable {
        /// The missing variable name.
        variable: String,
    },

    /// A forced-branch index is outside the declared branch list.
    #[error("Forced branch {index} of variable {variable} is out of range (got {count} branches)")]
    ForcedBranchOutOfRange {
        /// Name of the offending variable.
        variable: String,
        /// Requested branch index.
        index: usize,
        /// Number of declared branches.
        count: usize,
    },

    /// An operation expected a variable of a different kind.
    #[error("Variable {variable} is a {kind} node, expected {expected}")]
    KindMismatch {
        /// Name of the offending variable.
        variable: String,
        /// Actual kind.
        kind: Kind,
        /// Kind required by the operation.
        expected: Kind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_branches_display() {
        let err = ModelError::EmptyBranches {
            variable: "bid".to_string(),
        };
        assert_eq!(format!("{}", err), "Variable bid has an empty branch list");
    }

    #[test]
    fn test_probability_sum_display() {
        let err = ModelError::ProbabilitySum {
            variable: "cost".to_string(),
            sum: 0.9,
        };
        assert_eq!(
            format!("{}", err),
            "Probabilities of variable cost sum to 0.9, expected 1"
        );
    }

    #[test]
    fn test_forced_branch_out_of_range_display() {
        let err = ModelError::ForcedBranchOutOfRange {
            variable: "cost".to_string(),
            index: 5,
            count: 3,
        };
        assert_eq!(
            format!("{}", err),
            "Forced branch 5 of variable cost is out of range (got 3 branches)"
        );
    }

    #[test]
    fn test_kind_mismatch_display() {
        let err = ModelError::KindMismatch {
            variable: "bid".to_string(),
            kind: Kind::Decision,
            expected: Kind::Chance,
        };
        assert_eq!(
            format!("{}", err),
            "Variable bid is a DECISION node, expected CHANCE"
        );
    }

    #[test]
    fn test_error_trait_implementation() {
        let err = ModelError::UnknownVariable {
            variable: "x".to_string(),
        };
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_clone_and_equality() {
        let err1 = ModelError::ZeroProbabilityMass {
            variable: "cost".to_string(),
        };
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
