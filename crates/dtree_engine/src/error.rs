//! Error types for tree expansion, pipeline ordering, and sweeps.

use dtree_core::registry::Kind;
use dtree_core::ModelError;
use thiserror::Error;

/// Errors raised while expanding the registry into a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// A branch names a successor variable absent from the registry.
    #[error("Variable {variable} referenced by {referenced_by} is not registered")]
    UnknownVariable {
        /// The missing variable name.
        variable: String,
        /// The variable whose branch referenced it ("root" for the root).
        referenced_by: String,
    },
}

/// Errors raised by pipeline entry points on an already-built tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Rollback was requested before `evaluate` populated terminal values.
    #[error("Tree has not been evaluated; call evaluate() before rollback()")]
    NotEvaluated,

    /// Risk profiles were requested before rollback chose a strategy.
    #[error("Tree has not been rolled back; call rollback() before risk_profile()")]
    NotRolledBack,

    /// A node index is outside the tree.
    #[error("Node index {index} is out of range (tree has {count} nodes)")]
    NodeOutOfRange {
        /// Requested node index.
        index: usize,
        /// Number of nodes in the tree.
        count: usize,
    },
}

/// Errors raised by sensitivity drivers before a sweep begins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensitivityError {
    /// Probabilistic sensitivity targets a non-chance variable.
    #[error("Variable {variable} is a {kind} node; probabilistic sensitivity requires CHANCE")]
    NotChance {
        /// Name of the targeted variable.
        variable: String,
        /// Actual kind of the variable.
        kind: Kind,
    },

    /// The swept variable or branch does not exist.
    #[error("Sweep target {target} is not registered")]
    UnknownTarget {
        /// The missing variable or `variable/branch` pair.
        target: String,
    },

    /// A value range with `min > max`, or too few sample points.
    #[error("Invalid sweep range [{min}, {max}] with {n_points} points")]
    InvalidRange {
        /// Lower bound of the range.
        min: f64,
        /// Upper bound of the range.
        max: f64,
        /// Requested number of samples.
        n_points: usize,
    },

    /// Risk-tolerance sweeps need a positive base tolerance.
    #[error("Risk tolerance must be positive, got {risk_tolerance}")]
    InvalidRiskTolerance {
        /// The offending tolerance.
        risk_tolerance: f64,
    },

    /// A registry mutation failed mid-sweep.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A rebuild failed mid-sweep.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A rollback failed mid-sweep.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
