//! Payoff functions and path contexts.
//!
//! A payoff function turns the context accumulated along a root-to-leaf
//! path into a scalar monetary value at a terminal node. Callers supply
//! their own implementation of [`Payoff`] (any closure over a
//! [`PathContext`] also qualifies); when none is supplied the default is
//! the sum of all accumulated outcome values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Context accumulated while walking from the root to a terminal node.
///
/// Each traversed branch contributes, under its parent variable's name,
/// the branch outcome value, the branch probability (chance parents only),
/// and the branch name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathContext {
    /// Outcome value by variable name.
    pub values: BTreeMap<String, f64>,
    /// Branch probability by variable name (chance variables only).
    pub probabilities: BTreeMap<String, f64>,
    /// Branch name by variable name.
    pub branches: BTreeMap<String, String>,
}

impl PathContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome value recorded for a variable, if traversed.
    pub fn value(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied()
    }

    /// Branch probability recorded for a variable, if traversed.
    pub fn probability(&self, variable: &str) -> Option<f64> {
        self.probabilities.get(variable).copied()
    }

    /// Branch name recorded for a variable, if traversed.
    pub fn branch(&self, variable: &str) -> Option<&str> {
        self.branches.get(variable).map(String::as_str)
    }

    /// Sum of all accumulated outcome values.
    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }
}

/// Strategy interface for terminal payoff computation.
pub trait Payoff: Send + Sync {
    /// Compute the scalar payoff for an accumulated path context.
    fn evaluate(&self, context: &PathContext) -> f64;
}

impl<F> Payoff for F
where
    F: Fn(&PathContext) -> f64 + Send + Sync,
{
    fn evaluate(&self, context: &PathContext) -> f64 {
        self(context)
    }
}

/// Default payoff: the sum of all accumulated outcome values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumPayoff;

impl Payoff for SumPayoff {
    fn evaluate(&self, context: &PathContext) -> f64 {
        context.sum()
    }
}

/// Shared handle to a payoff implementation.
///
/// Cloning the handle shares the underlying implementation, which keeps the
/// registry cheap to deep-copy. The handle is opaque to serialisation.
#[derive(Clone)]
pub struct PayoffFn(Arc<dyn Payoff>);

impl PayoffFn {
    /// Wrap a payoff implementation.
    pub fn new(payoff: impl Payoff + 'static) -> Self {
        Self(Arc::new(payoff))
    }

    /// The default sum-of-values payoff.
    pub fn sum() -> Self {
        Self::new(SumPayoff)
    }

    /// Compute the payoff for an accumulated path context.
    pub fn evaluate(&self, context: &PathContext) -> f64 {
        self.0.evaluate(context)
    }
}

impl Default for PayoffFn {
    fn default() -> Self {
        Self::sum()
    }
}

impl fmt::Debug for PayoffFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayoffFn(..)")
    }
}
