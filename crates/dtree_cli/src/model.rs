//! JSON model files.
//!
//! A model file declares the variable registry and names the root:
//!
//! ```json
//! {
//!   "root": "bid",
//!   "mode": "strict",
//!   "variables": [
//!     {
//!       "name": "bid",
//!       "kind": "decision",
//!       "sense": "maximize",
//!       "branches": [
//!         { "name": "low", "value": 500.0, "successor": "compbid" },
//!         { "name": "high", "value": 700.0, "successor": "compbid" }
//!       ]
//!     },
//!     {
//!       "name": "compbid",
//!       "kind": "chance",
//!       "branches": [
//!         { "name": "low", "probability": 0.35, "value": 400.0, "successor": "profit" },
//!         { "name": "high", "probability": 0.65, "value": 800.0, "successor": "profit" }
//!       ]
//!     },
//!     { "name": "profit", "kind": "terminal" }
//!   ]
//! }
//! ```
//!
//! Terminal payoffs are always the default path sum; custom payoff
//! closures are a library-level feature. The registry is rebuilt through
//! the validating constructors, so malformed probabilities are rejected
//! (or rescaled under `"mode": "normalize"`) exactly as they would be in
//! code.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use dtree_core::registry::{Branch, Kind, OptimizeSense, ProbabilityMode, Registry};

use crate::error::{CliError, Result};

/// One branch as written in a model file.
#[derive(Debug, Deserialize)]
pub struct BranchSpec {
    /// Branch label.
    pub name: String,
    /// Probability; required on chance branches, ignored elsewhere.
    #[serde(default)]
    pub probability: Option<f64>,
    /// Outcome value contributed to the path.
    pub value: f64,
    /// Successor variable name.
    pub successor: String,
}

/// One variable as written in a model file.
#[derive(Debug, Deserialize)]
pub struct VariableSpec {
    /// Variable name.
    pub name: String,
    /// Variable kind.
    pub kind: Kind,
    /// Optimisation sense; decision variables only, defaults to maximise.
    #[serde(default)]
    pub sense: Option<OptimizeSense>,
    /// Optional forced branch index.
    #[serde(default)]
    pub forced_branch: Option<usize>,
    /// Ordered branches; empty or absent for terminal variables.
    #[serde(default)]
    pub branches: Vec<BranchSpec>,
}

/// A parsed model file.
#[derive(Debug, Deserialize)]
pub struct ModelFile {
    /// Name of the root variable.
    pub root: String,
    /// Probability handling mode; defaults to strict.
    #[serde(default)]
    pub mode: ProbabilityMode,
    /// Variable declarations.
    pub variables: Vec<VariableSpec>,
}

impl ModelFile {
    /// Read and parse a model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the registry through the validating constructors.
    pub fn build_registry(&self) -> Result<Registry> {
        let mut registry = Registry::with_mode(self.mode);
        for spec in &self.variables {
            match spec.kind {
                Kind::Decision => {
                    let branches = spec
                        .branches
                        .iter()
                        .map(|b| Branch::decision(&b.name, b.value, &b.successor))
                        .collect();
                    let sense = spec.sense.unwrap_or(OptimizeSense::Maximize);
                    registry.decision(&spec.name, branches, sense)?;
                }
                Kind::Chance => {
                    let branches = spec
                        .branches
                        .iter()
                        .map(|b| {
                            let probability = b.probability.ok_or_else(|| {
                                CliError::InvalidArgument(format!(
                                    "Chance branch {}/{} has no probability",
                                    spec.name, b.name
                                ))
                            })?;
                            Ok(Branch::chance(&b.name, probability, b.value, &b.successor))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    registry.chance(&spec.name, branches)?;
                }
                Kind::Terminal => registry.terminal(&spec.name, None),
            }
        }
        for spec in &self.variables {
            if spec.forced_branch.is_some() {
                registry.set_forced_branch(&spec.name, spec.forced_branch)?;
            }
        }
        Ok(registry)
    }
}
