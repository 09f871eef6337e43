//! Variable registry.
//!
//! The registry is the declarative description of a decision problem: a
//! mapping from variable name to its declaration (kind, branches,
//! optimisation sense, payoff function). It is pure data plus validation;
//! the engine crate expands it into an explicit tree.
//!
//! A variable may reference any other variable as a branch successor,
//! including transitively itself. Cyclic references are not detected here
//! or during expansion and make the expansion diverge; acyclicity is a
//! caller precondition.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::payoff::PayoffFn;

/// Tolerance used when checking that chance probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Kind of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// A decision point controlled by the decision maker.
    Decision,
    /// A chance event resolved by probability.
    Chance,
    /// A terminal node carrying a payoff function.
    Terminal,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Decision => write!(f, "DECISION"),
            Kind::Chance => write!(f, "CHANCE"),
            Kind::Terminal => write!(f, "TERMINAL"),
        }
    }
}

/// Direction of optimisation at a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeSense {
    /// Select the branch with the largest criterion value.
    Maximize,
    /// Select the branch with the smallest criterion value.
    Minimize,
}

/// Probability handling mode for chance registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityMode {
    /// Reject chance variables whose probabilities do not sum to one.
    #[default]
    Strict,
    /// Rescale probabilities so that they sum to one.
    Normalize,
}

/// One branch of a decision or chance variable.
///
/// Decision branches carry no probability; chance branches always do. The
/// distinction is enforced at registration rather than by tuple arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch label, unique within its variable by convention.
    pub name: String,
    /// Branch probability; `None` on decision branches.
    pub probability: Option<f64>,
    /// Outcome value contributed to the path when the branch is taken.
    pub value: f64,
    /// Name of the successor variable.
    pub successor: String,
}

impl Branch {
    /// Create a decision branch (no probability).
    pub fn decision(name: impl Into<String>, value: f64, successor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probability: None,
            value,
            successor: successor.into(),
        }
    }

    /// Create a chance branch with the given probability.
    pub fn chance(
        name: impl Into<String>,
        probability: f64,
        value: f64,
        successor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            probability: Some(probability),
            value,
            successor: successor.into(),
        }
    }
}

/// One declared node type in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    /// Variable kind.
    pub kind: Kind,
    /// Ordered branch list; empty for terminal variables.
    pub branches: Vec<Branch>,
    /// Optimisation sense; present on decision variables only.
    pub sense: Option<OptimizeSense>,
    /// Payoff function; present on terminal variables only. Not serialised;
    /// deserialised declarations fall back to the default sum payoff.
    #[serde(skip)]
    pub payoff: Option<PayoffFn>,
    /// Optional branch index that overrides rollback choice or expectation.
    pub forced_branch: Option<usize>,
}

/// Bag of variable declarations, looked up by name.
///
/// The registry is authored once through [`Registry::decision`],
/// [`Registry::chance`], and [`Registry::terminal`], then deep-copied
/// (`Clone`) into each tree so that in-place mutation during sensitivity
/// sweeps never corrupts the caller's original.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    variables: BTreeMap<String, VariableDecl>,
    mode: ProbabilityMode,
}

impl Registry {
    /// Create an empty registry in strict probability mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given probability mode.
    pub fn with_mode(mode: ProbabilityMode) -> Self {
        Self {
            variables: BTreeMap::new(),
            mode,
        }
    }

    /// Number of registered variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.get(name)
    }

    /// Look up a declaration by name, failing with [`ModelError::UnknownVariable`].
    pub fn decl(&self, name: &str) -> Result<&VariableDecl, ModelError> {
        self.variables
            .get(name)
            .ok_or_else(|| ModelError::UnknownVariable {
                variable: name.to_string(),
            })
    }

    fn decl_mut(&mut self, name: &str) -> Result<&mut VariableDecl, ModelError> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownVariable {
                variable: name.to_string(),
            })
    }

    /// Register a decision variable.
    ///
    /// # Arguments
    /// * `name` - Variable name, referenced by other branches as successor
    /// * `branches` - Non-empty ordered branch list
    /// * `sense` - Whether rollback maximises or minimises over the branches
    ///
    /// # Errors
    /// [`ModelError::EmptyBranches`] when `branches` is empty.
    pub fn decision(
        &mut self,
        name: impl Into<String>,
        branches: Vec<Branch>,
        sense: OptimizeSense,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if branches.is_empty() {
            return Err(ModelError::EmptyBranches { variable: name });
        }
        self.variables.insert(
            name,
            VariableDecl {
                kind: Kind::Decision,
                branches,
                sense: Some(sense),
                payoff: None,
                forced_branch: None,
            },
        );
        Ok(())
    }

    /// Register a chance variable.
    ///
    /// Every branch must carry a probability. In strict mode the
    /// probabilities must sum to one within [`PROBABILITY_TOLERANCE`]; in
    /// normalize mode they are rescaled to sum to one.
    ///
    /// # Errors
    /// [`ModelError::EmptyBranches`], [`ModelError::MissingProbability`],
    /// [`ModelError::ProbabilitySum`] (strict), or
    /// [`ModelError::ZeroProbabilityMass`] (normalize).
    pub fn chance(
        &mut self,
        name: impl Into<String>,
        mut branches: Vec<Branch>,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if branches.is_empty() {
            return Err(ModelError::EmptyBranches { variable: name });
        }
        for (index, branch) in branches.iter().enumerate() {
            if branch.probability.is_none() {
                return Err(ModelError::MissingProbability {
                    variable: name.clone(),
                    index,
                });
            }
        }

        let sum: f64 = branches.iter().filter_map(|b| b.probability).sum();
        match self.mode {
            ProbabilityMode::Strict => {
                if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(ModelError::ProbabilitySum {
                        variable: name,
                        sum,
                    });
                }
            }
            ProbabilityMode::Normalize => {
                if sum.abs() <= PROBABILITY_TOLERANCE {
                    return Err(ModelError::ZeroProbabilityMass { variable: name });
                }
                if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                    for branch in &mut branches {
                        branch.probability = branch.probability.map(|p| p / sum);
                    }
                }
            }
        }

        self.variables.insert(
            name,
            VariableDecl {
                kind: Kind::Chance,
                branches,
                sense: None,
                payoff: None,
                forced_branch: None,
            },
        );
        Ok(())
    }

    /// Register a terminal variable.
    ///
    /// When `payoff` is `None` the default payoff (sum of all accumulated
    /// outcome values) is used at evaluation time.
    pub fn terminal(&mut self, name: impl Into<String>, payoff: Option<PayoffFn>) {
        self.variables.insert(
            name.into(),
            VariableDecl {
                kind: Kind::Terminal,
                branches: Vec::new(),
                sense: None,
                payoff,
                forced_branch: None,
            },
        );
    }

    /// Pin a variable's traversal to a single branch, or clear the pin.
    ///
    /// Forcing overrides the rollback choice at a decision variable and the
    /// probability-weighted expectation at a chance variable. Used for
    /// scenario freezing and what-if analysis.
    ///
    /// # Errors
    /// [`ModelError::UnknownVariable`], [`ModelError::KindMismatch`] for a
    /// terminal target, or [`ModelError::ForcedBranchOutOfRange`].
    pub fn set_forced_branch(
        &mut self,
        name: &str,
        forced_branch: Option<usize>,
    ) -> Result<(), ModelError> {
        let decl = self.decl_mut(name)?;
        if decl.kind == Kind::Terminal {
            return Err(ModelError::KindMismatch {
                variable: name.to_string(),
                kind: Kind::Terminal,
                expected: Kind::Decision,
            });
        }
        if let Some(index) = forced_branch {
            if index >= decl.branches.len() {
                return Err(ModelError::ForcedBranchOutOfRange {
                    variable: name.to_string(),
                    index,
                    count: decl.branches.len(),
                });
            }
        }
        decl.forced_branch = forced_branch;
        Ok(())
    }

    /// Overwrite the probability of one branch of a chance variable.
    ///
    /// No sum constraint is applied here; sensitivity sweeps deliberately
    /// move probability mass between branches one assignment at a time.
    pub fn set_branch_probability(
        &mut self,
        name: &str,
        index: usize,
        probability: f64,
    ) -> Result<(), ModelError> {
        let decl = self.decl_mut(name)?;
        if decl.kind != Kind::Chance {
            return Err(ModelError::KindMismatch {
                variable: name.to_string(),
                kind: decl.kind,
                expected: Kind::Chance,
            });
        }
        let count = decl.branches.len();
        let branch = decl
            .branches
            .get_mut(index)
            .ok_or(ModelError::ForcedBranchOutOfRange {
                variable: name.to_string(),
                index,
                count,
            })?;
        branch.probability = Some(probability);
        Ok(())
    }

    /// Overwrite the outcome value of one branch, addressed by branch name.
    pub fn set_branch_value(
        &mut self,
        name: &str,
        branch_name: &str,
        value: f64,
    ) -> Result<(), ModelError> {
        let decl = self.decl_mut(name)?;
        let branch = decl
            .branches
            .iter_mut()
            .find(|b| b.name == branch_name)
            .ok_or_else(|| ModelError::UnknownVariable {
                variable: format!("{}/{}", name, branch_name),
            })?;
        branch.value = value;
        Ok(())
    }

    /// Indices of the branches with the highest and lowest outcome values.
    ///
    /// Returns `(top, bottom)`. Used by probabilistic sensitivity to pick
    /// the two branches between which probability mass is swept.
    pub fn top_bottom_branches(&self, name: &str) -> Result<(usize, usize), ModelError> {
        let decl = self.decl(name)?;
        if decl.branches.is_empty() {
            return Err(ModelError::EmptyBranches {
                variable: name.to_string(),
            });
        }
        let mut top = 0;
        let mut bottom = 0;
        for (index, branch) in decl.branches.iter().enumerate() {
            if branch.value > decl.branches[top].value {
                top = index;
            }
            if branch.value < decl.branches[bottom].value {
                bottom = index;
            }
        }
        Ok((top, bottom))
    }

    /// Set the probabilities of all branches of a chance variable to zero.
    pub fn zero_probabilities(&mut self, name: &str) -> Result<(), ModelError> {
        let decl = self.decl_mut(name)?;
        if decl.kind != Kind::Chance {
            return Err(ModelError::KindMismatch {
                variable: name.to_string(),
                kind: decl.kind,
                expected: Kind::Chance,
            });
        }
        for branch in &mut decl.branches {
            branch.probability = Some(0.0);
        }
        Ok(())
    }

    /// Iterate over `(name, declaration)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableDecl)> {
        self.variables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chance_branches() -> Vec<Branch> {
        vec![
            Branch::chance("low", 0.25, 200.0, "profit"),
            Branch::chance("medium", 0.50, 400.0, "profit"),
            Branch::chance("high", 0.25, 600.0, "profit"),
        ]
    }

    #[test]
    fn test_decision_registration() {
        let mut registry = Registry::new();
        registry
            .decision(
                "bid",
                vec![
                    Branch::decision("low", 500.0, "compbid"),
                    Branch::decision("high", 700.0, "compbid"),
                ],
                OptimizeSense::Maximize,
            )
            .unwrap();

        let decl = registry.get("bid").unwrap();
        assert_eq!(decl.kind, Kind::Decision);
        assert_eq!(decl.sense, Some(OptimizeSense::Maximize));
        assert_eq!(decl.branches.len(), 2);
        assert!(decl.branches[0].probability.is_none());
    }

    #[test]
    fn test_decision_empty_branches_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .decision("bid", vec![], OptimizeSense::Maximize)
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyBranches { .. }));
    }

    #[test]
    fn test_chance_registration() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();

        let decl = registry.get("cost").unwrap();
        assert_eq!(decl.kind, Kind::Chance);
        assert_eq!(decl.branches[1].probability, Some(0.50));
    }

    #[test]
    fn test_chance_strict_rejects_bad_sum() {
        let mut registry = Registry::new();
        let err = registry
            .chance(
                "cost",
                vec![
                    Branch::chance("low", 0.25, 200.0, "profit"),
                    Branch::chance("high", 0.25, 600.0, "profit"),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::ProbabilitySum { .. }));
    }

    #[test]
    fn test_chance_normalize_rescales() {
        let mut registry = Registry::with_mode(ProbabilityMode::Normalize);
        registry
            .chance(
                "cost",
                vec![
                    Branch::chance("low", 1.0, 200.0, "profit"),
                    Branch::chance("high", 3.0, 600.0, "profit"),
                ],
            )
            .unwrap();

        let decl = registry.get("cost").unwrap();
        assert!((decl.branches[0].probability.unwrap() - 0.25).abs() < 1e-12);
        assert!((decl.branches[1].probability.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_chance_normalize_rejects_zero_mass() {
        let mut registry = Registry::with_mode(ProbabilityMode::Normalize);
        let err = registry
            .chance(
                "cost",
                vec![
                    Branch::chance("low", 0.0, 200.0, "profit"),
                    Branch::chance("high", 0.0, 600.0, "profit"),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::ZeroProbabilityMass { .. }));
    }

    #[test]
    fn test_forced_branch_validation() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();
        registry.terminal("profit", None);

        registry.set_forced_branch("cost", Some(2)).unwrap();
        assert_eq!(registry.get("cost").unwrap().forced_branch, Some(2));

        registry.set_forced_branch("cost", None).unwrap();
        assert_eq!(registry.get("cost").unwrap().forced_branch, None);

        let err = registry.set_forced_branch("cost", Some(3)).unwrap_err();
        assert!(matches!(err, ModelError::ForcedBranchOutOfRange { .. }));

        let err = registry.set_forced_branch("profit", Some(0)).unwrap_err();
        assert!(matches!(err, ModelError::KindMismatch { .. }));
    }

    #[test]
    fn test_top_bottom_branches() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();

        let (top, bottom) = registry.top_bottom_branches("cost").unwrap();
        assert_eq!(top, 2);
        assert_eq!(bottom, 0);
    }

    #[test]
    fn test_zero_probabilities() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();
        registry.zero_probabilities("cost").unwrap();

        let decl = registry.get("cost").unwrap();
        assert!(decl.branches.iter().all(|b| b.probability == Some(0.0)));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();

        let mut copy = registry.clone();
        copy.zero_probabilities("cost").unwrap();

        assert_eq!(
            registry.get("cost").unwrap().branches[1].probability,
            Some(0.50)
        );
    }

    #[test]
    fn test_unknown_variable_lookup() {
        let registry = Registry::new();
        let err = registry.decl("missing").unwrap_err();
        assert!(matches!(err, ModelError::UnknownVariable { .. }));
    }

    #[test]
    fn test_serde_roundtrip_uses_default_payoff() {
        let mut registry = Registry::new();
        registry.chance("cost", chance_branches()).unwrap();
        registry.terminal("profit", None);

        let json = serde_json::to_string(&registry).unwrap();
        let restored: Registry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("profit").unwrap().kind, Kind::Terminal);
    }
}
