//! Sensitivity sweeps: probability, outcome value, and risk tolerance.
//!
//! Each driver holds the registry fixed except for one dimension and
//! re-runs the full build → evaluate → rollback pipeline at every sample
//! point. The tree's registry copy is snapshotted before a sweep and
//! restored afterwards, then the pipeline is re-run with defaults, so no
//! mutation is visible to the caller once a sweep returns.

use serde::{Deserialize, Serialize};

use dtree_core::registry::Kind;
use dtree_core::utility::UtilityFn;

use crate::error::SensitivityError;
use crate::rollback::RollbackConfig;
use crate::tree::DecisionTree;

/// Number of probability samples in a probabilistic sweep (0..=1).
pub const PROBABILITY_SAMPLES: usize = 21;

/// Number of samples in a risk-tolerance sweep.
pub const RISK_AVERSION_SAMPLES: usize = 11;

/// Default number of samples in a value sweep.
pub const DEFAULT_VALUE_SAMPLES: usize = 11;

/// One dependent series of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSeries {
    /// Series label: a root branch name, or the root variable name.
    pub label: String,
    /// Dependent values, one per sample.
    pub values: Vec<f64>,
}

/// Tabular result of a sensitivity sweep.
///
/// `samples[i]` is the independent variable at sample `i`;
/// `series[k].values[i]` is the corresponding dependent value. When the
/// root is a decision node there is one series per root branch, otherwise
/// a single series for the root itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTable {
    /// Name of the swept parameter.
    pub parameter: String,
    /// Independent variable values.
    pub samples: Vec<f64>,
    /// Dependent series.
    pub series: Vec<SweepSeries>,
}

/// `n` equally spaced points over `[start, stop]`, inclusive.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

impl DecisionTree {
    /// Series labels and the node indices they track.
    ///
    /// A decision root yields one series per root branch; any other root
    /// yields a single series for the root node itself.
    fn sweep_targets(&self) -> (Vec<String>, Vec<usize>) {
        if self.nodes[0].kind == Kind::Decision {
            let targets = self.nodes[0].successors.clone();
            let labels = targets
                .iter()
                .map(|&child| {
                    self.nodes[child]
                        .tag
                        .as_ref()
                        .map(|tag| tag.branch.clone())
                        .unwrap_or_else(|| self.nodes[child].variable.clone())
                })
                .collect();
            (labels, targets)
        } else {
            (vec![self.nodes[0].variable.clone()], vec![0])
        }
    }

    /// Re-run the whole pipeline with a risk-neutral rollback.
    fn rerun(&mut self) -> Result<(), SensitivityError> {
        self.rebuild()?;
        self.evaluate();
        self.rollback(&RollbackConfig::default())?;
        Ok(())
    }

    /// Sweep probability mass between the extreme branches of a chance
    /// variable.
    ///
    /// All branches of `variable` are pinned to zero except the
    /// highest-valued and lowest-valued ones; the swept probability `p`
    /// goes to the lowest-valued branch and `1 - p` to the highest-valued
    /// one, over [`PROBABILITY_SAMPLES`] equally spaced levels in
    /// `[0, 1]`. The recorded dependent value is the expected value at the
    /// root, or at each root decision branch.
    ///
    /// # Errors
    /// [`SensitivityError::UnknownTarget`] or
    /// [`SensitivityError::NotChance`], before any sample runs.
    pub fn probabilistic_sensitivity(
        &mut self,
        variable: &str,
    ) -> Result<SweepTable, SensitivityError> {
        let decl = self
            .registry
            .get(variable)
            .ok_or_else(|| SensitivityError::UnknownTarget {
                target: variable.to_string(),
            })?;
        if decl.kind != Kind::Chance {
            return Err(SensitivityError::NotChance {
                variable: variable.to_string(),
                kind: decl.kind,
            });
        }

        let snapshot = self.registry.clone();
        let (top, bottom) = self.registry.top_bottom_branches(variable)?;
        self.registry.zero_probabilities(variable)?;

        let (labels, targets) = self.sweep_targets();
        let samples = linspace(0.0, 1.0, PROBABILITY_SAMPLES);
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(samples.len()); targets.len()];

        let result = (|| -> Result<(), SensitivityError> {
            for &p in &samples {
                self.registry.set_branch_probability(variable, top, 1.0 - p)?;
                self.registry.set_branch_probability(variable, bottom, p)?;
                self.rerun()?;
                for (column, &target) in values.iter_mut().zip(&targets) {
                    column.push(self.nodes[target].ev.unwrap_or(0.0));
                }
            }
            Ok(())
        })();

        self.registry = snapshot;
        self.rerun()?;
        result?;

        Ok(SweepTable {
            parameter: format!("P({}/{})", variable, bottom),
            samples,
            series: labels
                .into_iter()
                .zip(values)
                .map(|(label, values)| SweepSeries { label, values })
                .collect(),
        })
    }

    /// Sweep one branch's outcome value over `[min, max]`.
    ///
    /// # Arguments
    /// * `variable` - Variable owning the swept branch
    /// * `branch` - Branch name within `variable`
    /// * `range` - `(min, max)` of the swept outcome value
    /// * `n_points` - Number of equally spaced samples (>= 2)
    ///
    /// # Errors
    /// [`SensitivityError::InvalidRange`] or
    /// [`SensitivityError::UnknownTarget`], before any sample runs.
    pub fn value_sensitivity(
        &mut self,
        variable: &str,
        branch: &str,
        range: (f64, f64),
        n_points: usize,
    ) -> Result<SweepTable, SensitivityError> {
        let (min, max) = range;
        if n_points < 2 || min > max {
            return Err(SensitivityError::InvalidRange { min, max, n_points });
        }
        let known = self
            .registry
            .get(variable)
            .is_some_and(|decl| decl.branches.iter().any(|b| b.name == branch));
        if !known {
            return Err(SensitivityError::UnknownTarget {
                target: format!("{}/{}", variable, branch),
            });
        }

        let snapshot = self.registry.clone();
        let (labels, targets) = self.sweep_targets();
        let samples = linspace(min, max, n_points);
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(samples.len()); targets.len()];

        let result = (|| -> Result<(), SensitivityError> {
            for &value in &samples {
                self.registry.set_branch_value(variable, branch, value)?;
                self.rerun()?;
                for (column, &target) in values.iter_mut().zip(&targets) {
                    column.push(self.nodes[target].ev.unwrap_or(0.0));
                }
            }
            Ok(())
        })();

        self.registry = snapshot;
        self.rerun()?;
        result?;

        Ok(SweepTable {
            parameter: format!("{}/{}", variable, branch),
            samples,
            series: labels
                .into_iter()
                .zip(values)
                .map(|(label, values)| SweepSeries { label, values })
                .collect(),
        })
    }

    /// Sweep the risk-aversion coefficient `1/rho` from zero (risk
    /// neutral) to `1/risk_tolerance`.
    ///
    /// At aversion zero the recorded value is the expected value; at every
    /// other sample the tree is rolled back under `utility` with
    /// `rho = 1/aversion` and the certainty equivalent is recorded. One
    /// series per root decision branch (or one for the root).
    ///
    /// # Errors
    /// [`SensitivityError::InvalidRiskTolerance`] when
    /// `risk_tolerance <= 0`.
    pub fn risk_sensitivity(
        &mut self,
        utility: UtilityFn,
        risk_tolerance: f64,
    ) -> Result<SweepTable, SensitivityError> {
        if risk_tolerance <= 0.0 {
            return Err(SensitivityError::InvalidRiskTolerance { risk_tolerance });
        }

        let (labels, targets) = self.sweep_targets();
        let samples = linspace(0.0, 1.0 / risk_tolerance, RISK_AVERSION_SAMPLES);
        let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(samples.len()); targets.len()];

        for &aversion in &samples {
            self.evaluate();
            if aversion == 0.0 {
                self.rollback(&RollbackConfig::default())?;
                for (column, &target) in values.iter_mut().zip(&targets) {
                    column.push(self.nodes[target].ev.unwrap_or(0.0));
                }
            } else {
                self.rollback(&RollbackConfig::with_utility(utility, 1.0 / aversion))?;
                for (column, &target) in values.iter_mut().zip(&targets) {
                    column.push(self.nodes[target].ce.unwrap_or(0.0));
                }
            }
        }

        self.evaluate();
        self.rollback(&RollbackConfig::default())?;

        Ok(SweepTable {
            parameter: "risk_aversion".to_string(),
            samples,
            series: labels
                .into_iter()
                .zip(values)
                .map(|(label, values)| SweepSeries { label, values })
                .collect(),
        })
    }
}
