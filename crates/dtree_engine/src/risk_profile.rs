//! Risk profiles: outcome distributions under the optimal strategy.
//!
//! A risk profile maps final payoff values to the probability of realising
//! them from a given node, assuming every decision follows the strategy
//! chosen by rollback. Terminal nodes contribute a point mass; chance
//! nodes merge their children's distributions weighted by branch
//! probability; decision nodes copy the distribution of their optimal
//! successor.

use serde::{Deserialize, Serialize};

use dtree_core::registry::Kind;

use crate::error::TreeError;
use crate::tree::DecisionTree;

/// Values closer than this are merged into one distribution key.
const VALUE_MERGE_TOLERANCE: f64 = 1e-9;

/// Discrete distribution of final payoffs, sorted by value.
///
/// f64 keys are neither `Eq` nor `Hash`, so the distribution is a sorted
/// vector of `(value, probability)` pairs with nearby values merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    points: Vec<(f64, f64)>,
}

impl RiskProfile {
    /// Empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point mass: the given value with probability one.
    pub fn unit(value: f64) -> Self {
        Self {
            points: vec![(value, 1.0)],
        }
    }

    /// Add probability mass at a value, merging keys within tolerance.
    pub fn add(&mut self, value: f64, probability: f64) {
        match self
            .points
            .binary_search_by(|(v, _)| v.partial_cmp(&value).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(position) => self.points[position].1 += probability,
            Err(position) => {
                if position > 0 && (self.points[position - 1].0 - value).abs() <= VALUE_MERGE_TOLERANCE {
                    self.points[position - 1].1 += probability;
                } else if position < self.points.len()
                    && (self.points[position].0 - value).abs() <= VALUE_MERGE_TOLERANCE
                {
                    self.points[position].1 += probability;
                } else {
                    self.points.insert(position, (value, probability));
                }
            }
        }
    }

    /// Fold another distribution in, scaled by `weight`.
    pub fn merge_weighted(&mut self, other: &RiskProfile, weight: f64) {
        for &(value, probability) in &other.points {
            self.add(value, weight * probability);
        }
    }

    /// The `(value, probability)` pairs in ascending value order.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Sum of all probabilities.
    pub fn total_probability(&self) -> f64 {
        self.points.iter().map(|(_, p)| p).sum()
    }

    /// Cumulative curve: running probability sums in value order.
    pub fn cumulative(&self) -> Vec<(f64, f64)> {
        let mut running = 0.0;
        self.points
            .iter()
            .map(|&(value, probability)| {
                running += probability;
                (value, running)
            })
            .collect()
    }
}

/// One labelled risk-profile curve, as returned by
/// [`DecisionTree::risk_profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCurve {
    /// Curve label: the node's incoming branch name, or its variable name
    /// at the root, plus its expected value.
    pub label: String,
    /// `(value, probability)` pairs; cumulative when requested.
    pub points: Vec<(f64, f64)>,
}

impl DecisionTree {
    /// Outcome distribution(s) of the subtree rooted at `index`.
    ///
    /// # Arguments
    /// * `index` - Root of the subtree to profile
    /// * `cumulative` - Return running probability sums instead of masses
    /// * `single` - One curve for the node itself; otherwise one curve per
    ///   immediate successor (per decision branch at a decision node)
    ///
    /// # Errors
    /// [`TreeError::NotRolledBack`] before rollback has chosen a strategy,
    /// or [`TreeError::NodeOutOfRange`].
    pub fn risk_profile(
        &mut self,
        index: usize,
        cumulative: bool,
        single: bool,
    ) -> Result<Vec<RiskCurve>, TreeError> {
        if !self.rolled_back {
            return Err(TreeError::NotRolledBack);
        }
        if index >= self.nodes.len() {
            return Err(TreeError::NodeOutOfRange {
                index,
                count: self.nodes.len(),
            });
        }

        self.compute_risk_profile(index);

        let targets: Vec<usize> = if single {
            vec![index]
        } else {
            self.nodes[index].successors.clone()
        };

        let curves = targets
            .into_iter()
            .filter_map(|target| {
                let node = &self.nodes[target];
                let profile = node.risk_profile.as_ref()?;
                let label = match &node.tag {
                    Some(tag) => format!("{}; EV={:.2}", tag.branch, node.ev.unwrap_or(0.0)),
                    None => format!("{}; EV={:.2}", node.variable, node.ev.unwrap_or(0.0)),
                };
                let points = if cumulative {
                    profile.cumulative()
                } else {
                    profile.points().to_vec()
                };
                Some(RiskCurve { label, points })
            })
            .collect();
        Ok(curves)
    }

    /// Bottom-up distribution aggregation over the subtree at `idx`.
    fn compute_risk_profile(&mut self, idx: usize) {
        match self.nodes[idx].kind {
            Kind::Terminal => {
                let value = self.nodes[idx].ev.unwrap_or(0.0);
                self.nodes[idx].risk_profile = Some(RiskProfile::unit(value));
            }
            Kind::Chance => {
                let successors = self.nodes[idx].successors.clone();
                for &child in &successors {
                    self.compute_risk_profile(child);
                }
                let mut profile = RiskProfile::new();
                for &child in &successors {
                    let weight = self.nodes[child]
                        .tag
                        .as_ref()
                        .and_then(|tag| tag.probability)
                        .unwrap_or(0.0);
                    if let Some(child_profile) = &self.nodes[child].risk_profile {
                        profile.merge_weighted(child_profile, weight);
                    }
                }
                self.nodes[idx].risk_profile = Some(profile);
            }
            Kind::Decision => {
                let successors = self.nodes[idx].successors.clone();
                for &child in &successors {
                    self.compute_risk_profile(child);
                }
                let optimal = self.nodes[idx].optimal_successor;
                self.nodes[idx].risk_profile = optimal
                    .and_then(|child| self.nodes[child].risk_profile.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollback::RollbackConfig;
    use crate::tree::fixtures::bid_tree;
    use approx::assert_relative_eq;

    fn rolled_bid_tree() -> DecisionTree {
        let mut tree = bid_tree();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();
        tree
    }

    #[test]
    fn test_profile_requires_rollback() {
        let mut tree = bid_tree();
        tree.evaluate();
        let err = tree.risk_profile(0, false, true).unwrap_err();
        assert_eq!(err, TreeError::NotRolledBack);
    }

    #[test]
    fn test_root_profile_normalised() {
        let mut tree = rolled_bid_tree();
        let curves = tree.risk_profile(0, false, true).unwrap();
        assert_eq!(curves.len(), 1);

        let total: f64 = curves[0].points.iter().map(|(_, p)| p).sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_root_profile_outcomes() {
        // Under bid 500 the reachable payoffs are 0 (lose, p=.35) and
        // 500-cost for the winning branches (p=.65 split over cost).
        let mut tree = rolled_bid_tree();
        let curves = tree.risk_profile(0, false, true).unwrap();
        let points = &curves[0].points;

        let lose = points.iter().find(|(v, _)| v.abs() < 1e-9).unwrap();
        assert_relative_eq!(lose.1, 0.35, max_relative = 1e-12);

        let win_margin_100 = points
            .iter()
            .find(|(v, _)| (v - 100.0).abs() < 1e-9)
            .unwrap();
        // cost=400 with p=.5, reached via compbid 600/800 (p=.65).
        assert_relative_eq!(win_margin_100.1, 0.65 * 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_profile_mean_matches_ev() {
        let mut tree = rolled_bid_tree();
        let curves = tree.risk_profile(0, false, true).unwrap();
        let mean: f64 = curves[0].points.iter().map(|(v, p)| v * p).sum();
        assert_relative_eq!(mean, 65.0, max_relative = 1e-12);
    }

    #[test]
    fn test_cumulative_curve_ends_at_one() {
        let mut tree = rolled_bid_tree();
        let curves = tree.risk_profile(0, true, true).unwrap();
        let last = curves[0].points.last().unwrap();
        assert_relative_eq!(last.1, 1.0, max_relative = 1e-12);

        // Running sums are non-decreasing.
        let monotone = curves[0]
            .points
            .windows(2)
            .all(|pair| pair[0].1 <= pair[1].1 + 1e-12);
        assert!(monotone);
    }

    #[test]
    fn test_per_branch_curves() {
        let mut tree = rolled_bid_tree();
        let curves = tree.risk_profile(0, false, false).unwrap();
        assert_eq!(curves.len(), 2);
        assert!(curves[0].label.starts_with("low"));
        assert!(curves[1].label.starts_with("high"));
        for curve in &curves {
            let total: f64 = curve.points.iter().map(|(_, p)| p).sum();
            assert_relative_eq!(total, 1.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_merge_tolerance_collapses_nearby_values() {
        let mut profile = RiskProfile::new();
        profile.add(100.0, 0.5);
        profile.add(100.0 + 1e-12, 0.5);
        assert_eq!(profile.points().len(), 1);
        assert_relative_eq!(profile.total_probability(), 1.0);
    }
}
