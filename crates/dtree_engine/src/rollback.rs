//! Backward induction over the indexed tree.
//!
//! Rollback runs four passes over a tree whose terminal expected values
//! are already populated:
//!
//! 1. post-order EV/EU induction with forced-branch pass-through;
//! 2. top-down optimal-strategy marking;
//! 3. top-down path probabilities (a decision branch that is not the
//!    optimal successor has path probability zero);
//! 4. certainty equivalents, when a utility transform is active.

use serde::{Deserialize, Serialize};

use dtree_core::registry::{Kind, OptimizeSense};
use dtree_core::utility::UtilityFn;

use crate::error::TreeError;
use crate::tree::DecisionTree;

/// Which computed value `rollback` returns for the root.
///
/// `Eu` and `Ce` fall back to the expected value when no utility
/// transform is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Expected value.
    #[default]
    Ev,
    /// Expected utility.
    Eu,
    /// Certainty equivalent.
    Ce,
}

/// Rollback parameters: root view, utility transform, risk tolerance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RollbackConfig {
    /// Value reported for the root.
    pub view: View,
    /// Optional risk-attitude transform; `None` means risk-neutral.
    pub utility: Option<UtilityFn>,
    /// Risk tolerance parameter for the utility transform.
    pub risk_tolerance: f64,
}

impl RollbackConfig {
    /// Risk-neutral rollback reporting the root expected value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rollback under a utility transform with the given risk tolerance.
    pub fn with_utility(utility: UtilityFn, risk_tolerance: f64) -> Self {
        Self {
            view: View::Ev,
            utility: Some(utility),
            risk_tolerance,
        }
    }

    /// Select the value reported for the root.
    pub fn view(mut self, view: View) -> Self {
        self.view = view;
        self
    }
}

impl DecisionTree {
    /// Compute the optimal strategy by backward induction.
    ///
    /// Populates `ev` (and `eu`/`ce` when a utility transform is active),
    /// `optimal_successor`, `optimal_strategy`, and `path_prob` tree-wide,
    /// and returns the root value under the requested view.
    ///
    /// At a chance node the expected value is the probability-weighted sum
    /// over its branches; at a decision node it is the extremal branch
    /// value under the declared optimisation sense, ties keeping the
    /// earlier branch. A forced branch replaces either rule with a
    /// single-branch pass-through.
    ///
    /// # Errors
    /// [`TreeError::NotEvaluated`] when `evaluate` has not run since the
    /// last rebuild.
    pub fn rollback(&mut self, config: &RollbackConfig) -> Result<f64, TreeError> {
        if !self.evaluated {
            return Err(TreeError::NotEvaluated);
        }

        match config.utility {
            Some(utility) => {
                for node in &mut self.nodes {
                    if node.kind == Kind::Terminal {
                        node.eu = node.ev.map(|ev| utility.apply(ev, config.risk_tolerance));
                    }
                }
            }
            None => {
                for node in &mut self.nodes {
                    node.eu = None;
                    node.ce = None;
                }
            }
        }

        self.roll_node(0, config.utility.is_some());
        self.mark_strategy(0, true);
        self.propagate_path_prob(0, 1.0);

        if let Some(utility) = config.utility {
            for node in &mut self.nodes {
                node.ce = node.eu.map(|eu| utility.invert(eu, config.risk_tolerance));
            }
        }

        self.rolled_back = true;

        let root = &self.nodes[0];
        let result = match (config.view, config.utility.is_some()) {
            (View::Eu, true) => root.eu,
            (View::Ce, true) => root.ce,
            _ => root.ev,
        };
        result.ok_or(TreeError::NotEvaluated)
    }

    /// Post-order EV/EU induction. Returns `(ev, eu)` for the node.
    fn roll_node(&mut self, idx: usize, use_eu: bool) -> (f64, Option<f64>) {
        match self.nodes[idx].kind {
            Kind::Terminal => {
                let ev = self.nodes[idx].ev.unwrap_or(0.0);
                (ev, self.nodes[idx].eu)
            }
            Kind::Chance => self.roll_chance(idx, use_eu),
            Kind::Decision => self.roll_decision(idx, use_eu),
        }
    }

    fn roll_chance(&mut self, idx: usize, use_eu: bool) -> (f64, Option<f64>) {
        let successors = self.nodes[idx].successors.clone();
        let mut children = Vec::with_capacity(successors.len());
        for &child in &successors {
            children.push(self.roll_node(child, use_eu));
        }

        let (ev, eu) = match self.nodes[idx].forced_branch {
            None => {
                let mut ev = 0.0;
                let mut eu = 0.0;
                for (&child, &(child_ev, child_eu)) in successors.iter().zip(&children) {
                    let probability = self.nodes[child]
                        .tag
                        .as_ref()
                        .and_then(|tag| tag.probability)
                        .unwrap_or(0.0);
                    ev += probability * child_ev;
                    if use_eu {
                        eu += probability * child_eu.unwrap_or(0.0);
                    }
                }
                (ev, use_eu.then_some(eu))
            }
            Some(forced) => {
                let (child_ev, child_eu) = children[forced];
                self.nodes[idx].optimal_successor = Some(successors[forced]);
                (child_ev, child_eu)
            }
        };

        self.nodes[idx].ev = Some(ev);
        if use_eu {
            self.nodes[idx].eu = eu;
        }
        (ev, eu)
    }

    fn roll_decision(&mut self, idx: usize, use_eu: bool) -> (f64, Option<f64>) {
        let successors = self.nodes[idx].successors.clone();
        let mut children = Vec::with_capacity(successors.len());
        for &child in &successors {
            children.push(self.roll_node(child, use_eu));
        }

        let (best_successor, best_ev, best_eu) = match self.nodes[idx].forced_branch {
            None => {
                let sense = self.nodes[idx].sense.unwrap_or(OptimizeSense::Maximize);
                let mut best: Option<(usize, f64, Option<f64>, f64)> = None;
                for (&child, &(child_ev, child_eu)) in successors.iter().zip(&children) {
                    let criterion = if use_eu {
                        child_eu.unwrap_or(0.0)
                    } else {
                        child_ev
                    };
                    // First strictly better candidate wins; ties keep the
                    // earlier branch.
                    let better = match best {
                        None => true,
                        Some((_, _, _, best_criterion)) => match sense {
                            OptimizeSense::Maximize => criterion > best_criterion,
                            OptimizeSense::Minimize => criterion < best_criterion,
                        },
                    };
                    if better {
                        best = Some((child, child_ev, child_eu, criterion));
                    }
                }
                let (successor, ev, eu, _) = best.unwrap_or((idx, 0.0, None, 0.0));
                (successor, ev, eu)
            }
            Some(forced) => {
                let (child_ev, child_eu) = children[forced];
                (successors[forced], child_ev, child_eu)
            }
        };

        self.nodes[idx].ev = Some(best_ev);
        if use_eu {
            self.nodes[idx].eu = best_eu;
        }
        self.nodes[idx].optimal_successor = Some(best_successor);
        (best_ev, best_eu)
    }

    /// Top-down optimal-strategy marking.
    ///
    /// The flag propagates through the optimal successor of decision
    /// nodes, through every branch of an unforced chance node, and only
    /// through the forced branch of a forced one.
    fn mark_strategy(&mut self, idx: usize, on_strategy: bool) {
        self.nodes[idx].optimal_strategy = Some(on_strategy);
        let successors = self.nodes[idx].successors.clone();

        match self.nodes[idx].kind {
            Kind::Terminal => {}
            Kind::Decision => {
                let optimal = self.nodes[idx].optimal_successor;
                for child in successors {
                    self.mark_strategy(child, on_strategy && Some(child) == optimal);
                }
            }
            Kind::Chance => match self.nodes[idx].forced_branch {
                None => {
                    for child in successors {
                        self.mark_strategy(child, on_strategy);
                    }
                }
                Some(forced) => {
                    for (position, child) in successors.into_iter().enumerate() {
                        self.mark_strategy(child, on_strategy && position == forced);
                    }
                }
            },
        }
    }

    /// Top-down path probabilities.
    ///
    /// Each node multiplies the incoming cumulative probability by its own
    /// incoming branch probability; a decision branch other than the
    /// optimal successor continues with probability zero, as does any
    /// sibling of a forced branch.
    fn propagate_path_prob(&mut self, idx: usize, cumulative: f64) {
        let own = self.nodes[idx]
            .tag
            .as_ref()
            .and_then(|tag| tag.probability)
            .unwrap_or(1.0);
        let cumulative = cumulative * own;
        self.nodes[idx].path_prob = Some(cumulative);

        let successors = self.nodes[idx].successors.clone();
        match self.nodes[idx].kind {
            Kind::Terminal => {}
            Kind::Decision => {
                let optimal = self.nodes[idx].optimal_successor;
                for child in successors {
                    let next = if Some(child) == optimal { cumulative } else { 0.0 };
                    self.propagate_path_prob(child, next);
                }
            }
            Kind::Chance => match self.nodes[idx].forced_branch {
                None => {
                    for child in successors {
                        self.propagate_path_prob(child, cumulative);
                    }
                }
                Some(forced) => {
                    for (position, child) in successors.into_iter().enumerate() {
                        let next = if position == forced { cumulative } else { 0.0 };
                        self.propagate_path_prob(child, next);
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::{bid_registry, bid_tree};
    use approx::assert_relative_eq;
    use dtree_core::registry::{Branch, Registry};
    use proptest::prelude::*;

    #[test]
    fn test_bid_rollback_expected_values() {
        let mut tree = bid_tree();
        tree.evaluate();
        let root_value = tree.rollback(&RollbackConfig::default()).unwrap();

        assert_relative_eq!(root_value, 65.0, max_relative = 1e-12);

        let root = &tree.nodes()[0];
        let low = root.successors[0];
        let high = root.successors[1];
        assert_relative_eq!(tree.nodes()[low].ev.unwrap(), 65.0, max_relative = 1e-12);
        assert_relative_eq!(tree.nodes()[high].ev.unwrap(), 45.0, max_relative = 1e-12);
        assert_eq!(root.optimal_successor, Some(low));
    }

    #[test]
    fn test_rollback_requires_evaluate() {
        let mut tree = bid_tree();
        let err = tree.rollback(&RollbackConfig::default()).unwrap_err();
        assert_eq!(err, TreeError::NotEvaluated);
    }

    #[test]
    fn test_minimize_selects_smallest() {
        let mut registry = Registry::new();
        registry
            .decision(
                "route",
                vec![
                    Branch::decision("a", 30.0, "end"),
                    Branch::decision("b", 10.0, "end"),
                    Branch::decision("c", 20.0, "end"),
                ],
                dtree_core::registry::OptimizeSense::Minimize,
            )
            .unwrap();
        registry.terminal("end", None);

        let mut tree = DecisionTree::new(&registry, "route").unwrap();
        tree.evaluate();
        let value = tree.rollback(&RollbackConfig::default()).unwrap();
        assert_relative_eq!(value, 10.0);
        assert_eq!(tree.nodes()[0].optimal_successor, Some(2));
    }

    #[test]
    fn test_tie_break_keeps_earlier_branch() {
        let mut registry = Registry::new();
        registry
            .decision(
                "pick",
                vec![
                    Branch::decision("first", 10.0, "end"),
                    Branch::decision("second", 10.0, "end"),
                ],
                dtree_core::registry::OptimizeSense::Maximize,
            )
            .unwrap();
        registry.terminal("end", None);

        let mut tree = DecisionTree::new(&registry, "pick").unwrap();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();
        assert_eq!(tree.nodes()[0].optimal_successor, Some(1));
    }

    #[test]
    fn test_forced_cost_branch() {
        // Forcing cost to its 200 branch: bid 500 wins against 600/800
        // with margin 300, so EV = 0.65 * 300 = 195.
        let mut registry = bid_registry();
        registry.set_forced_branch("cost", Some(0)).unwrap();

        let mut tree = DecisionTree::new(&registry, "bid").unwrap();
        tree.evaluate();
        let value = tree.rollback(&RollbackConfig::default()).unwrap();
        assert_relative_eq!(value, 195.0, max_relative = 1e-12);
    }

    #[test]
    fn test_forced_decision_branch() {
        let mut registry = bid_registry();
        registry.set_forced_branch("bid", Some(1)).unwrap();

        let mut tree = DecisionTree::new(&registry, "bid").unwrap();
        tree.evaluate();
        let value = tree.rollback(&RollbackConfig::default()).unwrap();
        assert_relative_eq!(value, 45.0, max_relative = 1e-12);
    }

    #[test]
    fn test_optimal_strategy_marking() {
        let mut tree = bid_tree();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();

        let root = &tree.nodes()[0];
        assert_eq!(root.optimal_strategy, Some(true));
        let low = root.successors[0];
        let high = root.successors[1];
        assert_eq!(tree.nodes()[low].optimal_strategy, Some(true));
        assert_eq!(tree.nodes()[high].optimal_strategy, Some(false));

        // Chance nodes propagate the flag to all children.
        for &child in &tree.nodes()[low].successors {
            assert_eq!(tree.nodes()[child].optimal_strategy, Some(true));
        }
    }

    #[test]
    fn test_path_probabilities_sum_to_one_over_strategy() {
        let mut tree = bid_tree();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();

        let total: f64 = tree
            .nodes()
            .iter()
            .filter(|n| n.kind == Kind::Terminal && n.optimal_strategy == Some(true))
            .filter_map(|n| n.path_prob)
            .sum();
        assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_non_chosen_decision_branch_has_zero_path_prob() {
        let mut tree = bid_tree();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();

        let high = tree.nodes()[0].successors[1];
        assert_relative_eq!(tree.nodes()[high].path_prob.unwrap(), 0.0);
    }

    #[test]
    fn test_exponential_utility_lowers_certainty_equivalent() {
        let mut tree = bid_tree();
        tree.evaluate();
        let ev = tree.rollback(&RollbackConfig::default()).unwrap();

        tree.evaluate();
        let config = RollbackConfig::with_utility(UtilityFn::Exponential, 100.0).view(View::Ce);
        let ce = tree.rollback(&config).unwrap();

        // A risk-averse decision maker values the gamble below its EV.
        assert!(ce < ev);
        assert!(tree.nodes()[0].eu.is_some());
        assert!(tree.nodes()[0].ce.is_some());
    }

    #[test]
    fn test_view_falls_back_to_ev_without_utility() {
        let mut tree = bid_tree();
        tree.evaluate();
        let config = RollbackConfig::default().view(View::Ce);
        let value = tree.rollback(&config).unwrap();
        assert_relative_eq!(value, 65.0, max_relative = 1e-12);
    }

    #[test]
    fn test_risk_neutral_rollback_clears_utility_fields() {
        let mut tree = bid_tree();
        tree.evaluate();
        tree.rollback(&RollbackConfig::with_utility(UtilityFn::Exponential, 100.0))
            .unwrap();
        tree.evaluate();
        tree.rollback(&RollbackConfig::default()).unwrap();
        assert!(tree.nodes().iter().all(|n| n.eu.is_none() && n.ce.is_none()));
    }

    proptest! {
        // Induction must agree with direct enumeration of every
        // root-to-leaf path, for arbitrary probabilities and bid levels.
        #[test]
        fn prop_rollback_matches_path_enumeration(
            p_compbid in 0.01..0.99f64,
            p_cost in 0.01..0.99f64,
            bid_low in 100.0..900.0f64,
        ) {
            let compbid = [(p_compbid, 400.0), (1.0 - p_compbid, 800.0)];
            let cost = [(p_cost, 200.0), (1.0 - p_cost, 600.0)];
            let bids = [bid_low, 700.0];

            let mut registry = Registry::new();
            registry
                .decision(
                    "bid",
                    vec![
                        Branch::decision("low", bids[0], "compbid"),
                        Branch::decision("high", bids[1], "compbid"),
                    ],
                    dtree_core::registry::OptimizeSense::Maximize,
                )
                .unwrap();
            registry
                .chance(
                    "compbid",
                    vec![
                        Branch::chance("low", compbid[0].0, compbid[0].1, "cost"),
                        Branch::chance("high", compbid[1].0, compbid[1].1, "cost"),
                    ],
                )
                .unwrap();
            registry
                .chance(
                    "cost",
                    vec![
                        Branch::chance("low", cost[0].0, cost[0].1, "profit"),
                        Branch::chance("high", cost[1].0, cost[1].1, "profit"),
                    ],
                )
                .unwrap();
            registry.terminal(
                "profit",
                Some(dtree_core::payoff::PayoffFn::new(
                    |context: &dtree_core::payoff::PathContext| {
                        let bid = context.value("bid").unwrap_or(0.0);
                        let compbid = context.value("compbid").unwrap_or(0.0);
                        let cost = context.value("cost").unwrap_or(0.0);
                        if bid < compbid { bid - cost } else { 0.0 }
                    },
                )),
            );

            let mut tree = DecisionTree::new(&registry, "bid").unwrap();
            tree.evaluate();
            let rolled = tree.rollback(&RollbackConfig::default()).unwrap();

            let mut best = f64::NEG_INFINITY;
            for &bid in &bids {
                let mut ev = 0.0;
                for &(pc, cb) in &compbid {
                    for &(pk, ck) in &cost {
                        let payoff = if bid < cb { bid - ck } else { 0.0 };
                        ev += pc * pk * payoff;
                    }
                }
                best = best.max(ev);
            }
            prop_assert!((rolled - best).abs() < 1e-9);
        }
    }
}
