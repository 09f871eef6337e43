//! Evaluate command: rollback a model and report the optimal strategy.

use serde::Serialize;
use tracing::info;

use dtree_core::registry::Kind;
use dtree_core::utility::UtilityFn;
use dtree_engine::{DecisionTree, RollbackConfig, View};

use crate::error::{CliError, Result};

/// Root summary printed as JSON.
#[derive(Debug, Serialize)]
struct Evaluation {
    root: String,
    view: View,
    value: f64,
    expected_value: f64,
    certainty_equivalent: Option<f64>,
    strategy: Vec<StrategyStep>,
}

/// One decision on the optimal path.
#[derive(Debug, Serialize)]
struct StrategyStep {
    variable: String,
    branch: String,
}

/// Run the eval command.
pub fn run(
    model: &str,
    view: View,
    utility: Option<UtilityFn>,
    risk_tolerance: f64,
) -> Result<()> {
    if view != View::Ev && utility.is_none() {
        return Err(CliError::InvalidArgument(format!(
            "View {:?} requires --utility",
            view
        )));
    }

    let mut tree = super::load_tree(model)?;
    info!(root = tree.root(), nodes = tree.nodes().len(), "Model loaded");

    let config = match utility {
        Some(utility) => RollbackConfig::with_utility(utility, risk_tolerance).view(view),
        None => RollbackConfig::new(),
    };
    let value = tree.rollback(&config)?;

    let root = &tree.nodes()[0];
    let evaluation = Evaluation {
        root: tree.root().to_string(),
        view,
        value,
        expected_value: root.ev.unwrap_or(0.0),
        certainty_equivalent: root.ce,
        strategy: optimal_strategy(&tree),
    };
    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}

/// Walk the chosen branch at each decision node on the optimal path.
fn optimal_strategy(tree: &DecisionTree) -> Vec<StrategyStep> {
    let mut steps = Vec::new();
    let mut frontier = vec![0usize];
    while let Some(index) = frontier.pop() {
        let node = &tree.nodes()[index];
        match node.kind {
            Kind::Decision => {
                if let Some(child) = node.optimal_successor {
                    if let Some(tag) = &tree.nodes()[child].tag {
                        steps.push(StrategyStep {
                            variable: node.variable.clone(),
                            branch: tag.branch.clone(),
                        });
                    }
                    frontier.push(child);
                }
            }
            Kind::Chance => frontier.extend(node.successors.iter().copied()),
            Kind::Terminal => {}
        }
    }
    steps
}
