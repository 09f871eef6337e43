//! Nodes command: dump the expanded tree for inspection.

use serde::Serialize;
use tracing::info;

use dtree_core::registry::Kind;
use dtree_engine::{RollbackConfig, TreeNode};

use crate::error::Result;

/// One row of the node listing.
#[derive(Debug, Serialize)]
struct NodeRow {
    index: usize,
    variable: String,
    kind: Kind,
    branch: Option<String>,
    probability: Option<f64>,
    value: Option<f64>,
    ev: Option<f64>,
    path_probability: Option<f64>,
    on_optimal_path: Option<bool>,
    successors: Vec<usize>,
}

impl NodeRow {
    fn from_node(index: usize, node: &TreeNode) -> Self {
        Self {
            index,
            variable: node.variable.clone(),
            kind: node.kind,
            branch: node.tag.as_ref().map(|tag| tag.branch.clone()),
            probability: node.tag.as_ref().and_then(|tag| tag.probability),
            value: node.tag.as_ref().map(|tag| tag.value),
            ev: node.ev,
            path_probability: node.path_prob,
            on_optimal_path: node.optimal_strategy,
            successors: node.successors.clone(),
        }
    }
}

/// Run the nodes command.
pub fn run(model: &str, rolled_back: bool) -> Result<()> {
    let mut tree = super::load_tree(model)?;
    if rolled_back {
        tree.rollback(&RollbackConfig::default())?;
    }
    info!(nodes = tree.nodes().len(), "Tree expanded");

    let rows: Vec<NodeRow> = tree
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| NodeRow::from_node(index, node))
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
