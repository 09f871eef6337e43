//! Risk-profile command: outcome distributions under the optimal strategy.

use tracing::info;

use dtree_engine::RollbackConfig;

use crate::error::Result;

/// Run the risk-profile command.
pub fn run(model: &str, node: usize, cumulative: bool, single: bool) -> Result<()> {
    let mut tree = super::load_tree(model)?;
    tree.rollback(&RollbackConfig::default())?;
    info!(node, cumulative, single, "Computing risk profile");

    let curves = tree.risk_profile(node, cumulative, single)?;
    println!("{}", serde_json::to_string_pretty(&curves)?);
    Ok(())
}
