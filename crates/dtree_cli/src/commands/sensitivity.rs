//! Sensitivity command: probability, value, and risk-tolerance sweeps.

use tracing::info;

use dtree_core::utility::UtilityFn;
use dtree_engine::{RollbackConfig, SweepTable};

use crate::error::Result;

/// Which sweep to run, with its parameters.
#[derive(Debug)]
pub enum Sweep {
    /// Trade probability mass between the extreme branches of a chance
    /// variable.
    Probability {
        /// Swept chance variable.
        variable: String,
    },
    /// Sweep one branch's outcome value over a range.
    Value {
        /// Variable owning the swept branch.
        variable: String,
        /// Branch name.
        branch: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Number of samples.
        points: usize,
    },
    /// Sweep risk aversion from neutral to `1/risk_tolerance`.
    Risk {
        /// Utility transform.
        utility: UtilityFn,
        /// Base risk tolerance.
        risk_tolerance: f64,
    },
}

/// Run the sensitivity command.
pub fn run(model: &str, sweep: Sweep) -> Result<()> {
    let mut tree = super::load_tree(model)?;
    tree.rollback(&RollbackConfig::default())?;
    info!(?sweep, "Running sweep");

    let table: SweepTable = match sweep {
        Sweep::Probability { variable } => tree.probabilistic_sensitivity(&variable)?,
        Sweep::Value {
            variable,
            branch,
            min,
            max,
            points,
        } => tree.value_sensitivity(&variable, &branch, (min, max), points)?,
        Sweep::Risk {
            utility,
            risk_tolerance,
        } => tree.risk_sensitivity(utility, risk_tolerance)?,
    };
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
