//! # dtree_engine: Decision Tree Evaluation
//!
//! Expansion of a variable registry into an indexed tree, backward
//! induction ("rollback"), risk profiles, and sensitivity sweeps.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               dtree_engine (L2)              │
//! ├──────────────────────────────────────────────┤
//! │  tree/         - TreeNode arena, expansion,  │
//! │                  tags, payoff evaluation     │
//! │  rollback/     - EV/EU/CE backward induction │
//! │  risk_profile/ - outcome distributions       │
//! │  sensitivity/  - probability, value and      │
//! │                  risk-tolerance sweeps       │
//! └──────────────────────────────────────────────┘
//!          ↓
//! ┌──────────────────────────────────────────────┐
//! │               dtree_core (L1)                │
//! │  Registry, Payoff, UtilityFn, ModelError     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Pipeline
//!
//! A single evaluation flows strictly downward: build (expand + tag),
//! evaluate (terminal payoffs), rollback (expected values and optimal
//! strategy), then risk profiles. Sensitivity drivers mutate the tree's
//! private registry copy and re-enter the pipeline at build for each
//! sample point, restoring the registry afterwards.
//!
//! ## Example
//!
//! ```
//! use dtree_core::registry::{Branch, OptimizeSense, Registry};
//! use dtree_engine::{DecisionTree, RollbackConfig};
//!
//! let mut registry = Registry::new();
//! registry
//!     .decision(
//!         "launch",
//!         vec![
//!             Branch::decision("go", -50.0, "demand"),
//!             Branch::decision("skip", 0.0, "payout"),
//!         ],
//!         OptimizeSense::Maximize,
//!     )
//!     .unwrap();
//! registry
//!     .chance(
//!         "demand",
//!         vec![
//!             Branch::chance("weak", 0.5, 20.0, "payout"),
//!             Branch::chance("strong", 0.5, 200.0, "payout"),
//!         ],
//!     )
//!     .unwrap();
//! registry.terminal("payout", None);
//!
//! let mut tree = DecisionTree::new(&registry, "launch").unwrap();
//! tree.evaluate();
//! let root_value = tree.rollback(&RollbackConfig::default()).unwrap();
//! assert!((root_value - 60.0).abs() < 1e-9);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

mod error;
mod risk_profile;
mod rollback;
mod sensitivity;
mod tree;

pub use error::{BuildError, SensitivityError, TreeError};
pub use risk_profile::{RiskCurve, RiskProfile};
pub use rollback::{RollbackConfig, View};
pub use sensitivity::{
    SweepSeries, SweepTable, DEFAULT_VALUE_SAMPLES, PROBABILITY_SAMPLES, RISK_AVERSION_SAMPLES,
};
pub use tree::{BranchTag, DecisionTree, TreeNode};
