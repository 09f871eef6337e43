//! # dtree_core: Foundation for Decision Tree Analysis
//!
//! ## Layer 1 (Foundation) Role
//!
//! dtree_core serves as the bottom layer of the workspace, providing:
//! - Variable declarations and the registry bag (`registry`)
//! - Payoff functions and path contexts (`payoff`)
//! - Utility transforms for risk attitude (`utility`)
//! - Error types: `ModelError` (`error`)
//!
//! The crate holds pure data and validation only; tree expansion and
//! backward induction live one layer up, in `dtree_engine`.
//!
//! ## Usage Examples
//!
//! ```rust
//! use dtree_core::registry::{Branch, OptimizeSense, Registry};
//!
//! let mut registry = Registry::new();
//! registry
//!     .decision(
//!         "drill",
//!         vec![
//!             Branch::decision("yes", -100.0, "outcome"),
//!             Branch::decision("no", 0.0, "payout"),
//!         ],
//!         OptimizeSense::Maximize,
//!     )
//!     .unwrap();
//! registry
//!     .chance(
//!         "outcome",
//!         vec![
//!             Branch::chance("dry", 0.6, 0.0, "payout"),
//!             Branch::chance("wet", 0.4, 500.0, "payout"),
//!         ],
//!     )
//!     .unwrap();
//! registry.terminal("payout", None);
//!
//! assert_eq!(registry.len(), 3);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod error;
pub mod payoff;
pub mod registry;
pub mod utility;

pub use error::ModelError;
pub use payoff::{PathContext, Payoff, PayoffFn, SumPayoff};
pub use registry::{Branch, Kind, OptimizeSense, ProbabilityMode, Registry, VariableDecl};
pub use utility::UtilityFn;
