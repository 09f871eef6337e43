//! Utility transforms for risk attitude.
//!
//! Rollback can optionally score outcomes through a concave utility
//! transform instead of raw monetary value. Both supported transforms are
//! parameterised by a risk tolerance `rho`; larger tolerance means
//! behaviour closer to risk-neutral.

use serde::{Deserialize, Serialize};

/// Upper clamp applied to expected utility before inverting the
/// exponential transform, guarding the `ln(1 - u)` singularity as `u -> 1`.
const EXP_INVERSE_CLAMP: f64 = 0.9999;

/// Risk-attitude utility transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityFn {
    /// Exponential utility `U(x) = 1 - exp(-x / rho)`.
    #[serde(rename = "exp")]
    Exponential,
    /// Logarithmic utility `U(x) = ln(x + rho)`.
    #[serde(rename = "log")]
    Logarithmic,
}

impl UtilityFn {
    /// Transform a monetary value into utility.
    pub fn apply(&self, value: f64, risk_tolerance: f64) -> f64 {
        match self {
            UtilityFn::Exponential => 1.0 - (-value / risk_tolerance).exp(),
            UtilityFn::Logarithmic => (value + risk_tolerance).ln(),
        }
    }

    /// Invert the transform: the certain value whose utility equals `utility`.
    pub fn invert(&self, utility: f64, risk_tolerance: f64) -> f64 {
        match self {
            UtilityFn::Exponential => {
                -risk_tolerance * (1.0 - utility.min(EXP_INVERSE_CLAMP)).ln()
            }
            UtilityFn::Logarithmic => utility.exp() - risk_tolerance,
        }
    }
}
