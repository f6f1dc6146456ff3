//! Learning-rate policies: pure functions of the base rate and the iteration number.

use serde::{Deserialize, Serialize};

/// How the learning rate evolves over training iterations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum RatePolicy {
    /// Constant rate.
    #[default]
    Fixed,
    /// Multiply by `gamma` every `step_size` iterations.
    Step { gamma: f64, step_size: usize },
    /// Multiply by `gamma` every iteration.
    Exp { gamma: f64 },
    /// `base * (1 + gamma * iteration)^-power`.
    Inv { gamma: f64, power: f64 },
}

impl RatePolicy {
    /// Step policy with gamma 0.9 every 100 iterations.
    pub const STEP: Self = Self::Step {
        gamma: 0.9,
        step_size: 100,
    };
    /// Exponential policy with gamma 0.999.
    pub const EXP: Self = Self::Exp { gamma: 0.999 };
    /// Inverse policy with gamma 0.001 and power 2.
    pub const INV: Self = Self::Inv {
        gamma: 0.001,
        power: 2.0,
    };

    /// Learning rate for `iteration`, starting from `base`.
    #[must_use]
    pub fn rate(self, base: f64, iteration: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let iter = iteration as f64;
        match self {
            Self::Fixed => base,
            Self::Step { gamma, step_size } => {
                let steps = iteration / step_size.max(1);
                base * gamma.powi(i32::try_from(steps).unwrap_or(i32::MAX))
            }
            Self::Exp { gamma } => base * gamma.powf(iter),
            Self::Inv { gamma, power } => base * (1.0 + gamma * iter).powf(-power),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed() {
        assert_eq!(RatePolicy::Fixed.rate(0.3, 1000), 0.3);
    }

    #[test]
    fn test_step_decays_in_stairs() {
        let policy = RatePolicy::STEP;
        assert_eq!(policy.rate(1.0, 99), 1.0);
        assert!((policy.rate(1.0, 100) - 0.9).abs() < 1e-12);
        assert!((policy.rate(1.0, 250) - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_exp_and_inv_decrease() {
        for policy in [RatePolicy::EXP, RatePolicy::INV] {
            assert_eq!(policy.rate(0.5, 0), 0.5);
            assert!(policy.rate(0.5, 10) < policy.rate(0.5, 1));
        }
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_string(&RatePolicy::EXP).unwrap();
        assert_eq!(json, r#"{"policy":"exp","gamma":0.999}"#);
    }
}
