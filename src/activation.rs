//! Squash (activation) functions for network nodes.
//!
//! Every function is paired with its derivative, which backpropagation reads
//! from the pre-activation state of the node. Variants serialize to a stable
//! upper-case id (`"LOGISTIC"`, `"TANH"`, ...) used by the network record.

use rand::Rng;
use serde::{Deserialize, Serialize};

const SELU_ALPHA: f64 = 1.673_263_242_354_377_3;
const SELU_SCALE: f64 = 1.050_700_987_355_480_5;

/// Activation function applied to a node's summed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activation {
    /// Logistic sigmoid: f(x) = 1 / (1 + e^(-x))
    #[default]
    Logistic,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Identity function: f(x) = x
    Identity,
    /// Step function: f(x) = 1 if x > 0 else 0
    Step,
    /// Rectified Linear Unit: f(x) = max(0, x)
    Relu,
    /// Softsign: f(x) = x / (1 + |x|)
    Softsign,
    /// Sine function: f(x) = sin(x)
    Sinusoid,
    /// Gaussian: f(x) = e^(-x^2)
    Gaussian,
    /// Bent identity: f(x) = (sqrt(x^2 + 1) - 1) / 2 + x
    BentIdentity,
    /// Bipolar step: f(x) = 1 if x > 0 else -1
    Bipolar,
    /// Bipolar sigmoid: f(x) = 2 / (1 + e^(-x)) - 1
    BipolarSigmoid,
    /// Hard tanh: f(x) = clamp(x, -1, 1)
    HardTanh,
    /// Absolute value: f(x) = |x|
    Absolute,
    /// Inverse: f(x) = 1 - x
    Inverse,
    /// Scaled exponential linear unit.
    Selu,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 15] = [
        Self::Logistic,
        Self::Tanh,
        Self::Identity,
        Self::Step,
        Self::Relu,
        Self::Softsign,
        Self::Sinusoid,
        Self::Gaussian,
        Self::BentIdentity,
        Self::Bipolar,
        Self::BipolarSigmoid,
        Self::HardTanh,
        Self::Absolute,
        Self::Inverse,
        Self::Selu,
    ];

    /// Apply this activation function to an input value.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Logistic => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Identity => x,
            Self::Step => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Relu => {
                if x > 0.0 {
                    x
                } else {
                    0.0
                }
            }
            Self::Softsign => x / (1.0 + x.abs()),
            Self::Sinusoid => x.sin(),
            Self::Gaussian => (-x * x).exp(),
            Self::BentIdentity => (x.mul_add(x, 1.0).sqrt() - 1.0) / 2.0 + x,
            Self::Bipolar => {
                if x > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::BipolarSigmoid => 2.0 / (1.0 + (-x).exp()) - 1.0,
            Self::HardTanh => x.clamp(-1.0, 1.0),
            Self::Absolute => x.abs(),
            Self::Inverse => 1.0 - x,
            Self::Selu => {
                let fx = if x > 0.0 {
                    x
                } else {
                    SELU_ALPHA * x.exp() - SELU_ALPHA
                };
                fx * SELU_SCALE
            }
        }
    }

    /// Derivative of this activation function at `x` (the pre-activation state).
    #[inline]
    #[must_use]
    pub fn derivative(self, x: f64) -> f64 {
        match self {
            Self::Logistic => {
                let fx = self.apply(x);
                fx * (1.0 - fx)
            }
            Self::Tanh => 1.0 - x.tanh().powi(2),
            Self::Identity => 1.0,
            Self::Step | Self::Bipolar => 0.0,
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Softsign => {
                let d = 1.0 + x.abs();
                1.0 / (d * d)
            }
            Self::Sinusoid => x.cos(),
            Self::Gaussian => -2.0 * x * (-x * x).exp(),
            Self::BentIdentity => x / (2.0 * x.mul_add(x, 1.0).sqrt()) + 1.0,
            Self::BipolarSigmoid => {
                let d = self.apply(x);
                0.5 * (1.0 + d) * (1.0 - d)
            }
            Self::HardTanh => {
                if x > -1.0 && x < 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Absolute => {
                if x < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            Self::Inverse => -1.0,
            Self::Selu => {
                if x > 0.0 {
                    SELU_SCALE
                } else {
                    SELU_ALPHA * x.exp() * SELU_SCALE
                }
            }
        }
    }

    /// Stable string id of this function, as written in network records.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Logistic => "LOGISTIC",
            Self::Tanh => "TANH",
            Self::Identity => "IDENTITY",
            Self::Step => "STEP",
            Self::Relu => "RELU",
            Self::Softsign => "SOFTSIGN",
            Self::Sinusoid => "SINUSOID",
            Self::Gaussian => "GAUSSIAN",
            Self::BentIdentity => "BENT_IDENTITY",
            Self::Bipolar => "BIPOLAR",
            Self::BipolarSigmoid => "BIPOLAR_SIGMOID",
            Self::HardTanh => "HARD_TANH",
            Self::Absolute => "ABSOLUTE",
            Self::Inverse => "INVERSE",
            Self::Selu => "SELU",
        }
    }

    /// Pick a function from `allowed` that differs from `self`.
    ///
    /// Returns `self` unchanged when `allowed` offers no alternative.
    pub fn mutated<R: Rng>(self, allowed: &[Self], rng: &mut R) -> Self {
        match allowed.len() {
            0 => self,
            1 => allowed[0],
            len => {
                let offset = rng.random_range(1..len);
                let current = allowed.iter().position(|&a| a == self);
                match current {
                    Some(pos) => allowed[(pos + offset) % len],
                    None => allowed[rng.random_range(0..len)],
                }
            }
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn numeric_derivative(act: Activation, x: f64) -> f64 {
        let h = 1e-6;
        (act.apply(x + h) - act.apply(x - h)) / (2.0 * h)
    }

    #[test]
    fn test_logistic() {
        assert!((Activation::Logistic.apply(0.0) - 0.5).abs() < 1e-12);
        assert!(Activation::Logistic.apply(10.0) > 0.99);
        assert!((Activation::Logistic.derivative(0.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_smooth_derivatives_match_finite_differences() {
        let smooth = [
            Activation::Logistic,
            Activation::Tanh,
            Activation::Identity,
            Activation::Softsign,
            Activation::Sinusoid,
            Activation::Gaussian,
            Activation::BentIdentity,
            Activation::BipolarSigmoid,
            Activation::Inverse,
        ];
        for act in smooth {
            for &x in &[-1.3, -0.2, 0.4, 2.1] {
                let analytic = act.derivative(x);
                let numeric = numeric_derivative(act, x);
                assert!(
                    (analytic - numeric).abs() < 1e-5,
                    "{act}: analytic {analytic} vs numeric {numeric} at {x}"
                );
            }
        }
    }

    #[test]
    fn test_piecewise() {
        assert_eq!(Activation::Step.apply(0.1), 1.0);
        assert_eq!(Activation::Step.apply(-0.1), 0.0);
        assert_eq!(Activation::Relu.apply(-3.0), 0.0);
        assert_eq!(Activation::Bipolar.apply(-0.5), -1.0);
        assert_eq!(Activation::HardTanh.apply(4.0), 1.0);
        assert_eq!(Activation::Absolute.derivative(-2.0), -1.0);
        assert!((Activation::Selu.apply(1.0) - SELU_SCALE).abs() < 1e-12);
    }

    #[test]
    fn test_serde_id_matches_name() {
        for act in Activation::ALL {
            let json = serde_json::to_string(&act).unwrap();
            assert_eq!(json, format!("\"{}\"", act.name()));
        }
    }

    #[test]
    fn test_mutated_always_changes() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let next = Activation::Tanh.mutated(&Activation::ALL, &mut rng);
            assert_ne!(next, Activation::Tanh);
        }
        assert_eq!(
            Activation::Tanh.mutated(&[Activation::Relu], &mut rng),
            Activation::Relu
        );
    }
}
