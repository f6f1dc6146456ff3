//! Loss functions comparing a target vector with a network output.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-15;

/// A loss function over `(target, output)` pairs of equal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cost {
    /// Binary cross entropy, outputs clamped away from zero.
    CrossEntropy,
    /// Mean squared error.
    #[default]
    Mse,
    /// Mean bias error: average signed deviation `output - target`.
    Mbe,
    /// Fraction of values whose rounded halves disagree.
    Binary,
    /// Mean absolute error.
    Mae,
    /// Mean absolute percentage error.
    Mape,
    /// Weighted absolute percentage error.
    Wape,
    /// Mean squared logarithmic error.
    Msle,
    /// Hinge loss for targets in {-1, 1}.
    Hinge,
}

impl Cost {
    /// Compute the loss.
    ///
    /// Only the common prefix of `target` and `output` is compared; callers
    /// validate lengths beforehand.
    #[must_use]
    pub fn calculate(self, target: &[f64], output: &[f64]) -> f64 {
        let pairs = target.iter().zip(output).map(|(&t, &o)| (t, o));
        #[allow(clippy::cast_precision_loss)]
        let n = target.len().min(output.len()).max(1) as f64;

        match self {
            Self::CrossEntropy => {
                -pairs
                    .map(|(t, o)| {
                        let o = o.max(EPSILON);
                        t * o.ln() + (1.0 - t) * (1.0 - o).max(EPSILON).ln()
                    })
                    .sum::<f64>()
                    / n
            }
            Self::Mse => pairs.map(|(t, o)| (t - o).powi(2)).sum::<f64>() / n,
            Self::Mbe => pairs.map(|(t, o)| o - t).sum::<f64>() / n,
            Self::Binary => {
                let misses = pairs
                    .filter(|&(t, o)| (t * 2.0).round() != (o * 2.0).round())
                    .count();
                #[allow(clippy::cast_precision_loss)]
                let misses = misses as f64;
                misses / n
            }
            Self::Mae => pairs.map(|(t, o)| (t - o).abs()).sum::<f64>() / n,
            Self::Mape => {
                pairs
                    .map(|(t, o)| ((o - t) / t.max(EPSILON)).abs())
                    .sum::<f64>()
                    / n
            }
            Self::Wape => {
                let (deviation, total) = pairs.fold((0.0, 0.0), |(d, s), (t, o)| {
                    (d + (t - o).abs(), s + t.abs())
                });
                deviation / total.max(EPSILON)
            }
            Self::Msle => {
                pairs
                    .map(|(t, o)| (t.max(EPSILON).ln() - o.max(EPSILON).ln()).powi(2))
                    .sum::<f64>()
                    / n
            }
            Self::Hinge => pairs.map(|(t, o)| (1.0 - t * o).max(0.0)).sum::<f64>() / n,
        }
    }
}
