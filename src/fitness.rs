//! Fitness functions scoring networks during evolution.
//!
//! Higher scores are better. Scores are computed on worker threads, so
//! implementations must be `Sync`; each call gets exclusive access to the
//! genome it scores.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::cost::Cost;
use crate::network::Network;
use crate::training::Sample;

/// Scores a single genome.
pub trait Fitness: Sync {
    fn score(&self, network: &mut Network) -> f64;
}

impl<F> Fitness for F
where
    F: Fn(&mut Network) -> f64 + Sync,
{
    fn score(&self, network: &mut Network) -> f64 {
        self(network)
    }
}

/// Negated mean test error over a dataset, averaged over `amount` repeats.
///
/// Repeats matter for recurrent genomes, whose state carries from one pass
/// to the next.
#[derive(Debug, Clone)]
pub struct DatasetFitness {
    set: Vec<Sample>,
    cost: Cost,
    amount: usize,
}

impl DatasetFitness {
    #[must_use]
    pub fn new(set: Vec<Sample>, cost: Cost, amount: usize) -> Self {
        Self {
            set,
            cost,
            amount: amount.max(1),
        }
    }
}

impl Fitness for DatasetFitness {
    fn score(&self, network: &mut Network) -> f64 {
        let mut score = 0.0;
        for _ in 0..self.amount {
            match network.test(&self.set, self.cost) {
                Ok(result) => score -= result.error,
                Err(err) => {
                    log::warn!("genome cannot be tested: {err}");
                    return f64::NEG_INFINITY;
                }
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let amount = self.amount as f64;
        score / amount
    }
}

/// Run one fitness task. NaN scores and panics count as the worst score.
pub(crate) fn score_task<F: Fitness + ?Sized>(fitness: &F, network: &mut Network) -> f64 {
    match catch_unwind(AssertUnwindSafe(|| fitness.score(network))) {
        Ok(score) if score.is_nan() => f64::NEG_INFINITY,
        Ok(score) => score,
        Err(_) => {
            log::warn!("fitness task panicked; scoring genome as -inf");
            f64::NEG_INFINITY
        }
    }
}
