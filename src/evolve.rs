//! Neuro-evolution of a single network through a NEAT population.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cost::Cost;
use crate::error::{NetworkError, Result};
use crate::fitness::{DatasetFitness, Fitness};
use crate::neat::{Neat, NeatConfig};
use crate::network::Network;
use crate::training::Sample;

/// Options for [`Network::evolve`].
///
/// At least one of `iterations` and `error` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolveOptions {
    /// Maximum number of generations; unbounded when `None`.
    pub iterations: Option<usize>,
    /// Target error of the fittest genome, growth penalty excluded.
    pub error: Option<f64>,
    /// Loss used by the dataset fitness.
    pub cost: Cost,
    /// Test passes per dataset fitness evaluation.
    pub amount: usize,
    /// Log progress every this many generations.
    pub log: Option<usize>,
    /// Invoke the schedule callback every this many generations.
    pub schedule: Option<usize>,
    pub neat: NeatConfig,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        Self {
            iterations: None,
            error: None,
            cost: Cost::Mse,
            amount: 1,
            log: None,
            schedule: None,
            neat: NeatConfig::default(),
        }
    }
}

/// Progress passed to the schedule callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolveProgress {
    pub generation: usize,
    /// Score of this generation's fittest genome.
    pub fitness: f64,
    /// Error of this generation's fittest genome.
    pub error: f64,
    pub species: usize,
}

/// Outcome of an evolution run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolveResult {
    /// Error of the adopted genome.
    pub error: f64,
    /// Score of the adopted genome.
    pub fitness: f64,
    /// Generations bred.
    pub iterations: usize,
    pub time: Duration,
}

impl Network {
    /// Evolve this network against a dataset and adopt the fittest genome found.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::MissingStopCriterion`] if neither `iterations` nor `error` is set
    /// - [`NetworkError::EmptyDataset`] or a size mismatch for a bad dataset
    /// - any error of [`Neat::new`]
    pub fn evolve<R: Rng>(
        &mut self,
        set: &[Sample],
        options: &EvolveOptions,
        rng: &mut R,
    ) -> Result<EvolveResult> {
        self.check_set(set)?;
        let fitness = DatasetFitness::new(set.to_vec(), options.cost, options.amount);
        self.evolve_with(fitness, options, rng)
    }

    /// Evolve against a custom fitness function.
    ///
    /// # Errors
    ///
    /// Same as [`evolve`](Self::evolve), minus the dataset checks.
    pub fn evolve_with<F: Fitness, R: Rng>(
        &mut self,
        fitness: F,
        options: &EvolveOptions,
        rng: &mut R,
    ) -> Result<EvolveResult> {
        self.evolve_with_schedule(fitness, options, rng, |_| {})
    }

    /// [`evolve_with`](Self::evolve_with) with a callback invoked every
    /// `options.schedule` generations.
    ///
    /// # Errors
    ///
    /// Same as [`evolve_with`](Self::evolve_with).
    pub fn evolve_with_schedule<F, R, S>(
        &mut self,
        fitness: F,
        options: &EvolveOptions,
        rng: &mut R,
        mut schedule: S,
    ) -> Result<EvolveResult>
    where
        F: Fitness,
        R: Rng,
        S: FnMut(&EvolveProgress),
    {
        if options.iterations.is_none() && options.error.is_none() {
            return Err(NetworkError::MissingStopCriterion);
        }

        let target_error = options.error.unwrap_or(f64::NEG_INFINITY);
        let growth = options.neat.growth;
        let start = Instant::now();
        let mut neat = Neat::new(self, fitness, options.neat.clone())?;

        let mut error = f64::INFINITY;
        let mut best: Option<(Network, f64, f64)> = None;

        while error > target_error
            && !matches!(options.iterations, Some(cap) if neat.generation() >= cap)
        {
            let fittest = neat.evolve(rng)?;
            let fitness = fittest.score.unwrap_or(f64::NEG_INFINITY);
            #[allow(clippy::cast_precision_loss)]
            let penalty = fittest.complexity() as f64 * growth;
            error = -(fitness + penalty);

            if best.as_ref().is_none_or(|(_, best_fitness, _)| fitness > *best_fitness) {
                best = Some((fittest, fitness, error));
            }

            let generation = neat.generation();
            let species = neat.species().len();
            if options.log.is_some_and(|every| every > 0 && generation % every == 0) {
                log::info!(
                    "generation {generation}: fitness {fitness:.6}, error {error:.6}, {species} species"
                );
            }
            if options.schedule.is_some_and(|every| every > 0 && generation % every == 0) {
                schedule(&EvolveProgress {
                    generation,
                    fitness,
                    error,
                    species,
                });
            }
        }

        let iterations = neat.generation();
        let (fitness, error) = match best {
            Some((genome, fitness, error)) => {
                self.adopt(genome, options.neat.clear);
                (fitness, error)
            }
            None => (f64::NEG_INFINITY, error),
        };

        Ok(EvolveResult {
            error,
            fitness,
            iterations,
            time: start.elapsed(),
        })
    }

    /// Take over the structure and parameters of `genome`, keeping this
    /// network's dropout rate.
    fn adopt(&mut self, genome: Self, clear: bool) {
        let dropout = self.dropout;
        *self = genome;
        self.dropout = dropout;
        if clear {
            self.clear();
        }
    }
}
