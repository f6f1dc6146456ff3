//! NEAT population driver.
//!
//! Each generation: score the population on the worker pool, sort by score,
//! speciate, keep the elite, seed fresh template copies, breed the rest by
//! crossover of selected parents, then mutate the offspring. Scores carry a
//! growth penalty proportional to genome complexity.

use rand::Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::fitness::{score_task, Fitness};
use crate::mutation::{Mutation, MutationConfig};
use crate::network::Network;
use crate::record::NetworkRecord;
use crate::species::{speciate, Compatibility, Species};

/// Parent selection method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Selection {
    /// Index `floor(r^power * n)` into the sorted population; higher powers favour the top.
    Power { power: f64 },
    /// Roulette wheel over scores shifted to be non-negative.
    FitnessProportionate,
    /// Best of `size` random contestants wins with `probability`, else the next best, and so on.
    Tournament { size: usize, probability: f64 },
}

impl Selection {
    pub const POWER: Self = Self::Power { power: 4.0 };
    pub const TOURNAMENT: Self = Self::Tournament {
        size: 5,
        probability: 0.5,
    };
}

impl Default for Selection {
    fn default() -> Self {
        Self::POWER
    }
}

/// Population driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    pub population_size: usize,
    /// Best genomes carried over unchanged.
    pub elitism: usize,
    /// Fresh template copies added each generation.
    pub provenance: usize,
    /// Probability that an offspring is mutated.
    pub mutation_rate: f64,
    /// Mutations applied to a mutated offspring.
    pub mutation_amount: usize,
    /// Treat parents as equally fit during crossover.
    pub equal: bool,
    /// Clear genome state before scoring.
    pub clear: bool,
    pub selection: Selection,
    /// Operators drawn from when mutating.
    pub mutations: Vec<Mutation>,
    pub mutation: MutationConfig,
    /// Score penalty per unit of complexity (hidden nodes + connections + gates).
    pub growth: f64,
    /// Worker threads for fitness evaluation; `None` uses available parallelism.
    pub threads: Option<usize>,
    pub compatibility: Compatibility,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            elitism: 0,
            provenance: 0,
            mutation_rate: 0.3,
            mutation_amount: 1,
            equal: false,
            clear: false,
            selection: Selection::default(),
            mutations: Mutation::FFW.to_vec(),
            mutation: MutationConfig::default(),
            growth: 0.0001,
            threads: None,
            compatibility: Compatibility::default(),
        }
    }
}

/// A population of networks evolved against a fitness function.
pub struct Neat<F: Fitness> {
    config: NeatConfig,
    template: Network,
    population: Vec<Network>,
    fitness: F,
    species: Vec<Species>,
    next_species_id: usize,
    generation: usize,
    pool: ThreadPool,
}

impl<F: Fitness> Neat<F> {
    /// Create a population of unscored copies of `template`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::EmptyPopulation`] for a zero population size
    /// - [`NetworkError::TournamentTooLarge`] if tournament selection needs
    ///   more contestants than the population holds
    /// - [`NetworkError::ThreadPool`] if the worker pool cannot be built
    pub fn new(template: &Network, fitness: F, config: NeatConfig) -> Result<Self> {
        validate(&config, config.population_size)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .thread_name(|i| format!("fitness-{i}"))
            .build()?;

        let mut template = template.clone();
        template.score = None;
        let population = vec![template.clone(); config.population_size];

        Ok(Self {
            config,
            template,
            population,
            fitness,
            species: Vec::new(),
            next_species_id: 0,
            generation: 0,
            pool,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &NeatConfig {
        &self.config
    }

    /// Generations bred so far.
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn population(&self) -> &[Network] {
        &self.population
    }

    /// Species found at the last generation.
    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Score every genome on the worker pool, blocking until all are done.
    pub fn evaluate(&mut self) {
        let fitness = &self.fitness;
        let (growth, clear) = (self.config.growth, self.config.clear);
        let population = &mut self.population;

        self.pool.install(|| {
            population.par_iter_mut().for_each(|genome| {
                if clear {
                    genome.clear();
                }
                let raw = score_task(fitness, genome);
                #[allow(clippy::cast_precision_loss)]
                let penalty = genome.complexity() as f64 * growth;
                genome.score = Some(raw - penalty);
            });
        });
    }

    /// Sort by descending score; unscored genomes go last.
    pub fn sort(&mut self) {
        self.population.sort_by(|a, b| {
            let (a, b) = (
                a.score.unwrap_or(f64::NEG_INFINITY),
                b.score.unwrap_or(f64::NEG_INFINITY),
            );
            b.total_cmp(&a)
        });
    }

    /// Breed the next generation and return a copy of this generation's fittest genome.
    ///
    /// # Errors
    ///
    /// Propagates selection and crossover failures.
    pub fn evolve<R: Rng>(&mut self, rng: &mut R) -> Result<Network> {
        if self.population.iter().any(|g| g.score.is_none()) {
            self.evaluate();
        }
        self.sort();
        speciate(
            &mut self.species,
            &mut self.next_species_id,
            &self.population,
            &self.config.compatibility,
        );

        let fittest = self.population[0].clone();
        let size = self.population.len();
        let elitism = self.config.elitism.min(size);
        let provenance = self.config.provenance.min(size - elitism);
        let elitists: Vec<Network> = self.population[..elitism].to_vec();

        let mut next = Vec::with_capacity(size);
        for _ in 0..provenance {
            next.push(self.template.clone());
        }
        for _ in 0..size - elitism - provenance {
            next.push(self.offspring(rng)?);
        }

        self.population = next;
        self.mutate(rng);
        self.population.extend(elitists);
        for genome in &mut self.population {
            genome.score = None;
        }
        self.generation += 1;

        log::debug!(
            "generation {}: best score {:?}, {} species",
            self.generation,
            fittest.score,
            self.species.len()
        );
        Ok(fittest)
    }

    /// Crossover of two selected parents.
    ///
    /// # Errors
    ///
    /// Propagates selection and crossover failures.
    pub fn offspring<R: Rng>(&self, rng: &mut R) -> Result<Network> {
        let a = self.select_parent(rng)?;
        let b = self.select_parent(rng)?;
        Network::crossover(&self.population[a], &self.population[b], self.config.equal, rng)
    }

    /// Index of a parent chosen by the configured selection method.
    ///
    /// Power selection assumes the population is sorted.
    ///
    /// # Errors
    ///
    /// [`NetworkError::EmptyPopulation`] or [`NetworkError::TournamentTooLarge`].
    pub fn select_parent<R: Rng>(&self, rng: &mut R) -> Result<usize> {
        let n = self.population.len();
        validate(&self.config, n)?;
        let score = |i: usize| self.population[i].score.unwrap_or(f64::NEG_INFINITY);

        match self.config.selection {
            Selection::Power { power } => {
                #[allow(
                    clippy::cast_precision_loss,
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss
                )]
                let index = (rng.random::<f64>().powf(power) * n as f64).floor() as usize;
                Ok(index.min(n - 1))
            }
            Selection::FitnessProportionate => {
                let minimum = (0..n)
                    .map(score)
                    .filter(|s| s.is_finite())
                    .fold(0.0_f64, f64::min)
                    .abs();
                let weight = |i: usize| {
                    let s = score(i);
                    if s.is_finite() {
                        s + minimum
                    } else {
                        0.0
                    }
                };
                let total: f64 = (0..n).map(weight).sum();
                if !(total > 0.0 && total.is_finite()) {
                    return Ok(rng.random_range(0..n));
                }

                let target = rng.random::<f64>() * total;
                let mut value = 0.0;
                for i in 0..n {
                    value += weight(i);
                    if target < value {
                        return Ok(i);
                    }
                }
                Ok(rng.random_range(0..n))
            }
            Selection::Tournament { size, probability } => {
                let mut contestants: Vec<usize> =
                    (0..size).map(|_| rng.random_range(0..n)).collect();
                contestants.sort_by(|&a, &b| score(b).total_cmp(&score(a)));
                for (rank, &i) in contestants.iter().enumerate() {
                    if rng.random::<f64>() < probability || rank + 1 == contestants.len() {
                        return Ok(i);
                    }
                }
                Ok(contestants.first().copied().unwrap_or(0))
            }
        }
    }

    /// Mutate each genome with probability `mutation_rate`, `mutation_amount` times.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) {
        if self.config.mutations.is_empty() {
            return;
        }
        for genome in &mut self.population {
            if rng.random::<f64>() > self.config.mutation_rate {
                continue;
            }
            for _ in 0..self.config.mutation_amount {
                let mutation =
                    self.config.mutations[rng.random_range(0..self.config.mutations.len())];
                mutation.apply(genome, &self.config.mutation, rng);
            }
        }
    }

    /// The best genome, scoring the population first if needed.
    pub fn fittest(&mut self) -> &Network {
        if self.population.iter().any(|g| g.score.is_none()) {
            self.evaluate();
        }
        self.sort();
        &self.population[0]
    }

    /// Mean score, scoring the population first if needed.
    pub fn average(&mut self) -> f64 {
        if self.population.iter().any(|g| g.score.is_none()) {
            self.evaluate();
        }
        let total: f64 = self.population.iter().filter_map(|g| g.score).sum();
        #[allow(clippy::cast_precision_loss)]
        let n = self.population.len() as f64;
        total / n
    }

    /// Records of the current population.
    #[must_use]
    pub fn export(&self) -> Vec<NetworkRecord> {
        self.population.iter().map(Network::to_record).collect()
    }

    /// Replace the population with networks rebuilt from records.
    ///
    /// # Errors
    ///
    /// [`NetworkError::EmptyPopulation`] for no records, or any record error.
    pub fn import(&mut self, records: &[NetworkRecord]) -> Result<()> {
        if records.is_empty() {
            return Err(NetworkError::EmptyPopulation);
        }
        let population = records
            .iter()
            .map(Network::from_record)
            .collect::<Result<Vec<_>>>()?;
        self.config.population_size = population.len();
        self.population = population;
        Ok(())
    }
}

fn validate(config: &NeatConfig, population: usize) -> Result<()> {
    if population == 0 {
        return Err(NetworkError::EmptyPopulation);
    }
    if let Selection::Tournament { size, .. } = config.selection {
        if size > population {
            return Err(NetworkError::TournamentTooLarge { size, population });
        }
    }
    Ok(())
}
