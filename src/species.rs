//! Species bookkeeping for the NEAT driver.

use serde::{Deserialize, Serialize};

use crate::network::Network;

/// Coefficients and threshold of the compatibility distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compatibility {
    /// Coefficient for excess genes.
    pub excess_coeff: f64,
    /// Coefficient for disjoint genes.
    pub disjoint_coeff: f64,
    /// Coefficient for the mean weight difference of matching genes.
    pub weight_coeff: f64,
    /// Genomes closer than this to a representative join its species.
    pub threshold: f64,
}

impl Default for Compatibility {
    fn default() -> Self {
        Self {
            excess_coeff: 1.0,
            disjoint_coeff: 1.0,
            weight_coeff: 0.4,
            threshold: 3.0,
        }
    }
}

impl Compatibility {
    #[must_use]
    pub fn distance(&self, a: &Network, b: &Network) -> f64 {
        a.compatibility_distance(b, self.excess_coeff, self.disjoint_coeff, self.weight_coeff)
    }
}

/// A group of structurally similar genomes.
#[derive(Debug, Clone)]
pub struct Species {
    pub id: usize,
    /// Genome new members are compared against.
    pub representative: Network,
    /// Population indices of the current members.
    pub members: Vec<usize>,
    pub average_fitness: f64,
    pub best_fitness: f64,
    /// Generations since `best_fitness` last improved.
    pub stagnation: u32,
}

impl Species {
    #[must_use]
    pub fn new(id: usize, representative: Network) -> Self {
        Self {
            id,
            representative,
            members: Vec::new(),
            average_fitness: 0.0,
            best_fitness: f64::NEG_INFINITY,
            stagnation: 0,
        }
    }

    #[must_use]
    pub fn is_compatible(&self, genome: &Network, compatibility: &Compatibility) -> bool {
        compatibility.distance(genome, &self.representative) < compatibility.threshold
    }

    /// Refresh fitness statistics and make the best member the representative.
    pub fn update_stats(&mut self, genomes: &[Network]) {
        let score = |i: usize| genomes[i].score.unwrap_or(f64::NEG_INFINITY);
        let Some(&best) = self
            .members
            .iter()
            .max_by(|&&a, &&b| score(a).total_cmp(&score(b)))
        else {
            return;
        };

        let total: f64 = self.members.iter().map(|&i| score(i)).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.members.len() as f64;
        self.average_fitness = total / count;

        if score(best) > self.best_fitness {
            self.best_fitness = score(best);
            self.stagnation = 0;
        } else {
            self.stagnation += 1;
        }
        self.representative = genomes[best].clone();
    }
}

/// Assign every genome to the first compatible species, founding new species
/// as needed, and drop species left without members.
pub(crate) fn speciate(
    species: &mut Vec<Species>,
    next_id: &mut usize,
    genomes: &[Network],
    compatibility: &Compatibility,
) {
    for s in species.iter_mut() {
        s.members.clear();
    }

    for (i, genome) in genomes.iter().enumerate() {
        if let Some(s) = species
            .iter_mut()
            .find(|s| s.is_compatible(genome, compatibility))
        {
            s.members.push(i);
        } else {
            let mut founded = Species::new(*next_id, genome.clone());
            *next_id += 1;
            founded.members.push(i);
            species.push(founded);
        }
    }

    species.retain(|s| !s.members.is_empty());
    for s in species.iter_mut() {
        s.update_stats(genomes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{Mutation, MutationConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_identical_genomes_share_species() {
        let mut rng = test_rng();
        let mut genome = Network::new(2, 1, &mut rng).unwrap();
        genome.score = Some(1.0);
        let genomes = vec![genome.clone(), genome.clone(), genome];

        let mut species = Vec::new();
        let mut next_id = 0;
        speciate(&mut species, &mut next_id, &genomes, &Compatibility::default());

        assert_eq!(species.len(), 1);
        assert_eq!(species[0].members, vec![0, 1, 2]);
        assert_eq!(species[0].best_fitness, 1.0);
        assert_eq!(next_id, 1);
    }

    #[test]
    fn test_distant_genomes_split() {
        let mut rng = test_rng();
        let base = Network::new(2, 1, &mut rng).unwrap();
        let mut grown = base.clone();
        for _ in 0..6 {
            Mutation::AddNode.apply(&mut grown, &MutationConfig::default(), &mut rng);
        }
        let strict = Compatibility {
            threshold: 0.1,
            ..Compatibility::default()
        };

        let mut species = Vec::new();
        let mut next_id = 0;
        speciate(&mut species, &mut next_id, &[base, grown], &strict);
        assert_eq!(species.len(), 2);
    }

    #[test]
    fn test_stagnation_counts_generations_without_improvement() {
        let mut rng = test_rng();
        let mut genome = Network::new(1, 1, &mut rng).unwrap();
        genome.score = Some(0.5);
        let genomes = vec![genome.clone()];
        let mut s = Species::new(0, genome);
        s.members.push(0);

        s.update_stats(&genomes);
        s.update_stats(&genomes);
        assert_eq!(s.stagnation, 1);
        assert_eq!(s.average_fitness, 0.5);
    }
}
