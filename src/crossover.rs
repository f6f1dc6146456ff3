//! Crossover and compatibility distance over innovation-aligned genes.
//!
//! Both operations view a network as a map from innovation id to connection
//! gene. Innovation ids are computed from the current node indices, which
//! line up between parents because every network shares the same layout:
//! inputs, then outputs, then hidden nodes.

use std::collections::BTreeMap;

use rand::Rng;

use crate::error::{NetworkError, Result};
use crate::gene::Node;
use crate::innovation::{connection_innovation, innovation_endpoints};
use crate::network::Network;

#[derive(Debug, Clone, Copy)]
struct Gene {
    weight: f64,
    gater: Option<usize>,
}

/// Regular and active self-connections keyed by innovation id.
fn genes(network: &Network) -> BTreeMap<u64, Gene> {
    network
        .connections()
        .chain(network.self_connections())
        .map(|(_, conn)| {
            let from = network.nodes[conn.from].index;
            let to = network.nodes[conn.to].index;
            let gene = Gene {
                weight: conn.weight,
                gater: conn.gater.map(|g| network.nodes[g].index),
            };
            (connection_innovation(from, to), gene)
        })
        .collect()
}

impl Network {
    /// Combine two parents into an offspring.
    ///
    /// Offspring size is a uniform draw between the parents' node counts when
    /// `equal` is set or the scores tie, else the fitter parent's node count.
    /// Each node slot copies bias and squash from a random parent, forced to
    /// the longer parent past the shorter one's end. Matching genes come from
    /// either parent at random; disjoint genes come from the fitter parent
    /// (both when equal). Genes and gates referencing indices past the
    /// offspring size are dropped. Missing scores count as zero.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::IncompatibleNetworks`] if the parents differ
    /// in input or output size.
    pub fn crossover<R: Rng>(a: &Self, b: &Self, equal: bool, rng: &mut R) -> Result<Self> {
        if a.input_size() != b.input_size() || a.output_size() != b.output_size() {
            return Err(NetworkError::IncompatibleNetworks {
                left_input: a.input_size(),
                left_output: a.output_size(),
                right_input: b.input_size(),
                right_output: b.output_size(),
            });
        }

        let score_a = a.score.unwrap_or(0.0);
        let score_b = b.score.unwrap_or(0.0);
        let tied = equal || score_a == score_b;

        let size = if tied {
            let min = a.node_count().min(b.node_count());
            let max = a.node_count().max(b.node_count());
            rng.random_range(min..=max)
        } else if score_a > score_b {
            a.node_count()
        } else {
            b.node_count()
        };

        let mut offspring = Self::empty(a.input_size(), a.output_size())?;
        for i in 0..size {
            let source = if i >= a.node_count() {
                b
            } else if i >= b.node_count() || rng.random::<f64>() >= 0.5 {
                a
            } else {
                b
            };
            let node = &source.nodes[source.order[i]];
            offspring.push_node(Node::new(node.node_type, node.bias, node.squash));
        }

        let mut genes_b = genes(b);
        let mut inherited = Vec::new();
        for (key, gene) in genes(a) {
            if let Some(other) = genes_b.remove(&key) {
                let pick = if rng.random::<f64>() >= 0.5 { gene } else { other };
                inherited.push((key, pick));
            } else if tied || score_a >= score_b {
                inherited.push((key, gene));
            }
        }
        if tied || score_b >= score_a {
            inherited.extend(genes_b);
        }

        for (key, gene) in inherited {
            let (from, to) = innovation_endpoints(key);
            if from >= size || to >= size {
                continue;
            }
            let id = offspring.connect(offspring.order[from], offspring.order[to], gene.weight)?;
            if let Some(gater) = gene.gater.filter(|&g| g < size) {
                offspring.gate(offspring.order[gater], id)?;
            }
        }

        Ok(offspring)
    }

    /// NEAT compatibility distance between two networks.
    ///
    /// `c1 * excess / n + c2 * disjoint / n + c3 * mean |Δw|`, where `n` is the
    /// larger gene count and excess genes lie beyond the other network's
    /// highest innovation id.
    #[must_use]
    pub fn compatibility_distance(
        &self,
        other: &Self,
        excess_coeff: f64,
        disjoint_coeff: f64,
        weight_coeff: f64,
    ) -> f64 {
        let ours = genes(self);
        let theirs = genes(other);
        let our_max = ours.keys().next_back().copied().unwrap_or(0);
        let their_max = theirs.keys().next_back().copied().unwrap_or(0);

        let mut matching = 0_usize;
        let mut disjoint = 0_usize;
        let mut excess = 0_usize;
        let mut weight_diff_sum = 0.0;

        for (key, gene) in &ours {
            if let Some(other_gene) = theirs.get(key) {
                matching += 1;
                weight_diff_sum += (gene.weight - other_gene.weight).abs();
            } else if *key > their_max {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }
        for key in theirs.keys().filter(|k| !ours.contains_key(k)) {
            if *key > our_max {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let n = ours.len().max(theirs.len()).max(1) as f64;
        #[allow(clippy::cast_precision_loss)]
        let avg_weight_diff = if matching > 0 {
            weight_diff_sum / matching as f64
        } else {
            0.0
        };

        #[allow(clippy::cast_precision_loss)]
        let distance = excess_coeff * excess as f64 / n + disjoint_coeff * disjoint as f64 / n;
        distance + weight_coeff * avg_weight_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::mutation::{Mutation, MutationConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn gated(rng: &mut ChaCha8Rng) -> Network {
        let mut network = Network::new(2, 1, rng).unwrap();
        let hidden = network.add_hidden_node(Activation::Relu, rng);
        let ids = network.node_ids().to_vec();
        network.connect(ids[0], hidden, 0.8).unwrap();
        network.connect(hidden, ids[2], -0.4).unwrap();
        network.connect(hidden, hidden, 0.5).unwrap();
        let conn = network.connection_between(ids[1], ids[2]).unwrap();
        network.gate(hidden, conn).unwrap();
        network
    }

    #[test]
    fn test_identical_parents_reproduce_structure() {
        let mut rng = test_rng();
        let parent = gated(&mut rng);
        let child = Network::crossover(&parent, &parent, true, &mut rng).unwrap();

        assert_eq!(child.node_count(), parent.node_count());
        assert_eq!(child.connection_count(), parent.connection_count());
        assert_eq!(child.self_connection_count(), 1);
        assert_eq!(child.gate_count(), 1);
        for (&c, &p) in child.node_ids().iter().zip(parent.node_ids()) {
            let (c, p) = (child.node(c).unwrap(), parent.node(p).unwrap());
            assert_eq!(c.bias, p.bias);
            assert_eq!(c.squash, p.squash);
            assert_eq!(c.node_type(), p.node_type());
        }
        let sorted = |network: &Network| {
            let mut connections = network.to_record().connections;
            connections.sort_by_key(|c| (c.from_index, c.to_index));
            connections
        };
        assert_eq!(sorted(&child), sorted(&parent));
    }

    #[test]
    fn test_mismatched_shapes_rejected() {
        let mut rng = test_rng();
        let a = Network::new(2, 1, &mut rng).unwrap();
        let b = Network::new(3, 1, &mut rng).unwrap();
        assert!(matches!(
            Network::crossover(&a, &b, false, &mut rng),
            Err(NetworkError::IncompatibleNetworks { .. })
        ));
    }

    #[test]
    fn test_fitter_parent_sets_size_and_genes() {
        let mut rng = test_rng();
        let config = MutationConfig::default();
        let mut big = Network::new(2, 1, &mut rng).unwrap();
        for _ in 0..3 {
            Mutation::AddNode.apply(&mut big, &config, &mut rng);
        }
        let mut small = Network::new(2, 1, &mut rng).unwrap();

        big.score = Some(1.0);
        small.score = Some(0.0);
        let child = Network::crossover(&big, &small, false, &mut rng).unwrap();
        assert_eq!(child.node_count(), big.node_count());
        assert_eq!(child.connection_count(), big.connection_count());

        big.score = Some(-1.0);
        let child = Network::crossover(&big, &small, false, &mut rng).unwrap();
        assert_eq!(child.node_count(), small.node_count());
        assert!(child.connection_count() <= small.connection_count());
        for (_, conn) in child.connections() {
            assert!(child.node(conn.to()).is_some());
        }
    }

    #[test]
    fn test_equal_size_is_bounded() {
        let mut rng = test_rng();
        let config = MutationConfig::default();
        let a = Network::new(2, 1, &mut rng).unwrap();
        let mut b = a.clone();
        for _ in 0..4 {
            Mutation::AddNode.apply(&mut b, &config, &mut rng);
        }
        for _ in 0..20 {
            let child = Network::crossover(&a, &b, true, &mut rng).unwrap();
            assert!((a.node_count()..=b.node_count()).contains(&child.node_count()));
        }
    }

    #[test]
    fn test_compatibility_distance() {
        let mut rng = test_rng();
        let a = Network::new(2, 1, &mut rng).unwrap();
        assert_eq!(a.compatibility_distance(&a, 1.0, 1.0, 0.4), 0.0);

        let mut b = a.clone();
        Mutation::AddNode.apply(&mut b, &MutationConfig::default(), &mut rng);
        let distance = a.compatibility_distance(&b, 1.0, 1.0, 0.4);
        assert!(distance > 0.0);
        assert!((distance - b.compatibility_distance(&a, 1.0, 1.0, 0.4)).abs() < 1e-12);
    }
}
