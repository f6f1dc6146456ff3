//! Builders for common fixed topologies.

use rand::Rng;

use crate::activation::Activation;
use crate::error::{NetworkError, Result};
use crate::gene::{Connection, NodeId};
use crate::network::Network;

impl Network {
    /// Fully connected feed-forward network with the given layer sizes.
    ///
    /// `layers[0]` is the input size and the last entry the output size; every
    /// node of a layer connects to every node of the next one.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidSize`] for fewer than two layers or an
    /// empty layer.
    pub fn perceptron<R: Rng>(layers: &[usize], rng: &mut R) -> Result<Self> {
        let (&input, &output) = match (layers.first(), layers.last()) {
            (Some(input), Some(output)) if layers.len() >= 2 => (input, output),
            _ => {
                return Err(NetworkError::InvalidSize {
                    input: layers.first().copied().unwrap_or(0),
                    output: 0,
                })
            }
        };
        if layers.contains(&0) {
            return Err(NetworkError::InvalidSize { input, output });
        }

        let mut network = Self::unconnected(input, output, rng)?;
        let mut previous: Vec<NodeId> = network.node_ids()[..input].to_vec();
        for &size in &layers[1..layers.len() - 1] {
            let layer: Vec<NodeId> = (0..size)
                .map(|_| network.add_hidden_node(Activation::Logistic, rng))
                .collect();
            connect_all(&mut network, &previous, &layer, rng)?;
            previous = layer;
        }
        let outputs = network.node_ids()[input..input + output].to_vec();
        connect_all(&mut network, &previous, &outputs, rng)?;
        Ok(network)
    }

    /// Hopfield network: `size` inputs connected to `size` step-activated outputs.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidSize`] for a zero size.
    pub fn hopfield<R: Rng>(size: usize, rng: &mut R) -> Result<Self> {
        let mut network = Self::unconnected(size, size, rng)?;
        let ids = network.node_ids().to_vec();
        for &id in &ids[size..] {
            if let Some(node) = network.node_mut(id) {
                node.squash = Activation::Step;
            }
        }
        connect_all(&mut network, &ids[..size], &ids[size..], rng)?;
        Ok(network)
    }
}

fn connect_all<R: Rng>(
    network: &mut Network,
    from: &[NodeId],
    to: &[NodeId],
    rng: &mut R,
) -> Result<()> {
    for &a in from {
        for &b in to {
            network.connect(a, b, Connection::random_weight(rng))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_perceptron_counts() {
        let mut rng = test_rng();
        let network = Network::perceptron(&[2, 4, 3, 1], &mut rng).unwrap();
        assert_eq!(network.node_count(), 10);
        assert_eq!(network.connection_count(), 2 * 4 + 4 * 3 + 3);
        assert_eq!(network.gate_count(), 0);
        for (_, conn) in network.connections() {
            assert!(network.rank(conn.from()) < network.rank(conn.to()));
        }
    }

    #[test]
    fn test_perceptron_rejects_bad_layers() {
        let mut rng = test_rng();
        assert!(Network::perceptron(&[3], &mut rng).is_err());
        assert!(Network::perceptron(&[2, 0, 1], &mut rng).is_err());
    }

    #[test]
    fn test_hopfield_counts() {
        let mut rng = test_rng();
        let mut network = Network::hopfield(4, &mut rng).unwrap();
        assert_eq!(network.node_count(), 8);
        assert_eq!(network.connection_count(), 16);
        assert_eq!(network.gate_count(), 0);

        let output = network.activate(&[1.0, 0.0, 1.0, 0.0]).unwrap();
        assert!(output.iter().all(|&v| v == 0.0 || v == 1.0));
    }
}
