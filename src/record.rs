//! Plain-data record of a network, the only persisted representation.
//!
//! The record lists nodes in index order and connections by endpoint index:
//!
//! ```json
//! {
//!   "inputSize": 2, "outputSize": 1, "dropout": 0.0,
//!   "nodes": [
//!     { "index": 0, "bias": 0.0, "type": "INPUT", "squashId": "LOGISTIC", "mask": 1.0 }, ...
//!   ],
//!   "connections": [{ "fromIndex": 0, "toIndex": 2, "weight": 0.4, "gateNodeIndex": null }, ...]
//! }
//! ```
//!
//! Self-connections appear only when their weight is non-zero. Runtime state
//! (activations, traces, accumulated deltas) is not recorded.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NetworkError, Result};
use crate::gene::{Node, NodeId, NodeType};
use crate::network::Network;

/// Serialized form of a [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub input_size: usize,
    pub output_size: usize,
    #[serde(default)]
    pub dropout: f64,
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<ConnectionRecord>,
}

/// Serialized node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub index: usize,
    pub bias: f64,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub squash_id: Activation,
    #[serde(default = "full_mask")]
    pub mask: f64,
}

const fn full_mask() -> f64 {
    1.0
}

/// Serialized connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub from_index: usize,
    pub to_index: usize,
    pub weight: f64,
    pub gate_node_index: Option<usize>,
}

impl Network {
    /// Export the network as a record.
    #[must_use]
    pub fn to_record(&self) -> NetworkRecord {
        let nodes = self
            .order
            .iter()
            .map(|&id| {
                let node = &self.nodes[id];
                NodeRecord {
                    index: node.index,
                    bias: node.bias,
                    node_type: node.node_type,
                    squash_id: node.squash,
                    mask: node.mask,
                }
            })
            .collect();

        let connections = self
            .connections()
            .chain(self.self_connections())
            .map(|(_, conn)| ConnectionRecord {
                from_index: self.nodes[conn.from].index,
                to_index: self.nodes[conn.to].index,
                weight: conn.weight,
                gate_node_index: conn.gater.map(|g| self.nodes[g].index),
            })
            .collect();

        NetworkRecord {
            input_size: self.input_size(),
            output_size: self.output_size(),
            dropout: self.dropout,
            nodes,
            connections,
        }
    }

    /// Rebuild a network from a record.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::InvalidSize`] for zero input or output sizes
    /// - [`NetworkError::InvalidRecord`] for misplaced node types, out-of-range
    ///   indices or too few nodes
    /// - [`NetworkError::AlreadyConnected`] for duplicate connections
    pub fn from_record(record: &NetworkRecord) -> Result<Self> {
        let mut network = Self::empty(record.input_size, record.output_size)?;
        network.dropout = record.dropout;

        let io = record.input_size + record.output_size;
        if record.nodes.len() < io {
            return Err(NetworkError::InvalidRecord(format!(
                "{} nodes cannot hold {} inputs and {} outputs",
                record.nodes.len(),
                record.input_size,
                record.output_size
            )));
        }

        for (i, n) in record.nodes.iter().enumerate() {
            let expected = if i < record.input_size {
                NodeType::Input
            } else if i < io {
                NodeType::Output
            } else {
                NodeType::Hidden
            };
            if n.index != i || n.node_type != expected {
                return Err(NetworkError::InvalidRecord(format!(
                    "node at position {i} has index {} and type {:?}, expected {expected:?}",
                    n.index, n.node_type
                )));
            }
            let mut node = Node::new(n.node_type, n.bias, n.squash_id);
            node.mask = n.mask;
            network.push_node(node);
        }

        let lookup = |network: &Self, index: usize| -> Result<NodeId> {
            network.node_at(index).ok_or_else(|| {
                NetworkError::InvalidRecord(format!("connection references missing node {index}"))
            })
        };
        for c in &record.connections {
            let from = lookup(&network, c.from_index)?;
            let to = lookup(&network, c.to_index)?;
            if from == to && c.weight == 0.0 {
                continue;
            }
            let id = network.connect(from, to, c.weight)?;
            if let Some(gate) = c.gate_node_index {
                let gater = lookup(&network, gate)?;
                network.gate(gater, id)?;
            }
        }

        Ok(network)
    }

    /// Serialize the network record as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Parse a network from a JSON record.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Json`] for malformed JSON, or any error of
    /// [`Network::from_record`].
    pub fn from_json(json: &str) -> Result<Self> {
        let record: NetworkRecord = serde_json::from_str(json)?;
        Self::from_record(&record)
    }
}

impl From<Network> for NetworkRecord {
    fn from(network: Network) -> Self {
        network.to_record()
    }
}

impl TryFrom<NetworkRecord> for Network {
    type Error = NetworkError;

    fn try_from(record: NetworkRecord) -> Result<Self> {
        Self::from_record(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn gated_recurrent(rng: &mut ChaCha8Rng) -> Network {
        let mut network = Network::new(2, 1, rng).unwrap();
        let hidden = network.add_hidden_node(Activation::Tanh, rng);
        let ids = network.node_ids().to_vec();
        network.connect(ids[0], hidden, 0.3).unwrap();
        network.connect(hidden, ids[2], -0.7).unwrap();
        network.connect(hidden, hidden, 0.25).unwrap();
        let conn = network.connection_between(ids[1], ids[2]).unwrap();
        network.gate(hidden, conn).unwrap();
        network
    }

    #[test]
    fn test_record_layout() {
        let mut rng = test_rng();
        let network = gated_recurrent(&mut rng);
        let record = network.to_record();

        assert_eq!(record.nodes.len(), 4);
        assert_eq!(record.nodes[3].node_type, NodeType::Hidden);
        assert_eq!(record.nodes[3].squash_id, Activation::Tanh);
        assert_eq!(record.connections.len(), 5);
        let self_conn = record.connections.last().unwrap();
        assert_eq!((self_conn.from_index, self_conn.to_index), (3, 3));
        assert!(record
            .connections
            .iter()
            .any(|c| c.from_index == 1 && c.gate_node_index == Some(3)));
    }

    #[test]
    fn test_dormant_self_connection_not_recorded() {
        let mut rng = test_rng();
        let mut network = gated_recurrent(&mut rng);
        let hidden = network.node_at(3).unwrap();
        network.disconnect(hidden, hidden).unwrap();

        let record = network.to_record();
        assert!(record.connections.iter().all(|c| c.from_index != c.to_index));
    }

    #[test]
    fn test_json_round_trip() {
        let mut rng = test_rng();
        let mut network = gated_recurrent(&mut rng);
        let json = network.to_json().unwrap();
        assert!(json.contains("\"squashId\":\"TANH\""));
        assert!(json.contains("\"gateNodeIndex\":3"));

        let mut restored = Network::from_json(&json).unwrap();
        assert_eq!(restored.to_record(), network.to_record());
        let input = [0.4, -0.9];
        assert_eq!(
            restored.activate_no_trace(&input).unwrap(),
            network.activate_no_trace(&input).unwrap()
        );
    }

    #[test]
    fn test_serde_goes_through_record() {
        let mut rng = test_rng();
        let network = gated_recurrent(&mut rng);
        let json = serde_json::to_string(&network).unwrap();
        let restored: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.gate_count(), 1);
        assert_eq!(restored.self_connection_count(), 1);
    }

    #[test]
    fn test_invalid_records_rejected() {
        let mut rng = test_rng();
        let mut record = Network::new(2, 1, &mut rng).unwrap().to_record();
        record.connections[0].to_index = 9;
        assert!(matches!(
            Network::from_record(&record),
            Err(NetworkError::InvalidRecord(_))
        ));

        let mut record = Network::new(2, 1, &mut rng).unwrap().to_record();
        record.nodes[2].node_type = NodeType::Hidden;
        assert!(matches!(
            Network::from_record(&record),
            Err(NetworkError::InvalidRecord(_))
        ));

        let mut record = Network::new(2, 1, &mut rng).unwrap().to_record();
        let duplicate = record.connections[0].clone();
        record.connections.push(duplicate);
        assert!(matches!(
            Network::from_record(&record),
            Err(NetworkError::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn test_mask_defaults_to_one() {
        let json = r#"{"inputSize":1,"outputSize":1,"nodes":[
            {"index":0,"bias":0.0,"type":"INPUT","squashId":"LOGISTIC"},
            {"index":1,"bias":0.1,"type":"OUTPUT","squashId":"RELU"}],
            "connections":[{"fromIndex":0,"toIndex":1,"weight":0.5,"gateNodeIndex":null}]}"#;
        let network = Network::from_json(json).unwrap();
        let output = network.node_at(1).unwrap();
        assert_eq!(network.node(output).unwrap().mask, 1.0);
        assert_eq!(network.connection_count(), 1);
    }
}
