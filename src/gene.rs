//! Node and connection records stored in a network's arenas.
//!
//! - [`Node`]: a computational unit with bias, squash function and trace state
//! - [`Connection`]: a weighted, optionally gated edge between two nodes
//!
//! Records refer to each other through arena keys, never through references,
//! so the node/connection cycles of a recurrent graph carry no lifetimes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::activation::Activation;

new_key_type! {
    /// Stable identifier for a node within a network.
    ///
    /// Unlike a node's index, the id survives insertions and removals of
    /// other nodes.
    pub struct NodeId;

    /// Stable identifier for a connection within a network.
    pub struct ConnectionId;
}

/// The role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    /// Receives external input; its activation is the input value.
    Input,
    /// Internal node added by construction or mutation.
    Hidden,
    /// Produces one component of the network output.
    Output,
}

/// Error signals computed during backpropagation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ErrorSignal {
    /// Total error attributed to this node.
    pub responsibility: f64,
    /// Error projected back through outgoing connections.
    pub projected: f64,
    /// Error arising from the connections this node gates.
    pub gated: f64,
}

/// A neuron of the network.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) node_type: NodeType,
    /// Bias added to the summed input before squashing.
    pub bias: f64,
    /// Squash function.
    pub squash: Activation,
    /// Dropout mask multiplied into the activation (1 = kept).
    pub mask: f64,
    /// Position in the owning network's node sequence.
    pub(crate) index: usize,
    pub(crate) state: f64,
    pub(crate) old: f64,
    pub(crate) activation: f64,
    pub(crate) derivative: f64,
    pub(crate) error: ErrorSignal,
    pub(crate) previous_delta_bias: f64,
    pub(crate) total_delta_bias: f64,
    pub(crate) incoming: Vec<ConnectionId>,
    pub(crate) outgoing: Vec<ConnectionId>,
    pub(crate) gated: Vec<ConnectionId>,
    /// The node's self-connection; dormant while its weight is zero.
    pub(crate) self_link: ConnectionId,
}

impl Node {
    /// Create a node with an explicit bias.
    pub(crate) fn new(node_type: NodeType, bias: f64, squash: Activation) -> Self {
        Self {
            node_type,
            bias,
            squash,
            mask: 1.0,
            index: 0,
            state: 0.0,
            old: 0.0,
            activation: 0.0,
            derivative: 0.0,
            error: ErrorSignal::default(),
            previous_delta_bias: 0.0,
            total_delta_bias: 0.0,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            gated: Vec::new(),
            self_link: ConnectionId::default(),
        }
    }

    /// Create a node with the default random bias: zero for inputs,
    /// uniform in `[-0.1, 0.1)` otherwise.
    pub(crate) fn random<R: Rng>(node_type: NodeType, rng: &mut R) -> Self {
        let bias = match node_type {
            NodeType::Input => 0.0,
            NodeType::Hidden | NodeType::Output => rng.random::<f64>() * 0.2 - 0.1,
        };
        Self::new(node_type, bias, Activation::Logistic)
    }

    /// Role of this node.
    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Position of this node in the network's node sequence.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Output of the most recent activation.
    #[must_use]
    pub const fn activation(&self) -> f64 {
        self.activation
    }

    /// Pre-activation sum of the most recent activation.
    #[must_use]
    pub const fn state(&self) -> f64 {
        self.state
    }

    /// Total error signal from the most recent backpropagation.
    #[must_use]
    pub const fn responsibility(&self) -> f64 {
        self.error.responsibility
    }

    /// Incoming connections, excluding the self-connection.
    #[must_use]
    pub fn incoming(&self) -> &[ConnectionId] {
        &self.incoming
    }

    /// Outgoing connections, excluding the self-connection.
    #[must_use]
    pub fn outgoing(&self) -> &[ConnectionId] {
        &self.outgoing
    }

    /// Connections gated by this node.
    #[must_use]
    pub fn gated(&self) -> &[ConnectionId] {
        &self.gated
    }

    /// Reset activation memory and error signals.
    pub(crate) fn reset(&mut self) {
        self.error = ErrorSignal::default();
        self.old = 0.0;
        self.state = 0.0;
        self.activation = 0.0;
    }
}

/// A weighted edge between two nodes.
#[derive(Debug, Clone)]
pub struct Connection {
    pub(crate) from: NodeId,
    pub(crate) to: NodeId,
    /// Connection weight.
    pub weight: f64,
    /// Multiplier on the weight; the gater's activation when gated, else 1.
    pub(crate) gain: f64,
    pub(crate) gater: Option<NodeId>,
    pub(crate) eligibility: f64,
    /// Extended eligibility traces, keyed by the nodes this connection's
    /// target influences through its gates.
    pub(crate) xtrace: Vec<(NodeId, f64)>,
    pub(crate) previous_delta_weight: f64,
    pub(crate) total_delta_weight: f64,
}

impl Connection {
    /// Create a connection with the given weight.
    #[must_use]
    pub(crate) fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Self {
            from,
            to,
            weight,
            gain: 1.0,
            gater: None,
            eligibility: 0.0,
            xtrace: Vec::new(),
            previous_delta_weight: 0.0,
            total_delta_weight: 0.0,
        }
    }

    /// Default weight for a connection created without one: uniform in `[-0.1, 0.1)`.
    pub fn random_weight<R: Rng>(rng: &mut R) -> f64 {
        rng.random::<f64>() * 0.2 - 0.1
    }

    /// Source node.
    #[must_use]
    pub const fn from(&self) -> NodeId {
        self.from
    }

    /// Target node.
    #[must_use]
    pub const fn to(&self) -> NodeId {
        self.to
    }

    /// Current gain applied to the weight.
    #[must_use]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    /// Node gating this connection, if any.
    #[must_use]
    pub const fn gater(&self) -> Option<NodeId> {
        self.gater
    }

    /// Eligibility trace accumulated by traced activation.
    #[must_use]
    pub const fn eligibility(&self) -> f64 {
        self.eligibility
    }

    /// Reset traces.
    pub(crate) fn reset_traces(&mut self) {
        self.eligibility = 0.0;
        self.xtrace.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use slotmap::SlotMap;

    #[test]
    fn test_node_creation() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let input = Node::random(NodeType::Input, &mut rng);
        assert_eq!(input.bias, 0.0);
        assert_eq!(input.mask, 1.0);

        for _ in 0..20 {
            let hidden = Node::random(NodeType::Hidden, &mut rng);
            assert!((-0.1..0.1).contains(&hidden.bias));
            assert_eq!(hidden.squash, Activation::Logistic);
        }
    }

    #[test]
    fn test_connection_creation() {
        let mut nodes: SlotMap<NodeId, u8> = SlotMap::with_key();
        let a = nodes.insert(0);
        let b = nodes.insert(1);

        let conn = Connection::new(a, b, 0.5);
        assert_eq!(conn.from, a);
        assert_eq!(conn.to, b);
        assert_eq!(conn.gain, 1.0);
        assert!(conn.gater.is_none());
        assert!(conn.xtrace.is_empty());
    }

    #[test]
    fn test_node_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&NodeType::Hidden).unwrap(), "\"HIDDEN\"");
    }
}
