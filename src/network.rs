//! The network graph engine.
//!
//! A [`Network`] stores nodes and connections in `SlotMap` arenas and keeps an
//! ordered node sequence on top of them. The position of a node in that
//! sequence is its *index*: inputs occupy `0..input_size`, outputs the next
//! `output_size` slots, and hidden nodes follow. Indices are the key space of
//! innovation ids and of the serialized record; they are recomputed after
//! every structural edit.
//!
//! Activation walks nodes in *activation order*: inputs, hidden nodes by
//! index, then outputs. Mutation operators reason about "forward" and "back"
//! connections in terms of that order.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use symbios_genetics::Genotype;

use crate::activation::Activation;
use crate::error::{NetworkError, Result};
use crate::gene::{Connection, ConnectionId, Node, NodeId, NodeType};
use crate::mutation::{Mutation, MutationConfig};
use crate::record::NetworkRecord;

/// A trainable, evolvable graph of nodes and weighted, optionally gated connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "NetworkRecord", try_from = "NetworkRecord")]
pub struct Network {
    input_size: usize,
    output_size: usize,
    pub(crate) nodes: SlotMap<NodeId, Node>,
    /// Node sequence; position = index.
    pub(crate) order: Vec<NodeId>,
    /// Every connection record, including dormant self-connections.
    pub(crate) links: SlotMap<ConnectionId, Connection>,
    /// Regular (non-self) connections in creation order.
    pub(crate) connections: Vec<ConnectionId>,
    /// Self-connections with a non-zero weight.
    pub(crate) self_connections: Vec<ConnectionId>,
    /// Gated connections, a subset of `connections ∪ self_connections`.
    pub(crate) gates: Vec<ConnectionId>,
    /// Dropout probability applied to hidden nodes during training.
    pub dropout: f64,
    /// Fitness score assigned during evolution.
    pub score: Option<f64>,
}

impl Network {
    /// Create a network with every input connected to every output.
    ///
    /// Initial weights are drawn uniformly from `[0, input_size * sqrt(2 / input_size))`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidSize`] if either size is zero.
    pub fn new<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Result<Self> {
        let mut network = Self::unconnected(input_size, output_size, rng)?;

        #[allow(clippy::cast_precision_loss)]
        let inputs = input_size as f64;
        let scale = inputs * (2.0 / inputs).sqrt();
        for i in 0..input_size {
            for o in input_size..input_size + output_size {
                let weight = rng.random::<f64>() * scale;
                let (from, to) = (network.order[i], network.order[o]);
                network.connect(from, to, weight)?;
            }
        }
        Ok(network)
    }

    /// Create a network with input and output nodes but no connections.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidSize`] if either size is zero.
    pub fn unconnected<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Result<Self> {
        let mut network = Self::empty(input_size, output_size)?;
        for i in 0..input_size + output_size {
            let node_type = if i < input_size {
                NodeType::Input
            } else {
                NodeType::Output
            };
            network.push_node(Node::random(node_type, rng));
        }
        Ok(network)
    }

    /// A network shell with no nodes at all; callers push the nodes.
    pub(crate) fn empty(input_size: usize, output_size: usize) -> Result<Self> {
        if input_size == 0 || output_size == 0 {
            return Err(NetworkError::InvalidSize {
                input: input_size,
                output: output_size,
            });
        }
        Ok(Self {
            input_size,
            output_size,
            nodes: SlotMap::with_key(),
            order: Vec::new(),
            links: SlotMap::with_key(),
            connections: Vec::new(),
            self_connections: Vec::new(),
            gates: Vec::new(),
            dropout: 0.0,
            score: None,
        })
    }

    /// Append a node to the sequence, allocating its dormant self-connection.
    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        let position = self.order.len();
        self.insert_node(position, node)
    }

    /// Insert a node at `position` in the sequence and reindex.
    pub(crate) fn insert_node(&mut self, position: usize, mut node: Node) -> NodeId {
        node.index = position;
        let id = self.nodes.insert(node);
        let self_link = self.links.insert(Connection::new(id, id, 0.0));
        self.nodes[id].self_link = self_link;
        self.order.insert(position, id);
        if position + 1 != self.order.len() {
            self.reindex();
        }
        id
    }

    /// Append a hidden node with a random bias and the given squash function.
    pub fn add_hidden_node<R: Rng>(&mut self, squash: Activation, rng: &mut R) -> NodeId {
        let mut node = Node::random(NodeType::Hidden, rng);
        node.squash = squash;
        self.push_node(node)
    }

    /// Recompute every node's index from its position in the sequence.
    pub(crate) fn reindex(&mut self) {
        for (i, &id) in self.order.iter().enumerate() {
            self.nodes[id].index = i;
        }
    }

    /// Number of input nodes.
    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.input_size
    }

    /// Number of output nodes.
    #[must_use]
    pub const fn output_size(&self) -> usize {
        self.output_size
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Number of hidden nodes.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.order.len() - self.input_size - self.output_size
    }

    /// Number of regular (non-self) connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of active self-connections.
    #[must_use]
    pub fn self_connection_count(&self) -> usize {
        self.self_connections.len()
    }

    /// Number of gated connections.
    #[must_use]
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Size measure used by the evolution growth penalty.
    #[must_use]
    pub fn complexity(&self) -> usize {
        self.hidden_count() + self.connections.len() + self.gates.len()
    }

    /// Node ids in index order.
    #[must_use]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Node id at `index`.
    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.order.get(index).copied()
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node for editing its bias, squash function or mask.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Look up any connection record, including self-connections.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.links.get(id)
    }

    /// Set the weight of a connection.
    ///
    /// A self-connection is active exactly while its weight is non-zero, so
    /// setting it to zero deactivates it (dropping any gate) and setting a
    /// dormant one to a non-zero weight activates it.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownConnection`] if the connection does not exist.
    pub fn set_weight(&mut self, id: ConnectionId, weight: f64) -> Result<()> {
        let conn = self
            .links
            .get_mut(id)
            .ok_or(NetworkError::UnknownConnection)?;
        if conn.from != conn.to {
            conn.weight = weight;
            return Ok(());
        }

        let active = self.self_connections.contains(&id);
        if weight == 0.0 && active {
            if self.links[id].gater.is_some() {
                self.ungate(id)?;
            }
            self.links[id].reset_traces();
            self.self_connections.retain(|&c| c != id);
        } else if weight != 0.0 && !active {
            let conn = &mut self.links[id];
            conn.previous_delta_weight = 0.0;
            conn.total_delta_weight = 0.0;
            self.self_connections.push(id);
        }
        self.links[id].weight = weight;
        Ok(())
    }

    /// Regular connections in creation order.
    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> + '_ {
        self.connections.iter().map(move |&id| (id, &self.links[id]))
    }

    /// Active self-connections.
    pub fn self_connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> + '_ {
        self.self_connections
            .iter()
            .map(move |&id| (id, &self.links[id]))
    }

    /// Gated connections.
    #[must_use]
    pub fn gates(&self) -> &[ConnectionId] {
        &self.gates
    }

    /// The regular connection from `from` to `to`, or the self-connection when
    /// they are equal and it is active.
    #[must_use]
    pub fn connection_between(&self, from: NodeId, to: NodeId) -> Option<ConnectionId> {
        let node = self.nodes.get(from)?;
        if from == to {
            let link = node.self_link;
            return (self.links[link].weight != 0.0).then_some(link);
        }
        node.outgoing
            .iter()
            .copied()
            .find(|&id| self.links[id].to == to)
    }

    /// Whether `from` projects a connection to `to`.
    #[must_use]
    pub fn is_projecting(&self, from: NodeId, to: NodeId) -> bool {
        self.connection_between(from, to).is_some()
    }

    /// Node ids in activation order: inputs, hidden nodes, outputs.
    #[must_use]
    pub fn activation_order(&self) -> Vec<NodeId> {
        let hidden_start = self.input_size + self.output_size;
        let mut order = Vec::with_capacity(self.order.len());
        order.extend_from_slice(&self.order[..self.input_size]);
        order.extend_from_slice(&self.order[hidden_start..]);
        order.extend_from_slice(&self.order[self.input_size..hidden_start]);
        order
    }

    /// Position of an index in activation order.
    pub(crate) fn rank_of_index(&self, index: usize) -> usize {
        if index < self.input_size {
            index
        } else if index < self.input_size + self.output_size {
            index + self.hidden_count()
        } else {
            index - self.output_size
        }
    }

    /// Position of a node in activation order.
    pub(crate) fn rank(&self, id: NodeId) -> usize {
        self.rank_of_index(self.nodes[id].index)
    }

    /// Sequence index at which a node occupying activation-order `rank`
    /// would be stored. Ranks are clamped into the hidden region.
    pub(crate) fn hidden_index_for_rank(&self, rank: usize) -> usize {
        let hidden_end = self.order.len() - self.output_size;
        rank.clamp(self.input_size, hidden_end) + self.output_size
    }

    fn require_node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(NetworkError::UnknownNode)
    }

    /// Whether `id` is a live connection: regular, or an active self-connection.
    fn is_live(&self, id: ConnectionId) -> bool {
        self.links.get(id).is_some_and(|conn| {
            if conn.from == conn.to {
                self.self_connections.contains(&id)
            } else {
                self.connections.contains(&id)
            }
        })
    }

    /// Connect `from` to `to`.
    ///
    /// Connecting a node to itself activates its self-connection; a zero
    /// `weight` is replaced by 1 since a zero self-weight means "absent".
    ///
    /// # Errors
    ///
    /// - [`NetworkError::UnknownNode`] if either node is not in this network
    /// - [`NetworkError::AlreadyConnected`] if the pair is already connected
    pub fn connect(&mut self, from: NodeId, to: NodeId, weight: f64) -> Result<ConnectionId> {
        let from_index = self.require_node(from)?.index;
        let to_index = self.require_node(to)?.index;

        if self.is_projecting(from, to) {
            return Err(NetworkError::AlreadyConnected {
                from: from_index,
                to: to_index,
            });
        }

        if from == to {
            let link = self.nodes[from].self_link;
            let conn = &mut self.links[link];
            conn.weight = if weight == 0.0 { 1.0 } else { weight };
            conn.previous_delta_weight = 0.0;
            conn.total_delta_weight = 0.0;
            self.self_connections.push(link);
            return Ok(link);
        }

        let id = self.links.insert(Connection::new(from, to, weight));
        self.nodes[from].outgoing.push(id);
        self.nodes[to].incoming.push(id);
        self.connections.push(id);
        Ok(id)
    }

    /// Remove the connection from `from` to `to`, stripping its gate first.
    ///
    /// Returns whether a connection was removed.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownNode`] if either node is not in this network.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        self.require_node(from)?;
        self.require_node(to)?;

        let Some(id) = self.connection_between(from, to) else {
            return Ok(false);
        };
        if self.links[id].gater.is_some() {
            self.ungate(id)?;
        }

        if from == to {
            let conn = &mut self.links[id];
            conn.weight = 0.0;
            conn.reset_traces();
            self.self_connections.retain(|&c| c != id);
        } else {
            self.connections.retain(|&c| c != id);
            self.nodes[from].outgoing.retain(|&c| c != id);
            self.nodes[to].incoming.retain(|&c| c != id);
            self.links.remove(id);
        }
        Ok(true)
    }

    /// Gate `connection` with `node`: the connection's gain follows the node's activation.
    ///
    /// Gating an already-gated connection is a logged no-op.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::UnknownNode`] if `node` is not in this network
    /// - [`NetworkError::UnknownConnection`] if `connection` is not a live connection
    pub fn gate(&mut self, node: NodeId, connection: ConnectionId) -> Result<()> {
        self.require_node(node)?;
        if !self.is_live(connection) {
            return Err(NetworkError::UnknownConnection);
        }
        if self.links[connection].gater.is_some() {
            log::warn!("connection is already gated; ignoring gate request");
            return Ok(());
        }

        self.links[connection].gater = Some(node);
        self.nodes[node].gated.push(connection);
        self.gates.push(connection);
        Ok(())
    }

    /// Remove the gate from `connection`, restoring its gain to 1.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NotGated`] if the connection has no gater.
    pub fn ungate(&mut self, connection: ConnectionId) -> Result<()> {
        let Some(position) = self.gates.iter().position(|&c| c == connection) else {
            return Err(NetworkError::NotGated);
        };
        self.gates.remove(position);

        let conn = &mut self.links[connection];
        let gater = conn.gater.take().ok_or(NetworkError::NotGated)?;
        conn.gain = 1.0;
        let target = conn.to;

        self.nodes[gater].gated.retain(|&c| c != connection);
        self.prune_xtrace(gater, target);
        Ok(())
    }

    /// Drop extended traces for `target` from the gater's incoming connections
    /// once the gater no longer gates anything into `target`.
    fn prune_xtrace(&mut self, gater: NodeId, target: NodeId) {
        let still_gates = self.nodes[gater]
            .gated
            .iter()
            .any(|&c| self.links[c].to == target);
        if still_gates {
            return;
        }
        for &id in &self.nodes[gater].incoming {
            self.links[id].xtrace.retain(|&(node, _)| node != target);
        }
    }

    /// Remove a hidden node, bridging its inputs to its outputs.
    ///
    /// Every node that fed the removed node is connected to every node it fed,
    /// unless already connected. With `keep_gates`, gaters of the removed
    /// connections are reassigned at random onto the new bridge connections
    /// until either list runs out.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::UnknownNode`] if the node is not in this network
    /// - [`NetworkError::ProtectedNode`] if the node is an input or output
    pub fn remove_node<R: Rng>(
        &mut self,
        node: NodeId,
        keep_gates: bool,
        rng: &mut R,
    ) -> Result<()> {
        let target = self.require_node(node)?;
        if target.node_type != NodeType::Hidden {
            return Err(NetworkError::ProtectedNode(target.index));
        }

        self.disconnect(node, node)?;

        let mut gaters = Vec::new();
        let mut inputs = Vec::new();
        for id in self.nodes[node].incoming.clone().into_iter().rev() {
            let (from, gater) = (self.links[id].from, self.links[id].gater);
            if let Some(gater) = gater.filter(|&g| keep_gates && g != node) {
                gaters.push(gater);
            }
            inputs.push(from);
            self.disconnect(from, node)?;
        }

        let mut outputs = Vec::new();
        for id in self.nodes[node].outgoing.clone().into_iter().rev() {
            let (to, gater) = (self.links[id].to, self.links[id].gater);
            if let Some(gater) = gater.filter(|&g| keep_gates && g != node) {
                gaters.push(gater);
            }
            outputs.push(to);
            self.disconnect(node, to)?;
        }

        let mut bridges = Vec::new();
        for &from in &inputs {
            for &to in &outputs {
                if !self.is_projecting(from, to) {
                    let weight = Connection::random_weight(rng);
                    bridges.push(self.connect(from, to, weight)?);
                }
            }
        }

        for gater in gaters {
            if bridges.is_empty() {
                break;
            }
            let pick = rng.random_range(0..bridges.len());
            let bridge = bridges.remove(pick);
            self.gate(gater, bridge)?;
        }

        for id in self.nodes[node].gated.clone().into_iter().rev() {
            self.ungate(id)?;
        }

        let index = self.nodes[node].index;
        if let Some(removed) = self.nodes.remove(node) {
            self.links.remove(removed.self_link);
        }
        self.order.remove(index);
        for (_, conn) in &mut self.links {
            conn.xtrace.retain(|&(n, _)| n != node);
        }
        self.reindex();
        Ok(())
    }

    /// Apply one mutation with the given configuration.
    ///
    /// Returns whether the network changed.
    pub fn mutate<R: Rng>(
        &mut self,
        mutation: Mutation,
        config: &MutationConfig,
        rng: &mut R,
    ) -> bool {
        mutation.apply(self, config, rng)
    }
}

impl Genotype for Network {
    fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f32) {
        if rng.random::<f32>() >= rate {
            return;
        }
        let config = MutationConfig::default();
        let mutation = Mutation::FFW[rng.random_range(0..Mutation::FFW.len())];
        mutation.apply(self, &config, rng);
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        // Shapes match within a population; fall back to the fitter parent otherwise.
        Self::crossover(self, other, false, rng).unwrap_or_else(|_| {
            if other.score.unwrap_or(0.0) > self.score.unwrap_or(0.0) {
                other.clone()
            } else {
                self.clone()
            }
        })
    }
}
