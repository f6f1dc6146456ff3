//! Structural and parametric mutation operators.
//!
//! Operators reason about "forward" and "backward" connections in activation
//! order (inputs, hidden nodes, outputs): a forward connection points to a
//! later node in that order.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::Result;
use crate::gene::{Connection, ConnectionId, Node, NodeId, NodeType};
use crate::network::Network;

/// A graph-editing operation applied to a network in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutation {
    /// Split a random connection with a new hidden node.
    AddNode,
    /// Remove a random hidden node, bridging its inputs to its outputs.
    SubNode,
    /// Add a forward connection between two unconnected nodes.
    AddConnection,
    /// Remove a forward connection whose endpoints stay connected otherwise.
    SubConnection,
    /// Perturb the weight of a random connection.
    ModWeight,
    /// Perturb the bias of a random non-input node.
    ModBias,
    /// Replace the squash function of a random non-input node.
    ModActivation,
    /// Give a random node a self-connection.
    AddSelfConnection,
    /// Remove a random self-connection.
    SubSelfConnection,
    /// Gate a random ungated connection with a random non-input node.
    AddGate,
    /// Remove a random gate.
    SubGate,
    /// Add a connection pointing backwards in activation order.
    AddBackConnection,
    /// Remove a backward connection whose endpoints stay connected otherwise.
    SubBackConnection,
    /// Swap bias and squash function between two nodes.
    SwapNodes,
}

impl Mutation {
    /// Every operator.
    pub const ALL: [Self; 14] = [
        Self::AddNode,
        Self::SubNode,
        Self::AddConnection,
        Self::SubConnection,
        Self::ModWeight,
        Self::ModBias,
        Self::ModActivation,
        Self::AddGate,
        Self::SubGate,
        Self::AddSelfConnection,
        Self::SubSelfConnection,
        Self::AddBackConnection,
        Self::SubBackConnection,
        Self::SwapNodes,
    ];

    /// Operators that keep a feed-forward network feed-forward.
    pub const FFW: [Self; 8] = [
        Self::AddNode,
        Self::SubNode,
        Self::AddConnection,
        Self::SubConnection,
        Self::ModWeight,
        Self::ModBias,
        Self::ModActivation,
        Self::SwapNodes,
    ];

    /// Stable upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddNode => "ADD_NODE",
            Self::SubNode => "SUB_NODE",
            Self::AddConnection => "ADD_CONNECTION",
            Self::SubConnection => "SUB_CONNECTION",
            Self::ModWeight => "MOD_WEIGHT",
            Self::ModBias => "MOD_BIAS",
            Self::ModActivation => "MOD_ACTIVATION",
            Self::AddSelfConnection => "ADD_SELF_CONNECTION",
            Self::SubSelfConnection => "SUB_SELF_CONNECTION",
            Self::AddGate => "ADD_GATE",
            Self::SubGate => "SUB_GATE",
            Self::AddBackConnection => "ADD_BACK_CONNECTION",
            Self::SubBackConnection => "SUB_BACK_CONNECTION",
            Self::SwapNodes => "SWAP_NODES",
        }
    }

    /// Whether applying this operator would push the network past a size cap.
    #[must_use]
    pub fn exceeds_cap(self, network: &Network, config: &MutationConfig) -> bool {
        match self {
            Self::AddNode => {
                network.node_count() >= config.max_nodes
                    || network.connection_count() >= config.max_connections
            }
            Self::AddConnection | Self::AddBackConnection => {
                network.connection_count() >= config.max_connections
            }
            Self::AddGate => network.gate_count() >= config.max_gates,
            _ => false,
        }
    }

    /// Apply the operator. Returns whether the network changed.
    ///
    /// Operators with no eligible target, or that would exceed a size cap,
    /// leave the network untouched.
    pub fn apply<R: Rng>(
        self,
        network: &mut Network,
        config: &MutationConfig,
        rng: &mut R,
    ) -> bool {
        if self.exceeds_cap(network, config) {
            log::trace!("skipping {self}: size cap reached");
            return false;
        }

        let outcome = match self {
            Self::AddNode => add_node(network, config, rng),
            Self::SubNode => sub_node(network, config, rng),
            Self::AddConnection => add_connection(network, rng),
            Self::SubConnection => sub_connection(network, true, rng),
            Self::ModWeight => Ok(mod_weight(network, config, rng)),
            Self::ModBias => Ok(mod_bias(network, config, rng)),
            Self::ModActivation => Ok(mod_activation(network, config, rng)),
            Self::AddSelfConnection => add_self_connection(network, rng),
            Self::SubSelfConnection => sub_self_connection(network, rng),
            Self::AddGate => add_gate(network, rng),
            Self::SubGate => sub_gate(network, rng),
            Self::AddBackConnection => add_back_connection(network, rng),
            Self::SubBackConnection => sub_connection(network, false, rng),
            Self::SwapNodes => Ok(swap_nodes(network, config, rng)),
        };

        outcome.unwrap_or_else(|err| {
            log::debug!("{self} failed: {err}");
            false
        })
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ranges and caps shared by the mutation operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Lower bound of a weight perturbation.
    pub min_weight: f64,
    /// Upper bound of a weight perturbation.
    pub max_weight: f64,
    /// Lower bound of a bias perturbation.
    pub min_bias: f64,
    /// Upper bound of a bias perturbation.
    pub max_bias: f64,
    /// Reassign gates of removed connections when removing a node.
    pub keep_gates: bool,
    /// Allow activation changes and swaps on output nodes.
    pub mutate_output: bool,
    /// Squash functions new or mutated nodes may take.
    pub allowed_activations: Vec<Activation>,
    pub max_nodes: usize,
    pub max_connections: usize,
    pub max_gates: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            min_weight: -1.0,
            max_weight: 1.0,
            min_bias: -1.0,
            max_bias: 1.0,
            keep_gates: true,
            mutate_output: true,
            allowed_activations: Activation::ALL.to_vec(),
            max_nodes: usize::MAX,
            max_connections: usize::MAX,
            max_gates: usize::MAX,
        }
    }
}

fn pick<T: Copy, R: Rng>(items: &[T], rng: &mut R) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[rng.random_range(0..items.len())])
    }
}

fn uniform<R: Rng>(min: f64, max: f64, rng: &mut R) -> f64 {
    rng.random::<f64>() * (max - min) + min
}

/// Non-input nodes, optionally excluding outputs.
fn mutable_nodes(network: &Network, include_outputs: bool) -> Vec<NodeId> {
    let io = network.input_size() + network.output_size();
    let ids = network.node_ids();
    if include_outputs {
        ids[network.input_size()..].to_vec()
    } else {
        ids[io..].to_vec()
    }
}

fn add_node<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> Result<bool> {
    let Some(split) = pick(&network.connections, rng) else {
        return Ok(false);
    };
    let (from, to, gater) = {
        let conn = &network.links[split];
        (conn.from, conn.to, conn.gater)
    };
    network.disconnect(from, to)?;

    let rank = network
        .rank(to)
        .min(network.node_count() - network.output_size());
    let position = network.hidden_index_for_rank(rank);
    let mut node = Node::random(NodeType::Hidden, rng);
    node.squash = node.squash.mutated(&config.allowed_activations, rng);
    let hidden = network.insert_node(position, node);

    let first = network.connect(from, hidden, Connection::random_weight(rng))?;
    let second = network.connect(hidden, to, Connection::random_weight(rng))?;
    if let Some(gater) = gater {
        let target = if rng.random::<f64>() >= 0.5 { first } else { second };
        network.gate(gater, target)?;
    }
    Ok(true)
}

fn sub_node<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> Result<bool> {
    let Some(node) = pick(&mutable_nodes(network, false), rng) else {
        return Ok(false);
    };
    network.remove_node(node, config.keep_gates, rng)?;
    Ok(true)
}

fn add_connection<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let order = network.activation_order();
    let (inputs, outputs) = (network.input_size(), network.output_size());

    let mut available = Vec::new();
    for i in 0..order.len() - outputs {
        for j in (i + 1).max(inputs)..order.len() {
            if !network.is_projecting(order[i], order[j]) {
                available.push((order[i], order[j]));
            }
        }
    }

    let Some((from, to)) = pick(&available, rng) else {
        return Ok(false);
    };
    network.connect(from, to, Connection::random_weight(rng))?;
    Ok(true)
}

/// Remove a forward (or backward) connection whose source has other outputs
/// and whose target has other inputs.
fn sub_connection<R: Rng>(network: &mut Network, forward: bool, rng: &mut R) -> Result<bool> {
    let candidates: Vec<(NodeId, NodeId)> = network
        .connections()
        .filter(|(_, conn)| {
            let (from, to) = (conn.from(), conn.to());
            let redundant = network.nodes[from].outgoing.len() > 1
                && network.nodes[to].incoming.len() > 1;
            let points_forward = network.rank(to) > network.rank(from);
            redundant && points_forward == forward
        })
        .map(|(_, conn)| (conn.from(), conn.to()))
        .collect();

    let Some((from, to)) = pick(&candidates, rng) else {
        return Ok(false);
    };
    network.disconnect(from, to)
}

fn mod_weight<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> bool {
    let all: Vec<ConnectionId> = network
        .connections
        .iter()
        .chain(&network.self_connections)
        .copied()
        .collect();
    let Some(id) = pick(&all, rng) else {
        return false;
    };
    let weight = network.links[id].weight + uniform(config.min_weight, config.max_weight, rng);
    network.set_weight(id, weight).is_ok()
}

fn mod_bias<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> bool {
    let Some(id) = pick(&mutable_nodes(network, true), rng) else {
        return false;
    };
    network.nodes[id].bias += uniform(config.min_bias, config.max_bias, rng);
    true
}

fn mod_activation<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> bool {
    let Some(id) = pick(&mutable_nodes(network, config.mutate_output), rng) else {
        return false;
    };
    let node = &mut network.nodes[id];
    let next = node.squash.mutated(&config.allowed_activations, rng);
    let changed = next != node.squash;
    node.squash = next;
    changed
}

fn add_self_connection<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let candidates: Vec<NodeId> = mutable_nodes(network, true)
        .into_iter()
        .filter(|&id| !network.is_projecting(id, id))
        .collect();
    let Some(node) = pick(&candidates, rng) else {
        return Ok(false);
    };
    network.connect(node, node, 0.0)?;
    Ok(true)
}

fn sub_self_connection<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let Some(id) = pick(&network.self_connections, rng) else {
        return Ok(false);
    };
    let node = network.links[id].from;
    network.disconnect(node, node)
}

fn add_gate<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let ungated: Vec<ConnectionId> = network
        .connections
        .iter()
        .chain(&network.self_connections)
        .copied()
        .filter(|&id| network.links[id].gater.is_none())
        .collect();
    let Some(conn) = pick(&ungated, rng) else {
        return Ok(false);
    };
    let Some(gater) = pick(&mutable_nodes(network, true), rng) else {
        return Ok(false);
    };
    network.gate(gater, conn)?;
    Ok(true)
}

fn sub_gate<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let Some(conn) = pick(&network.gates, rng) else {
        return Ok(false);
    };
    network.ungate(conn)?;
    Ok(true)
}

fn add_back_connection<R: Rng>(network: &mut Network, rng: &mut R) -> Result<bool> {
    let order = network.activation_order();
    let inputs = network.input_size();

    let mut available = Vec::new();
    for i in inputs..order.len() {
        for j in inputs..i {
            if !network.is_projecting(order[i], order[j]) {
                available.push((order[i], order[j]));
            }
        }
    }

    let Some((from, to)) = pick(&available, rng) else {
        return Ok(false);
    };
    network.connect(from, to, Connection::random_weight(rng))?;
    Ok(true)
}

fn swap_nodes<R: Rng>(network: &mut Network, config: &MutationConfig, rng: &mut R) -> bool {
    let candidates = mutable_nodes(network, config.mutate_output);
    if candidates.len() < 2 {
        return false;
    }
    let first = rng.random_range(0..candidates.len());
    let second = (first + rng.random_range(1..candidates.len())) % candidates.len();
    let (a, b) = (candidates[first], candidates[second]);

    let (bias, squash) = (network.nodes[a].bias, network.nodes[a].squash);
    network.nodes[a].bias = network.nodes[b].bias;
    network.nodes[a].squash = network.nodes[b].squash;
    network.nodes[b].bias = bias;
    network.nodes[b].squash = squash;
    true
}
