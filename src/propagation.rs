//! Forward activation and trace-based backpropagation.
//!
//! Traced activation keeps, per incoming connection, an eligibility trace
//! (how much the connection contributed to the target's current state,
//! decayed through the target's self-connection) and extended traces for
//! every node the target influences through its gates. Backpropagation
//! combines those traces with the error responsibilities of the influenced
//! nodes to produce weight gradients, so gated and recurrent connections are
//! trained without unrolling.

use rand::Rng;

use crate::error::{NetworkError, Result};
use crate::gene::{ErrorSignal, NodeId};
use crate::network::Network;

impl Network {
    /// Activate the network and record traces for a later [`propagate`](Self::propagate).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InputSizeMismatch`] if `input` has the wrong length.
    pub fn activate(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        Ok(self.forward(input, true))
    }

    /// Traced activation with fresh dropout masks drawn for every hidden node.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InputSizeMismatch`] if `input` has the wrong length.
    pub fn activate_training<R: Rng>(&mut self, input: &[f64], rng: &mut R) -> Result<Vec<f64>> {
        self.check_input(input)?;
        let hidden_start = self.input_size() + self.output_size();
        for i in hidden_start..self.order.len() {
            let id = self.order[i];
            self.nodes[id].mask = if rng.random::<f64>() < self.dropout {
                0.0
            } else {
                1.0
            };
        }
        Ok(self.forward(input, true))
    }

    /// Activate without computing derivatives or traces.
    ///
    /// Node states still carry over between calls, so recurrent networks keep
    /// their memory.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InputSizeMismatch`] if `input` has the wrong length.
    pub fn activate_no_trace(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        Ok(self.forward(input, false))
    }

    /// Backpropagate `target` through the network.
    ///
    /// Output nodes are seeded with `target - output` in reverse order, then
    /// hidden nodes are visited by descending index. Input nodes have no
    /// incoming weights and are skipped. Deltas accumulate until a call with
    /// `update` set applies them together with the momentum term.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::OutputSizeMismatch`] if `target` has the wrong length.
    pub fn propagate(
        &mut self,
        rate: f64,
        momentum: f64,
        update: bool,
        target: &[f64],
    ) -> Result<()> {
        if target.len() != self.output_size() {
            return Err(NetworkError::OutputSizeMismatch {
                expected: self.output_size(),
                found: target.len(),
            });
        }

        let input_size = self.input_size();
        for (k, &value) in target.iter().enumerate().rev() {
            let id = self.order[input_size + k];
            self.propagate_node(id, rate, momentum, update, Some(value));
        }
        let hidden_start = input_size + self.output_size();
        for i in (hidden_start..self.order.len()).rev() {
            let id = self.order[i];
            self.propagate_node(id, rate, momentum, update, None);
        }
        Ok(())
    }

    /// Reset every node's state, activation and error, and every trace.
    ///
    /// Gated connections get a gain of zero until their gater fires again.
    pub fn clear(&mut self) {
        for (_, conn) in &mut self.links {
            conn.reset_traces();
        }
        for &id in &self.gates {
            self.links[id].gain = 0.0;
        }
        for (_, node) in &mut self.nodes {
            node.reset();
        }
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() == self.input_size() {
            Ok(())
        } else {
            Err(NetworkError::InputSizeMismatch {
                expected: self.input_size(),
                found: input.len(),
            })
        }
    }

    fn forward(&mut self, input: &[f64], traced: bool) -> Vec<f64> {
        for (i, &value) in input.iter().enumerate() {
            let id = self.order[i];
            self.nodes[id].activation = value;
        }

        let input_size = self.input_size();
        let hidden_start = input_size + self.output_size();
        for i in (hidden_start..self.order.len()).chain(input_size..hidden_start) {
            let id = self.order[i];
            if traced {
                self.activate_traced(id);
            } else {
                self.activate_untraced(id);
            }
        }

        self.order[input_size..hidden_start]
            .iter()
            .map(|&id| self.nodes[id].activation)
            .collect()
    }

    /// Self-connection contribution plus bias plus gated incoming signals.
    fn weighted_input(&self, id: NodeId) -> f64 {
        let node = &self.nodes[id];
        let self_link = &self.links[node.self_link];
        let mut state = self_link.gain * self_link.weight * node.state + node.bias;
        for &c in &node.incoming {
            let conn = &self.links[c];
            state += self.nodes[conn.from].activation * conn.weight * conn.gain;
        }
        state
    }

    fn activate_untraced(&mut self, id: NodeId) {
        let state = self.weighted_input(id);
        let node = &mut self.nodes[id];
        node.state = state;
        node.activation = node.squash.apply(state) * node.mask;

        let activation = node.activation;
        for &c in &self.nodes[id].gated {
            self.links[c].gain = activation;
        }
    }

    fn activate_traced(&mut self, id: NodeId) {
        let state = self.weighted_input(id);
        let node = &mut self.nodes[id];
        node.old = node.state;
        node.state = state;
        node.activation = node.squash.apply(state) * node.mask;
        node.derivative = node.squash.derivative(state);
        let (activation, derivative, self_link) =
            (node.activation, node.derivative, node.self_link);

        // Influence of this node on each target it gates.
        let mut influences: Vec<(NodeId, f64)> = Vec::new();
        for &c in &self.nodes[id].gated {
            let conn = &self.links[c];
            let signal = conn.weight * self.nodes[conn.from].activation;
            if let Some(entry) = influences.iter_mut().find(|(n, _)| *n == conn.to) {
                entry.1 += signal;
            } else {
                let target = &self.nodes[conn.to];
                let carried = if self.links[target.self_link].gater == Some(id) {
                    target.old
                } else {
                    0.0
                };
                influences.push((conn.to, signal + carried));
            }
        }
        for &c in &self.nodes[id].gated {
            self.links[c].gain = activation;
        }

        // Decay of each influenced target's extended trace through its own self-connection.
        let decays: Vec<f64> = influences
            .iter()
            .map(|&(target, _)| {
                let link = &self.links[self.nodes[target].self_link];
                link.gain * link.weight
            })
            .collect();

        let recurrence = {
            let link = &self.links[self_link];
            link.gain * link.weight
        };
        for k in 0..self.nodes[id].incoming.len() {
            let c = self.nodes[id].incoming[k];
            let from_activation = self.nodes[self.links[c].from].activation;
            let conn = &mut self.links[c];
            conn.eligibility = recurrence * conn.eligibility + from_activation * conn.gain;

            let eligibility = conn.eligibility;
            for (&(target, influence), &decay) in influences.iter().zip(&decays) {
                let value = derivative * eligibility * influence;
                match conn.xtrace.iter_mut().find(|(n, _)| *n == target) {
                    Some(entry) => entry.1 = decay * entry.1 + value,
                    None => conn.xtrace.push((target, value)),
                }
            }
        }
    }

    fn propagate_node(
        &mut self,
        id: NodeId,
        rate: f64,
        momentum: f64,
        update: bool,
        target: Option<f64>,
    ) {
        let node = &self.nodes[id];
        let error = if let Some(target) = target {
            let delta = target - node.activation;
            ErrorSignal {
                responsibility: delta,
                projected: delta,
                gated: 0.0,
            }
        } else {
            let mut projected = 0.0;
            for &c in &node.outgoing {
                let conn = &self.links[c];
                projected += self.nodes[conn.to].error.responsibility * conn.weight * conn.gain;
            }
            projected *= node.derivative;

            let mut gated = 0.0;
            for &c in &node.gated {
                let conn = &self.links[c];
                let influenced = &self.nodes[conn.to];
                let mut influence = if self.links[influenced.self_link].gater == Some(id) {
                    influenced.old
                } else {
                    0.0
                };
                influence += conn.weight * self.nodes[conn.from].activation;
                gated += influenced.error.responsibility * influence;
            }
            gated *= node.derivative;

            ErrorSignal {
                responsibility: projected + gated,
                projected,
                gated,
            }
        };

        let mask = node.mask;
        self.nodes[id].error = error;

        for k in 0..self.nodes[id].incoming.len() {
            let c = self.nodes[id].incoming[k];
            let conn = &self.links[c];
            let mut gradient = error.projected * conn.eligibility;
            for &(influenced, value) in &conn.xtrace {
                gradient += self.nodes[influenced].error.responsibility * value;
            }

            let conn = &mut self.links[c];
            conn.total_delta_weight += rate * gradient * mask;
            if update {
                conn.total_delta_weight += momentum * conn.previous_delta_weight;
                conn.weight += conn.total_delta_weight;
                conn.previous_delta_weight = conn.total_delta_weight;
                conn.total_delta_weight = 0.0;
            }
        }

        let node = &mut self.nodes[id];
        node.total_delta_bias += rate * error.responsibility;
        if update {
            node.total_delta_bias += momentum * node.previous_delta_bias;
            node.bias += node.total_delta_bias;
            node.previous_delta_bias = node.total_delta_bias;
            node.total_delta_bias = 0.0;
        }
    }
}
