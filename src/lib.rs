//! # Symbios Neuro
//!
//! Graph-based neural networks that learn by gradient descent and by
//! neuro-evolution of their topology.
//!
//! ## Features
//!
//! - **Arena-Graph Model**: nodes and connections live in `SlotMap` arenas with an
//!   explicit index order (inputs, outputs, then hidden nodes)
//! - **Trace-Based Learning**: eligibility and extended traces support recurrent
//!   self connections and multiplicative gates during backpropagation
//! - **Structural Mutation**: fourteen operators that grow and prune nodes,
//!   connections, self connections and gates
//! - **NEAT Driver**: selection, crossover and mutation over a population scored
//!   in parallel on a `rayon` thread pool
//! - **Genotype Trait**: `Network` implements `symbios_genetics::Genotype` for use
//!   with the generic evolutionary algorithms of that crate
//!
//! ## Quick Start
//!
//! ```rust
//! use symbios_neuro::{Network, Sample, TrainOptions};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut network = Network::perceptron(&[2, 3, 1], &mut rng).unwrap();
//!
//! let set = vec![
//!     Sample::new([0.0, 0.0], [0.0]),
//!     Sample::new([0.0, 1.0], [0.0]),
//!     Sample::new([1.0, 0.0], [0.0]),
//!     Sample::new([1.0, 1.0], [1.0]),
//! ];
//! let options = TrainOptions {
//!     iterations: Some(500),
//!     ..TrainOptions::default()
//! };
//! let result = network.train(&set, &options, &mut rng).unwrap();
//! println!("error after {} iterations: {}", result.iterations, result.error);
//! ```
//!
//! ## Evolving a Topology
//!
//! ```rust,no_run
//! use symbios_neuro::{EvolveOptions, Network, Sample};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let mut network = Network::new(2, 1, &mut rng).unwrap();
//! let set = vec![
//!     Sample::new([0.0, 0.0], [0.0]),
//!     Sample::new([0.0, 1.0], [1.0]),
//!     Sample::new([1.0, 0.0], [1.0]),
//!     Sample::new([1.0, 1.0], [0.0]),
//! ];
//! let options = EvolveOptions {
//!     iterations: Some(100),
//!     error: Some(0.01),
//!     ..EvolveOptions::default()
//! };
//! let result = network.evolve(&set, &options, &mut rng).unwrap();
//! println!("evolved to error {} in {} generations", result.error, result.iterations);
//! ```
//!
//! ## Architecture
//!
//! ### Index Order and Activation Order
//!
//! Every node has a dense index: inputs occupy `[0, input_size)`, outputs the
//! next `output_size` slots and hidden nodes follow. Activation visits inputs,
//! then hidden nodes in index order, then outputs, so a connection is
//! feed-forward exactly when its source activates before its target.
//!
//! ### Innovation Numbers
//!
//! Connection genes are matched across genomes by the Cantor pairing of their
//! endpoint indices. The pairing is invertible, so crossover can rebuild a
//! connection from its innovation number alone.

pub mod activation;
pub mod architect;
pub mod cost;
pub mod crossover;
pub mod error;
pub mod evolve;
pub mod fitness;
pub mod gene;
pub mod innovation;
pub mod mutation;
pub mod neat;
pub mod network;
pub mod propagation;
pub mod rate;
pub mod record;
pub mod species;
pub mod training;

// Re-exports for convenience
pub use activation::Activation;
pub use cost::Cost;
pub use error::{NetworkError, Result};
pub use evolve::{EvolveOptions, EvolveProgress, EvolveResult};
pub use fitness::{DatasetFitness, Fitness};
pub use gene::{Connection, ConnectionId, Node, NodeId, NodeType};
pub use innovation::{connection_innovation, innovation_endpoints};
pub use mutation::{Mutation, MutationConfig};
pub use neat::{Neat, NeatConfig, Selection};
pub use network::Network;
pub use rate::RatePolicy;
pub use record::{ConnectionRecord, NetworkRecord, NodeRecord};
pub use species::{Compatibility, Species};
pub use training::{CrossValidate, Progress, Sample, TestResult, TrainOptions, TrainResult};
