//! Integration tests for symbios-neuro.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use symbios_genetics::Genotype;
use symbios_neuro::{
    Activation, Cost, EvolveOptions, Mutation, MutationConfig, Neat, NeatConfig, Network,
    NetworkError, NodeType, Sample, TrainOptions,
};

fn and_set() -> Vec<Sample> {
    vec![
        Sample::new([0.0, 0.0], [0.0]),
        Sample::new([0.0, 1.0], [0.0]),
        Sample::new([1.0, 0.0], [0.0]),
        Sample::new([1.0, 1.0], [1.0]),
    ]
}

/// Grow a network with a mix of structural mutations, including gates and
/// self connections.
fn grown_network(rng: &mut ChaCha8Rng) -> Network {
    let mut network = Network::new(3, 2, rng).unwrap();
    let config = MutationConfig::default();
    for _ in 0..4 {
        Mutation::AddNode.apply(&mut network, &config, rng);
    }
    for _ in 0..6 {
        Mutation::AddConnection.apply(&mut network, &config, rng);
        Mutation::AddGate.apply(&mut network, &config, rng);
    }
    Mutation::AddSelfConnection.apply(&mut network, &config, rng);
    Mutation::AddBackConnection.apply(&mut network, &config, rng);
    network
}

#[test]
fn test_perceptron_closed_form_counts() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for layers in [vec![2, 1], vec![3, 5, 2], vec![4, 3, 3, 6]] {
        let network = Network::perceptron(&layers, &mut rng).unwrap();
        let nodes: usize = layers.iter().sum();
        let connections: usize = layers.windows(2).map(|w| w[0] * w[1]).sum();
        assert_eq!(network.node_count(), nodes);
        assert_eq!(network.connection_count(), connections);
        assert_eq!(network.gate_count(), 0);
    }
}

#[test]
fn test_hopfield_closed_form_counts() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let network = Network::hopfield(5, &mut rng).unwrap();
    assert_eq!(network.connection_count(), 25);
    assert_eq!(network.gate_count(), 0);
    for &id in &network.node_ids()[5..] {
        assert_eq!(network.node(id).unwrap().squash, Activation::Step);
    }
}

#[test]
fn test_training_and_does_not_increase_error() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = Network::new(2, 1, &mut rng).unwrap();
    let set = and_set();

    let before = network.test(&set, Cost::Mse).unwrap().error;
    let options = TrainOptions {
        iterations: Some(2000),
        rate: 0.3,
        ..TrainOptions::default()
    };
    let result = network.train(&set, &options, &mut rng).unwrap();
    let after = network.test(&set, Cost::Mse).unwrap().error;

    assert_eq!(result.iterations, 2000);
    assert!(before.is_finite() && after.is_finite());
    assert!(after <= before);
}

#[test]
fn test_training_reaches_error_target() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut network = Network::perceptron(&[2, 3, 1], &mut rng).unwrap();
    let options = TrainOptions {
        iterations: Some(20_000),
        error: Some(0.05),
        rate: 0.5,
        ..TrainOptions::default()
    };
    let result = network.train(&and_set(), &options, &mut rng).unwrap();
    assert!(result.error <= 0.05);
    assert!(result.iterations > 0 && result.iterations < 20_000);

    // Already below the target: the first epoch stops training.
    let again = network.train(&and_set(), &options, &mut rng).unwrap();
    assert!(again.error <= 0.05);
    assert!(again.iterations <= result.iterations);
}

#[test]
fn test_json_round_trip_is_isomorphic() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = grown_network(&mut rng);

    let json = network.to_json().unwrap();
    let mut restored = Network::from_json(&json).unwrap();

    assert_eq!(restored.node_count(), network.node_count());
    assert_eq!(restored.connection_count(), network.connection_count());
    assert_eq!(restored.self_connection_count(), network.self_connection_count());
    assert_eq!(restored.gate_count(), network.gate_count());

    let index = |n: &Network, id| n.node(id).unwrap().index();
    for (_, conn) in network.connections().chain(network.self_connections()) {
        let from = restored.node_at(index(&network, conn.from())).unwrap();
        let to = restored.node_at(index(&network, conn.to())).unwrap();
        let twin = restored.connection(restored.connection_between(from, to).unwrap()).unwrap();
        assert_eq!(twin.weight, conn.weight);
        assert_eq!(
            twin.gater().map(|g| index(&restored, g)),
            conn.gater().map(|g| index(&network, g))
        );
    }

    let input = [0.3, -0.7, 1.2];
    let expected = network.activate_no_trace(&input).unwrap();
    let actual = restored.activate_no_trace(&input).unwrap();
    for (a, b) in expected.iter().zip(&actual) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }
}

#[test]
fn test_from_json_rejects_malformed_records() {
    assert!(matches!(Network::from_json("{"), Err(NetworkError::Json(_))));

    let misplaced = r#"{
        "inputSize": 1, "outputSize": 1,
        "nodes": [
            { "index": 0, "bias": 0.0, "type": "OUTPUT", "squashId": "LOGISTIC" },
            { "index": 1, "bias": 0.0, "type": "INPUT", "squashId": "LOGISTIC" }
        ],
        "connections": []
    }"#;
    assert!(matches!(
        Network::from_json(misplaced),
        Err(NetworkError::InvalidRecord(_))
    ));
}

#[test]
fn test_crossover_of_identical_parents() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let parent = grown_network(&mut rng);

    let child = Network::crossover(&parent, &parent, true, &mut rng).unwrap();
    assert_eq!(child.node_count(), parent.node_count());
    assert_eq!(child.connection_count(), parent.connection_count());
    for (&a, &b) in parent.node_ids().iter().zip(child.node_ids()) {
        let (a, b) = (parent.node(a).unwrap(), child.node(b).unwrap());
        assert_eq!(a.bias, b.bias);
        assert_eq!(a.squash, b.squash);
        assert_eq!(a.node_type(), b.node_type());
    }
}

#[test]
fn test_crossover_rejects_mismatched_shapes() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let a = Network::new(2, 1, &mut rng).unwrap();
    let b = Network::new(3, 1, &mut rng).unwrap();
    assert!(matches!(
        Network::crossover(&a, &b, false, &mut rng),
        Err(NetworkError::IncompatibleNetworks { .. })
    ));
}

#[test]
fn test_remove_node_bridges_paths() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = Network::new(2, 1, &mut rng).unwrap();
    let ids = network.node_ids().to_vec();
    let hidden = network.add_hidden_node(Activation::Tanh, &mut rng);
    network.disconnect(ids[0], ids[2]).unwrap();
    network.disconnect(ids[1], ids[2]).unwrap();
    network.connect(ids[0], hidden, 0.5).unwrap();
    network.connect(ids[1], hidden, 0.5).unwrap();
    network.connect(hidden, ids[2], 0.5).unwrap();
    let before = network.node_count();

    network.remove_node(hidden, true, &mut rng).unwrap();

    assert_eq!(network.node_count(), before - 1);
    assert!(network.is_projecting(ids[0], ids[2]));
    assert!(network.is_projecting(ids[1], ids[2]));
    assert_eq!(network.connection_count(), 2);
    for (i, &id) in network.node_ids().iter().enumerate() {
        assert_eq!(network.node(id).unwrap().index(), i);
    }
}

#[test]
fn test_remove_node_protects_inputs_and_outputs() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = Network::new(2, 1, &mut rng).unwrap();
    let input = network.node_ids()[0];
    assert!(matches!(
        network.remove_node(input, true, &mut rng),
        Err(NetworkError::ProtectedNode(0))
    ));
}

#[test]
fn test_mutations_keep_network_usable() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = Network::new(3, 2, &mut rng).unwrap();
    let config = MutationConfig::default();

    for round in 0..200 {
        let mutation = Mutation::ALL[round % Mutation::ALL.len()];
        network.mutate(mutation, &config, &mut rng);

        assert_eq!(network.input_size(), 3);
        assert_eq!(network.output_size(), 2);
        for (i, &id) in network.node_ids().iter().enumerate() {
            let node = network.node(id).unwrap();
            assert_eq!(node.index(), i);
            let expected = match i {
                0..3 => NodeType::Input,
                3..5 => NodeType::Output,
                _ => NodeType::Hidden,
            };
            assert_eq!(node.node_type(), expected);
        }
        assert_eq!(network.activate(&[0.1, 0.2, 0.3]).unwrap().len(), 2);
    }
}

#[test]
fn test_genotype_population_cycle() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut population: Vec<Network> = (0..10)
        .map(|_| Network::new(2, 1, &mut rng).unwrap())
        .collect();

    for _ in 0..5 {
        for genome in &mut population {
            Genotype::mutate(genome, &mut rng, 1.0);
        }

        let mut offspring = Vec::new();
        for pair in population.chunks(2) {
            if let [a, b] = pair {
                offspring.push(Genotype::crossover(a, b, &mut rng));
            }
        }
        population.extend(offspring);
        population.truncate(10);
    }

    for genome in &mut population {
        let output = genome.activate(&[0.5, 0.5]).unwrap();
        assert_eq!(output.len(), 1);
    }
}

#[test]
fn test_neat_generations_keep_population_size() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let template = Network::new(2, 1, &mut rng).unwrap();
    let fitness = |n: &mut Network| -(n.complexity() as f64);
    let config = NeatConfig {
        population_size: 12,
        elitism: 2,
        provenance: 1,
        threads: Some(2),
        ..NeatConfig::default()
    };
    let mut neat = Neat::new(&template, fitness, config).unwrap();

    for generation in 1..=5 {
        neat.evolve(&mut rng).unwrap();
        assert_eq!(neat.generation(), generation);
        assert_eq!(neat.population().len(), 12);
    }

    let exported = neat.export();
    assert_eq!(exported.len(), 12);
    neat.import(&exported).unwrap();
    assert_eq!(neat.population().len(), 12);
}

#[test]
fn test_evolve_adopts_fittest_genome() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = Network::new(2, 1, &mut rng).unwrap();
    let set = and_set();
    let before = network.test(&set, Cost::Mse).unwrap().error;

    let options = EvolveOptions {
        iterations: Some(15),
        neat: NeatConfig {
            population_size: 30,
            elitism: 3,
            threads: Some(2),
            ..NeatConfig::default()
        },
        ..EvolveOptions::default()
    };
    let result = network.evolve(&set, &options, &mut rng).unwrap();

    assert_eq!(result.iterations, 15);
    let after = network.test(&set, Cost::Mse).unwrap().error;
    assert!(after <= before + 1e-3);
}
