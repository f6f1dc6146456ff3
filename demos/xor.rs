//! XOR example: gradient training versus topology evolution.
//!
//! First trains a fixed 2-4-1 perceptron with backpropagation, then evolves a
//! minimal 2-1 network with the NEAT driver until it solves XOR.
//!
//! Run with: `RUST_LOG=info cargo run --example xor`

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use symbios_neuro::{
    DatasetFitness, EvolveOptions, Mutation, NeatConfig, Network, RatePolicy, Sample,
    TrainOptions,
};

fn xor_set() -> Vec<Sample> {
    vec![
        Sample::new([0.0, 0.0], [0.0]),
        Sample::new([0.0, 1.0], [1.0]),
        Sample::new([1.0, 0.0], [1.0]),
        Sample::new([1.0, 1.0], [0.0]),
    ]
}

fn report(network: &mut Network, set: &[Sample]) {
    for sample in set {
        let output = match network.activate_no_trace(&sample.input) {
            Ok(output) => output[0],
            Err(err) => {
                eprintln!("activation failed: {err}");
                return;
            }
        };
        let expected = sample.output[0];
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            sample.input[0], sample.input[1], output, expected, status
        );
    }
}

fn main() -> symbios_neuro::Result<()> {
    env_logger::init();

    let set = xor_set();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    println!("Backpropagation");
    println!("===============\n");

    let mut perceptron = Network::perceptron(&[2, 4, 1], &mut rng)?;
    let options = TrainOptions {
        iterations: Some(20_000),
        error: Some(0.005),
        rate: 0.3,
        momentum: 0.5,
        rate_policy: RatePolicy::EXP,
        shuffle: true,
        log: Some(2_000),
        ..TrainOptions::default()
    };
    let result = perceptron.train(&set, &options, &mut rng)?;
    println!(
        "error {:.5} after {} iterations in {:?}",
        result.error, result.iterations, result.time
    );
    report(&mut perceptron, &set);

    println!("\nNeuro-evolution");
    println!("===============\n");

    let mut network = Network::new(2, 1, &mut rng)?;
    let options = EvolveOptions {
        iterations: Some(500),
        error: Some(0.01),
        log: Some(25),
        schedule: Some(50),
        neat: NeatConfig {
            population_size: 150,
            elitism: 5,
            mutation_rate: 0.5,
            mutations: Mutation::FFW.to_vec(),
            ..NeatConfig::default()
        },
        ..EvolveOptions::default()
    };

    let mut species_seen = 0;
    let fitness = DatasetFitness::new(set.clone(), options.cost, options.amount);
    let result = network.evolve_with_schedule(
        fitness,
        &options,
        &mut rng,
        |progress| {
            species_seen = species_seen.max(progress.species);
            println!(
                "Gen {:3}: fitness={:.4}, error={:.4}, species={}",
                progress.generation, progress.fitness, progress.error, progress.species
            );
        },
    )?;

    println!();
    println!("Evolution Complete!");
    println!("==================");
    println!("Error: {:.5}", result.error);
    println!("Generations: {}", result.iterations);
    println!("Nodes: {}", network.node_count());
    println!("Connections: {}", network.connection_count());
    println!("Hidden nodes: {}", network.hidden_count());
    println!("Most species at once: {species_seen}");

    println!("\nChampion XOR outputs:");
    report(&mut network, &set);
    Ok(())
}
