//! Benchmarks for symbios-neuro.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use symbios_neuro::{Compatibility, Mutation, MutationConfig, Network, Sample, TrainOptions};

fn grown(rng: &mut ChaCha8Rng) -> Network {
    let mut network = Network::perceptron(&[4, 8, 2], rng).unwrap();
    let config = MutationConfig::default();
    for _ in 0..5 {
        Mutation::AddNode.apply(&mut network, &config, rng);
        Mutation::AddGate.apply(&mut network, &config, rng);
        Mutation::AddSelfConnection.apply(&mut network, &config, rng);
    }
    network
}

fn bench_network_creation(c: &mut Criterion) {
    c.bench_function("perceptron_4_16_16_2", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| {
            black_box(Network::perceptron(&[4, 16, 16, 2], &mut rng).unwrap());
        });
    });
}

fn bench_activation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = grown(&mut rng);
    let input = [0.1, 0.4, -0.3, 0.9];

    c.bench_function("activate_traced", |b| {
        b.iter(|| {
            black_box(network.activate(&input).unwrap());
        });
    });

    c.bench_function("activate_no_trace", |b| {
        b.iter(|| {
            black_box(network.activate_no_trace(&input).unwrap());
        });
    });
}

fn bench_propagation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut network = grown(&mut rng);
    let input = [0.1, 0.4, -0.3, 0.9];
    let target = [1.0, 0.0];

    c.bench_function("activate_propagate", |b| {
        b.iter(|| {
            network.activate(&input).unwrap();
            network.propagate(0.1, 0.0, true, &target).unwrap();
            black_box(&network);
        });
    });
}

fn bench_mutation(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let network = grown(&mut rng);
    let config = MutationConfig::default();

    c.bench_function("network_mutation", |b| {
        let mut n = network.clone();
        let mut round = 0;
        b.iter(|| {
            let mutation = Mutation::FFW[round % Mutation::FFW.len()];
            round += 1;
            black_box(n.mutate(mutation, &config, &mut rng));
        });
    });
}

fn bench_crossover(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let parent1 = grown(&mut rng);
    let parent2 = grown(&mut rng);

    c.bench_function("network_crossover", |b| {
        b.iter(|| {
            black_box(Network::crossover(&parent1, &parent2, false, &mut rng).unwrap());
        });
    });

    let compatibility = Compatibility::default();
    c.bench_function("compatibility_distance", |b| {
        b.iter(|| {
            black_box(compatibility.distance(&parent1, &parent2));
        });
    });
}

fn bench_training(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let network = Network::perceptron(&[2, 4, 1], &mut rng).unwrap();
    let set = vec![
        Sample::new([0.0, 0.0], [0.0]),
        Sample::new([0.0, 1.0], [1.0]),
        Sample::new([1.0, 0.0], [1.0]),
        Sample::new([1.0, 1.0], [0.0]),
    ];
    let options = TrainOptions {
        iterations: Some(100),
        ..TrainOptions::default()
    };

    c.bench_function("train_xor_100_iterations", |b| {
        b.iter(|| {
            let mut n = network.clone();
            black_box(n.train(&set, &options, &mut rng).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_network_creation,
    bench_activation,
    bench_propagation,
    bench_mutation,
    bench_crossover,
    bench_training,
);
criterion_main!(benches);
