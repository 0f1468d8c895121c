//! Performance benchmarks for GRIDMIND

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridmind::evolution::WorldTemplate;
use gridmind::{evaluate_genome, Config, GeneticPool, Genome, GridNetwork, WallGrid};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn benchmark_network_tick(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome = Genome::random(100, &mut rng);
    let mut network = GridNetwork::from_genome(10, 10, &genome).unwrap();

    c.bench_function("network_tick_10x10", |b| {
        b.iter(|| {
            network.stimulate(5, 5, 0.5).unwrap();
            network.fire_and_update();
            black_box(network.activations().len())
        });
    });
}

fn benchmark_world_generation(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("world_generation_30x30", |b| {
        b.iter(|| WallGrid::random(black_box(&config.world), &mut rng));
    });
}

fn benchmark_evaluation(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let worlds: Vec<WorldTemplate> = (0..config.fitness.num_worlds_to_test)
        .map(|_| {
            let walls = WallGrid::random(&config.world, &mut rng);
            let start = walls.random_empty_cell(&mut rng).unwrap();
            WorldTemplate { walls, start }
        })
        .collect();
    let genome = Genome::random(config.genetics.num_genes, &mut rng);

    c.bench_function("evaluate_genome", |b| {
        b.iter(|| evaluate_genome(black_box(&genome), &config, &worlds).unwrap());
    });
}

fn benchmark_pool_evolve(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut pool = GeneticPool::from_config(&config.genetics, &mut rng).unwrap();

    c.bench_function("pool_evolve", |b| {
        b.iter(|| {
            for i in 0..pool.len() {
                pool.set_fitness(i, (i % 7) as f32).unwrap();
            }
            pool.evolve(
                config.genetics.generation_size,
                config.genetics.elite_size,
                config.genetics.new_gene_probability,
                &mut rng,
            )
            .unwrap();
        });
    });
}

criterion_group!(
    benches,
    benchmark_network_tick,
    benchmark_world_generation,
    benchmark_evaluation,
    benchmark_pool_evolve,
);

criterion_main!(benches);
