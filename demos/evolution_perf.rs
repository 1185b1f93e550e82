//! Quick evolution performance test

use district_evolve::{EvolutionConfig, EvolutionEngine, MasterGraph, schema::LocalSearchConfig};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    println!("=== Evolution Performance Test ===\n");

    // Test different grid sizes
    for side in [8, 16, 32] {
        println!("Grid size: {}x{}", side, side);

        let graph = Arc::new(MasterGraph::grid(side, side, 4).expect("grid"));
        let config = EvolutionConfig {
            generations: 20,
            population_size: 40,
            optimization_interval: 5,
            local_search: LocalSearchConfig {
                steps: 20,
                sample_size: 50,
            },
            random_seed: Some(42),
            ..Default::default()
        };

        report(config, graph);
    }

    // Population size scalability
    println!("=== Population Scalability (16x16 grid) ===\n");
    let graph = Arc::new(MasterGraph::grid(16, 16, 4).expect("grid"));

    for population_size in [20, 60, 120] {
        println!("Population: {}", population_size);

        let config = EvolutionConfig {
            generations: 10,
            population_size,
            optimization_interval: 5,
            random_seed: Some(42),
            ..Default::default()
        };

        report(config, Arc::clone(&graph));
    }
}

fn report(config: EvolutionConfig, graph: Arc<MasterGraph>) {
    let start = Instant::now();
    let mut engine = EvolutionEngine::from_graph(config, graph).expect("engine");
    let result = engine.run().expect("run");
    let elapsed = start.elapsed();

    let total_evals = result.stats.total_evaluations;
    let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

    println!("  Generations:    {}", result.stats.generations);
    println!("  Evaluations:    {}", total_evals);
    println!("  Refinements:    {}", result.stats.total_refinements);
    println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
    println!("  Evals/sec:      {:.1}", evals_per_sec);
    println!("  Front size:     {}", result.pareto_front.len());
    println!();
}
