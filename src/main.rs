//! district-evolve CLI - Run a partition search from a JSON run configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use district_evolve::{
    compute::evolution::{EvolutionEngine, ProgressCallback},
    schema::{EvolutionProgress, RunConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json>", args[0]);
        eprintln!();
        eprintln!("Search for a balanced contiguous partition of a weighted graph.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json  Path to run configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    // Load configuration
    let config = RunConfig::load(&args[1]).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let graph = config.graph.load().unwrap_or_else(|e| {
        eprintln!("Error loading graph: {}", e);
        std::process::exit(1);
    });

    eprintln!("District Evolution");
    eprintln!("==================");
    eprintln!(
        "Graph: {} vertices, {} edges, {} districts",
        graph.num_vertices(),
        graph.num_edges(),
        graph.districts()
    );
    eprintln!(
        "Population: {}, generations: {}",
        config.evolution.population_size, config.evolution.generations
    );
    eprintln!();

    let mut engine = EvolutionEngine::from_graph(config.evolution.clone(), Arc::new(graph))
        .unwrap_or_else(|e| {
            eprintln!("Error creating engine: {}", e);
            std::process::exit(1);
        });

    install_interrupt_handler(engine.cancel_handle());

    let interval = (config.evolution.generations / 10).max(1);
    let report: ProgressCallback = Box::new(move |progress: &EvolutionProgress| {
        if progress.generation % interval == 0 {
            log::info!(
                "Generation {}/{}: front {}, best {:?}, mutation p={:.3}",
                progress.generation,
                progress.total_generations,
                progress.front_size,
                progress.best_scores,
                progress.mutation_probability
            );
        }
    });

    let result = engine.run_with_callback(report).unwrap_or_else(|e| {
        eprintln!("Evolution failed: {}", e);
        std::process::exit(1);
    });

    eprintln!(
        "Stopped after {} generations ({:?}) in {:.2}s",
        result.stats.generations, result.stats.stop_reason, result.stats.elapsed_seconds
    );
    eprintln!("Pareto front: {} partitions", result.pareto_front.len());
    for snapshot in &result.pareto_front {
        let scores: Vec<String> = snapshot
            .scores
            .iter()
            .map(|s| format!("{}={:.3}", s.name, s.score))
            .collect();
        eprintln!("  #{}: {}", snapshot.id, scores.join(", "));
    }

    let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
        eprintln!("Error serializing result: {}", e);
        std::process::exit(1);
    });

    match &config.output {
        Some(path) => {
            fs::write(path, json).unwrap_or_else(|e| {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            });
            eprintln!("Result written to {}", path);
        }
        None => println!("{}", json),
    }
}

/// First Ctrl-C stops the run at the next generation boundary; a second one exits.
fn install_interrupt_handler(cancel: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        log::warn!("Interrupted; finishing with the best front so far");
    });
    if let Err(e) = result {
        log::warn!("Could not install interrupt handler: {}", e);
    }
}

fn print_example_config() {
    let config = RunConfig::example();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
