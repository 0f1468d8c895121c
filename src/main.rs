//! GRIDMIND - CLI Entry Point
//!
//! Evolves grid brains for wall-world navigation.

use clap::{Parser, Subcommand};
use gridmind::checkpoint::{Checkpoint, CheckpointManager};
use gridmind::{benchmark, Config, EpochOutcome, EvolutionEngine, NeuronKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Checkpoints kept per output directory
const KEEP_CHECKPOINTS: usize = 10;

#[derive(Parser)]
#[command(name = "gridmind")]
#[command(version)]
#[command(about = "Evolves cellular grid brains that steer agents through walled worlds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new training run
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of epochs (overrides the config)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Output directory for checkpoints and stats
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resume training from a checkpoint
    Resume {
        /// Checkpoint file to resume from
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Number of additional epochs
        #[arg(short, long, default_value = "10")]
        epochs: usize,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of epochs
        #[arg(short, long, default_value = "3")]
        epochs: usize,

        /// Genomes per generation
        #[arg(short, long, default_value = "60")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The run config may carry its own default level; RUST_LOG still wins
    let level = match &cli.command {
        Commands::Run { config, .. } if config.exists() => Config::from_file(config)
            .map(|c| c.logging.log_level)
            .unwrap_or_else(|_| "info".to_string()),
        _ => "info".to_string(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            config,
            epochs,
            output,
            seed,
            quiet,
        } => run_training(config, epochs, output, seed, quiet),

        Commands::Resume {
            checkpoint,
            epochs,
            output,
        } => resume_training(checkpoint, epochs, output),

        Commands::Benchmark { epochs, population } => run_benchmark(epochs, population),

        Commands::Init { output } => generate_config(output),

        Commands::Analyze { checkpoint } => analyze_checkpoint(checkpoint),
    }
}

fn run_training(
    config_path: PathBuf,
    epochs: Option<usize>,
    output: PathBuf,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };
    if let Some(epochs) = epochs {
        config.fitness.num_epochs = epochs;
    }

    let seed = seed.unwrap_or_else(rand::random);
    let mut engine = EvolutionEngine::new(config.clone(), seed)?;

    println!("Starting training");
    println!("  Seed: {}", seed);
    println!("  Brain: {}x{}", config.brain.size_x, config.brain.size_y);
    println!("  World: {}x{}", config.world.width, config.world.height);
    println!("  Pool: {} genomes of {} genes", engine.pool().len(), config.genetics.num_genes);
    println!("  Epochs: {}", config.fitness.num_epochs);
    println!();

    let epochs = engine.remaining_epochs();
    drive(&mut engine, epochs, &output, quiet)
}

fn resume_training(
    checkpoint_path: PathBuf,
    epochs: usize,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading checkpoint: {:?}", checkpoint_path);

    let checkpoint = Checkpoint::load(&checkpoint_path)?;
    let mut engine = EvolutionEngine::from_checkpoint(checkpoint)?;

    println!("Resumed at epoch {}", engine.epoch());
    println!("Best fitness so far: {:.2}", engine.best_fitness());
    println!("Running {} additional epochs", epochs);
    println!();

    drive(&mut engine, epochs, &output, false)
}

/// Run epochs with periodic checkpoints, then write the final state
fn drive(
    engine: &mut EvolutionEngine,
    epochs: usize,
    output: &Path,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output)?;
    let mut checkpoint_mgr = CheckpointManager::new(
        output,
        engine.config().logging.checkpoint_interval,
        KEEP_CHECKPOINTS,
    )?;

    let start = Instant::now();
    engine.run_with_callback(epochs, |engine, outcome| {
        if let Some(stats) = outcome.stats() {
            if !quiet {
                println!("{}", stats.summary());
            }
        }
        if matches!(outcome, EpochOutcome::Cancelled) {
            return;
        }
        if checkpoint_mgr.should_save(engine.epoch()) {
            match checkpoint_mgr.save(&engine.create_checkpoint()) {
                Ok(path) => {
                    if !quiet {
                        println!("  Checkpoint saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("  Checkpoint error: {}", e),
            }
        }
    })?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Training Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Epochs: {}", engine.epoch());
    println!("Best fitness: {:.2}", engine.best_fitness());
    if let Some(best) = engine.best() {
        println!("Best found in epoch: {}", best.epoch);
    }
    println!(
        "Reinitializations: {}",
        engine.history().reinitializations()
    );

    let final_path = output.join("checkpoint_final.bin");
    engine.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {:?}", final_path);

    let stats_path = output.join("stats_history.json");
    engine.history().save(&stats_path.to_string_lossy())?;
    println!("Stats history: {:?}", stats_path);

    Ok(())
}

fn run_benchmark(epochs: usize, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== GRIDMIND Benchmark ===");
    println!("Epochs: {}", epochs);
    println!("Population: {}", population);
    println!();

    let result = benchmark(epochs, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {:?}", checkpoint_path);
    println!();

    let checkpoint = Checkpoint::load(&checkpoint_path)?;

    println!("Epoch: {}", checkpoint.epoch);
    println!("Seed: {}", checkpoint.seed);
    println!("Pool: {} genomes (generation {})", checkpoint.pool.len(), checkpoint.pool.generation());
    println!();

    match &checkpoint.best {
        Some(best) => {
            println!("Best fitness: {:.2} (epoch {})", best.fitness, best.epoch);
            println!("Best genome neuron mix:");
            let histogram = best.genome.kind_histogram();
            for (kind, count) in NeuronKind::ALL.iter().zip(histogram) {
                if count > 0 {
                    println!(
                        "  {:<14} {:4} ({:.1}%)",
                        kind.name(),
                        count,
                        100.0 * count as f32 / best.genome.len().max(1) as f32
                    );
                }
            }
        }
        None => println!("No genome has scored yet"),
    }

    let history = &checkpoint.history;
    if let Some(top) = history.best_overall() {
        println!();
        println!("Epochs recorded: {}", history.len());
        println!("Peak epoch: {} ({:.2})", top.epoch, top.best);
        println!("Reinitializations: {}", history.reinitializations());
        let means = history.mean_series();
        if let (Some(first), Some(last)) = (means.first(), means.last()) {
            println!("Mean fitness: {:.2} -> {:.2}", first.1, last.1);
        }
    }

    println!();
    println!(
        "Checkpoint size: {:.2} KB",
        checkpoint.size_bytes() as f64 / 1_000.0
    );

    Ok(())
}
