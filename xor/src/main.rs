use evomlp::{
    BoxError, Evolution, FileStorage, GeneticConfig, Network, PopulationConfig, State, Storage,
};
use evomlp_nn::networks::NetworkError;

use std::env;
use std::num::NonZeroUsize;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const ERROR_MARGIN: f64 = 0.3;
const PERFECT_SCORE: f64 = 16.0;
const MAX_GENERATIONS: usize = 200;

const VALUES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn score_xor(network: &mut Network) -> Result<f64, NetworkError> {
    let mut error = 0.0;
    for (input, output) in VALUES {
        let miss = (network.evaluate(&input)?[0] - output).abs();
        if miss >= ERROR_MARGIN {
            error += miss;
        }
    }
    Ok((4.0 - error).powi(2))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = env::args().nth(1).unwrap_or_else(|| "xor-run".into());
    if let Err(e) = run(&dir) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let population_config = PopulationConfig {
        size: NonZeroUsize::new(100).unwrap(),
        ..PopulationConfig::new(["a", "b"], ["a xor b"])
    };
    let genetic_config = GeneticConfig {
        mutation_probability: 0.15,
        hidden_layers: 1..=2,
        ..GeneticConfig::default()
    };

    let solved = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&solved);
    let evaluator = move |network: &mut Network| -> Result<f64, BoxError> {
        let score = score_xor(network)?;
        if (score - PERFECT_SCORE).abs() < f64::EPSILON {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(score)
    };

    let storage = FileStorage::new(dir)?;
    let evolution = Evolution::new(population_config, genetic_config, evaluator, storage)?;
    evolution.load()?;
    if let Some(generation) = evolution.generation() {
        info!(generation, "resuming from checkpoint");
    }

    evolution.start()?;
    let start = evolution.generation().map_or(0, |g| g + 1);
    while evolution.state() == State::Running
        && !solved.load(Ordering::SeqCst)
        && evolution.generation().map_or(0, |g| g + 1) < start + MAX_GENERATIONS
    {
        thread::sleep(Duration::from_millis(50));
    }
    evolution.stop(|| info!("evolution stopped"));
    evolution.wait()?;

    let population = evolution.population().ok_or("no generation was evaluated")?;
    let champion = population.champion().ok_or("population is empty")?;
    if let Some(stats) = population.fitness_stats() {
        info!(generation = population.generation(), ?stats, "final generation");
    }
    println!("{}", ron::to_string(champion.genome())?);
    if champion.fitness() < PERFECT_SCORE {
        warn!(fitness = champion.fitness(), "no perfect solution found");
    }

    // Fine-tune the champion with gradient descent.
    let mut network = Network::new(
        champion.genome().decode()?,
        evolution.population_config().input_names.clone(),
        evolution.population_config().output_names.clone(),
    )?;
    let inputs: Vec<Vec<f64>> = VALUES.iter().map(|(input, _)| input.to_vec()).collect();
    let expected: Vec<Vec<f64>> = VALUES.iter().map(|(_, output)| vec![*output]).collect();
    match network.train(&inputs, &expected, 0.01, 20_000) {
        Ok(epoch) => info!(epoch, score = score_xor(&mut network)?, "champion refined"),
        Err(e) => warn!(error = %e, "champion refinement did not converge"),
    }

    if let Some(checkpoint) = evolution.storage().load()? {
        info!(
            generation = checkpoint.generation(),
            dir = %evolution.storage().dir().display(),
            "checkpoint saved"
        );
    }
    Ok(())
}
