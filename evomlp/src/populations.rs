//! A Population is a generation of individuals, each
//! holding a genome and, once evaluated, its fitness.
//! Populations are bred from one another using an
//! evaluation function as the source of selective pressure.
mod config;
mod errors;
mod individual;
mod stats;

pub use config::PopulationConfig;
pub use errors::PopulationError;
pub use individual::{EvaluationError, FailureKind, Individual};
pub use stats::Stats;

use crate::genomics::{GeneticConfig, Genome};
use crate::operators::{mutate, Crossover};
use crate::rng::RngExt;
use crate::selection::{Elite, Selection, StochasticUniversalSampling};

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

type GenomeSet = HashSet<Genome, ahash::RandomState>;

/// A generation of individuals with pairwise distinct genomes.
#[derive(Clone, Debug)]
pub struct Population {
    generation: usize,
    individuals: Vec<Arc<Individual>>,
}

impl Population {
    /// Assembles a new generation of exactly `config.size`
    /// unevaluated individuals.
    ///
    /// At most `size - ⌊size × min_random_fraction⌋` seeds are
    /// kept, in order, and the rest of the population is filled
    /// with random genomes. Genomes appearing more than once are
    /// replaced in place by random ones.
    ///
    /// # Errors
    /// Returns an error if the configuration names no inputs or
    /// no outputs, or if a seed is malformed or doesn't map the
    /// configured inputs to the configured outputs.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{GeneticConfig, Population, PopulationConfig};
    ///
    /// let config = PopulationConfig::new(["a", "b"], ["out"]);
    /// let population = Population::new(0, vec![], &config, &GeneticConfig::default()).unwrap();
    ///
    /// assert_eq!(population.len(), config.size.get());
    /// assert!(population
    ///     .iter()
    ///     .all(|individual| individual.genome().shape().unwrap() == (2, 1)));
    /// ```
    pub fn new(
        generation: usize,
        seeds: Vec<Genome>,
        config: &PopulationConfig,
        genetic: &GeneticConfig,
    ) -> Result<Population, PopulationError> {
        let (inputs, outputs) = dimensions(config)?;
        for (index, seed) in seeds.iter().enumerate() {
            check_shape(index, seed, config)?;
        }

        let size = config.size.get();
        let kept = seeds.len().min(config.max_seeds());
        debug!(generation, seeds = seeds.len(), kept, "assembling population");

        let mut genomes = seeds;
        genomes.truncate(kept);
        genomes.extend((kept..size).map(|_| Genome::random(inputs, outputs, genetic)));
        deduplicate(&mut genomes, || Genome::random(inputs, outputs, genetic))?;

        Ok(Population {
            generation,
            individuals: genomes
                .into_iter()
                .map(|genome| Arc::new(Individual::new(genome)))
                .collect(),
        })
    }

    /// Rebuilds a checkpointed population, keeping
    /// its individuals and their fitness as they are.
    /// Repeated genomes only keep their first occurrence.
    ///
    /// # Errors
    /// Returns an error if the configuration names no inputs or
    /// no outputs, or if a genome is malformed or doesn't map the
    /// configured inputs to the configured outputs.
    pub fn restore(
        generation: usize,
        individuals: Vec<Individual>,
        config: &PopulationConfig,
    ) -> Result<Population, PopulationError> {
        dimensions(config)?;
        for (index, individual) in individuals.iter().enumerate() {
            check_shape(index, individual.genome(), config)?;
        }

        let mut seen = GenomeSet::default();
        let individuals = individuals
            .into_iter()
            .filter(|individual| seen.insert(individual.genome().clone()))
            .map(Arc::new)
            .collect();
        Ok(Population {
            generation,
            individuals,
        })
    }

    /// Breeds the next generation out of this one.
    ///
    /// The fittest and a sample of the rest are selected,
    /// and carried over along with crossovers of random pairs
    /// of them and mutants, until the selection fraction of
    /// the population size is reached. The result is then
    /// assembled like any new population seeded with them.
    ///
    /// # Errors
    /// Returns an error if a genome in the population is malformed.
    pub fn breed(
        &self,
        config: &PopulationConfig,
        genetic: &GeneticConfig,
    ) -> Result<Population, PopulationError> {
        let next = self.generation + 1;
        if self.individuals.is_empty() {
            return Population::new(next, vec![], config, genetic);
        }

        let available = self.individuals.len();
        let selection_size = config.selection_size();
        let fraction = |f: f64| (selection_size as f64 * f).floor() as usize;

        let mut selected = Elite.select(fraction(0.05).max(2).min(available), &self.individuals)?;
        selected.extend(
            StochasticUniversalSampling.select(fraction(0.2).max(4).min(available), &self.individuals)?,
        );
        let mut survivors: Vec<Genome> = selected
            .iter()
            .map(|individual| individual.genome().clone())
            .collect();

        let mut rng = rand::thread_rng();
        let parents = survivors.len();
        for _ in 0..fraction(0.2).max(4) {
            let dad = &survivors[rng.between_sizes(0, parents - 1)];
            let mom = &survivors[rng.between_sizes(0, parents - 1)];
            let child = Crossover::random().apply(dad, mom)?;
            survivors.push(child);
        }

        for parent in 0..parents.min(2) {
            for _ in 0..2 {
                let mutant = mutate(&survivors[parent], genetic)?;
                survivors.push(mutant);
            }
        }

        while survivors.len() < selection_size {
            let parent = rng.between_sizes(0, survivors.len() - 1);
            let mutant = mutate(&survivors[parent], genetic)?;
            survivors.push(mutant);
        }

        debug!(
            generation = next,
            selected = parents,
            survivors = survivors.len(),
            "bred next generation"
        );
        Population::new(next, survivors, config, genetic)
    }

    /// The generation this population belongs to.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn individuals(&self) -> &[Arc<Individual>] {
        &self.individuals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Individual>> {
        self.individuals.iter()
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// The fittest individual, if any.
    pub fn champion(&self) -> Option<&Arc<Individual>> {
        self.individuals
            .iter()
            .filter(|individual| !individual.fitness().is_nan())
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Highest fitness in the population, or
    /// negative infinity if it is empty.
    pub fn best_fitness(&self) -> f64 {
        self.fitness_stats()
            .map_or(f64::NEG_INFINITY, |stats| stats.maximum)
    }

    /// Mean fitness in the population, or
    /// negative infinity if it is empty.
    pub fn average_fitness(&self) -> f64 {
        self.fitness_stats()
            .map_or(f64::NEG_INFINITY, |stats| stats.mean)
    }

    /// Lowest fitness in the population, or
    /// negative infinity if it is empty.
    pub fn worst_fitness(&self) -> f64 {
        self.fitness_stats()
            .map_or(f64::NEG_INFINITY, |stats| stats.minimum)
    }

    /// Statistics on the population's fitness.
    pub fn fitness_stats(&self) -> Option<Stats> {
        Stats::from(self.individuals.iter().map(|individual| individual.fitness()))
    }
}

fn dimensions(config: &PopulationConfig) -> Result<(NonZeroUsize, NonZeroUsize), PopulationError> {
    let inputs = NonZeroUsize::new(config.inputs()).ok_or(PopulationError::NoInputs)?;
    let outputs = NonZeroUsize::new(config.outputs()).ok_or(PopulationError::NoOutputs)?;
    Ok((inputs, outputs))
}

fn check_shape(index: usize, genome: &Genome, config: &PopulationConfig) -> Result<(), PopulationError> {
    let wrap = |source| PopulationError::Genome { index, source };
    genome.validate().map_err(wrap)?;
    let found = genome.shape().map_err(wrap)?;
    let expected = (config.inputs(), config.outputs());
    if found != expected {
        return Err(PopulationError::ShapeMismatch {
            index,
            expected,
            found,
        });
    }
    Ok(())
}

/// Fresh genomes drawn per population member
/// before giving up on finding distinct ones.
const REDRAWS_PER_GENOME: usize = 10;

/// Replaces every repeated genome with a fresh one.
fn deduplicate(
    genomes: &mut [Genome],
    mut fresh: impl FnMut() -> Genome,
) -> Result<(), PopulationError> {
    let mut seen = GenomeSet::default();
    let budget = genomes.len() * REDRAWS_PER_GENOME;
    let mut replaced = 0;
    for genome in genomes.iter_mut() {
        while !seen.insert(genome.clone()) {
            if replaced == budget {
                return Err(PopulationError::NotEnoughDistinctGenomes {
                    size: genomes.len(),
                    draws: budget,
                });
            }
            *genome = fresh();
            replaced += 1;
        }
    }
    if replaced > 0 {
        debug!(replaced, "replaced duplicate genomes");
    }
    Ok(())
}
