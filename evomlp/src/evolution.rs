//! The evolution driver: evaluates one generation
//! after another on a worker pool, checkpointing
//! each one, until asked to stop.
mod errors;
mod evaluator;

pub use errors::*;
pub use evaluator::*;

use crate::genomics::{GeneticConfig, Genome};
use crate::populations::{EvaluationError, FailureKind, Individual, Population, PopulationConfig};
use crate::storage::{Checkpoint, Storage};

use chrono::Utc;
use evomlp_nn::networks::Network;
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// The states of an [`Evolution`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No generation is being evaluated.
    Stopped,
    /// Generations are evaluated one after another.
    Running,
    /// The generation in flight is the last one.
    Stopping,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

type StopCallback = Box<dyn FnOnce() + Send>;

struct Control {
    state: State,
    /// The last population evaluated without failures, or loaded.
    population: Option<Arc<Population>>,
    seeds: Vec<Genome>,
    on_stopped: Vec<StopCallback>,
    halt: Option<EvolutionError>,
    /// Runs started so far.
    started: u64,
    /// Latest run whose stop callbacks have all been called.
    settled: u64,
}

struct Shared<E, S> {
    population_config: PopulationConfig,
    genetic_config: GeneticConfig,
    evaluator: E,
    storage: S,
    pool: ThreadPool,
    control: Mutex<Control>,
    stopped: Condvar,
}

/// One generation in flight. Tasks count themselves
/// done, and whichever finishes last completes it.
struct GenerationRun {
    epoch: u64,
    population: Arc<Population>,
    completed: AtomicUsize,
    failures: Mutex<Vec<EvaluationFailure>>,
}

/// Drives the evolution of a population of MLPs,
/// using an [`Evaluator`] as the source of selective
/// pressure and a [`Storage`] to checkpoint every
/// successfully evaluated generation.
///
/// Each generation's individuals are evaluated in parallel
/// on a dedicated pool of worker threads. If any of them
/// fails, the generation is not saved and the driver halts;
/// [`wait`] reports the failures.
///
/// # Examples
/// ```
/// use evomlp::{BoxError, Evolution, GeneticConfig, MemoryStorage, Network, PopulationConfig};
/// use std::num::NonZeroUsize;
/// use std::sync::Arc;
///
/// let config = PopulationConfig {
///     size: NonZeroUsize::new(10).unwrap(),
///     ..PopulationConfig::new(["x"], ["y"])
/// };
/// let storage = Arc::new(MemoryStorage::new());
/// let evolution = Evolution::new(
///     config,
///     GeneticConfig::default(),
///     |network: &mut Network| -> Result<f64, BoxError> {
///         let output = network.evaluate(&[0.5])?[0];
///         Ok(-(output - 0.25).abs())
///     },
///     Arc::clone(&storage),
/// )
/// .unwrap();
///
/// evolution.start().unwrap();
/// evolution.stop(|| {});
/// evolution.wait().unwrap();
///
/// assert!(storage.saves() >= 1);
/// assert!(evolution.population().is_some());
/// ```
///
/// [`wait`]: Evolution::wait
pub struct Evolution<E, S> {
    shared: Arc<Shared<E, S>>,
}

impl<E: Evaluator, S: Storage + 'static> Evolution<E, S> {
    /// Returns a stopped driver with no population.
    ///
    /// # Errors
    /// Returns an error if the worker pool can't be started.
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
        evaluator: E,
        storage: S,
    ) -> Result<Evolution<E, S>, EvolutionError> {
        let workers = thread::available_parallelism().map_or(1, |n| n.get()) + 1;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("evomlp-worker-{}", i))
            .build()?;
        debug!(workers, "worker pool ready");

        Ok(Evolution {
            shared: Arc::new(Shared {
                population_config,
                genetic_config,
                evaluator,
                storage,
                pool,
                control: Mutex::new(Control {
                    state: State::Stopped,
                    population: None,
                    seeds: vec![],
                    on_stopped: vec![],
                    halt: None,
                    started: 0,
                    settled: 0,
                }),
                stopped: Condvar::new(),
            }),
        })
    }

    /// Seeds the first generation with `seeds`, which
    /// are validated once it is built.
    pub fn with_initial_population(self, seeds: Vec<Genome>) -> Evolution<E, S> {
        self.shared.control.lock().seeds = seeds;
        self
    }

    pub fn population_config(&self) -> &PopulationConfig {
        &self.shared.population_config
    }

    pub fn genetic_config(&self) -> &GeneticConfig {
        &self.shared.genetic_config
    }

    pub fn storage(&self) -> &S {
        &self.shared.storage
    }

    pub fn state(&self) -> State {
        self.shared.control.lock().state
    }

    /// The last population evaluated without failures,
    /// or the one loaded from storage.
    pub fn population(&self) -> Option<Arc<Population>> {
        self.shared.control.lock().population.clone()
    }

    /// The generation of [`population`](Evolution::population).
    pub fn generation(&self) -> Option<usize> {
        self.shared
            .control
            .lock()
            .population
            .as_ref()
            .map(|population| population.generation())
    }

    /// Restores the population from the latest checkpoint
    /// in storage. Does nothing if there is none.
    ///
    /// # Errors
    /// Returns an error if the driver isn't stopped, if
    /// storage fails, or if the checkpoint doesn't fit
    /// the population configuration.
    pub fn load(&self) -> Result<(), EvolutionError> {
        let runs = self.stopped_runs("load")?;

        let checkpoint = match self.shared.storage.load()? {
            Some(checkpoint) => checkpoint,
            None => {
                debug!("no checkpoint to load");
                return Ok(());
            }
        };
        let generation = checkpoint.generation();
        let population = Population::restore(
            generation,
            checkpoint.into_individuals(),
            &self.shared.population_config,
        )?;

        // Storage was read unlocked; a run started
        // meanwhile owns the population now.
        let mut control = self.shared.control.lock();
        if control.state != State::Stopped || control.started != runs {
            return Err(EvolutionError::StateConflict {
                operation: "load",
                state: control.state,
            });
        }
        info!(generation, individuals = population.len(), "loaded checkpoint");
        control.population = Some(Arc::new(population));
        Ok(())
    }

    /// Number of runs started so far, if stopped.
    fn stopped_runs(&self, operation: &'static str) -> Result<u64, EvolutionError> {
        let control = self.shared.control.lock();
        if control.state != State::Stopped {
            return Err(EvolutionError::StateConflict {
                operation,
                state: control.state,
            });
        }
        Ok(control.started)
    }

    /// Starts evaluating generations. Does nothing if
    /// already running. Any failure reported by a
    /// previous run is discarded.
    ///
    /// # Errors
    /// Returns an error if the driver is stopping.
    pub fn start(&self) -> Result<(), EvolutionError> {
        let epoch = {
            let mut control = self.shared.control.lock();
            match control.state {
                State::Running => return Ok(()),
                State::Stopping => {
                    return Err(EvolutionError::StateConflict {
                        operation: "start",
                        state: State::Stopping,
                    })
                }
                State::Stopped => {}
            }
            control.state = State::Running;
            control.halt = None;
            control.started += 1;
            control.started
        };
        info!(run = epoch, "evolution started");

        let shared = Arc::clone(&self.shared);
        self.shared.pool.spawn(move || shared.run_generation(epoch));
        Ok(())
    }

    /// Stops once the generation in flight has been
    /// evaluated, then calls `on_stopped`. If already
    /// stopped, calls it right away.
    pub fn stop<F>(&self, on_stopped: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut control = self.shared.control.lock();
        if control.state == State::Stopped {
            drop(control);
            on_stopped();
            return;
        }
        if control.state == State::Running {
            info!("evolution stopping");
        }
        control.state = State::Stopping;
        control.on_stopped.push(Box::new(on_stopped));
    }

    /// Blocks until the driver has stopped, and its
    /// stop callbacks have been called.
    ///
    /// # Errors
    /// Returns the error the driver halted on, if any.
    /// It is only reported once.
    pub fn wait(&self) -> Result<(), EvolutionError> {
        let mut control = self.shared.control.lock();
        while control.state != State::Stopped || control.settled < control.started {
            self.shared.stopped.wait(&mut control);
        }
        control.halt.take().map_or(Ok(()), Err)
    }
}

impl<E: Evaluator, S: Storage + 'static> Shared<E, S> {
    fn run_generation(self: Arc<Self>, epoch: u64) {
        let (previous, seeds) = {
            let control = self.control.lock();
            (control.population.clone(), control.seeds.clone())
        };
        let next = match previous {
            Some(population) => population.breed(&self.population_config, &self.genetic_config),
            None => Population::new(0, seeds, &self.population_config, &self.genetic_config),
        };
        let population = match next {
            Ok(population) => Arc::new(population),
            Err(e) => {
                error!(error = %e, "could not build the next generation");
                self.halt(epoch, e.into());
                return;
            }
        };

        info!(
            generation = population.generation(),
            individuals = population.len(),
            "evaluating generation"
        );
        let run = Arc::new(GenerationRun {
            epoch,
            population: Arc::clone(&population),
            completed: AtomicUsize::new(0),
            failures: Mutex::new(vec![]),
        });
        if population.is_empty() {
            self.complete(&run);
            return;
        }

        for (index, individual) in population.individuals().iter().enumerate() {
            let individual = Arc::clone(individual);
            let shared = Arc::clone(&self);
            let run = Arc::clone(&run);
            self.pool.spawn(move || {
                if let Err(error) = shared.evaluate(index, &individual) {
                    run.failures.lock().push(EvaluationFailure { index, error });
                }
                if run.completed.fetch_add(1, Ordering::AcqRel) + 1 == run.population.len() {
                    shared.complete(&run);
                }
            });
        }
    }

    /// Scores one individual, recording the outcome on it.
    fn evaluate(&self, index: usize, individual: &Individual) -> Result<f64, EvaluationError> {
        individual.set_start(Utc::now());
        let outcome = self.score(individual);
        individual.set_end(Utc::now());

        let elapsed = individual
            .elapsed()
            .map_or(0, |elapsed| elapsed.num_milliseconds());
        match &outcome {
            Ok(fitness) => {
                individual.set_fitness(*fitness);
                info!(index, fitness, elapsed_ms = elapsed, "individual evaluated");
            }
            Err(e) => {
                individual.set_error(e.clone());
                warn!(index, error = %e, elapsed_ms = elapsed, "individual evaluation failed");
            }
        }
        outcome
    }

    fn score(&self, individual: &Individual) -> Result<f64, EvaluationError> {
        let layers = individual
            .genome()
            .decode()
            .map_err(|e| EvaluationError::new(FailureKind::Genome, e.to_string()))?;
        let mut network = Network::new(
            layers,
            self.population_config.input_names.clone(),
            self.population_config.output_names.clone(),
        )
        .map_err(|e| EvaluationError::new(FailureKind::Network, e.to_string()))?;

        let fitness = panic::catch_unwind(AssertUnwindSafe(|| self.evaluator.evaluate(&mut network)))
            .map_err(|payload| EvaluationError::new(FailureKind::Panic, panic_message(&*payload)))?
            .map_err(|e| EvaluationError::new(FailureKind::Evaluator, e.to_string()))?;
        if !fitness.is_finite() {
            return Err(EvaluationError::new(
                FailureKind::NonFiniteFitness,
                format!("evaluator scored {}", fitness),
            ));
        }
        Ok(fitness)
    }

    /// Runs once per generation, after its last evaluation.
    fn complete(self: &Arc<Self>, run: &GenerationRun) {
        let population = &run.population;
        let generation = population.generation();

        let mut failures = std::mem::take(&mut *run.failures.lock());
        if !failures.is_empty() {
            failures.sort_by_key(|failure| failure.index);
            let e = GenerationError {
                generation,
                failures,
            };
            error!(generation, "{}", e);
            self.halt(run.epoch, e.into());
            return;
        }

        if let Err(e) = self.storage.save(&Checkpoint::from_population(population)) {
            error!(generation, error = %e, "could not save generation");
        }
        if let Some(stats) = population.fitness_stats() {
            info!(
                generation,
                best = stats.maximum,
                average = stats.mean,
                worst = stats.minimum,
                "generation evaluated"
            );
        }

        let mut control = self.control.lock();
        control.population = Some(Arc::clone(population));
        if control.state == State::Stopping {
            control.state = State::Stopped;
            let callbacks = std::mem::take(&mut control.on_stopped);
            drop(control);
            info!(generation, "evolution stopped");
            self.settle(run.epoch, callbacks);
        } else {
            drop(control);
            Arc::clone(self).run_generation(run.epoch);
        }
    }

    /// Stops on `error`, keeping the last good population.
    fn halt(&self, epoch: u64, error: EvolutionError) {
        let mut control = self.control.lock();
        control.state = State::Stopped;
        control.halt = Some(error);
        let callbacks = std::mem::take(&mut control.on_stopped);
        drop(control);
        warn!(run = epoch, "evolution halted");
        self.settle(epoch, callbacks);
    }

    fn settle(&self, epoch: u64, callbacks: Vec<StopCallback>) {
        for callback in callbacks {
            callback();
        }
        let mut control = self.control.lock();
        control.settled = control.settled.max(epoch);
        self.stopped.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "evaluator panicked".to_string()
    }
}
