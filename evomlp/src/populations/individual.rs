use crate::genomics::Genome;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// What went wrong while evaluating an individual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The genome could not be decoded.
    Genome,
    /// The decoded layers could not form a network.
    Network,
    /// The evaluator returned an error.
    Evaluator,
    /// The evaluator panicked.
    Panic,
    /// The evaluator returned an infinite or NaN fitness.
    NonFiniteFitness,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Genome => "genome",
            Self::Network => "network",
            Self::Evaluator => "evaluator",
            Self::Panic => "panic",
            Self::NonFiniteFitness => "non-finite fitness",
        };
        f.write_str(name)
    }
}

/// The failure recorded on an individual whose
/// evaluation did not produce a fitness.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EvaluationError {
    pub kind: FailureKind,
    pub message: String,
}

impl EvaluationError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> EvaluationError {
        EvaluationError {
            kind,
            message: message.into(),
        }
    }
}

/// An Individual is a genome together with the
/// outcome of its evaluation.
///
/// The outcome fields are write-once: the first value
/// set sticks, and later attempts are ignored. Equality
/// and hashing only consider the genome.
#[derive(Clone, Debug)]
pub struct Individual {
    genome: Genome,
    fitness: OnceLock<f64>,
    start: OnceLock<DateTime<Utc>>,
    end: OnceLock<DateTime<Utc>>,
    error: OnceLock<EvaluationError>,
}

impl Individual {
    /// Returns a new, unevaluated individual.
    pub fn new(genome: Genome) -> Individual {
        Individual {
            genome,
            fitness: OnceLock::new(),
            start: OnceLock::new(),
            end: OnceLock::new(),
            error: OnceLock::new(),
        }
    }

    /// Returns an individual whose fitness is already known.
    pub fn with_fitness(genome: Genome, fitness: f64) -> Individual {
        let individual = Individual::new(genome);
        individual.set_fitness(fitness);
        individual
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// The individual's fitness, or negative infinity
    /// if it hasn't been set.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Genome, Individual};
    ///
    /// let individual = Individual::new(Genome::default());
    /// assert_eq!(individual.fitness(), f64::NEG_INFINITY);
    ///
    /// assert!(individual.set_fitness(3.0));
    /// assert!(!individual.set_fitness(5.0));
    /// assert_eq!(individual.fitness(), 3.0);
    /// ```
    pub fn fitness(&self) -> f64 {
        self.fitness.get().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Whether a fitness has been set.
    pub fn is_evaluated(&self) -> bool {
        self.fitness.get().is_some()
    }

    /// Sets the fitness if unset. Returns whether it was set.
    pub fn set_fitness(&self, fitness: f64) -> bool {
        self.fitness.set(fitness).is_ok()
    }

    /// When evaluation began.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start.get().copied()
    }

    pub fn set_start(&self, at: DateTime<Utc>) -> bool {
        self.start.set(at).is_ok()
    }

    /// When evaluation finished.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end.get().copied()
    }

    pub fn set_end(&self, at: DateTime<Utc>) -> bool {
        self.end.set(at).is_ok()
    }

    /// How long evaluation took, once finished.
    pub fn elapsed(&self) -> Option<Duration> {
        Some(self.end()? - self.start()?)
    }

    /// Why evaluation failed, if it did.
    pub fn error(&self) -> Option<&EvaluationError> {
        self.error.get()
    }

    pub fn set_error(&self, error: EvaluationError) -> bool {
        self.error.set(error).is_ok()
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.genome == other.genome
    }
}

impl Eq for Individual {}

impl Hash for Individual {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.genome.hash(state);
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Individual {{ fitness: {}", self.fitness())?;
        if let Some(error) = self.error() {
            write!(f, ", error: {}", error)?;
        }
        write!(f, ", genome: {} }}", self.genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_write_once() {
        let individual = Individual::new(Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.5]));
        let now = Utc::now();
        assert!(individual.set_start(now));
        assert!(!individual.set_start(now + Duration::seconds(5)));
        assert!(individual.set_end(now + Duration::seconds(2)));
        assert_eq!(individual.elapsed(), Some(Duration::seconds(2)));

        let error = EvaluationError::new(FailureKind::Evaluator, "boom");
        assert!(individual.set_error(error.clone()));
        assert!(!individual.set_error(EvaluationError::new(FailureKind::Panic, "again")));
        assert_eq!(individual.error(), Some(&error));
        assert!(!individual.is_evaluated());
    }

    #[test]
    fn equality_follows_genome() {
        let genome = Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.5]);
        let a = Individual::with_fitness(genome.clone(), 1.0);
        let b = Individual::with_fitness(genome, 2.0);
        assert_eq!(a, b);
        assert_eq!(
            EvaluationError::new(FailureKind::NonFiniteFitness, "NaN").to_string(),
            "non-finite fitness: NaN"
        );
    }
}
