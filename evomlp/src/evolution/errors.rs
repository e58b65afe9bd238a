use super::State;
use crate::populations::{EvaluationError, PopulationError};
use crate::storage::StorageError;

use thiserror::Error;

use std::error::Error;
use std::fmt;

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("cannot {operation} while {state}")]
    StateConflict {
        operation: &'static str,
        state: State,
    },
    #[error("could not build the next generation")]
    Population(#[from] PopulationError),
    #[error("checkpoint storage failed")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("could not start the worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// An individual that failed evaluation, by
/// its index in the population.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationFailure {
    pub index: usize,
    pub error: EvaluationError,
}

/// Every evaluation failure of a generation, in
/// population order.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationError {
    pub generation: usize,
    pub failures: Vec<EvaluationFailure>,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "There were {} errors:", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            write!(
                f,
                "\n  {:>2}. {} : {}",
                i + 1,
                failure.error.kind,
                failure.error.message
            )?;
        }
        Ok(())
    }
}

impl Error for GenerationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::FailureKind;

    #[test]
    fn lists_every_failure() {
        let error = GenerationError {
            generation: 2,
            failures: vec![
                EvaluationFailure {
                    index: 0,
                    error: EvaluationError::new(FailureKind::Evaluator, "timed out"),
                },
                EvaluationFailure {
                    index: 3,
                    error: EvaluationError::new(FailureKind::Panic, "index out of bounds"),
                },
            ],
        };
        assert_eq!(
            error.to_string(),
            "There were 2 errors:\n   1. evaluator : timed out\n   2. panic : index out of bounds"
        );
    }
}
