use crate::genomics::GenomeError;
use crate::selection::SelectionError;

use thiserror::Error;

/// Errors raised while assembling or breeding a population.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PopulationError {
    #[error("populations need at least one input")]
    NoInputs,
    #[error("populations need at least one output")]
    NoOutputs,
    #[error("genome {index} maps {found:?} inputs to outputs, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("genome {index} is invalid")]
    Genome {
        index: usize,
        #[source]
        source: GenomeError,
    },
    #[error("could not draw {size} distinct genomes in {draws} attempts")]
    NotEnoughDistinctGenomes { size: usize, draws: usize },
    #[error("breeding failed")]
    Breeding(#[from] GenomeError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
