mod crossover;
mod mutation;

pub use crossover::*;
pub use mutation::*;
