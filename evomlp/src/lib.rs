//! A genetic algorithm that evolves both the topology and
//! the weights of multi-layer perceptrons.
//!
//! Every network is encoded as a flat [`Genome`] of numbers,
//! which is bred by layer-wise [`Crossover`] and three-pass
//! [`mutate`]ion, and decoded into an
//! [`evomlp-nn`](../evomlp_nn) [`Network`] for evaluation.
//! An [`Evolution`] drives generation after generation on a
//! pool of worker threads, checkpointing each generation to a
//! [`Storage`] so that evolution can later be resumed.
//!
//! # Example usage: evolving an XOR approximator
//! ```
//! use evomlp::{BoxError, Evolution, GeneticConfig, MemoryStorage, Network, PopulationConfig};
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! // Allowed error margin for network answers.
//! const ERROR_MARGIN: f64 = 0.3;
//!
//! fn evaluate_xor(network: &mut Network) -> Result<f64, BoxError> {
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut error = 0.0;
//!     for (input, output) in values {
//!         let miss = (network.evaluate(&input)?[0] - output).abs();
//!         if miss >= ERROR_MARGIN {
//!             error += miss;
//!         }
//!     }
//!     Ok((4.0 - error).powi(2))
//! }
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(30).unwrap(),
//!     ..PopulationConfig::new(["a", "b"], ["a xor b"])
//! };
//! let genetic_config = GeneticConfig {
//!     mutation_probability: 0.2,
//!     hidden_layers: 1..=2,
//!     ..GeneticConfig::default()
//! };
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let evolution = Evolution::new(population_config, genetic_config, evaluate_xor, Arc::clone(&storage))
//!     .unwrap();
//!
//! evolution.start().unwrap();
//! evolution.stop(|| println!("Stopped."));
//! evolution.wait().unwrap();
//!
//! let population = evolution.population().unwrap();
//! let champion = population.champion().unwrap();
//! println!("Champion: {}", ron::to_string(champion.genome()).unwrap());
//! assert_eq!(storage.latest().unwrap().generation(), population.generation());
//! ```

mod evolution;
mod genomics;
mod operators;
mod populations;
mod rng;
mod selection;
mod storage;

pub use evolution::*;
pub use genomics::*;
pub use operators::*;
pub use populations::*;
pub use selection::*;
pub use storage::*;

pub use evomlp_nn::networks::Network;
