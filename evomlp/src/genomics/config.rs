use crate::rng::RngExt;

use evomlp_nn::neurons::TransferFunction;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::ops::RangeInclusive;

/// Configuration data for genome generation
/// and the genetic operators.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. Using
/// values that are not in this bound may result
/// in odd behaviours and/or incorrect programs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    /// Chance of each individual mutation decision
    /// (value jitter, layer resize, layer insertion
    /// or removal) taking place.
    pub mutation_probability: f64,
    /// Chance of offspring being produced by crossover.
    /// Advisory: the breeding rule always performs
    /// its crossovers.
    pub crossover_probability: f64,
    /// Range random biases are drawn from.
    pub bias_range: RangeInclusive<f64>,
    /// Range random weights are drawn from.
    pub weight_range: RangeInclusive<f64>,
    /// Number of hidden layers in a random genome.
    pub hidden_layers: RangeInclusive<usize>,
}

impl Default for GeneticConfig {
    /// # Examples
    /// ```
    /// use evomlp::GeneticConfig;
    ///
    /// let config = GeneticConfig::default();
    /// assert_eq!(config.mutation_probability, 0.1);
    /// assert_eq!(config.crossover_probability, 0.7);
    ///
    /// let config = GeneticConfig {
    ///     mutation_probability: 0.3,
    ///     ..GeneticConfig::default()
    /// };
    /// ```
    fn default() -> Self {
        GeneticConfig {
            mutation_probability: 0.1,
            crossover_probability: 0.7,
            bias_range: 0.01..=1.0,
            weight_range: 0.0..=1.0,
            hidden_layers: 1..=3,
        }
    }
}

impl GeneticConfig {
    pub(crate) fn random_bias<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.between(*self.bias_range.start(), *self.bias_range.end())
    }

    pub(crate) fn random_weight<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.between(*self.weight_range.start(), *self.weight_range.end())
    }

    pub(crate) fn random_transfer_id<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen::<TransferFunction>().id() as f64
    }

    /// Appends a random `[type, bias, weights..]` neuron.
    pub(crate) fn push_random_neuron<R: Rng>(&self, dna: &mut Vec<f64>, inputs: usize, rng: &mut R) {
        dna.push(self.random_transfer_id(rng));
        dna.push(self.random_bias(rng));
        for _ in 0..inputs {
            dna.push(self.random_weight(rng));
        }
    }

    /// Appends a random `[size, prevSize, neurons..]` layer.
    pub(crate) fn push_random_layer<R: Rng>(
        &self,
        dna: &mut Vec<f64>,
        size: usize,
        inputs: usize,
        rng: &mut R,
    ) {
        dna.push(size as f64);
        dna.push(inputs as f64);
        for _ in 0..size {
            self.push_random_neuron(dna, inputs, rng);
        }
    }
}
