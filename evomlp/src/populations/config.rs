use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// Fractions should be in the range [0.0, 1.0].
/// Using values outside of it may result in
/// odd behaviours.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Names of the networks' inputs, one per input.
    pub input_names: Vec<String>,
    /// Names of the networks' outputs, one per output.
    pub output_names: Vec<String>,
    /// Fraction of every new population that is always
    /// filled with random genomes, whatever the seeds.
    pub min_random_fraction: f64,
    /// Fraction of a population that is selected to
    /// seed the next generation.
    pub selection_fraction: f64,
}

impl PopulationConfig {
    /// Returns the default configuration with the
    /// given input and output names.
    ///
    /// # Examples
    /// ```
    /// use evomlp::PopulationConfig;
    ///
    /// let config = PopulationConfig::new(["x", "y"], ["x xor y"]);
    /// assert_eq!(config.inputs(), 2);
    /// assert_eq!(config.outputs(), 1);
    /// assert_eq!(config.size.get(), 50);
    /// ```
    pub fn new<I, O>(inputs: I, outputs: O) -> PopulationConfig
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        PopulationConfig {
            input_names: inputs.into_iter().map(Into::into).collect(),
            output_names: outputs.into_iter().map(Into::into).collect(),
            ..PopulationConfig::default()
        }
    }

    /// Number of network inputs.
    pub fn inputs(&self) -> usize {
        self.input_names.len()
    }

    /// Number of network outputs.
    pub fn outputs(&self) -> usize {
        self.output_names.len()
    }

    /// The largest number of seeds a new population keeps.
    pub(crate) fn max_seeds(&self) -> usize {
        let size = self.size.get();
        let fraction = self.min_random_fraction.clamp(0.0, 1.0);
        size - (size as f64 * fraction).floor() as usize
    }

    /// How many individuals are selected for breeding.
    pub(crate) fn selection_size(&self) -> usize {
        (self.size.get() as f64 * self.selection_fraction).floor() as usize
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            // SAFETY: 50 is a valid NonZeroUsize.
            size: unsafe { NonZeroUsize::new_unchecked(50) },
            input_names: vec![],
            output_names: vec![],
            min_random_fraction: 0.3,
            selection_fraction: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_sizes() {
        let config = PopulationConfig {
            size: NonZeroUsize::new(10).unwrap(),
            ..PopulationConfig::default()
        };
        assert_eq!(config.max_seeds(), 7);
        assert_eq!(config.selection_size(), 7);
    }

    #[test]
    fn random_fraction_is_clamped() {
        let mut config = PopulationConfig {
            size: NonZeroUsize::new(10).unwrap(),
            min_random_fraction: 1.5,
            ..PopulationConfig::default()
        };
        assert_eq!(config.max_seeds(), 0);
        config.min_random_fraction = -0.5;
        assert_eq!(config.max_seeds(), 10);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: PopulationConfig =
            serde_json::from_str(r#"{ "size": 8, "input_names": ["a"] }"#).unwrap();
        assert_eq!(config.size.get(), 8);
        assert_eq!(config.inputs(), 1);
        assert_eq!(config.outputs(), 0);
        assert_eq!(config.selection_fraction, 0.7);
    }
}
