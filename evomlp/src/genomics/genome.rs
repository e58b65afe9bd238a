use super::{GeneticConfig, GenomeError};
use crate::rng::RngExt;

use serde::{Deserialize, Serialize};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// Largest layer dimension accepted in a layer header.
const MAX_DIMENSION: f64 = u32::MAX as f64;

/// A Genome is the flat encoding of a multi-layer
/// perceptron's topology and parameters.
///
/// Layers are concatenated with no delimiters, each laid
/// out as `[size, prevSize, neuron_0 .. neuron_{size-1}]`,
/// and each neuron as `[type, bias, weight_0 .. weight_{prevSize-1}]`.
/// The first layer's `prevSize` is the network's input count;
/// there is no explicit input layer.
///
/// Genomes are values: every operation returns a new genome.
/// Two genomes are equal iff their values have identical
/// bit patterns, which makes equality usable for hashing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome(Vec<f64>);

/// Location and dimensions of one layer inside a genome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LayerSpan {
    pub offset: usize,
    pub size: usize,
    pub inputs: usize,
}

impl LayerSpan {
    pub fn neuron_len(&self) -> usize {
        2 + self.inputs
    }

    pub fn len(&self) -> usize {
        2 + self.size * self.neuron_len()
    }

    pub fn end(&self) -> usize {
        self.offset + self.len()
    }

    /// `end`, or `None` if it doesn't fit in a `usize`.
    fn checked_end(&self) -> Option<usize> {
        self.inputs
            .checked_add(2)
            .and_then(|neuron_len| self.size.checked_mul(neuron_len))
            .and_then(|values| values.checked_add(2))
            .and_then(|len| self.offset.checked_add(len))
    }

    /// Offset of the `n`th neuron's type field.
    pub fn neuron_offset(&self, n: usize) -> usize {
        self.offset + 2 + n * self.neuron_len()
    }
}

impl Genome {
    /// Wraps raw values as a genome, without validation.
    ///
    /// # Examples
    /// ```
    /// use evomlp::Genome;
    ///
    /// // One layer of a single identity neuron weighing two inputs.
    /// let genome = Genome::new(vec![1.0, 2.0, 1.0, 0.5, 0.1, 0.2]);
    /// assert_eq!(genome.layer_sizes().unwrap(), vec![2, 1]);
    /// ```
    pub fn new(dna: Vec<f64>) -> Genome {
        Genome(dna)
    }

    /// Returns a random genome for a network with the passed
    /// input and output counts.
    ///
    /// It has a random number of hidden layers in the configured
    /// range, each sized between the smaller of the two counts
    /// and one more than the larger, followed by an output layer.
    /// All neurons are randomized from the configured ranges.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Genome, GeneticConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let genome = Genome::random(
    ///     NonZeroUsize::new(3).unwrap(),
    ///     NonZeroUsize::new(1).unwrap(),
    ///     &GeneticConfig::default(),
    /// );
    /// assert_eq!(genome.shape().unwrap(), (3, 1));
    /// ```
    pub fn random(inputs: NonZeroUsize, outputs: NonZeroUsize, config: &GeneticConfig) -> Genome {
        let mut rng = rand::thread_rng();
        let (inputs, outputs) = (inputs.get(), outputs.get());
        let hidden = rng.between_sizes(*config.hidden_layers.start(), *config.hidden_layers.end());

        let mut dna = vec![];
        let mut previous = inputs;
        for _ in 0..hidden {
            let size = rng.between_sizes(inputs.min(outputs), inputs.max(outputs) + 1);
            config.push_random_layer(&mut dna, size, previous, &mut rng);
            previous = size;
        }
        config.push_random_layer(&mut dna, outputs, previous, &mut rng);
        Genome(dna)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Number of values in the genome.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scans the layer headers.
    pub(crate) fn spans(&self) -> Result<Vec<LayerSpan>, GenomeError> {
        let mut spans = vec![];
        let mut offset = 0;
        while offset < self.0.len() {
            if offset + 2 > self.0.len() {
                return Err(GenomeError::Malformed {
                    offset,
                    reason: "truncated layer header",
                });
            }
            let size = dimension(self.0[offset]).ok_or(GenomeError::Malformed {
                offset,
                reason: "layer size is not a non-negative integer",
            })?;
            let inputs = dimension(self.0[offset + 1]).ok_or(GenomeError::Malformed {
                offset: offset + 1,
                reason: "layer input count is not a non-negative integer",
            })?;
            if size == 0 {
                return Err(GenomeError::Malformed {
                    offset,
                    reason: "layer has no neurons",
                });
            }
            let span = LayerSpan {
                offset,
                size,
                inputs,
            };
            offset = match span.checked_end() {
                Some(end) if end <= self.0.len() => end,
                _ => {
                    return Err(GenomeError::Malformed {
                        offset,
                        reason: "layer length exceeds the remaining genome",
                    })
                }
            };
            spans.push(span);
        }
        Ok(spans)
    }

    /// Slices the genome into its raw layers, headers included.
    ///
    /// # Errors
    /// Returns an error if a layer header is truncated, holds
    /// something other than a non-negative integer, declares an
    /// empty layer, or describes more values than remain.
    ///
    /// # Examples
    /// ```
    /// use evomlp::Genome;
    ///
    /// let genome = Genome::new(vec![
    ///     1.0, 1.0, 3.0, 0.5, 0.1, // 1 neuron weighing 1 input
    ///     2.0, 1.0, 3.0, 0.5, 0.1, 3.0, 0.5, 0.2, // 2 neurons weighing 1 input
    /// ]);
    /// let layers = genome.extract_layers().unwrap();
    /// assert_eq!(layers.len(), 2);
    /// assert_eq!(layers[1].len(), 8);
    ///
    /// // The second header claims more neurons than there are.
    /// let malformed = Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.1, 3.0, 1.0, 3.0, 0.5, 0.1]);
    /// assert!(malformed.extract_layers().is_err());
    /// ```
    pub fn extract_layers(&self) -> Result<Vec<&[f64]>, GenomeError> {
        Ok(self
            .spans()?
            .into_iter()
            .map(|span| &self.0[span.offset..span.end()])
            .collect())
    }

    /// Returns the input count followed by the size of
    /// every layer. Empty for an empty genome.
    pub fn layer_sizes(&self) -> Result<Vec<usize>, GenomeError> {
        let spans = self.spans()?;
        Ok(spans
            .first()
            .map(|first| first.inputs)
            .into_iter()
            .chain(spans.iter().map(|span| span.size))
            .collect())
    }

    /// Number of layers, the output layer included.
    pub fn count_layers(&self) -> Result<usize, GenomeError> {
        Ok(self.spans()?.len())
    }

    /// Returns the `(input, output)` counts of the network.
    ///
    /// # Errors
    /// Returns an error if the genome is malformed or empty.
    pub fn shape(&self) -> Result<(usize, usize), GenomeError> {
        let spans = self.spans()?;
        match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => Ok((first.inputs, last.size)),
            _ => Err(GenomeError::Empty),
        }
    }

    /// Checks that every layer weighs exactly the
    /// outputs of the layer before it.
    pub fn validate(&self) -> Result<(), GenomeError> {
        let spans = self.spans()?;
        for (l, pair) in spans.windows(2).enumerate() {
            if pair[1].inputs != pair[0].size {
                return Err(GenomeError::SeamMismatch {
                    layer: l + 1,
                    expected: pair[0].size,
                    found: pair[1].inputs,
                });
            }
        }
        Ok(())
    }
}

/// Reads a layer header field.
fn dimension(value: f64) -> Option<usize> {
    if value >= 0.0 && value <= MAX_DIMENSION && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

impl From<Vec<f64>> for Genome {
    fn from(dna: Vec<f64>) -> Self {
        Genome(dna)
    }
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Genome {}

impl Hash for Genome {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            value.to_bits().hash(state);
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "[{}]", values.join(", "))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use ahash::RandomState;

    use std::collections::HashSet;

    /// Builds a genome whose every type, bias and weight is `value`.
    pub(crate) fn uniform_genome(value: f64, inputs: usize, hidden: &[usize], outputs: usize) -> Genome {
        let mut dna = vec![];
        let mut previous = inputs;
        for &size in hidden.iter().chain(std::iter::once(&outputs)) {
            dna.push(size as f64);
            dna.push(previous as f64);
            dna.extend(std::iter::repeat(value).take(size * (2 + previous)));
            previous = size;
        }
        Genome(dna)
    }

    fn sizes(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn random_genomes_are_consistent() {
        let config = GeneticConfig::default();
        for _ in 0..100 {
            let genome = Genome::random(sizes(4), sizes(2), &config);
            genome.validate().unwrap();
            assert_eq!(genome.shape().unwrap(), (4, 2));

            let layers = genome.layer_sizes().unwrap();
            assert!((3..=5).contains(&layers.len()));
            assert!(layers[1..layers.len() - 1]
                .iter()
                .all(|size| (2..=5).contains(size)));

            let expected: usize = layers.windows(2).map(|w| 2 + w[1] * (2 + w[0])).sum();
            assert_eq!(genome.len(), expected);
        }
    }

    #[test]
    fn spans_of_uniform_genome() {
        let genome = uniform_genome(1.0, 1, &[3], 1);
        assert_eq!(
            genome.spans().unwrap(),
            vec![
                LayerSpan {
                    offset: 0,
                    size: 3,
                    inputs: 1
                },
                LayerSpan {
                    offset: 11,
                    size: 1,
                    inputs: 3
                },
            ]
        );
        assert_eq!(genome.layer_sizes().unwrap(), vec![1, 3, 1]);
        assert_eq!(genome.count_layers().unwrap(), 2);
    }

    #[test]
    fn malformed_headers() {
        let truncated = Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.1, 1.0]);
        let fractional = Genome::new(vec![1.5, 1.0, 3.0, 0.5, 0.1]);
        let negative = Genome::new(vec![1.0, -1.0, 3.0, 0.5]);
        let empty_layer = Genome::new(vec![0.0, 1.0]);
        let overlong = Genome::new(vec![2.0, 1.0, 3.0, 0.5, 0.1]);
        let huge = Genome::new(vec![4294967295.0, 4294967295.0, 3.0, 0.5]);
        for genome in [truncated, fractional, negative, empty_layer, overlong, huge] {
            assert!(matches!(
                genome.extract_layers(),
                Err(GenomeError::Malformed { .. })
            ));
        }
        assert_eq!(Genome::default().extract_layers().unwrap().len(), 0);
        assert_eq!(Genome::default().shape(), Err(GenomeError::Empty));
    }

    #[test]
    fn validate_finds_seams() {
        let mut dna = uniform_genome(1.0, 2, &[], 3).into_inner();
        dna.extend(uniform_genome(1.0, 2, &[], 1).into_inner());
        assert_eq!(
            Genome::new(dna).validate(),
            Err(GenomeError::SeamMismatch {
                layer: 1,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn equality_is_bitwise() {
        let a = uniform_genome(1.0, 2, &[2], 1);
        let b = uniform_genome(1.0, 2, &[2], 1);
        let c = uniform_genome(2.0, 2, &[2], 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Genome::new(vec![f64::NAN]), Genome::new(vec![f64::NAN]));
        assert_ne!(Genome::new(vec![0.0]), Genome::new(vec![-0.0]));

        let set: HashSet<Genome, RandomState> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
