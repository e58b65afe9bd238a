use super::{Genome, GenomeError};

use evomlp_nn::neurons::{Layer, Neuron, TransferFunction};
use tracing::warn;

use std::iter;

/// An owned copy of one neuron's fields, handed to
/// the visitor of [`Genome::for_each_neuron`].
#[derive(Clone, Debug, PartialEq)]
pub struct NeuronSnapshot {
    /// Index of the neuron's layer.
    pub layer: usize,
    /// Index of the neuron inside its layer.
    pub index: usize,
    /// Raw transfer function id.
    pub transfer_id: f64,
    pub bias: f64,
    pub weights: Vec<f64>,
}

impl NeuronSnapshot {
    /// The transfer function the id decodes to.
    pub fn transfer(&self) -> TransferFunction {
        TransferFunction::from_id_or_default(self.transfer_id)
    }
}

impl Genome {
    /// Visits every neuron in order and returns a genome
    /// with the visitor's changes written back.
    ///
    /// See [`for_each_neuron_from`] for details.
    ///
    /// [`for_each_neuron_from`]: Genome::for_each_neuron_from
    pub fn for_each_neuron<F>(&self, visitor: F) -> Result<Genome, GenomeError>
    where
        F: FnMut(&mut NeuronSnapshot) -> bool,
    {
        self.for_each_neuron_from(0, 0, visitor)
    }

    /// Visits every neuron starting at neuron `start_neuron`
    /// of layer `start_layer`, and returns a genome with the
    /// visitor's changes written back. Traversal stops early
    /// once the visitor returns `false`.
    ///
    /// Invalid transfer ids set by the visitor are replaced
    /// by the default function's id. Only the prefix of the
    /// visitor's weights overlapping the neuron's original
    /// weights is written back: the layout never changes.
    ///
    /// # Errors
    /// Returns an error if the genome is malformed.
    ///
    /// # Examples
    /// ```
    /// use evomlp::Genome;
    ///
    /// let genome = Genome::new(vec![
    ///     2.0, 1.0, 3.0, 0.5, 0.1, 3.0, 0.5, 0.2,
    ///     1.0, 2.0, 3.0, 0.5, 0.3, 0.4,
    /// ]);
    ///
    /// // Double the bias of every neuron in the first layer.
    /// let doubled = genome
    ///     .for_each_neuron(|neuron| {
    ///         neuron.bias *= 2.0;
    ///         neuron.layer == 0
    ///     })
    ///     .unwrap();
    /// assert_eq!(doubled.as_slice()[3], 1.0);
    /// assert_eq!(doubled.as_slice()[6], 1.0);
    /// // The first neuron of the output layer is visited, then traversal stops.
    /// assert_eq!(doubled.as_slice()[11], 1.0);
    /// ```
    pub fn for_each_neuron_from<F>(
        &self,
        start_layer: usize,
        start_neuron: usize,
        mut visitor: F,
    ) -> Result<Genome, GenomeError>
    where
        F: FnMut(&mut NeuronSnapshot) -> bool,
    {
        let spans = self.spans()?;
        let mut dna = self.as_slice().to_vec();

        'layers: for (l, span) in spans.iter().enumerate().skip(start_layer) {
            let first = if l == start_layer { start_neuron } else { 0 };
            for n in first..span.size {
                let at = span.neuron_offset(n);
                let weights = at + 2..at + 2 + span.inputs;
                let mut snapshot = NeuronSnapshot {
                    layer: l,
                    index: n,
                    transfer_id: dna[at],
                    bias: dna[at + 1],
                    weights: dna[weights.clone()].to_vec(),
                };

                let proceed = visitor(&mut snapshot);

                dna[at] = match TransferFunction::from_id(snapshot.transfer_id) {
                    Some(_) => snapshot.transfer_id,
                    None => TransferFunction::default().id() as f64,
                };
                dna[at + 1] = snapshot.bias;
                let overlap = snapshot.weights.len().min(span.inputs);
                dna[weights.start..weights.start + overlap]
                    .copy_from_slice(&snapshot.weights[..overlap]);

                if !proceed {
                    break 'layers;
                }
            }
        }
        Ok(Genome::new(dna))
    }

    /// Decodes the genome into its layers.
    /// Unknown transfer ids decode to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: evomlp_nn::neurons::TransferFunction::Sigmoid
    ///
    /// # Errors
    /// Returns an error if the genome is malformed.
    pub fn decode(&self) -> Result<Vec<Layer>, GenomeError> {
        let dna = self.as_slice();
        Ok(self
            .spans()?
            .iter()
            .map(|span| {
                (0..span.size)
                    .map(|n| {
                        let at = span.neuron_offset(n);
                        Neuron::new(
                            TransferFunction::from_id_or_default(dna[at]),
                            dna[at + 1],
                            dna[at + 2..at + 2 + span.inputs].to_vec(),
                        )
                    })
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect())
    }

    /// Encodes layers into a genome.
    ///
    /// The first layer's input count is taken from its first
    /// neuron; every later layer weighs the previous layer's
    /// outputs. Neurons with a different number of weights are
    /// fixed up, padding by repeating their last weight or
    /// truncating from the end, and the inconsistency is logged.
    ///
    /// # Errors
    /// Returns an error if a layer has no neurons.
    ///
    /// # Examples
    /// ```
    /// use evomlp::Genome;
    /// use evomlp_nn::neurons::{Layer, Neuron, TransferFunction};
    ///
    /// let hidden = Layer::new(vec![Neuron::new(TransferFunction::Tanh, 0.1, vec![0.5]); 2]);
    /// // Weighs only one of the two hidden outputs.
    /// let output = Layer::new(vec![Neuron::new(TransferFunction::Identity, 0.2, vec![0.7])]);
    ///
    /// let genome = Genome::encode(&[hidden, output]).unwrap();
    /// assert_eq!(genome.layer_sizes().unwrap(), vec![1, 2, 1]);
    /// assert_eq!(&genome.as_slice()[8..], &[1.0, 2.0, 1.0, 0.2, 0.7, 0.7]);
    /// ```
    pub fn encode(layers: &[Layer]) -> Result<Genome, GenomeError> {
        let mut dna = vec![];
        let mut previous: Option<usize> = None;

        for (l, layer) in layers.iter().enumerate() {
            let inputs = previous
                .or_else(|| layer.input_count())
                .ok_or(GenomeError::EmptyLayer(l))?;
            if layer.size() == 0 {
                return Err(GenomeError::EmptyLayer(l));
            }

            dna.push(layer.size() as f64);
            dna.push(inputs as f64);
            let mut resized = 0;
            for neuron in layer.iter() {
                if neuron.input_count() != inputs {
                    resized += 1;
                }
                dna.push(neuron.transfer.id() as f64);
                dna.push(neuron.bias);
                let last = neuron.weights.last().copied().unwrap_or(0.0);
                dna.extend(
                    neuron
                        .weights
                        .iter()
                        .copied()
                        .chain(iter::repeat(last))
                        .take(inputs),
                );
            }
            if resized > 0 {
                warn!(
                    layer = l,
                    inputs, resized, "inconsistent weight counts, resized to match layer inputs"
                );
            }
            previous = Some(layer.size());
        }
        Ok(Genome::new(dna))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{uniform_genome, GeneticConfig};

    use std::num::NonZeroUsize;

    fn random_genome() -> Genome {
        Genome::random(
            NonZeroUsize::new(3).unwrap(),
            NonZeroUsize::new(2).unwrap(),
            &GeneticConfig::default(),
        )
    }

    #[test]
    fn decode_encode_round_trip() {
        for _ in 0..100 {
            let genome = random_genome();
            let layers = genome.decode().unwrap();
            assert_eq!(layers.len(), genome.count_layers().unwrap());
            assert_eq!(Genome::encode(&layers).unwrap(), genome);
        }
    }

    #[test]
    fn unknown_types_normalize_through_transcoding() {
        // One neuron with id 42 weighing one input.
        let genome = Genome::new(vec![1.0, 1.0, 42.0, 0.5, 0.25]);
        let layers = genome.decode().unwrap();
        assert_eq!(layers[0].neurons[0].transfer, TransferFunction::Sigmoid);
        assert_eq!(
            Genome::encode(&layers).unwrap(),
            Genome::new(vec![1.0, 1.0, 3.0, 0.5, 0.25])
        );
    }

    #[test]
    fn encode_truncates_extra_weights() {
        let hidden = Layer::new(vec![Neuron::new(TransferFunction::Relu, 0.0, vec![1.0]); 2]);
        let output = Layer::new(vec![Neuron::new(
            TransferFunction::Relu,
            0.0,
            vec![1.0, 2.0, 3.0],
        )]);
        let genome = Genome::encode(&[hidden, output]).unwrap();
        genome.validate().unwrap();
        assert_eq!(genome.decode().unwrap()[1].neurons[0].weights, vec![1.0, 2.0]);
    }

    #[test]
    fn encode_rejects_empty_layers() {
        let hidden = Layer::new(vec![Neuron::new(TransferFunction::Relu, 0.0, vec![1.0])]);
        assert_eq!(
            Genome::encode(&[hidden, Layer::default()]),
            Err(GenomeError::EmptyLayer(1))
        );
        assert_eq!(Genome::encode(&[]).unwrap(), Genome::default());
    }

    #[test]
    fn visitor_sees_every_neuron_once() {
        let genome = uniform_genome(1.0, 2, &[3, 4], 2);
        let mut seen = vec![];
        let rewritten = genome
            .for_each_neuron(|neuron| {
                seen.push((neuron.layer, neuron.index));
                true
            })
            .unwrap();
        assert_eq!(rewritten, genome);
        assert_eq!(seen.len(), 3 + 4 + 2);
        assert_eq!(seen[3], (1, 0));
    }

    #[test]
    fn visitor_restarts_from_position() {
        let genome = uniform_genome(1.0, 2, &[3, 4], 2);
        let mut seen = vec![];
        genome
            .for_each_neuron_from(1, 2, |neuron| {
                seen.push((neuron.layer, neuron.index));
                seen.len() < 3
            })
            .unwrap();
        assert_eq!(seen, vec![(1, 2), (1, 3), (2, 0)]);
    }

    #[test]
    fn visitor_write_back_rules() {
        let genome = uniform_genome(1.0, 2, &[], 2);
        let rewritten = genome
            .for_each_neuron(|neuron| {
                if neuron.index == 0 {
                    neuron.transfer_id = 99.0;
                    neuron.weights = vec![5.0];
                } else {
                    neuron.transfer_id = 4.0;
                    neuron.bias = -1.0;
                    neuron.weights = vec![6.0, 7.0, 8.0];
                }
                true
            })
            .unwrap();
        assert_eq!(
            rewritten.as_slice(),
            &[2.0, 2.0, 3.0, 1.0, 5.0, 1.0, 4.0, -1.0, 6.0, 7.0]
        );
        assert_eq!(genome, uniform_genome(1.0, 2, &[], 2));
    }
}
