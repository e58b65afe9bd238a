//! Structural edits. Every edit that changes a layer's
//! size cascades into the layer after it, so that layer
//! keeps weighing exactly its predecessor's outputs.

use super::genome::LayerSpan;
use super::{GeneticConfig, Genome, GenomeError};

use rand::Rng;
use tracing::debug;

impl Genome {
    /// Resizes layer `layer` to `new_size` neurons.
    ///
    /// Growing appends random neurons and random weights to
    /// every neuron of the next layer; shrinking drops neurons
    /// from the tail and the matching weights of the next layer.
    /// Resizing to zero, resizing the output layer, or resizing
    /// to the current size returns an unchanged copy.
    ///
    /// # Errors
    /// Returns an error if the genome is malformed or
    /// `layer` is out of bounds.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Genome, GeneticConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     hidden_layers: 1..=1,
    ///     ..GeneticConfig::default()
    /// };
    /// let genome = Genome::random(NonZeroUsize::new(2).unwrap(), NonZeroUsize::new(1).unwrap(), &config);
    ///
    /// let resized = genome.change_layer_size(0, 7, &config).unwrap();
    /// assert_eq!(resized.layer_sizes().unwrap(), vec![2, 7, 1]);
    /// resized.validate().unwrap();
    ///
    /// // The output layer is never resized.
    /// assert_eq!(genome.change_layer_size(1, 7, &config).unwrap(), genome);
    /// ```
    pub fn change_layer_size(
        &self,
        layer: usize,
        new_size: usize,
        config: &GeneticConfig,
    ) -> Result<Genome, GenomeError> {
        let spans = self.spans()?;
        let span = *spans.get(layer).ok_or(GenomeError::LayerOutOfBounds {
            index: layer,
            layers: spans.len(),
        })?;
        if new_size == 0 || new_size == span.size || layer == spans.len() - 1 {
            debug!(layer, new_size, "layer resize is a no-op");
            return Ok(self.clone());
        }

        let mut rng = rand::thread_rng();
        let dna = self.as_slice();
        let mut edited = Vec::with_capacity(dna.len());
        edited.extend_from_slice(&dna[..span.offset]);
        edited.push(new_size as f64);
        edited.push(span.inputs as f64);
        if new_size > span.size {
            edited.extend_from_slice(&dna[span.offset + 2..span.end()]);
            for _ in span.size..new_size {
                config.push_random_neuron(&mut edited, span.inputs, &mut rng);
            }
        } else {
            edited.extend_from_slice(&dna[span.offset + 2..span.neuron_offset(new_size)]);
        }

        let next = spans[layer + 1];
        self.push_rewired(&mut edited, next, new_size, config, &mut rng);
        edited.extend_from_slice(&dna[next.end()..]);
        Ok(Genome::new(edited))
    }

    /// Inserts a random layer of `size` neurons right after
    /// layer `index`, and rewires the layer that followed it.
    ///
    /// # Errors
    /// Returns an error if `size` is zero, if `index` is the
    /// output layer or out of bounds, or if the genome is malformed.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Genome, GeneticConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     hidden_layers: 1..=1,
    ///     ..GeneticConfig::default()
    /// };
    /// let genome = Genome::random(NonZeroUsize::new(2).unwrap(), NonZeroUsize::new(1).unwrap(), &config);
    /// let hidden = genome.layer_sizes().unwrap()[1];
    ///
    /// let grown = genome.add_layer(0, 4, &config).unwrap();
    /// assert_eq!(grown.layer_sizes().unwrap(), vec![2, hidden, 4, 1]);
    ///
    /// assert!(genome.add_layer(0, 0, &config).is_err());
    /// assert!(genome.add_layer(1, 4, &config).is_err());
    /// ```
    pub fn add_layer(
        &self,
        index: usize,
        size: usize,
        config: &GeneticConfig,
    ) -> Result<Genome, GenomeError> {
        if size == 0 {
            return Err(GenomeError::ZeroSizedLayer);
        }
        let spans = self.spans()?;
        let span = *spans.get(index).ok_or(GenomeError::LayerOutOfBounds {
            index,
            layers: spans.len(),
        })?;
        if index == spans.len() - 1 {
            return Err(GenomeError::InsertAfterOutput);
        }

        let mut rng = rand::thread_rng();
        let dna = self.as_slice();
        let mut edited = dna[..span.end()].to_vec();
        config.push_random_layer(&mut edited, size, span.size, &mut rng);

        let next = spans[index + 1];
        self.push_rewired(&mut edited, next, size, config, &mut rng);
        edited.extend_from_slice(&dna[next.end()..]);
        Ok(Genome::new(edited))
    }

    /// Removes layer `index`, and rewires the layer that
    /// followed it to weigh the outputs of the one before.
    ///
    /// # Errors
    /// Returns an error if `index` is the first or the output
    /// layer, if it is out of bounds, or if the genome is malformed.
    pub fn remove_layer(&self, index: usize, config: &GeneticConfig) -> Result<Genome, GenomeError> {
        if index == 0 {
            return Err(GenomeError::RemoveFirstLayer);
        }
        let spans = self.spans()?;
        let span = *spans.get(index).ok_or(GenomeError::LayerOutOfBounds {
            index,
            layers: spans.len(),
        })?;
        if index == spans.len() - 1 {
            return Err(GenomeError::RemoveOutputLayer);
        }

        let mut rng = rand::thread_rng();
        let dna = self.as_slice();
        let mut edited = dna[..span.offset].to_vec();
        let next = spans[index + 1];
        self.push_rewired(&mut edited, next, spans[index - 1].size, config, &mut rng);
        edited.extend_from_slice(&dna[next.end()..]);
        Ok(Genome::new(edited))
    }

    /// Appends layer `span` rewired to weigh `inputs` values.
    /// Types and biases are kept; every neuron gets random weights
    /// appended, or loses weights from its tail.
    fn push_rewired<R: Rng>(
        &self,
        edited: &mut Vec<f64>,
        span: LayerSpan,
        inputs: usize,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        let dna = self.as_slice();
        let kept = span.inputs.min(inputs);
        edited.push(span.size as f64);
        edited.push(inputs as f64);
        for n in 0..span.size {
            let at = span.neuron_offset(n);
            edited.extend_from_slice(&dna[at..at + 2 + kept]);
            for _ in span.inputs..inputs {
                edited.push(config.random_weight(rng));
            }
        }
    }
}
