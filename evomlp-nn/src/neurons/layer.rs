use super::TransferFunction;

use serde::{Deserialize, Serialize};

use std::fmt;

/// A Neuron weighs the outputs of the previous
/// layer, adds its bias, and applies its
/// transfer function to the sum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    /// Activation function applied to the weighted sum.
    pub transfer: TransferFunction,
    /// Constant added to the weighted sum.
    pub bias: f64,
    /// One weight per output of the previous layer.
    pub weights: Vec<f64>,
}

impl Neuron {
    /// Returns a new neuron with the passed parameters.
    pub fn new(transfer: TransferFunction, bias: f64, weights: Vec<f64>) -> Neuron {
        Neuron {
            transfer,
            bias,
            weights,
        }
    }

    /// Number of inputs the neuron weighs.
    pub fn input_count(&self) -> usize {
        self.weights.len()
    }

    /// Returns the weighted sum of `inputs` plus the bias.
    /// Inputs beyond the neuron's weight count are ignored.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::neurons::{Neuron, TransferFunction};
    ///
    /// let neuron = Neuron::new(TransferFunction::Identity, 0.5, vec![1.0, -2.0]);
    /// assert_eq!(neuron.net_input(&[3.0, 1.0]), 1.5);
    /// ```
    pub fn net_input(&self, inputs: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(inputs)
            .map(|(w, i)| w * i)
            .sum::<f64>()
            + self.bias
    }

    /// Returns the neuron's output for `inputs`.
    pub fn activate(&self, inputs: &[f64]) -> f64 {
        self.transfer.activation(self.net_input(inputs))
    }
}

/// A Layer is one stage of neurons which
/// all weigh the same inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(neurons: Vec<Neuron>) -> Layer {
        Layer { neurons }
    }

    /// Number of neurons in the layer.
    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    /// Number of inputs the layer's first neuron weighs,
    /// or `None` for an empty layer.
    pub fn input_count(&self) -> Option<usize> {
        self.neurons.first().map(Neuron::input_count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter()
    }
}

impl From<Vec<Neuron>> for Layer {
    fn from(neurons: Vec<Neuron>) -> Self {
        Layer::new(neurons)
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[bias: {:+.16}, weights: {:?}]",
            self.transfer, self.bias, self.weights
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<SIZE: {}>", self.size())?;
        for (i, neuron) in self.neurons.iter().enumerate() {
            writeln!(f, "  {:03}: {}", i + 1, neuron)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_applies_transfer() {
        let neuron = Neuron::new(TransferFunction::Sigmoid, -1.0, vec![0.5, 0.5]);
        assert_eq!(neuron.activate(&[1.0, 1.0]), 0.5);
    }

    #[test]
    fn layer_input_count() {
        assert_eq!(Layer::default().input_count(), None);
        let layer = Layer::from(vec![
            Neuron::new(TransferFunction::Identity, 0.0, vec![1.0; 3]),
            Neuron::new(TransferFunction::Identity, 0.0, vec![1.0; 3]),
        ]);
        assert_eq!(layer.size(), 2);
        assert_eq!(layer.input_count(), Some(3));
    }
}
