use super::NetworkError;
use crate::neurons::Layer;

use tracing::{debug, trace};

/// Learning rate networks start with.
pub const DEFAULT_LEARNING_RATE: f64 = 0.03;

/// A fully-connected feed-forward network.
///
/// Inputs and outputs are named, so fitness
/// functions can address them by meaning rather
/// than by position.
#[derive(Clone, Debug)]
pub struct Network {
    layers: Vec<Layer>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    learning_rate: f64,
    // Per-neuron scratch state of the last propagation.
    net_inputs: Vec<Vec<f64>>,
    outputs: Vec<Vec<f64>>,
    deltas: Vec<Vec<f64>>,
}

impl Network {
    /// Builds a network from its layers.
    ///
    /// # Errors
    /// Returns an error if there are no layers, if a layer
    /// is empty, if a neuron's weight count differs from
    /// the size of the layer before it, or if the names
    /// don't match the network's input and output counts.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::networks::Network;
    /// use evomlp_nn::neurons::{Layer, Neuron, TransferFunction};
    ///
    /// let layer = Layer::new(vec![Neuron::new(TransferFunction::Identity, 0.0, vec![1.0])]);
    /// assert!(Network::new(vec![layer.clone()], vec!["x".into()], vec!["y".into()]).is_ok());
    /// assert!(Network::new(vec![layer], vec![], vec!["y".into()]).is_err());
    /// ```
    pub fn new(
        layers: Vec<Layer>,
        input_names: Vec<String>,
        output_names: Vec<String>,
    ) -> Result<Network, NetworkError> {
        let input_count = layers
            .first()
            .ok_or(NetworkError::Empty)?
            .input_count()
            .ok_or(NetworkError::EmptyLayer(0))?;

        let mut expected = input_count;
        for (l, layer) in layers.iter().enumerate() {
            if layer.size() == 0 {
                return Err(NetworkError::EmptyLayer(l));
            }
            if let Some((n, neuron)) = layer
                .iter()
                .enumerate()
                .find(|(_, neuron)| neuron.input_count() != expected)
            {
                return Err(NetworkError::InconsistentLayer {
                    layer: l,
                    neuron: n,
                    expected,
                    found: neuron.input_count(),
                });
            }
            expected = layer.size();
        }

        if input_names.len() != input_count {
            return Err(NetworkError::SizeMismatch {
                what: "input names",
                expected: input_count,
                found: input_names.len(),
            });
        }
        if output_names.len() != expected {
            return Err(NetworkError::SizeMismatch {
                what: "output names",
                expected,
                found: output_names.len(),
            });
        }

        let zeroed: Vec<Vec<f64>> = layers.iter().map(|l| vec![0.0; l.size()]).collect();
        Ok(Network {
            layers,
            input_names,
            output_names,
            learning_rate: DEFAULT_LEARNING_RATE,
            net_inputs: zeroed.clone(),
            outputs: zeroed.clone(),
            deltas: zeroed,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Sets the fraction of each computed correction
    /// applied to the weights during training.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Propagates `inputs` through the network and
    /// returns the output layer's values.
    ///
    /// # Errors
    /// Returns an error if `inputs` doesn't have
    /// one value per input name.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::networks::Network;
    /// use evomlp_nn::neurons::{Layer, Neuron, TransferFunction};
    ///
    /// fn sigmoid(x: f64) -> f64 {
    ///     1.0 / (1.0 + (-x).exp())
    /// }
    ///
    /// // Two chained single-neuron sigmoid layers.
    /// let layer = Layer::new(vec![Neuron::new(TransferFunction::Sigmoid, 0.0, vec![1.0])]);
    /// let mut network =
    ///     Network::new(vec![layer.clone(), layer], vec!["x".into()], vec!["y".into()]).unwrap();
    ///
    /// for input in -20..=20 {
    ///     let input = input as f64 / 10.0;
    ///     assert_eq!(network.evaluate(&[input]).unwrap()[0], sigmoid(sigmoid(input)));
    /// }
    /// ```
    pub fn evaluate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NetworkError> {
        self.check_len("inputs", self.input_names.len(), inputs.len())?;
        self.forward_propagate(inputs);
        Ok(self.outputs().to_vec())
    }

    /// Values of the output layer after the last propagation.
    pub fn outputs(&self) -> &[f64] {
        self.outputs.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value of the named output after the last propagation.
    pub fn output(&self, name: &str) -> Option<f64> {
        let index = self.output_names.iter().position(|n| n == name)?;
        self.outputs().get(index).copied()
    }

    /// Resets all propagation state.
    pub fn clear(&mut self) {
        for values in self
            .net_inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .chain(self.deltas.iter_mut())
        {
            values.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Runs a single stochastic gradient descent step
    /// towards `expected`, and returns the squared error
    /// of the outputs before the update.
    ///
    /// # Errors
    /// Returns an error if `inputs` or `expected` have
    /// the wrong length.
    pub fn train_sample(&mut self, inputs: &[f64], expected: &[f64]) -> Result<f64, NetworkError> {
        self.check_len("inputs", self.input_names.len(), inputs.len())?;
        self.check_len("expected outputs", self.output_names.len(), expected.len())?;

        self.forward_propagate(inputs);
        let error = self
            .outputs()
            .iter()
            .zip(expected)
            .map(|(o, e)| (e - o).powi(2))
            .sum();
        self.back_propagate(expected);
        self.update_weights(inputs);
        Ok(error)
    }

    /// Trains the network over `dataset` until the summed
    /// squared error of an epoch is at most `max_error`.
    /// Returns the epoch at which the threshold was met.
    ///
    /// # Errors
    /// Returns an error if the dataset is malformed, or if
    /// the threshold isn't met within `epochs` epochs.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::networks::{Network, NetworkError};
    /// use evomlp_nn::neurons::{Layer, Neuron, TransferFunction};
    ///
    /// let layer = Layer::new(vec![Neuron::new(TransferFunction::Sigmoid, 0.0, vec![0.5])]);
    /// let mut network = Network::new(vec![layer], vec!["x".into()], vec!["y".into()]).unwrap();
    ///
    /// let result = network.train(&[vec![1.0]], &[vec![1.0]], 0.0, 0);
    /// assert!(matches!(result, Err(NetworkError::NoConvergence { epochs: 0, .. })));
    /// ```
    pub fn train(
        &mut self,
        dataset: &[Vec<f64>],
        expected: &[Vec<f64>],
        max_error: f64,
        epochs: usize,
    ) -> Result<usize, NetworkError> {
        self.check_len("expected rows", dataset.len(), expected.len())?;

        let mut error = f64::INFINITY;
        for epoch in 0..epochs {
            error = 0.0;
            for (row, target) in dataset.iter().zip(expected) {
                error += self.train_sample(row, target)?;
            }
            if epoch % 1000 == 0 {
                trace!(epoch, error, "training");
            }
            if error <= max_error {
                debug!(epoch, error, "training converged");
                return Ok(epoch);
            }
        }
        Err(NetworkError::NoConvergence { epochs, error })
    }

    fn check_len(&self, what: &'static str, expected: usize, found: usize) -> Result<(), NetworkError> {
        if expected == found {
            Ok(())
        } else {
            Err(NetworkError::SizeMismatch {
                what,
                expected,
                found,
            })
        }
    }

    fn forward_propagate(&mut self, inputs: &[f64]) {
        for (l, layer) in self.layers.iter().enumerate() {
            let (previous, current) = self.outputs.split_at_mut(l);
            let layer_inputs = previous.last().map(Vec::as_slice).unwrap_or(inputs);
            for (n, neuron) in layer.iter().enumerate() {
                let net = neuron.net_input(layer_inputs);
                self.net_inputs[l][n] = net;
                current[0][n] = neuron.transfer.activation(net);
            }
        }
    }

    fn back_propagate(&mut self, expected: &[f64]) {
        let last = self.layers.len() - 1;
        for l in (0..=last).rev() {
            for (n, neuron) in self.layers[l].iter().enumerate() {
                let error = if l == last {
                    expected[n] - self.outputs[l][n]
                } else {
                    self.layers[l + 1]
                        .iter()
                        .zip(&self.deltas[l + 1])
                        .map(|(next, delta)| delta * next.weights[n])
                        .sum()
                };
                self.deltas[l][n] = error
                    * neuron
                        .transfer
                        .derivative(self.outputs[l][n], self.net_inputs[l][n]);
            }
        }
    }

    fn update_weights(&mut self, inputs: &[f64]) {
        let rate = self.learning_rate;
        for l in 0..self.layers.len() {
            let layer_inputs = if l == 0 {
                inputs
            } else {
                self.outputs[l - 1].as_slice()
            };
            for (neuron, delta) in self.layers[l].neurons.iter_mut().zip(&self.deltas[l]) {
                for (weight, input) in neuron.weights.iter_mut().zip(layer_inputs) {
                    *weight += rate * delta * input;
                }
                neuron.bias += rate * delta;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::neurons::{Neuron, TransferFunction};

    fn names(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn layer(size: usize, inputs: usize, transfer: TransferFunction, weight: f64) -> Layer {
        Layer::new(vec![Neuron::new(transfer, 0.0, vec![weight; inputs]); size])
    }

    #[test]
    fn rejects_inconsistent_layers() {
        let layers = vec![
            layer(3, 2, TransferFunction::Identity, 1.0),
            layer(1, 2, TransferFunction::Identity, 1.0),
        ];
        assert_eq!(
            Network::new(layers, names("in", 2), names("out", 1)).unwrap_err(),
            NetworkError::InconsistentLayer {
                layer: 1,
                neuron: 0,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(
            Network::new(vec![], vec![], vec![]).unwrap_err(),
            NetworkError::Empty
        );
        assert_eq!(
            Network::new(vec![Layer::default()], vec![], vec![]).unwrap_err(),
            NetworkError::EmptyLayer(0)
        );
    }

    #[test]
    fn evaluate_sums_layers() {
        let layers = vec![
            layer(3, 2, TransferFunction::Identity, 1.0),
            layer(2, 3, TransferFunction::Identity, 0.5),
        ];
        let mut network = Network::new(layers, names("in", 2), names("out", 2)).unwrap();
        assert_eq!(network.evaluate(&[1.0, 2.0]).unwrap(), vec![4.5, 4.5]);
        assert_eq!(network.output("out1"), Some(4.5));
        assert_eq!(network.output("missing"), None);
        assert!(network.evaluate(&[1.0]).is_err());

        network.clear();
        assert_eq!(network.outputs(), &[0.0, 0.0]);
    }

    #[test]
    fn training_learns_or() {
        let layers = vec![layer(1, 2, TransferFunction::Sigmoid, 0.5)];
        let mut network = Network::new(layers, names("in", 2), names("out", 1)).unwrap();
        network.set_learning_rate(0.5);

        let dataset = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let expected = vec![vec![0.0], vec![1.0], vec![1.0], vec![1.0]];
        assert!(network.train(&dataset, &expected, 0.05, 50_000).is_ok());

        assert!(network.evaluate(&[0.0, 0.0]).unwrap()[0] < 0.5);
        assert!(network.evaluate(&[1.0, 1.0]).unwrap()[0] > 0.5);
    }
}
