use thiserror::Error;

/// An error type indicating a network could not
/// be built or could not process its inputs.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NetworkError {
    /// The network has no layers.
    #[error("network has no layers")]
    Empty,
    /// A layer has no neurons.
    #[error("layer {0} has no neurons")]
    EmptyLayer(usize),
    /// A neuron's weight count differs from the
    /// size of the layer feeding it.
    #[error("neuron {neuron} of layer {layer} has {found} weights, expected {expected}")]
    InconsistentLayer {
        layer: usize,
        neuron: usize,
        expected: usize,
        found: usize,
    },
    /// A sequence had the wrong length.
    #[error("expected {expected} {what}, got {found}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Training ran out of epochs above the error threshold.
    #[error("training did not converge after {epochs} epochs (error {error})")]
    NoConvergence { epochs: usize, error: f64 },
}
