use thiserror::Error;

/// An error type indicating a genome could not be
/// read, or a structural edit on it was illegal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenomeError {
    /// The genome's layout is inconsistent at `offset`.
    #[error("malformed genome at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },
    /// A layer's declared input count differs from
    /// the size of the layer before it.
    #[error("layer {layer} declares {found} inputs, but the layer before it has {expected} neurons")]
    SeamMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },
    /// The genome has no layers.
    #[error("genome has no layers")]
    Empty,
    /// A transcoded layer has no neurons.
    #[error("layer {0} has no neurons")]
    EmptyLayer(usize),
    /// A layer index doesn't address any layer.
    #[error("layer {index} out of bounds for a genome with {layers} layers")]
    LayerOutOfBounds { index: usize, layers: usize },
    /// Layer creation with no neurons.
    #[error("cannot create a layer with no neurons")]
    ZeroSizedLayer,
    /// Layer insertion past the output layer.
    #[error("cannot insert a layer after the output layer")]
    InsertAfterOutput,
    /// Removal of the layer fed by the inputs.
    #[error("cannot remove the first layer")]
    RemoveFirstLayer,
    /// Removal of the output layer.
    #[error("cannot remove the output layer")]
    RemoveOutputLayer,
}
