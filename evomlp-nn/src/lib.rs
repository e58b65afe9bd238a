//! # evomlp-nn
//! The feed-forward multi-layer perceptron evaluated by the [`evomlp`](../evomlp) genetic engine.
//!
//! Provides the transcoded network building blocks ([`Neuron`], [`Layer`] and the
//! [`TransferFunction`] they apply), and a [`Network`] that can be built from them:
//! forward propagation for fitness evaluation, and stochastic gradient descent
//! for local refinement of an evolved topology.
//!
//! [`Neuron`]: crate::neurons::Neuron
//! [`Layer`]: crate::neurons::Layer
//! [`TransferFunction`]: crate::neurons::TransferFunction
//! [`Network`]: crate::networks::Network
//!
//! # Example usage: a hand-built OR gate
//! ```
//! use evomlp_nn::{
//!     networks::Network,
//!     neurons::{Layer, Neuron, TransferFunction},
//! };
//!
//! let output = Layer::new(vec![Neuron::new(TransferFunction::Relu, 0.0, vec![1.0, 1.0])]);
//! let mut network = Network::new(
//!     vec![output],
//!     vec!["a".into(), "b".into()],
//!     vec!["or".into()],
//! )
//! .unwrap();
//!
//! let values = [([0.0, 0.0], 0.0), ([0.0, 1.0], 1.0), ([1.0, 0.0], 1.0), ([1.0, 1.0], 2.0)];
//! for (input, expected) in values {
//!     assert_eq!(network.evaluate(&input).unwrap()[0], expected);
//! }
//! assert_eq!(network.output("or"), Some(2.0));
//! ```

pub mod networks;
pub mod neurons;
