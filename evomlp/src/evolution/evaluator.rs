use evomlp_nn::networks::Network;

use std::error::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Scores networks decoded from the individuals of a
/// population. Higher is better.
///
/// Evaluators are shared by all worker threads. Any error,
/// panic or non-finite score is recorded as a failure of
/// the individual being evaluated.
pub trait Evaluator: Send + Sync + 'static {
    /// Returns the fitness of `network`.
    fn evaluate(&self, network: &mut Network) -> Result<f64, BoxError>;
}

impl<F> Evaluator for F
where
    F: Fn(&mut Network) -> Result<f64, BoxError> + Send + Sync + 'static,
{
    fn evaluate(&self, network: &mut Network) -> Result<f64, BoxError> {
        self(network)
    }
}
