use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// A TransferFunction is the activation function
/// a neuron applies to its weighted input sum.
///
/// Every variant has a stable numeric id, which is
/// how the function is stored inside a genome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferFunction {
    // x
    Identity,
    // ((√(x² + 1) - 1) / 2) + x
    BentIdentity,
    // 1 / (1 + exp(-x))
    Sigmoid,
    // tanh(x)
    Tanh,
    // atan(x)
    ArcTan,
    // x / (1 + |x|)
    Softsign,
    // x / √(1 + x²)
    Isru,
    // 0   if x < 0
    // x   if x ≥ 0
    Relu,
    // 0.2x if x < 0
    // x    if x ≥ 0
    LeakyRelu,
    // ln(1 + exp(x))
    Softplus,
    // exp(-x²)
    Gaussian,
}

impl TransferFunction {
    /// Every transfer function, in id order.
    pub const ALL: [TransferFunction; 11] = [
        Self::Identity,
        Self::BentIdentity,
        Self::Sigmoid,
        Self::Tanh,
        Self::ArcTan,
        Self::Softsign,
        Self::Isru,
        Self::Relu,
        Self::LeakyRelu,
        Self::Softplus,
        Self::Gaussian,
    ];

    /// Returns the numeric id used to store this
    /// function inside a genome.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::neurons::TransferFunction;
    ///
    /// assert_eq!(TransferFunction::Identity.id(), 1);
    /// assert_eq!(TransferFunction::Sigmoid.id(), 3);
    /// assert_eq!(TransferFunction::Gaussian.id(), 11);
    /// ```
    pub const fn id(self) -> u8 {
        match self {
            Self::Identity => 1,
            Self::BentIdentity => 2,
            Self::Sigmoid => 3,
            Self::Tanh => 4,
            Self::ArcTan => 5,
            Self::Softsign => 6,
            Self::Isru => 7,
            Self::Relu => 8,
            Self::LeakyRelu => 9,
            Self::Softplus => 10,
            Self::Gaussian => 11,
        }
    }

    /// Returns the transfer function stored under `id`,
    /// or `None` if `id` is not an exact, known identifier.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::neurons::TransferFunction;
    ///
    /// assert_eq!(TransferFunction::from_id(4.0), Some(TransferFunction::Tanh));
    /// assert_eq!(TransferFunction::from_id(4.5), None);
    /// assert_eq!(TransferFunction::from_id(0.0), None);
    /// assert_eq!(TransferFunction::from_id(f64::NAN), None);
    /// ```
    pub fn from_id(id: f64) -> Option<TransferFunction> {
        if id.fract() != 0.0 || !(1.0..=11.0).contains(&id) {
            return None;
        }
        Some(Self::ALL[id as usize - 1])
    }

    /// Like [`from_id`], but unknown identifiers
    /// decode to the default function, [`Sigmoid`].
    ///
    /// [`from_id`]: TransferFunction::from_id
    /// [`Sigmoid`]: TransferFunction::Sigmoid
    pub fn from_id_or_default(id: f64) -> TransferFunction {
        Self::from_id(id).unwrap_or_default()
    }

    /// Applies the function to `x`.
    ///
    /// # Examples
    /// ```
    /// use evomlp_nn::neurons::TransferFunction;
    ///
    /// assert_eq!(TransferFunction::Sigmoid.activation(0.0), 0.5);
    /// assert_eq!(TransferFunction::Relu.activation(-3.0), 0.0);
    /// assert_eq!(TransferFunction::LeakyRelu.activation(-1.0), -0.2);
    /// ```
    pub fn activation(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::BentIdentity => ((x.powi(2) + 1.0).sqrt() - 1.0) / 2.0 + x,
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::ArcTan => x.atan(),
            Self::Softsign => x / (1.0 + x.abs()),
            Self::Isru => x / (1.0 + x.powi(2)).sqrt(),
            Self::Relu => {
                if x < 0.0 {
                    0.0
                } else {
                    x
                }
            }
            Self::LeakyRelu => {
                if x < 0.0 {
                    0.2 * x
                } else {
                    x
                }
            }
            Self::Softplus => x.exp().ln_1p(),
            Self::Gaussian => (-x.powi(2)).exp(),
        }
    }

    /// Returns the function's derivative, given both
    /// the `output` of [`activation`] and its input `x`.
    ///
    /// [`activation`]: TransferFunction::activation
    pub fn derivative(self, output: f64, x: f64) -> f64 {
        match self {
            Self::Identity => 1.0,
            Self::BentIdentity => x / (2.0 * (x.powi(2) + 1.0).sqrt()) + 1.0,
            Self::Sigmoid => output * (1.0 - output),
            Self::Tanh => 1.0 - output.powi(2),
            Self::ArcTan => 1.0 / (x.powi(2) + 1.0),
            Self::Softsign => 1.0 / (1.0 + x.abs()).powi(2),
            Self::Isru => (1.0 / (1.0 + x.powi(2)).sqrt()).powi(3),
            Self::Relu => {
                if x < 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            Self::LeakyRelu => {
                if x < 0.0 {
                    0.2
                } else {
                    1.0
                }
            }
            Self::Softplus => 1.0 / (1.0 + (-x).exp()),
            Self::Gaussian => -2.0 * x * output,
        }
    }
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::Sigmoid
    }
}

impl Distribution<TransferFunction> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> TransferFunction {
        TransferFunction::ALL[rng.gen_range(0..TransferFunction::ALL.len())]
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn ids_are_contiguous() {
        for (i, function) in TransferFunction::ALL.iter().enumerate() {
            assert_eq!(function.id() as usize, i + 1);
            assert_eq!(TransferFunction::from_id(function.id() as f64), Some(*function));
        }
    }

    #[test]
    fn unknown_ids_default_to_sigmoid() {
        for id in [0.0, 12.0, -3.0, 2.5, f64::INFINITY, f64::NAN] {
            assert_eq!(
                TransferFunction::from_id_or_default(id),
                TransferFunction::Sigmoid
            );
        }
    }

    #[test]
    fn activations() {
        use TransferFunction::*;
        assert_eq!(Identity.activation(-1.5), -1.5);
        assert_eq!(BentIdentity.activation(0.0), 0.0);
        assert!((Tanh.activation(1.0) - 1f64.tanh()).abs() < EPSILON);
        assert!((ArcTan.activation(1.0) - std::f64::consts::FRAC_PI_4).abs() < EPSILON);
        assert_eq!(Softsign.activation(1.0), 0.5);
        assert!((Isru.activation(1.0) - 1.0 / 2f64.sqrt()).abs() < EPSILON);
        assert_eq!(Relu.activation(2.0), 2.0);
        assert!((Softplus.activation(0.0) - 2f64.ln()).abs() < EPSILON);
        assert_eq!(Gaussian.activation(0.0), 1.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        const H: f64 = 1e-6;
        for function in TransferFunction::ALL {
            // Away from the kinks of the rectifiers.
            for x in [-1.3, -0.4, 0.7, 1.9] {
                let numeric =
                    (function.activation(x + H) - function.activation(x - H)) / (2.0 * H);
                let analytic = function.derivative(function.activation(x), x);
                assert!(
                    (numeric - analytic).abs() < 1e-4,
                    "{} at {}: {} vs {}",
                    function,
                    x,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn random_functions_are_valid() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let function: TransferFunction = rng.gen();
            assert!(TransferFunction::from_id(function.id() as f64).is_some());
        }
    }

    #[test]
    fn serializes_by_name() {
        let json = serde_json::to_string(&TransferFunction::LeakyRelu).unwrap();
        assert_eq!(json, "\"LeakyRelu\"");
    }
}
