use crate::genomics::{Genome, GenomeError};
use crate::rng::RngExt;

use evomlp_nn::neurons::Layer;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Strategies for recombining two parent genomes
/// layer by layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// The shorter parent's layers before a cut point,
    /// followed by the longer parent's layers from it on.
    SinglePoint,
    /// The prefix and suffix of one parent, around a
    /// window of layers taken from the other.
    TwoPoint,
}

impl Crossover {
    /// Picks a strategy uniformly at random.
    pub fn random() -> Crossover {
        if rand::thread_rng().gen_bool(0.5) {
            Crossover::SinglePoint
        } else {
            Crossover::TwoPoint
        }
    }

    /// Produces a child of `dad` and `mom`.
    ///
    /// The spliced layers are re-encoded, so every layer of the
    /// child weighs exactly the outputs of the layer before it.
    /// The child's first layer is always some parent's first
    /// layer, and its last layer some parent's output layer,
    /// so the network's input and output counts are preserved.
    ///
    /// # Errors
    /// Returns an error if either parent is malformed or empty.
    ///
    /// # Examples
    /// ```
    /// use evomlp::{Crossover, Genome, GeneticConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let (inputs, outputs) = (NonZeroUsize::new(3).unwrap(), NonZeroUsize::new(2).unwrap());
    /// let config = GeneticConfig::default();
    /// let dad = Genome::random(inputs, outputs, &config);
    /// let mom = Genome::random(inputs, outputs, &config);
    ///
    /// let child = Crossover::random().apply(&dad, &mom).unwrap();
    /// child.validate().unwrap();
    /// assert_eq!(child.shape().unwrap(), (3, 2));
    /// ```
    pub fn apply(self, dad: &Genome, mom: &Genome) -> Result<Genome, GenomeError> {
        let dad = dad.decode()?;
        let mom = mom.decode()?;
        if dad.is_empty() || mom.is_empty() {
            return Err(GenomeError::Empty);
        }

        let mut rng = rand::thread_rng();
        let child = match self {
            Crossover::SinglePoint => single_point(dad, mom, &mut rng),
            Crossover::TwoPoint => two_point(dad, mom, &mut rng),
        };
        Genome::encode(&child)
    }
}

fn single_point<R: Rng>(dad: Vec<Layer>, mom: Vec<Layer>, rng: &mut R) -> Vec<Layer> {
    let (shorter, longer) = if dad.len() <= mom.len() {
        (dad, mom)
    } else {
        (mom, dad)
    };
    let count = shorter.len();
    let mut cut = rng.between(count as f64 * 0.3, count as f64 * 0.7) as usize;
    if cut == count {
        cut = count / 2;
    }

    shorter
        .into_iter()
        .take(cut)
        .chain(longer.into_iter().skip(cut))
        .collect()
}

fn two_point<R: Rng>(dad: Vec<Layer>, mom: Vec<Layer>, rng: &mut R) -> Vec<Layer> {
    let (outer, inner) = if rng.gen_bool(0.5) {
        (dad, mom)
    } else {
        (mom, dad)
    };
    let (n, m) = (outer.len() as f64, inner.len() as f64);
    let first_cut = (rng.between(n * 0.2, n * 0.5) as usize).max(1);
    let second_cut = (rng.between(n * 0.5, n * 0.8) as usize).min(outer.len() - 1);
    let start = rng.between(0.0, m * 0.4) as usize;
    let end = (rng.between(m * 0.6, m) as usize).min(inner.len());

    outer[..first_cut]
        .iter()
        .chain(&inner[start..end])
        .chain(&outer[second_cut..])
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{uniform_genome, GeneticConfig};

    use std::num::NonZeroUsize;

    #[test]
    fn single_point_of_uniform_parents() {
        let dad = uniform_genome(1.0, 1, &[3], 1);
        let mom = uniform_genome(2.0, 1, &[3], 1);
        for _ in 0..20 {
            let child = Crossover::SinglePoint.apply(&dad, &mom).unwrap();
            let layers = child.decode().unwrap();
            assert_eq!(layers.len(), 2);
            assert_eq!(child.layer_sizes().unwrap(), vec![1, 3, 1]);
        }
    }

    #[test]
    fn single_point_takes_tail_of_longer_parent() {
        let short = uniform_genome(1.0, 2, &[3], 1);
        let long = uniform_genome(2.0, 2, &[4, 5, 6], 1);
        for _ in 0..20 {
            let child = Crossover::SinglePoint.apply(&long, &short).unwrap();
            child.validate().unwrap();
            // A 2-layer parent is cut before or after its hidden layer.
            let sizes = child.layer_sizes().unwrap();
            assert!(sizes == vec![2, 4, 5, 6, 1] || sizes == vec![2, 3, 5, 6, 1]);
        }
    }

    #[test]
    fn children_are_consistent() {
        let config = GeneticConfig::default();
        let (inputs, outputs) = (NonZeroUsize::new(4).unwrap(), NonZeroUsize::new(3).unwrap());
        for _ in 0..200 {
            let dad = Genome::random(inputs, outputs, &config);
            let mom = Genome::random(inputs, outputs, &config);
            for strategy in [Crossover::SinglePoint, Crossover::TwoPoint] {
                let child = strategy.apply(&dad, &mom).unwrap();
                child.validate().unwrap();
                assert_eq!(child.shape().unwrap(), (4, 3));
            }
        }
    }

    #[test]
    fn empty_parents_fail() {
        let genome = uniform_genome(1.0, 1, &[], 1);
        assert_eq!(
            Crossover::TwoPoint.apply(&genome, &Genome::default()),
            Err(GenomeError::Empty)
        );
    }
}
