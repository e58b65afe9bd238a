use crate::genomics::{GeneticConfig, Genome, GenomeError};
use crate::rng::RngExt;

use rand::Rng;

/// Returns a mutated copy of `parent`.
///
/// Mutation runs three passes, every decision in them
/// taken with the configured mutation probability:
/// 1. Every bias and weight is either perturbed hard (to
///    within ±40% of its value), or else perturbed softly
///    (to within ±15%), or else left alone.
/// 2. Every layer but the output layer may be resized to
///    between half and one and a half times its size.
/// 3. Scanning the inner layers, a new layer may be inserted
///    after the current one, which ends the scan; otherwise
///    the current layer may be removed.
///
/// Transfer functions, the input count and the output
/// layer's size are never changed.
///
/// # Errors
/// Returns an error if `parent` is malformed.
///
/// # Examples
/// ```
/// use evomlp::{mutate, Genome, GeneticConfig};
/// use std::num::NonZeroUsize;
///
/// let config = GeneticConfig {
///     mutation_probability: 0.5,
///     ..GeneticConfig::default()
/// };
/// let parent = Genome::random(NonZeroUsize::new(3).unwrap(), NonZeroUsize::new(2).unwrap(), &config);
///
/// let child = mutate(&parent, &config).unwrap();
/// child.validate().unwrap();
/// assert_eq!(child.shape().unwrap(), (3, 2));
/// ```
pub fn mutate(parent: &Genome, config: &GeneticConfig) -> Result<Genome, GenomeError> {
    let mut rng = rand::thread_rng();
    let chance = config.mutation_probability;

    let mut child = parent.for_each_neuron(|neuron| {
        neuron.bias = jitter(&mut rng, neuron.bias, chance);
        for weight in neuron.weights.iter_mut() {
            *weight = jitter(&mut rng, *weight, chance);
        }
        true
    })?;

    let sizes = child.layer_sizes()?;
    for layer in 0..sizes.len().saturating_sub(2) {
        if rng.chance(chance) {
            let size = sizes[layer + 1];
            let new_size = rng.between_sizes(size / 2, size + size / 2);
            child = child.change_layer_size(layer, new_size, config)?;
        }
    }

    let mut layer = 1;
    loop {
        let sizes = child.layer_sizes()?;
        let layers = sizes.len().saturating_sub(1);
        if layer + 1 >= layers {
            break;
        }
        if rng.chance(chance) {
            let (current, next) = (sizes[layer + 1], sizes[layer + 2]);
            let (low, high) = (current.min(next), current.max(next));
            let size = rng.between_sizes((low / 2).max(1), high + high / 2);
            child = child.add_layer(layer, size, config)?;
            break;
        }
        if rng.chance(chance) && layers > 2 {
            // The next layer slides into this position.
            child = child.remove_layer(layer, config)?;
            continue;
        }
        layer += 1;
    }

    Ok(child)
}

fn jitter<R: Rng>(rng: &mut R, value: f64, chance: f64) -> f64 {
    if rng.chance(chance) {
        rng.between(value * 0.6, value * 1.4)
    } else if rng.chance(chance) {
        rng.between(value * 0.85, value * 1.15)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::uniform_genome;

    use std::num::NonZeroUsize;

    fn config(chance: f64) -> GeneticConfig {
        GeneticConfig {
            mutation_probability: chance,
            ..GeneticConfig::default()
        }
    }

    fn transfer_ids(genome: &Genome) -> Vec<f64> {
        let mut ids = vec![];
        genome
            .for_each_neuron(|neuron| {
                ids.push(neuron.transfer_id);
                true
            })
            .unwrap();
        ids
    }

    #[test]
    fn zero_chance_is_identity() {
        let config = config(0.0);
        let parent = Genome::random(
            NonZeroUsize::new(3).unwrap(),
            NonZeroUsize::new(2).unwrap(),
            &config,
        );
        assert_eq!(mutate(&parent, &config).unwrap(), parent);
    }

    #[test]
    fn mutation_is_safe() {
        for chance in [0.1, 0.5, 1.0] {
            let config = config(chance);
            for _ in 0..100 {
                let parent = Genome::random(
                    NonZeroUsize::new(3).unwrap(),
                    NonZeroUsize::new(2).unwrap(),
                    &config,
                );
                let child = mutate(&parent, &config).unwrap();
                child.validate().unwrap();
                assert_eq!(child.shape().unwrap(), (3, 2));
                assert!(child.count_layers().unwrap() >= 2);

                let layers = child.decode().unwrap();
                assert_eq!(Genome::encode(&layers).unwrap(), child);
            }
        }
    }

    #[test]
    fn types_survive_value_jitter() {
        // A lone output layer is never resized, so only values change.
        let config = config(1.0);
        let parent = uniform_genome(4.0, 2, &[], 3);
        let child = mutate(&parent, &config).unwrap();
        assert_eq!(child.layer_sizes().unwrap(), vec![2, 3]);
        assert!(transfer_ids(&child).iter().all(|&id| id == 4.0));
        assert!(child.decode().unwrap()[0].iter().all(|neuron| {
            (2.39..=5.61).contains(&neuron.bias)
                && neuron.weights.iter().all(|w| (2.39..=5.61).contains(w))
        }));
    }

    #[test]
    fn jitter_stays_within_hard_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let value = jitter(&mut rng, 10.0, 0.5);
            assert!((5.99..=14.01).contains(&value));
            let value = jitter(&mut rng, -10.0, 0.5);
            assert!((-14.01..=-5.99).contains(&value));
        }
    }
}
