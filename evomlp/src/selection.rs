//! Strategies for picking the individuals of a
//! population that get to breed.

use crate::populations::Individual;

use rand::Rng;
use thiserror::Error;

use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("cannot select {requested} individuals out of {available}")]
    InsufficientPopulation { requested: usize, available: usize },
}

/// A strategy for selecting `count` individuals
/// from a population.
pub trait Selection {
    /// Selects `count` individuals from `population`.
    /// Selecting none always succeeds.
    ///
    /// # Errors
    /// Returns an error if fewer than `count` individuals
    /// are available to select from.
    fn select(
        &self,
        count: usize,
        population: &[Arc<Individual>],
    ) -> Result<Vec<Arc<Individual>>, SelectionError>;
}

fn check(count: usize, population: &[Arc<Individual>]) -> Result<(), SelectionError> {
    if count > population.len() {
        Err(SelectionError::InsufficientPopulation {
            requested: count,
            available: population.len(),
        })
    } else {
        Ok(())
    }
}

/// Selects the fittest individuals, best first.
/// Individuals with a NaN fitness rank last.
///
/// # Examples
/// ```
/// use evomlp::{Elite, Genome, Individual, Selection};
/// use std::sync::Arc;
///
/// let population: Vec<_> = [1.0, 3.0, 2.0]
///     .iter()
///     .map(|&f| Arc::new(Individual::with_fitness(Genome::new(vec![f]), f)))
///     .collect();
///
/// let best = Elite.select(2, &population).unwrap();
/// assert_eq!(best[0].fitness(), 3.0);
/// assert_eq!(best[1].fitness(), 2.0);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Elite;

impl Selection for Elite {
    fn select(
        &self,
        count: usize,
        population: &[Arc<Individual>],
    ) -> Result<Vec<Arc<Individual>>, SelectionError> {
        if count == 0 {
            return Ok(vec![]);
        }
        check(count, population)?;

        let mut ranked = population.to_vec();
        ranked.sort_by(|a, b| {
            let (a, b) = (a.fitness(), b.fitness());
            match (a.is_nan(), b.is_nan()) {
                (false, false) => b.total_cmp(&a),
                (a_nan, b_nan) => a_nan.cmp(&b_nan),
            }
        });
        ranked.truncate(count);
        Ok(ranked)
    }
}

/// Fitness-proportionate selection, with an independent
/// spin of the wheel per pick. Individuals may be picked
/// more than once.
#[derive(Clone, Copy, Debug, Default)]
pub struct RouletteWheel;

impl Selection for RouletteWheel {
    fn select(
        &self,
        count: usize,
        population: &[Arc<Individual>],
    ) -> Result<Vec<Arc<Individual>>, SelectionError> {
        if count == 0 {
            return Ok(vec![]);
        }
        check(count, population)?;

        let wheel = Wheel::new(population);
        let mut rng = rand::thread_rng();
        Ok((0..count)
            .map(|_| population[wheel.pick(rng.gen::<f64>())].clone())
            .collect())
    }
}

/// Fitness-proportionate selection with evenly spaced
/// pointers, which keeps picks close to each
/// individual's expected share.
#[derive(Clone, Copy, Debug, Default)]
pub struct StochasticUniversalSampling;

impl Selection for StochasticUniversalSampling {
    fn select(
        &self,
        count: usize,
        population: &[Arc<Individual>],
    ) -> Result<Vec<Arc<Individual>>, SelectionError> {
        if count == 0 {
            return Ok(vec![]);
        }
        check(count, population)?;

        let wheel = Wheel::new(population);
        let step = 1.0 / count as f64;
        let mut pointer = rand::thread_rng().gen::<f64>();
        let mut picks = Vec::with_capacity(count);
        for _ in 0..count {
            picks.push(population[wheel.pick(pointer)].clone());
            pointer += step;
            if pointer >= 1.0 {
                pointer -= 1.0;
            }
        }
        Ok(picks)
    }
}

/// Cumulative shares of the total fitness, ending at 1.
/// Negative and non-finite fitnesses get no share; if
/// nobody has a share, everybody gets an equal one.
struct Wheel {
    bounds: Vec<f64>,
    last: usize,
}

impl Wheel {
    fn new(population: &[Arc<Individual>]) -> Wheel {
        let shares: Vec<f64> = population
            .iter()
            .map(|individual| {
                let fitness = individual.fitness();
                if fitness.is_finite() && fitness > 0.0 {
                    fitness
                } else {
                    0.0
                }
            })
            .collect();
        let total: f64 = shares.iter().sum();

        let mut cumulative = 0.0;
        let bounds: Vec<f64> = if total > 0.0 && total.is_finite() {
            shares
                .iter()
                .map(|share| {
                    cumulative += share / total;
                    cumulative
                })
                .collect()
        } else {
            let share = 1.0 / population.len() as f64;
            (0..population.len())
                .map(|_| {
                    cumulative += share;
                    cumulative
                })
                .collect()
        };
        let last = (0..bounds.len())
            .rev()
            .find(|&i| i == 0 || bounds[i] > bounds[i - 1])
            .unwrap_or(0);
        Wheel { bounds, last }
    }

    /// Index of the slot `pointer` falls in, for
    /// a pointer in [0, 1). Rounding errors at the
    /// top end land in the last slot with a share.
    fn pick(&self, pointer: f64) -> usize {
        self.bounds
            .partition_point(|&bound| bound <= pointer)
            .min(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::Genome;

    fn population(fitness: &[f64]) -> Vec<Arc<Individual>> {
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| Arc::new(Individual::with_fitness(Genome::new(vec![i as f64]), f)))
            .collect()
    }

    fn strategies() -> Vec<Box<dyn Selection>> {
        vec![
            Box::new(Elite),
            Box::new(RouletteWheel),
            Box::new(StochasticUniversalSampling),
        ]
    }

    #[test]
    fn selects_requested_count() {
        let population = population(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for strategy in strategies() {
            for count in 0..=5 {
                assert_eq!(strategy.select(count, &population).unwrap().len(), count);
            }
            assert_eq!(
                strategy.select(6, &population),
                Err(SelectionError::InsufficientPopulation {
                    requested: 6,
                    available: 5
                })
            );
            assert!(strategy.select(0, &[]).unwrap().is_empty());
        }
    }

    #[test]
    fn elite_ranks_nan_last() {
        let population = population(&[f64::NAN, 2.0, f64::NEG_INFINITY, 7.0]);
        let picks = Elite.select(4, &population).unwrap();
        let fitness: Vec<f64> = picks.iter().map(|i| i.fitness()).collect();
        assert_eq!(&fitness[..3], &[7.0, 2.0, f64::NEG_INFINITY]);
        assert!(fitness[3].is_nan());
    }

    #[test]
    fn zero_fitness_is_never_spun() {
        let population = population(&[0.0, 1.0, 0.0, -3.0]);
        for _ in 0..100 {
            for picked in RouletteWheel.select(3, &population).unwrap() {
                assert_eq!(picked.fitness(), 1.0);
            }
            for picked in StochasticUniversalSampling.select(4, &population).unwrap() {
                assert_eq!(picked.fitness(), 1.0);
            }
        }
    }

    #[test]
    fn sampling_follows_shares() {
        // Two pointers half a wheel apart can't both
        // land in a slot a quarter wide.
        let population = population(&[1.0, 3.0]);
        for _ in 0..100 {
            let mut picks: Vec<f64> = StochasticUniversalSampling
                .select(2, &population)
                .unwrap()
                .iter()
                .map(|i| i.fitness())
                .collect();
            picks.sort_by(f64::total_cmp);
            assert!(picks == vec![1.0, 3.0] || picks == vec![3.0, 3.0]);
        }
    }

    fn pick_counts(picks: &[Arc<Individual>], population: &[Arc<Individual>]) -> Vec<usize> {
        population
            .iter()
            .map(|individual| picks.iter().filter(|pick| Arc::ptr_eq(pick, individual)).count())
            .collect()
    }

    #[test]
    fn sampling_stays_within_one_pick_of_expectation() {
        let fitness = [1.0, 2.0, 3.0, 4.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let total: f64 = fitness.iter().sum();
        let population = population(&fitness);
        for _ in 0..200 {
            let picks = StochasticUniversalSampling.select(10, &population).unwrap();
            for (count, f) in pick_counts(&picks, &population).into_iter().zip(fitness) {
                let expected = 10.0 * f / total;
                assert!(
                    count as f64 == expected.floor() || count as f64 == expected.ceil(),
                    "{} picks for an expected {}",
                    count,
                    expected
                );
            }
        }
    }

    #[test]
    fn roulette_follows_shares() {
        let fitness = [1.0, 2.0, 3.0, 4.0, 10.0];
        let total: f64 = fitness.iter().sum();
        let population = population(&fitness);
        let mut counts = vec![0; fitness.len()];
        for _ in 0..1000 {
            let picks = RouletteWheel.select(5, &population).unwrap();
            for (sum, count) in counts.iter_mut().zip(pick_counts(&picks, &population)) {
                *sum += count;
            }
        }
        for (count, f) in counts.into_iter().zip(fitness) {
            let share = count as f64 / 5000.0;
            assert!((share - f / total).abs() < 0.03, "share {} for fitness {}", share, f);
        }
    }

    #[test]
    fn hopeless_wheel_is_uniform() {
        let wheel = Wheel::new(&population(&[f64::NEG_INFINITY; 4]));
        assert_eq!(wheel.bounds, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(wheel.pick(0.0), 0);
        assert_eq!(wheel.pick(0.3), 1);
        assert_eq!(wheel.pick(0.99), 3);

        let wheel = Wheel::new(&population(&[0.0, 2.0, 2.0, 0.0]));
        assert_eq!(wheel.pick(0.0), 1);
        assert_eq!(wheel.pick(0.5), 2);
        assert_eq!(wheel.pick(1.0), 2);
    }
}
