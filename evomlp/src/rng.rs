use rand::Rng;

/// Sampling shorthands used by the genetic operators.
///
/// Implemented for every `Rng`, so call sites can keep
/// using `rand::thread_rng()` directly.
pub(crate) trait RngExt: Rng {
    /// Returns `true` with probability `chance`.
    fn chance(&mut self, chance: f64) -> bool {
        self.gen::<f64>() < chance
    }

    /// Uniform value between `a` and `b`, in either order.
    /// Degenerate or non-finite ranges yield their lower bound.
    fn between(&mut self, a: f64, b: f64) -> f64 {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        if !(low < high) || !(high - low).is_finite() {
            return low;
        }
        self.gen_range(low..=high)
    }

    /// Uniform integer in the inclusive range spanned by `a` and `b`.
    fn between_sizes(&mut self, a: usize, b: usize) -> usize {
        self.gen_range(a.min(b)..=a.max(b))
    }
}

impl<R: Rng> RngExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_accepts_reversed_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let v = rng.between(1.4, 0.6);
            assert!((0.6..=1.4).contains(&v));
        }
        assert_eq!(rng.between(0.0, 0.0), 0.0);
        assert_eq!(rng.between(-f64::INFINITY, 1.0), -f64::INFINITY);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = rand::thread_rng();
        assert!((0..100).all(|_| !rng.chance(0.0)));
        assert!((0..100).all(|_| rng.chance(1.0)));
    }
}
