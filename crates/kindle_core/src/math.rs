//! Math utilities
//!
//! Re-exports the parts of glam the host and scripts share, plus a seeded
//! random stream for gameplay code.

pub use glam::{vec2, Vec2};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Component-wise approximate equality, used by tests and script assertions.
pub fn approx_eq(a: Vec2, b: Vec2, epsilon: f32) -> bool {
    (a - b).abs().max_element() <= epsilon
}

/// Deterministic random stream.
///
/// The same seed always yields the same sequence, so replays reproduce.
#[derive(Debug, Clone)]
pub struct Random {
    rng: ChaCha8Rng,
}

impl Random {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// A new independent stream seeded from this one.
    pub fn split(&mut self) -> Random {
        Random::from_seed(self.rng.next_u64())
    }

    /// Uniform in `[0, 1)`.
    pub fn next_float01(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform in `[0, max)`; zero when `max` is not positive.
    pub fn next_range(&mut self, max: f32) -> f32 {
        if max > 0.0 {
            self.rng.gen_range(0.0..max)
        } else {
            0.0
        }
    }

    pub fn next_bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// A point inside the rectangle spanned by `a` and `b`.
    pub fn next_point2(&mut self, a: Vec2, b: Vec2) -> Vec2 {
        let min = a.min(b);
        let size = a.max(b) - min;
        min + vec2(self.next_float01() * size.x, self.next_float01() * size.y)
    }
}

impl Default for Random {
    fn default() -> Self {
        Random::from_seed(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Random::from_seed(7);
        let mut b = Random::from_seed(7);
        for _ in 0..16 {
            assert_eq!(a.next_float01().to_bits(), b.next_float01().to_bits());
            assert_eq!(a.next_bool(), b.next_bool());
        }
        assert_ne!(
            Random::from_seed(7).next_float01(),
            Random::from_seed(8).next_float01()
        );
    }

    #[test]
    fn values_stay_in_range() {
        let mut random = Random::from_seed(1);
        for _ in 0..1000 {
            let f = random.next_float01();
            assert!((0.0..1.0).contains(&f));
            let r = random.next_range(5.0);
            assert!((0.0..5.0).contains(&r));
            let p = random.next_point2(vec2(10.0, -2.0), vec2(-10.0, 2.0));
            assert!((-10.0..=10.0).contains(&p.x) && (-2.0..=2.0).contains(&p.y));
        }
        assert_eq!(random.next_range(0.0), 0.0);
        assert_eq!(random.next_range(-1.0), 0.0);
    }

    #[test]
    fn split_streams_are_reproducible() {
        let mut master = Random::from_seed(3);
        let mut first = master.split();
        let mut second = master.split();
        assert_ne!(first.next_float01(), second.next_float01());

        let mut again = Random::from_seed(3).split();
        assert_eq!(
            again.next_float01(),
            Random::from_seed(3).split().next_float01()
        );
    }
}
