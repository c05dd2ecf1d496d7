//! Seeded random source shared by the table, dispenser and task machine

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The random generator threaded through every draw in a simulation
pub type SimRng = ChaCha8Rng;

/// Create the simulation RNG from a seed
pub fn seeded(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Piecewise-linear interpolation between `a` and `b`, with `t` clamped to [0, 1]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for _ in 0..16 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }

    #[test]
    fn test_lerp_clamps() {
        assert!((lerp(1.5, 0.5, 0.0) - 1.5).abs() < 1e-6);
        assert!((lerp(1.5, 0.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((lerp(1.5, 0.5, 0.5) - 1.0).abs() < 1e-6);
        assert!((lerp(1.5, 0.5, 3.0) - 0.5).abs() < 1e-6);
    }
}
