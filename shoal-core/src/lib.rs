//! Math primitives and deterministic randomness shared by the shoal crates.

pub mod stream;
pub mod transform;

pub use stream::RandomStreams;
pub use transform::{look_rotation, Transform};

/// Repulsion strength curve `1 / (1 + d)`.
///
/// Equals 1 at distance zero, decreases monotonically, never divides by
/// zero. Used both for distance-based neighbor repulsion and for scaling
/// angular repulsion down as an agent strays from home.
#[inline]
pub fn falloff(d: f32) -> f32 {
    1.0 / (1.0 + d)
}

#[cfg(test)]
mod tests {
    use super::falloff;

    #[test]
    fn falloff_is_one_at_zero() {
        assert_eq!(falloff(0.0), 1.0);
    }

    #[test]
    fn falloff_strictly_decreases() {
        let mut previous = falloff(0.0);
        for i in 1..100 {
            let value = falloff(i as f32 * 0.25);
            assert!(value < previous, "falloff not decreasing at step {i}");
            previous = value;
        }
    }

    #[test]
    fn falloff_stays_positive() {
        for d in [0.0, 0.5, 1.0, 10.0, 1e6, f32::MAX] {
            assert!(falloff(d) > 0.0, "falloff({d}) not positive");
        }
    }
}
